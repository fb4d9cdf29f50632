//! Bounded, newest-first log of dominant emotions with consecutive runs
//! collapsed to a single entry.

use serde::Serialize;
use time::{macros::format_description, OffsetDateTime};

use super::{Emotion, EmotionSample};
use crate::config::DEFAULT_HISTORY_CAP;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub emotion: Emotion,
    /// Percentage in `[0, 100]`.
    pub confidence: f32,
}

impl HistoryEntry {
    /// Entry for the sample's dominant emotion, `None` for an empty sample.
    pub fn from_sample(sample: &EmotionSample, at: OffsetDateTime) -> Option<Self> {
        sample.dominant().map(|(emotion, p)| Self {
            at,
            emotion,
            confidence: p * 100.0,
        })
    }

    pub fn time_label(&self) -> String {
        self.at
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default()
    }

    pub fn confidence_label(&self) -> String {
        format!("{:.1}%", self.confidence)
    }
}

/// Transition function of the tracker.
///
/// Returns `current` unchanged when `entry` repeats the head's emotion,
/// otherwise `entry` prepended and the result truncated to `cap`. A cap of
/// zero means no cap, as with `HISTORY_CAP=0`.
pub fn push_entry(
    current: &[HistoryEntry],
    entry: HistoryEntry,
    cap: Option<usize>,
) -> Vec<HistoryEntry> {
    if current.first().is_some_and(|head| head.emotion == entry.emotion) {
        return current.to_vec();
    }
    let keep = match normalize_cap(cap) {
        Some(c) => (c - 1).min(current.len()),
        None => current.len(),
    };
    let mut next = Vec::with_capacity(keep + 1);
    next.push(entry);
    next.extend_from_slice(&current[..keep]);
    next
}

fn normalize_cap(cap: Option<usize>) -> Option<usize> {
    cap.filter(|c| *c > 0)
}

#[derive(Debug, Clone, Serialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    #[serde(skip)]
    cap: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Some(DEFAULT_HISTORY_CAP))
    }
}

impl History {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cap: normalize_cap(cap),
        }
    }

    /// Feeds one sample. Returns whether an entry was added.
    pub fn record(&mut self, sample: &EmotionSample, at: OffsetDateTime) -> bool {
        let Some(entry) = HistoryEntry::from_sample(sample, at) else {
            return false;
        };
        if self.head().is_some_and(|h| h.emotion == entry.emotion) {
            return false;
        }
        self.entries = push_entry(&self.entries, entry, self.cap);
        true
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn head(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// The newest `n` entries.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }
}
