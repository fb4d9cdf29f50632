use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod history;

/// Expression labels reported by the classifier.
///
/// Declaration order is the canonical order: it drives iteration over a
/// sample and breaks ties during dominance selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// One classifier output: probability per label. Probabilities are not
/// required to sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionSample(BTreeMap<Emotion, f32>);

impl EmotionSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sample from raw classifier output, dropping unknown labels and
    /// non-finite probabilities.
    pub fn from_labels<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        pairs
            .into_iter()
            .filter_map(|(label, p)| label.parse::<Emotion>().ok().map(|e| (e, p)))
            .collect()
    }

    pub fn with(mut self, emotion: Emotion, probability: f32) -> Self {
        self.insert(emotion, probability);
        self
    }

    pub fn insert(&mut self, emotion: Emotion, probability: f32) {
        if probability.is_finite() {
            self.0.insert(emotion, probability.clamp(0.0, 1.0));
        }
    }

    pub fn get(&self, emotion: Emotion) -> Option<f32> {
        self.0.get(&emotion).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        self.0.iter().map(|(e, p)| (*e, *p))
    }

    /// Label with the highest probability; the earliest label in canonical
    /// order wins a tie. `None` for an empty sample.
    pub fn dominant(&self) -> Option<(Emotion, f32)> {
        self.iter().fold(None, |best, (e, p)| match best {
            Some((_, bp)) if p <= bp => best,
            _ => Some((e, p)),
        })
    }

    /// Labels sorted by probability, highest first, for display.
    pub fn ranked(&self) -> Vec<(Emotion, f32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

impl FromIterator<(Emotion, f32)> for EmotionSample {
    fn from_iter<T: IntoIterator<Item = (Emotion, f32)>>(iter: T) -> Self {
        let mut sample = EmotionSample::new();
        for (e, p) in iter {
            sample.insert(e, p);
        }
        sample
    }
}
