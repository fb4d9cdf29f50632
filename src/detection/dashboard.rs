use serde::Serialize;
use time::OffsetDateTime;

use crate::emotion::{
    history::{History, HistoryEntry},
    EmotionSample,
};

/// Entries shown in the sidebar.
pub const SIDEBAR_ENTRIES: usize = 6;

pub const MEDIA_ALERT: &str =
    "Ensure camera permission allowed and models exist in /public/models";

/// Snapshot handed to the renderer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub models_loaded: bool,
    pub camera_ready: bool,
    pub expressions: Option<EmotionSample>,
    pub history: Vec<HistoryEntry>,
    /// Blocking error dialog text; the viewer has to reload.
    pub alert: Option<String>,
}

impl DashboardView {
    pub fn sidebar(&self) -> &[HistoryEntry] {
        &self.history[..SIDEBAR_ENTRIES.min(self.history.len())]
    }
}

/// Owner of the dashboard state. Fields change only through the transition
/// methods below.
#[derive(Debug, Clone)]
pub struct Dashboard {
    models_loaded: bool,
    camera_ready: bool,
    expressions: Option<EmotionSample>,
    history: History,
    alert: Option<String>,
}

impl Dashboard {
    pub fn new(history_cap: Option<usize>) -> Self {
        Self {
            models_loaded: false,
            camera_ready: false,
            expressions: None,
            history: History::new(history_cap),
            alert: None,
        }
    }

    pub fn models_loaded(&mut self) {
        self.models_loaded = true;
    }

    pub fn camera_started(&mut self) {
        self.camera_ready = true;
    }

    /// A face was found. Returns whether the history grew.
    pub fn observe(&mut self, expressions: EmotionSample, at: OffsetDateTime) -> bool {
        let added = self.history.record(&expressions, at);
        self.expressions = Some(expressions);
        added
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            models_loaded: self.models_loaded,
            camera_ready: self.camera_ready,
            expressions: self.expressions.clone(),
            history: self.history.entries().to_vec(),
            alert: self.alert.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;
    use time::Duration;

    #[test]
    fn observe_updates_expressions_and_history() {
        let mut dash = Dashboard::new(Some(20));
        let t = OffsetDateTime::UNIX_EPOCH;
        assert!(dash.observe(EmotionSample::new().with(Emotion::Happy, 0.9), t));
        assert!(!dash.observe(
            EmotionSample::new().with(Emotion::Happy, 0.7),
            t + Duration::seconds(1)
        ));

        let view = dash.view();
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.expressions.unwrap().get(Emotion::Happy), Some(0.7));
    }

    #[test]
    fn sidebar_shows_six_newest() {
        let mut dash = Dashboard::new(None);
        let t = OffsetDateTime::UNIX_EPOCH;
        for i in 0..10 {
            let e = Emotion::ALL[i % 2];
            dash.observe(EmotionSample::new().with(e, 0.9), t + Duration::seconds(i as i64));
        }
        let view = dash.view();
        assert_eq!(view.history.len(), 10);
        assert_eq!(view.sidebar().len(), SIDEBAR_ENTRIES);
        assert_eq!(view.sidebar()[0], view.history[0]);
    }

    #[test]
    fn failure_sets_alert() {
        let mut dash = Dashboard::new(Some(20));
        dash.fail(MEDIA_ALERT);
        assert_eq!(dash.view().alert.as_deref(), Some(MEDIA_ALERT));
    }
}
