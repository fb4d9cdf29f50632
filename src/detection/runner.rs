//! Capture/classify/render loop behind the dashboard.
//!
//! The camera, classifier and overlay are traits so an embedding client can
//! plug in its own media and inference backends.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::{
    sync::watch,
    time::{interval, timeout, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::{
    dashboard::MEDIA_ALERT, Classifier, Dashboard, DashboardView, Detection, DetectionError,
    Dimensions, Frame, FrameSource, ModelAssets, RenderSurface,
};
use crate::config::DetectionConfig;

enum Cycle {
    Face(Detection),
    NoFace,
    Skipped,
}

/// Drives one dashboard session.
///
/// Each tick captures a frame and awaits its classification before the next
/// tick is taken, so at most one classification is in flight. Missed ticks are
/// delayed rather than bursted.
pub struct DetectionLoop<S, C, R> {
    source: S,
    classifier: C,
    surface: R,
    models: ModelAssets,
    frame_interval: Duration,
    classify_timeout: Option<Duration>,
    dashboard: Dashboard,
    view_tx: watch::Sender<DashboardView>,
}

impl<S, C, R> DetectionLoop<S, C, R>
where
    S: FrameSource,
    C: Classifier,
    R: RenderSurface,
{
    pub fn new(
        config: &DetectionConfig,
        source: S,
        classifier: C,
        surface: R,
    ) -> (Self, watch::Receiver<DashboardView>) {
        let dashboard = Dashboard::new(config.history_cap);
        let (view_tx, view_rx) = watch::channel(dashboard.view());
        let runner = Self {
            source,
            classifier,
            surface,
            models: ModelAssets::new(&config.models_dir),
            frame_interval: config.frame_interval,
            classify_timeout: config.classify_timeout,
            dashboard,
            view_tx,
        };
        (runner, view_rx)
    }

    /// Runs until `cancel` fires or a failure occurs. The camera is released
    /// on every exit path once it has been opened.
    #[instrument(skip_all, name = "detection_loop")]
    pub async fn run(mut self, cancel: CancellationToken) -> Result<Dashboard, DetectionError> {
        let size = match self.init().await {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "dashboard initialization failed");
                self.dashboard.fail(MEDIA_ALERT);
                self.publish();
                return Err(e);
            }
        };

        let outcome = self.cycle_until_cancelled(size, &cancel).await;
        self.source.release().await;
        info!("camera released");

        match outcome {
            Ok(()) => Ok(self.dashboard),
            Err(e) => {
                error!(error = %e, "detection loop stopped");
                Err(e)
            }
        }
    }

    async fn init(&mut self) -> Result<Dimensions, DetectionError> {
        self.models.verify().await?;
        self.classifier.load(&self.models).await?;
        self.dashboard.models_loaded();
        self.publish();
        info!(dir = %self.models.dir().display(), "models loaded");

        let size = self.source.open().await?;
        self.surface.resize(size);
        self.dashboard.camera_started();
        self.publish();
        info!(width = size.width, height = size.height, "camera opened");
        Ok(size)
    }

    async fn cycle_until_cancelled(
        &mut self,
        size: Dimensions,
        cancel: &CancellationToken,
    ) -> Result<(), DetectionError> {
        let mut ticks = interval(self.frame_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = ticks.tick() => {}
            }

            let Some(frame) = self.source.capture().await else {
                trace!("no frame ready");
                continue;
            };

            let cycle = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                cycle = self.classify(&frame) => cycle?,
            };
            self.render(size, &frame, cycle);
        }
    }

    async fn classify(&mut self, frame: &Frame) -> Result<Cycle, DetectionError> {
        let limit = self.classify_timeout;
        let detect = self.classifier.detect(frame);
        let result = match limit {
            Some(limit) => match timeout(limit, detect).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "classification timed out");
                    return Ok(Cycle::Skipped);
                }
            },
            None => detect.await,
        };

        Ok(match result? {
            Some(detection) => Cycle::Face(detection),
            None => Cycle::NoFace,
        })
    }

    fn render(&mut self, size: Dimensions, frame: &Frame, cycle: Cycle) {
        match cycle {
            Cycle::Skipped => return,
            // Last readout stays on screen; history is untouched.
            Cycle::NoFace => {
                self.surface.clear();
                trace!("no face");
            }
            Cycle::Face(detection) => {
                self.surface.clear();
                self.surface.draw(&detection.resized(frame.size, size));
                if self
                    .dashboard
                    .observe(detection.expressions, OffsetDateTime::now_utc())
                {
                    if let Some(head) = self.dashboard.history().head() {
                        debug!(emotion = %head.emotion, confidence = head.confidence, "history entry added");
                    }
                }
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.dashboard.view());
    }
}
