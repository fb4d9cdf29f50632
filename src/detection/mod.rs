//! Capture → classify → render loop and the seams it drives.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::emotion::EmotionSample;

pub mod assets;
pub mod dashboard;
pub mod runner;

pub use assets::ModelAssets;
pub use dashboard::{Dashboard, DashboardView};
pub use runner::DetectionLoop;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const FALLBACK: Dimensions = Dimensions {
        width: 480,
        height: 360,
    };

    /// Native size as reported by the device; zero means "unknown yet".
    pub fn native_or_fallback(width: u32, height: u32) -> Self {
        Self {
            width: if width == 0 { Self::FALLBACK.width } else { width },
            height: if height == 0 { Self::FALLBACK.height } else { height },
        }
    }
}

/// One captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub size: Dimensions,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

impl FaceBox {
    pub fn scale(&self, from: Dimensions, to: Dimensions) -> FaceBox {
        let sx = to.width as f32 / from.width.max(1) as f32;
        let sy = to.height as f32 / from.height.max(1) as f32;
        FaceBox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
            score: self.score,
        }
    }
}

/// A face found in a frame plus its expression distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub face: FaceBox,
    pub expressions: EmotionSample,
}

impl Detection {
    /// Maps the detection from frame coordinates onto a surface of `display` size.
    pub fn resized(&self, frame: Dimensions, display: Dimensions) -> Detection {
        Detection {
            face: self.face.scale(frame, display),
            expressions: self.expressions.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    /// Camera permission denied or no device present.
    #[error("camera unavailable: {0}")]
    MediaAccess(String),

    #[error("model file missing: {0}")]
    ModelsMissing(String),

    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("classifier failed: {0}")]
    Classifier(#[from] anyhow::Error),
}

/// Live video input.
#[async_trait]
pub trait FrameSource: Send {
    /// Acquires the stream and reports its native size.
    async fn open(&mut self) -> Result<Dimensions, DetectionError>;
    /// Current frame, `None` when none is ready yet.
    async fn capture(&mut self) -> Option<Frame>;
    /// Stops the stream and frees the device.
    async fn release(&mut self);
}

/// Face detector plus expression classifier.
#[async_trait]
pub trait Classifier: Send {
    async fn load(&mut self, models: &ModelAssets) -> Result<(), DetectionError>;
    async fn detect(&mut self, frame: &Frame) -> anyhow::Result<Option<Detection>>;
}

/// Overlay drawn on top of the video.
pub trait RenderSurface: Send {
    fn resize(&mut self, size: Dimensions);
    fn clear(&mut self);
    fn draw(&mut self, detection: &Detection);
}
