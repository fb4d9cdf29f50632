use std::path::{Path, PathBuf};

use tracing::debug;

use super::DetectionError;

/// Weight manifests the classifier needs from the public models directory.
pub const REQUIRED_MANIFESTS: [&str; 2] = [
    "tiny_face_detector_model-weights_manifest.json",
    "face_expression_model-weights_manifest.json",
];

#[derive(Debug, Clone)]
pub struct ModelAssets {
    dir: PathBuf,
}

impl ModelAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Fails with [`DetectionError::ModelsMissing`] naming the first absent file.
    pub async fn verify(&self) -> Result<(), DetectionError> {
        for name in REQUIRED_MANIFESTS {
            let path = self.manifest(name);
            let present = tokio::fs::try_exists(&path).await.unwrap_or(false);
            if !present {
                return Err(DetectionError::ModelsMissing(path.display().to_string()));
            }
            debug!(path = %path.display(), "model manifest present");
        }
        Ok(())
    }
}
