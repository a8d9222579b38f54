use anyhow::{bail, Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// A rendered view of the report that can be rasterized for export.
#[async_trait::async_trait]
pub trait ReportSurface: Send + Sync {
    fn surface_name(&self) -> &str;

    /// Rasterizes the surface at `oversample` times its layout resolution.
    async fn capture(&self, oversample: u32) -> Result<RgbaImage>;
}

/// Surface backed by a pre-rendered PNG or JPEG snapshot on disk.
///
/// The file is taken at its native resolution; it is assumed to have been
/// rendered with oversampling already.
#[derive(Debug, Clone)]
pub struct ImageFileSurface {
    path: PathBuf,
}

impl ImageFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ReportSurface for ImageFileSurface {
    fn surface_name(&self) -> &str {
        "image_file"
    }

    async fn capture(&self, oversample: u32) -> Result<RgbaImage> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read snapshot {}", self.path.display()))?;
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("failed to decode snapshot {}", self.path.display()))?
            .to_rgba8();

        if decoded.width() == 0 || decoded.height() == 0 {
            bail!("snapshot {} is empty", self.path.display());
        }

        tracing::debug!(
            path = %self.path.display(),
            width = decoded.width(),
            height = decoded.height(),
            oversample,
            "loaded report snapshot"
        );
        Ok(decoded)
    }
}
