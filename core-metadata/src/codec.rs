//! Thumbnail encoding
//!
//! [`ThumbnailGenerator`] is the seam the resolver renders through; the
//! desktop default decodes with the `image` crate.

use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_runtime::config::ThumbnailDimensions;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Renders thumbnail bytes from an image on disk.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Fit `source` inside `dimensions`, or the full-size bounds when `None`.
    async fn generate(
        &self,
        source: &Path,
        dimensions: Option<ThumbnailDimensions>,
    ) -> Result<Bytes>;
}

/// `image`-backed generator.
///
/// Produces JPEG, or PNG when the source has an alpha channel. Images that
/// already fit are re-encoded without upscaling.
pub struct ImageThumbnailGenerator {
    fs: Arc<dyn FileSystemAccess>,
}

impl ImageThumbnailGenerator {
    pub fn new(fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl ThumbnailGenerator for ImageThumbnailGenerator {
    async fn generate(
        &self,
        source: &Path,
        dimensions: Option<ThumbnailDimensions>,
    ) -> Result<Bytes> {
        let data = self.fs.read_file(source).await?;
        let dimensions = dimensions.unwrap_or_default();
        render_thumbnail(&data, dimensions)
    }
}

/// Decode, shrink to fit and re-encode.
pub fn render_thumbnail(data: &[u8], dimensions: ThumbnailDimensions) -> Result<Bytes> {
    let img = image::load_from_memory(data).map_err(|e| MetadataError::ImageProcessing {
        message: format!("Failed to load image: {}", e),
    })?;

    let fitted = if img.width() > dimensions.width || img.height() > dimensions.height {
        img.thumbnail(dimensions.width, dimensions.height)
    } else {
        img
    };

    let (encoded, format) = if fitted.color().has_alpha() {
        (fitted, ImageFormat::Png)
    } else {
        (DynamicImage::ImageRgb8(fitted.to_rgb8()), ImageFormat::Jpeg)
    };

    let mut buffer = Vec::new();
    encoded
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| MetadataError::ImageProcessing {
            message: format!("Failed to encode thumbnail: {}", e),
        })?;

    debug!(
        width = encoded.width(),
        height = encoded.height(),
        ?format,
        size = buffer.len(),
        "Rendered thumbnail"
    );

    Ok(Bytes::from(buffer))
}
