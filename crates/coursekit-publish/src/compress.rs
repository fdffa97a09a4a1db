//! Image compression collaborator used before upload.

use std::path::Path;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Targets for [`AssetCompressor::compress`]. `None` leaves that bound open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionOptions {
    pub max_size_mb: Option<f64>,
    pub max_dimension: Option<u32>,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_size_mb: Some(1.0),
            max_dimension: Some(1920),
        }
    }
}

impl CompressionOptions {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn max_bytes(&self) -> Option<usize> {
        self.max_size_mb.map(|mb| (mb * BYTES_PER_MB) as usize)
    }
}

/// An in-memory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("image could not be processed: {0}")]
    Image(#[from] image::ImageError),

    #[error("compression worker failed: {0}")]
    Worker(String),
}

/// Shrinks an asset. Callers fall back to the original on `Err`.
#[async_trait]
pub trait AssetCompressor: Send + Sync {
    async fn compress(
        &self,
        file: &AssetFile,
        options: &CompressionOptions,
    ) -> Result<AssetFile, CompressError>;
}

/// JPEG re-encoder built on the `image` crate.
///
/// Downscales to `max_dimension` (aspect ratio kept), then lowers JPEG quality
/// step by step until the output fits `max_size_mb` or `min_quality` is reached.
#[derive(Debug, Clone, Copy)]
pub struct ImageCompressor {
    pub initial_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self {
            initial_quality: 85,
            min_quality: 40,
            quality_step: 10,
        }
    }
}

struct Encoded {
    bytes: Vec<u8>,
    resized: bool,
}

impl ImageCompressor {
    fn compress_blocking(
        self,
        bytes: &[u8],
        options: CompressionOptions,
    ) -> Result<Encoded, CompressError> {
        let decoded = image::load_from_memory(bytes)?;
        let (image, resized) = match options.max_dimension {
            Some(max) if decoded.width() > max || decoded.height() > max => {
                (decoded.resize(max, max, FilterType::Lanczos3), true)
            }
            _ => (decoded, false),
        };
        let rgb = image.to_rgb8();
        let max_bytes = options.max_bytes();

        let mut quality = self.initial_quality.max(self.min_quality);
        loop {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;

            let fits = max_bytes.is_none_or(|max| out.len() <= max);
            if fits || quality <= self.min_quality {
                if !fits {
                    tracing::debug!(
                        quality,
                        size = out.len(),
                        "image still above size target at minimum quality"
                    );
                }
                return Ok(Encoded {
                    bytes: out,
                    resized,
                });
            }
            quality = quality
                .saturating_sub(self.quality_step.max(1))
                .max(self.min_quality);
        }
    }
}

#[async_trait]
impl AssetCompressor for ImageCompressor {
    async fn compress(
        &self,
        file: &AssetFile,
        options: &CompressionOptions,
    ) -> Result<AssetFile, CompressError> {
        let within_size = options
            .max_bytes()
            .is_none_or(|max| file.bytes.len() <= max);
        if within_size && options.max_dimension.is_none() {
            return Ok(file.clone());
        }

        let bytes = file.bytes.clone();
        let opts = *options;
        let compressor = *self;
        let encoded = tokio::task::spawn_blocking(move || compressor.compress_blocking(&bytes, opts))
            .await
            .map_err(|e| CompressError::Worker(e.to_string()))??;

        // Re-encoding a small, already-fitting image can make it bigger.
        if within_size && !encoded.resized && encoded.bytes.len() >= file.bytes.len() {
            return Ok(file.clone());
        }

        Ok(AssetFile {
            name: jpeg_name(&file.name),
            content_type: "image/jpeg".to_string(),
            bytes: encoded.bytes,
        })
    }
}

fn jpeg_name(name: &str) -> String {
    Path::new(name)
        .with_extension("jpg")
        .to_string_lossy()
        .into_owned()
}
