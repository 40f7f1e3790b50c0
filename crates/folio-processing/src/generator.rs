//! Derivative generator
//!
//! Produces resized copies of one original for every configured width and every
//! available encoding. Runs synchronously; callers on an async runtime should
//! move it onto the blocking pool.

use crate::compression::{available_encodings, encode};
use crate::error::{ProcessingError, ProcessingResult};
use crate::naming::{derivative_key, is_raster_extension};
use folio_core::{DerivativeSet, Encoding, MediaSettings};
use folio_storage::normalize_key;
use image::imageops::FilterType;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct DerivativeGenerator {
    media_root: PathBuf,
    deriv_root: PathBuf,
    widths: Vec<u32>,
    quality: u8,
    encodings: Vec<Encoding>,
}

impl DerivativeGenerator {
    pub fn new(settings: &MediaSettings) -> Self {
        Self {
            media_root: settings.media_root.clone(),
            deriv_root: settings.deriv_root.clone(),
            widths: settings.deriv_widths.clone(),
            quality: settings.deriv_quality,
            encodings: available_encodings(settings.avif_enabled),
        }
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    /// Generate every derivative for the original at `rel`.
    ///
    /// A missing original or a non-raster extension yields an empty set. A decode
    /// failure returns an error before anything is written. If an encode or write
    /// fails partway, files already written in this run are removed.
    pub fn generate(&self, rel: &str) -> ProcessingResult<DerivativeSet> {
        let key = normalize_key(rel)?;
        let source = self.media_root.join(&key);

        if key.is_empty() || !source.is_file() {
            tracing::debug!(rel = %key, "Original missing, nothing to generate");
            return Ok(DerivativeSet::empty());
        }

        let raster = source
            .extension()
            .map(|ext| is_raster_extension(&ext.to_string_lossy()))
            .unwrap_or(false);
        if !raster {
            tracing::debug!(rel = %key, "Not a raster image, skipping derivatives");
            return Ok(DerivativeSet::empty());
        }

        let start = Instant::now();
        let img = decode_rgb(&source, &key)?;
        let (w0, h0) = img.dimensions();

        let mut written: Vec<(Encoding, String)> = Vec::new();
        if let Err(err) = self.write_all(&key, &img, &mut written) {
            self.remove_written(&written);
            return Err(err);
        }

        let mut set = DerivativeSet::empty();
        for (encoding, derivative) in written {
            set.push(encoding, derivative);
        }

        tracing::info!(
            rel = %key,
            width = w0,
            height = h0,
            derivatives = set.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Derivatives generated"
        );

        Ok(set)
    }

    fn write_all(
        &self,
        key: &str,
        img: &RgbImage,
        written: &mut Vec<(Encoding, String)>,
    ) -> ProcessingResult<()> {
        let (w0, h0) = img.dimensions();

        for width in effective_widths(&self.widths, w0) {
            let height = effective_height(w0, h0, width);
            let resized = if width == w0 && height == h0 {
                img.clone()
            } else {
                image::imageops::resize(img, width, height, FilterType::Lanczos3)
            };

            for &encoding in &self.encodings {
                let data = encode(&resized, encoding, self.quality)?;
                let derivative = derivative_key(key, width, encoding);
                let dest = self.deriv_root.join(&derivative);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&dest, &data)?;

                tracing::debug!(
                    rel = %derivative,
                    width,
                    height,
                    encoding = %encoding,
                    size_bytes = data.len(),
                    "Derivative written"
                );
                written.push((encoding, derivative));
            }
        }

        Ok(())
    }

    fn remove_written(&self, written: &[(Encoding, String)]) {
        for (_, derivative) in written {
            let path = self.deriv_root.join(derivative);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(rel = %derivative, error = %e, "Failed to remove partial derivative");
            }
        }
    }
}

fn decode_rgb(path: &Path, key: &str) -> ProcessingResult<RgbImage> {
    let decode_err = |message: String| ProcessingError::Decode {
        rel: key.to_string(),
        message,
    };

    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(decode_err("image has zero dimensions".to_string()));
    }
    Ok(rgb)
}

/// Configured widths clamped to the native width, deduplicated in first-seen order.
pub fn effective_widths(widths: &[u32], native_width: u32) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::with_capacity(widths.len());
    for &w in widths {
        if w == 0 {
            continue;
        }
        let effective = w.min(native_width);
        if !out.contains(&effective) {
            out.push(effective);
        }
    }
    out
}

/// Height preserving the original aspect ratio, never below one pixel.
pub fn effective_height(w0: u32, h0: u32, width: u32) -> u32 {
    let height = (h0 as f64 * width as f64 / w0 as f64).round() as u32;
    height.max(1)
}
