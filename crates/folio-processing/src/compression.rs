use crate::error::{ProcessingError, ProcessingResult};
use bytes::Bytes;
use folio_core::Encoding;
use image::RgbImage;

/// Encodings this build can produce, in the order they are written.
///
/// WebP is always available. AVIF is included only when the crate is built with
/// the `avif` feature and `avif_enabled` is set.
pub fn available_encodings(avif_enabled: bool) -> Vec<Encoding> {
    let mut encodings = vec![Encoding::WebP];
    if cfg!(feature = "avif") && avif_enabled {
        encodings.push(Encoding::Avif);
    }
    encodings
}

/// Encode an RGB image at `quality` (0-100).
pub fn encode(img: &RgbImage, encoding: Encoding, quality: u8) -> ProcessingResult<Bytes> {
    match encoding {
        Encoding::WebP => encode_webp(img, quality),
        Encoding::Avif => encode_avif(img, quality),
    }
}

/// Largest width or height libwebp accepts.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

fn encode_webp(img: &RgbImage, quality: u8) -> ProcessingResult<Bytes> {
    let (width, height) = img.dimensions();
    let encode_err = |message: String| ProcessingError::Encode {
        encoding: Encoding::WebP,
        message,
    };

    if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
        return Err(encode_err(format!(
            "{}x{} exceeds the WebP limit of {} px per side",
            width, height, WEBP_MAX_DIMENSION
        )));
    }

    let encoder = webp::Encoder::from_rgb(img.as_raw(), width, height);
    let webp_data = encoder
        .encode_simple(false, quality.min(100) as f32)
        .map_err(|e| encode_err(format!("{:?}", e)))?;

    Ok(Bytes::copy_from_slice(&webp_data))
}

#[cfg(feature = "avif")]
fn encode_avif(img: &RgbImage, quality: u8) -> ProcessingResult<Bytes> {
    let (width, height) = img.dimensions();

    let rgb_data: Vec<rgb::RGB8> = img
        .as_raw()
        .chunks_exact(3)
        .map(|chunk| rgb::RGB8::new(chunk[0], chunk[1], chunk[2]))
        .collect();

    let img_buf = ravif::Img::new(rgb_data.as_slice(), width as usize, height as usize);

    let encoder = ravif::Encoder::new()
        .with_quality(quality.min(100) as f32)
        .with_speed(6);

    let avif_data = encoder
        .encode_rgb(img_buf)
        .map_err(|e| ProcessingError::Encode {
            encoding: Encoding::Avif,
            message: e.to_string(),
        })?;

    Ok(Bytes::from(avif_data.avif_file))
}

#[cfg(not(feature = "avif"))]
fn encode_avif(_img: &RgbImage, _quality: u8) -> ProcessingResult<Bytes> {
    Err(ProcessingError::Encode {
        encoding: Encoding::Avif,
        message: "AVIF support not compiled in".to_string(),
    })
}
