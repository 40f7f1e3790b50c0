//! Derivative naming convention: `{stem}_w{width}.{ext}` next to the mirrored
//! directory of the original.

use folio_core::Encoding;
use folio_storage::keys::{child_key, split_key};
use std::path::Path;

/// Extensions the generator will attempt to decode.
///
/// `avif` is absent: the `image` build carries no AVIF decoder, so AVIF originals
/// are stored and served as-is without derivatives.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff"];

pub fn is_raster_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    RASTER_EXTENSIONS.contains(&ext.as_str())
}

/// Split a normalized original key into its directory key and filename stem.
pub fn original_stem(key: &str) -> (&str, String) {
    let (dir, name) = split_key(key);
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    (dir, stem)
}

pub fn derivative_file_name(stem: &str, width: u32, encoding: Encoding) -> String {
    format!("{}_w{}.{}", stem, width, encoding.extension())
}

/// Derivative key for a normalized original key.
pub fn derivative_key(original_key: &str, width: u32, encoding: Encoding) -> String {
    let (dir, stem) = original_stem(original_key);
    child_key(dir, &derivative_file_name(&stem, width, encoding))
}

/// Parse width and encoding from a derivative file name belonging to `stem`.
///
/// Only names of the exact form `{stem}_w<digits>.<ext>` with a known encoding
/// extension match; anything else yields `None`.
pub fn parse_derivative_name(file_name: &str, stem: &str) -> Option<(u32, Encoding)> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix("_w")?;
    let (digits, ext) = rest.split_once('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let width: u32 = digits.parse().ok()?;
    if width == 0 {
        return None;
    }
    let encoding = Encoding::from_extension(ext)?;
    Some((width, encoding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_extensions() {
        assert!(is_raster_extension("jpg"));
        assert!(is_raster_extension("JPEG"));
        assert!(!is_raster_extension("avif"));
        assert!(is_raster_extension("tiff"));
        assert!(!is_raster_extension("txt"));
        assert!(!is_raster_extension("gif"));
    }

    #[test]
    fn test_derivative_key_mirrors_directory() {
        assert_eq!(
            derivative_key("weddings/2024/couple.jpg", 800, Encoding::WebP),
            "weddings/2024/couple_w800.webp"
        );
        assert_eq!(derivative_key("photo.png", 480, Encoding::Avif), "photo_w480.avif");
    }

    #[test]
    fn test_original_stem_keeps_inner_dots() {
        assert_eq!(original_stem("a/my.photo.jpg"), ("a", "my.photo".to_string()));
        assert_eq!(original_stem("README"), ("", "README".to_string()));
    }

    #[test]
    fn test_parse_derivative_name() {
        assert_eq!(
            parse_derivative_name("photo_w800.webp", "photo"),
            Some((800, Encoding::WebP))
        );
        assert_eq!(
            parse_derivative_name("photo_w2048.AVIF", "photo"),
            Some((2048, Encoding::Avif))
        );
    }

    #[test]
    fn test_parse_rejects_foreign_or_malformed_names() {
        assert_eq!(parse_derivative_name("photo_1_w800.webp", "photo"), None);
        assert_eq!(parse_derivative_name("photo_wide.webp", "photo"), None);
        assert_eq!(parse_derivative_name("photo_w800.jpg", "photo"), None);
        assert_eq!(parse_derivative_name("photo_w.webp", "photo"), None);
        assert_eq!(parse_derivative_name("photo_w800", "photo"), None);
        assert_eq!(parse_derivative_name("photo_w800.webp.bak", "photo"), None);
        assert_eq!(parse_derivative_name("other_w800.webp", "photo"), None);
    }
}
