use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Output encoding of a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Avif,
    #[serde(rename = "webp")]
    WebP,
}

impl Encoding {
    pub const ALL: [Encoding; 2] = [Encoding::WebP, Encoding::Avif];

    /// File extension used in derivative names (no leading dot)
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Avif => "avif",
            Encoding::WebP => "webp",
        }
    }

    /// Parse from a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "avif" => Some(Encoding::Avif),
            "webp" => Some(Encoding::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encoding::from_extension(s).ok_or_else(|| format!("Invalid encoding: {}", s))
    }
}

/// One derivative file, identified by the naming convention `{stem}_w{width}.{ext}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DerivativeDescriptor {
    /// Path relative to the derivative root, posix separators
    pub rel: String,
    pub width: u32,
    pub encoding: Encoding,
}

/// Derivative paths grouped by encoding, as returned by a generation run.
///
/// Every known encoding is always present as a key, possibly with an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DerivativeSet(BTreeMap<Encoding, Vec<String>>);

impl DerivativeSet {
    pub fn empty() -> Self {
        Self(Encoding::ALL.iter().map(|e| (*e, Vec::new())).collect())
    }

    pub fn push(&mut self, encoding: Encoding, rel: String) {
        self.0.entry(encoding).or_default().push(rel);
    }

    pub fn get(&self, encoding: Encoding) -> &[String] {
        self.0.get(&encoding).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Encoding, &String)> {
        self.0
            .iter()
            .flat_map(|(encoding, paths)| paths.iter().map(move |p| (*encoding, p)))
    }
}

impl Default for DerivativeSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StoredOriginal {
    /// Path relative to the media root, posix separators
    pub rel: String,
    pub url: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DerivativeLink {
    pub url: String,
    pub width: u32,
    pub encoding: Encoding,
}

/// Metadata for a single original plus the derivatives discovered for it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssetMetadata {
    pub rel: String,
    pub url: String,
    pub size: u64,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    /// Derivative URLs, ordered by width then encoding
    pub derivatives: Vec<String>,
    pub derivative_details: Vec<DerivativeLink>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssetListing {
    pub media_base: String,
    pub media_deriv_base: String,
    pub originals: Vec<String>,
    pub derivatives: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_extension() {
        assert_eq!(Encoding::from_extension("webp"), Some(Encoding::WebP));
        assert_eq!(Encoding::from_extension("AVIF"), Some(Encoding::Avif));
        assert_eq!(Encoding::from_extension("jpg"), None);
        assert!("png".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_encoding_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Encoding::WebP).unwrap(), "\"webp\"");
        assert_eq!(serde_json::to_string(&Encoding::Avif).unwrap(), "\"avif\"");
        let parsed: Encoding = serde_json::from_str("\"webp\"").unwrap();
        assert_eq!(parsed, Encoding::WebP);
    }

    #[test]
    fn test_empty_derivative_set_has_every_encoding() {
        let set = DerivativeSet::empty();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "avif": [], "webp": [] }));
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_derivative_set_push() {
        let mut set = DerivativeSet::empty();
        set.push(Encoding::WebP, "a/photo_w800.webp".to_string());
        set.push(Encoding::WebP, "a/photo_w480.webp".to_string());
        assert_eq!(set.get(Encoding::WebP).len(), 2);
        assert!(set.get(Encoding::Avif).is_empty());
        assert!(!set.is_empty());
        assert_eq!(set.iter().count(), 2);
    }
}
