//! Domain models for the content-addressed media store
//!
//! Every managed file is identified by the SHA-256 digest of its bytes. The
//! same identifier keys the original file, its thumbnails and the metadata
//! records the library hands out.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Identifiers
// =============================================================================

/// SHA-256 digest identifying a file's content.
///
/// Serialised as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; ContentHash::LEN]);

impl ContentHash {
    /// Digest length in bytes.
    pub const LEN: usize = 32;

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Hash a file's content.
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).into())
    }

    /// Decode a 64 character hex string.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(encoded, &mut bytes).map_err(|e| LibraryError::InvalidInput {
            field: "hash".to_string(),
            message: format!("'{}' is not a {} byte hex digest: {}", encoded, Self::LEN, e),
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First two hex characters, used as the shard directory name.
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Opaque identifier of a file or tag service.
///
/// Serialised as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey(Vec<u8>);

impl ServiceKey {
    /// Key of the service holding every locally stored file.
    pub const LOCAL_FILES: &'static [u8] = b"local files";

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn local_files() -> Self {
        Self::new(Self::LOCAL_FILES)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Default for ServiceKey {
    fn default() -> Self {
        Self::local_files()
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.to_hex())
    }
}

impl Serialize for ServiceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ServiceKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Mime
// =============================================================================

/// File types the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mime {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/bmp")]
    Bmp,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/tiff")]
    Tiff,
    #[serde(rename = "application/x-shockwave-flash")]
    Flash,
    #[serde(rename = "video/x-flv")]
    Flv,
    #[serde(rename = "video/mp4")]
    Mp4,
    #[serde(rename = "video/webm")]
    Webm,
    #[serde(rename = "video/x-matroska")]
    Mkv,
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "audio/mp3")]
    Mp3,
    #[serde(rename = "audio/ogg")]
    Ogg,
    #[serde(rename = "audio/flac")]
    Flac,
    #[serde(rename = "application/zip")]
    Zip,
}

impl Mime {
    /// Every accepted type, in the order used when probing the store for a
    /// file whose type is unknown.
    pub const ALLOWED: [Mime; 16] = [
        Mime::Jpeg,
        Mime::Png,
        Mime::Gif,
        Mime::Bmp,
        Mime::Webp,
        Mime::Tiff,
        Mime::Flash,
        Mime::Flv,
        Mime::Mp4,
        Mime::Webm,
        Mime::Mkv,
        Mime::Pdf,
        Mime::Mp3,
        Mime::Ogg,
        Mime::Flac,
        Mime::Zip,
    ];

    /// Registered extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Mime::Jpeg => ".jpg",
            Mime::Png => ".png",
            Mime::Gif => ".gif",
            Mime::Bmp => ".bmp",
            Mime::Webp => ".webp",
            Mime::Tiff => ".tiff",
            Mime::Flash => ".swf",
            Mime::Flv => ".flv",
            Mime::Mp4 => ".mp4",
            Mime::Webm => ".webm",
            Mime::Mkv => ".mkv",
            Mime::Pdf => ".pdf",
            Mime::Mp3 => ".mp3",
            Mime::Ogg => ".ogg",
            Mime::Flac => ".flac",
            Mime::Zip => ".zip",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mime::Jpeg => "image/jpeg",
            Mime::Png => "image/png",
            Mime::Gif => "image/gif",
            Mime::Bmp => "image/bmp",
            Mime::Webp => "image/webp",
            Mime::Tiff => "image/tiff",
            Mime::Flash => "application/x-shockwave-flash",
            Mime::Flv => "video/x-flv",
            Mime::Mp4 => "video/mp4",
            Mime::Webm => "video/webm",
            Mime::Mkv => "video/x-matroska",
            Mime::Pdf => "application/pdf",
            Mime::Mp3 => "audio/mp3",
            Mime::Ogg => "audio/ogg",
            Mime::Flac => "audio/flac",
            Mime::Zip => "application/zip",
        }
    }
}

impl fmt::Display for Mime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mime {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        Mime::ALLOWED
            .iter()
            .copied()
            .find(|mime| mime.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LibraryError::InvalidInput {
                field: "mime".to_string(),
                message: format!("Unsupported mime type: {}", s),
            })
    }
}

// =============================================================================
// Tags
// =============================================================================

/// Splits `namespace:subtag`, returning `None` for unnamespaced tags.
pub fn split_tag(tag: &str) -> Option<(&str, &str)> {
    tag.split_once(':')
}

/// Drops the `namespace:` prefix if present.
pub fn strip_namespace(tag: &str) -> &str {
    split_tag(tag).map_or(tag, |(_, subtag)| subtag)
}

/// Read-only view of a file's tags on one tag service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsView {
    current: BTreeSet<String>,
    pending: BTreeSet<String>,
    /// Maps a tag to the sibling it should be displayed as
    #[serde(default)]
    siblings: HashMap<String, String>,
}

impl TagsView {
    pub fn new<C, P>(current: C, pending: P) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            current: current.into_iter().map(Into::into).collect(),
            pending: pending.into_iter().map(Into::into).collect(),
            siblings: HashMap::new(),
        }
    }

    pub fn with_siblings(mut self, siblings: HashMap<String, String>) -> Self {
        self.siblings = siblings;
        self
    }

    pub fn current(&self) -> &BTreeSet<String> {
        &self.current
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    /// Current and pending tags together.
    pub fn combined(&self) -> BTreeSet<&str> {
        self.current
            .iter()
            .chain(self.pending.iter())
            .map(String::as_str)
            .collect()
    }

    /// Whether the tag is current or pending.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.current.contains(tag) || self.pending.contains(tag)
    }

    fn preferred<'a>(&'a self, tag: &'a str) -> &'a str {
        self.siblings.get(tag).map_or(tag, String::as_str)
    }

    /// Current tags under `namespace`, collapsed to their preferred siblings.
    ///
    /// Tags keep their `namespace:` prefix; the result is sorted and free of
    /// duplicates.
    pub fn namespace_slice(&self, namespace: &str) -> Vec<&str> {
        let slice: BTreeSet<&str> = self
            .current
            .iter()
            .map(|tag| self.preferred(tag))
            .filter(|tag| matches!(split_tag(tag), Some((ns, _)) if ns == namespace))
            .collect();
        slice.into_iter().collect()
    }
}

// =============================================================================
// Media records
// =============================================================================

/// Read-only view of one managed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub hash: ContentHash,
    pub mime: Mime,
    /// Size of the original file in bytes
    pub size: u64,
    pub tags: TagsView,
}

impl MediaRecord {
    pub fn new(hash: ContentHash, mime: Mime, size: u64, tags: TagsView) -> Self {
        Self {
            hash,
            mime,
            size,
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::digest(b"hello");
        let encoded = hash.to_hex();

        assert_eq!(encoded.len(), 64);
        assert_eq!(
            encoded,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(hash.shard_prefix(), "2c");
        assert_eq!(ContentHash::from_hex(&encoded).unwrap(), hash);
    }

    #[test]
    fn test_content_hash_rejects_bad_hex() {
        assert!(ContentHash::from_hex("abcd").is_err());
        assert!(ContentHash::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_content_hash_serde_as_hex() {
        let hash = ContentHash::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));

        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_mime_registry() {
        assert_eq!(Mime::Jpeg.extension(), ".jpg");
        assert_eq!(Mime::ALLOWED[0], Mime::Jpeg);
        assert_eq!("image/png".parse::<Mime>().unwrap(), Mime::Png);
        assert!("text/plain".parse::<Mime>().is_err());

        for mime in Mime::ALLOWED {
            assert!(mime.extension().starts_with('.'));
            assert_eq!(mime.as_str().parse::<Mime>().unwrap(), mime);
        }
    }

    #[test]
    fn test_strip_namespace() {
        assert_eq!(strip_namespace("series:foo"), "foo");
        assert_eq!(strip_namespace("blue sky"), "blue sky");
        assert_eq!(strip_namespace("title:a:b"), "a:b");
    }

    #[test]
    fn test_namespace_slice_collapses_siblings() {
        let siblings = HashMap::from([(
            "character:samus".to_string(),
            "character:samus aran".to_string(),
        )]);
        let tags = TagsView::new(
            ["character:samus", "character:samus aran", "character:link", "series:metroid"],
            ["character:zelda"],
        )
        .with_siblings(siblings);

        assert_eq!(
            tags.namespace_slice("character"),
            vec!["character:link", "character:samus aran"]
        );
        assert!(tags.has_tag("character:zelda"));
        assert!(!tags.has_tag("zelda"));
    }
}
