//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `ListId`, `Version`, `CachedFilterKey`
//! - **Formats**: `FilterFormat`, `HashAlgorithm`
//! - **Configuration**: `BlacklistSource`

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::FormatTagError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identifier of a configured block list.
pub type ListId = i32;

/// Freshness of a list, as Unix epoch milliseconds.
///
/// Not a counter: "newer" always means strictly greater.
pub type Version = i64;

/// Identity of one stored filter artifact.
///
/// Equality is value equality. Ordering is by id, then version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CachedFilterKey {
    pub id: ListId,
    pub version: Version,
}

impl CachedFilterKey {
    pub fn new(id: ListId, version: Version) -> Self {
        Self { id, version }
    }

    /// Whether this key supersedes `other` for the same list.
    pub fn is_newer_than(&self, other: &CachedFilterKey) -> bool {
        self.id == other.id && self.version > other.version
    }
}

impl Ord for CachedFilterKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for CachedFilterKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `{id}-v{version}`, the base of every cached file name.
impl fmt::Display for CachedFilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.id, self.version)
    }
}

// =============================================================================
// CLUSTER B: FORMATS
// =============================================================================

/// Digest used by hash-based block lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
}

impl HashAlgorithm {
    /// Name written into hash storage files.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Some(HashAlgorithm::Md5),
            "sha1" => Some(HashAlgorithm::Sha1),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a cached artifact is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterFormat {
    /// Bucketed UTF-8 domain file plus bloom file.
    #[serde(rename = "string")]
    String,
    /// Bloom file only.
    #[serde(rename = "bloom")]
    Bloom,
    /// Bucketed MD5 digest file plus bloom file.
    #[serde(rename = "hash-md5")]
    HashMd5,
    /// Bucketed SHA-1 digest file plus bloom file.
    #[serde(rename = "hash-sha1")]
    HashSha1,
}

/// Prefix shared by every domain blacklist format tag.
pub const DOMAIN_BLACKLIST_TAG: &str = "domainblacklist";

impl FilterFormat {
    /// Interpret a configured list format tag.
    ///
    /// Returns `Ok(None)` for tags outside the domain blacklist family,
    /// which are simply not this engine's concern.
    pub fn from_tag(tag: &str) -> Result<Option<Self>, FormatTagError> {
        let Some(rest) = tag.strip_prefix(DOMAIN_BLACKLIST_TAG) else {
            return Ok(None);
        };
        match rest {
            "" | "/string" => Ok(Some(FilterFormat::String)),
            "/bloom" => Ok(Some(FilterFormat::Bloom)),
            "/hash-md5" => Ok(Some(FilterFormat::HashMd5)),
            "/hash-sha1" => Ok(Some(FilterFormat::HashSha1)),
            _ if rest.starts_with('/') => Err(FormatTagError::Unknown(tag.to_string())),
            _ => Ok(None),
        }
    }

    /// Name used in the cache index.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterFormat::String => "string",
            FilterFormat::Bloom => "bloom",
            FilterFormat::HashMd5 => "hash-md5",
            FilterFormat::HashSha1 => "hash-sha1",
        }
    }

    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            FilterFormat::HashMd5 => Some(HashAlgorithm::Md5),
            FilterFormat::HashSha1 => Some(HashAlgorithm::Sha1),
            FilterFormat::String | FilterFormat::Bloom => None,
        }
    }

    /// Whether artifacts of this format carry a storage file next to the bloom file.
    pub fn has_storage_file(&self) -> bool {
        !matches!(self, FilterFormat::Bloom)
    }
}

impl fmt::Display for FilterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER C: CONFIGURATION
// =============================================================================

/// One configured list as handed to the update cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistSource {
    pub id: ListId,
    /// Format tag, e.g. `domainblacklist/hash-md5`.
    pub format: String,
    /// Freshness of the source files, epoch millis.
    pub last_update: Version,
    /// Bucketed storage file, absent for bloom-only lists.
    pub storage_file: Option<PathBuf>,
    /// Bloom file; may be absent for string and hash lists.
    pub bloom_file: Option<PathBuf>,
}

impl BlacklistSource {
    pub fn new(id: ListId, format: impl Into<String>, last_update: Version) -> Self {
        Self {
            id,
            format: format.into(),
            last_update,
            storage_file: None,
            bloom_file: None,
        }
    }

    pub fn with_storage_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_file = Some(path.into());
        self
    }

    pub fn with_bloom_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.bloom_file = Some(path.into());
        self
    }
}
