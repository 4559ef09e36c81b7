//! # Bloom Pre-Filter
//!
//! Puts a [`BloomFilter`] in front of any filter. A bloom negative is
//! final and the wrapped filter is never consulted; a bloom positive is
//! confirmed by the wrapped filter.
//!
//! ## Bloom File Layout
//!
//! ```text
//! MAGIC "DBLBLOM" (7) | VERSION (1) | bincode(BloomFilter)
//! ```
//!
//! The file never embeds the backing data: loading re-attaches a
//! caller-supplied filter.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    owned_key_bytes, BloomFilter, DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin,
    FilterValue, SharedFilter,
};
use crate::error::FilterError;

pub const BLOOM_MAGIC: &[u8; 7] = b"DBLBLOM";
pub const BLOOM_FORMAT_VERSION: u8 = 1;

const KIND: &str = "bloom";

pub struct BloomDomainFilter<T: FilterValue + ?Sized> {
    bloom: Arc<BloomFilter>,
    inner: SharedFilter<T>,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> BloomDomainFilter<T> {
    /// Build a bloom structure over every entry of `inner`.
    pub fn new(inner: SharedFilter<T>, false_positive_rate: f64) -> Result<Self, FilterError> {
        let bloom = build_bloom(inner.as_ref(), false_positive_rate)?;
        Ok(Self::with_bloom(inner, Arc::new(bloom)))
    }

    /// Reuse an already built structure, possibly shared with other filters.
    pub fn with_bloom(inner: SharedFilter<T>, bloom: Arc<BloomFilter>) -> Self {
        let origin = FilterOrigin::new(inner.list_id(), format!("bloom({})", inner.name()));
        Self {
            bloom,
            inner,
            origin,
        }
    }

    /// Read a bloom file and attach it to `inner`.
    pub fn load(path: &Path, inner: SharedFilter<T>) -> Result<Self, FilterError> {
        let bloom = read_bloom_file(path)?;
        Ok(Self::with_bloom(inner, Arc::new(bloom)))
    }

    pub fn write(&self, path: &Path) -> Result<(), FilterError> {
        write_bloom_file(path, &self.bloom)
    }

    pub fn bloom(&self) -> &Arc<BloomFilter> {
        &self.bloom
    }

    pub fn inner(&self) -> &SharedFilter<T> {
        &self.inner
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for BloomDomainFilter<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        if !self.bloom.contains(value.key_bytes()) {
            return DecisionFor::<T>::passed(value.to_owned_value(), self.origin.clone());
        }
        self.inner.is_blocked(value)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        self.inner.domains()
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn list_id(&self) -> Option<i32> {
        self.origin.list_id()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        vec![T::into_node(self.inner.clone())]
    }
}

/// Size a bloom structure for `filter` and insert all of its entries.
pub fn build_bloom<T: FilterValue + ?Sized>(
    filter: &dyn DomainFilter<T>,
    false_positive_rate: f64,
) -> Result<BloomFilter, FilterError> {
    let mut bloom = BloomFilter::new_with_fpr(filter.size(), false_positive_rate)?;
    for entry in filter.domains()? {
        let entry = entry?;
        bloom.insert(owned_key_bytes::<T>(&entry));
    }
    debug!(
        filter = %filter.name(),
        elements = bloom.elements_inserted(),
        size_bits = bloom.size_bits(),
        hash_count = bloom.hash_count(),
        "Built bloom structure"
    );
    Ok(bloom)
}

pub fn write_bloom_file(path: &Path, bloom: &BloomFilter) -> Result<(), FilterError> {
    let payload = bloom.to_bytes()?;
    let mut bytes = Vec::with_capacity(BLOOM_MAGIC.len() + 1 + payload.len());
    bytes.extend_from_slice(BLOOM_MAGIC);
    bytes.push(BLOOM_FORMAT_VERSION);
    bytes.extend_from_slice(&payload);
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_bloom_file(path: &Path) -> Result<BloomFilter, FilterError> {
    let bytes = fs::read(path)?;
    let header_len = BLOOM_MAGIC.len() + 1;
    if bytes.len() < header_len {
        return Err(FilterError::corrupt(KIND, "file shorter than header"));
    }
    if bytes[..BLOOM_MAGIC.len()] != BLOOM_MAGIC[..] {
        return Err(FilterError::BadMagic {
            kind: KIND,
            expected: BLOOM_MAGIC.to_vec(),
            found: bytes[..BLOOM_MAGIC.len()].to_vec(),
        });
    }
    let version = bytes[BLOOM_MAGIC.len()];
    if version != BLOOM_FORMAT_VERSION {
        return Err(FilterError::UnsupportedVersion {
            kind: KIND,
            version,
        });
    }
    BloomFilter::from_bytes(&bytes[header_len..])
}
