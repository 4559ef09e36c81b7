//! Core Bloom Filter implementation
//!
//! INVARIANTS:
//! - FPR = (1 - e^(-kn/m))^k stays close to the rate the filter was sized for
//! - No false negatives: if inserted, contains() MUST return true

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hash_functions::hash_positions;
use super::parameters::{calculate_fpr, calculate_optimal_parameters};
use crate::error::FilterError;

/// Bloom filter for probabilistic membership testing
///
/// False positives are possible, false negatives are not. Used in front of
/// file-backed filters so most negative lookups never touch the disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    #[serde(with = "bitvec_serde")]
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions (k)
    k: usize,
    /// Size in bits (m)
    m: usize,
    /// Number of elements inserted (n)
    n: usize,
}

/// Serde support for BitVec
mod bitvec_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes: Vec<u8> = bits.as_raw_slice().to_vec();
        (bytes, bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create a filter with `m` bits and `k` hash functions
    pub fn new(m: usize, k: usize) -> Self {
        let m = m.max(1);
        Self {
            bits: bitvec![u8, Lsb0; 0; m],
            k: k.max(1),
            m,
            n: 0,
        }
    }

    /// Create a filter sized for `expected_elements` at `target_fpr`
    pub fn new_with_fpr(expected_elements: usize, target_fpr: f64) -> Result<Self, FilterError> {
        if !(target_fpr > 0.0 && target_fpr < 1.0) {
            return Err(FilterError::InvalidParameters(format!(
                "false positive probability must be in (0, 1), got {target_fpr}"
            )));
        }
        let params = calculate_optimal_parameters(expected_elements, target_fpr);
        Ok(Self::new(params.size_bits, params.hash_count))
    }

    /// Insert an element into the filter
    pub fn insert(&mut self, element: &[u8]) {
        for pos in hash_positions(element, self.k, self.m) {
            self.bits.set(pos, true);
        }
        self.n += 1;
    }

    /// `false` means the element is definitely NOT in the set
    pub fn contains(&self, element: &[u8]) -> bool {
        hash_positions(element, self.k, self.m).all(|pos| self.bits[pos])
    }

    /// Merge another filter into this one (OR operation)
    ///
    /// Both filters must have been built with the same m and k.
    pub fn merge(&mut self, other: &BloomFilter) -> Result<(), FilterError> {
        if self.m != other.m || self.k != other.k {
            return Err(FilterError::InvalidParameters(format!(
                "cannot merge bloom filters with m={}/k={} and m={}/k={}",
                self.m, self.k, other.m, other.k
            )));
        }

        let self_raw = self.bits.as_raw_mut_slice();
        let other_raw = other.bits.as_raw_slice();
        for (s, o) in self_raw.iter_mut().zip(other_raw.iter()) {
            *s |= *o;
        }
        self.n += other.n;
        Ok(())
    }

    /// Current false positive rate
    pub fn false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.n, self.k)
    }

    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn size_bits(&self) -> usize {
        self.m
    }

    pub fn hash_count(&self) -> usize {
        self.k
    }

    pub fn elements_inserted(&self) -> usize {
        self.n
    }

    /// Serialize the filter to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        bincode::serialize(self).map_err(|e| FilterError::SerializationError(e.to_string()))
    }

    /// Deserialize a filter from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        let filter: BloomFilter = bincode::deserialize(bytes)
            .map_err(|e| FilterError::SerializationError(e.to_string()))?;
        if filter.m == 0 || filter.k == 0 || filter.bits.len() != filter.m {
            return Err(FilterError::corrupt(
                "bloom",
                format!(
                    "inconsistent parameters m={} k={} bits={}",
                    filter.m,
                    filter.k,
                    filter.bits.len()
                ),
            ));
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_filter_is_empty() {
        let filter = BloomFilter::new(1000, 7);

        assert_eq!(filter.size_bits(), 1000);
        assert_eq!(filter.hash_count(), 7);
        assert_eq!(filter.elements_inserted(), 0);
        assert_eq!(filter.bits_set(), 0);
        assert!(!filter.contains(b"example.com"));
    }

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::new_with_fpr(1_000, 0.01).unwrap();
        let domains: Vec<String> = (0..1_000).map(|i| format!("host{i}.example.com")).collect();
        for d in &domains {
            filter.insert(d.as_bytes());
        }
        for d in &domains {
            assert!(filter.contains(d.as_bytes()), "{d} must be found");
        }
    }

    #[test]
    fn test_false_positive_rate_near_target() {
        let mut filter = BloomFilter::new_with_fpr(2_000, 0.01).unwrap();
        for i in 0..2_000 {
            filter.insert(format!("in{i}.test").as_bytes());
        }
        let false_positives = (0..10_000)
            .filter(|i| filter.contains(format!("out{i}.test").as_bytes()))
            .count();
        // 1% target, generous margin
        assert!(false_positives < 300, "false positives: {false_positives}");
    }

    #[test]
    fn test_invalid_fpr_rejected() {
        assert!(matches!(
            BloomFilter::new_with_fpr(10, 0.0),
            Err(FilterError::InvalidParameters(_))
        ));
        assert!(matches!(
            BloomFilter::new_with_fpr(10, 1.0),
            Err(FilterError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_merge_requires_same_shape() {
        let mut a = BloomFilter::new(512, 4);
        let mut b = BloomFilter::new(512, 4);
        a.insert(b"a.com");
        b.insert(b"b.com");
        a.merge(&b).unwrap();
        assert!(a.contains(b"a.com"));
        assert!(a.contains(b"b.com"));
        assert_eq!(a.elements_inserted(), 2);

        let c = BloomFilter::new(256, 4);
        assert!(a.merge(&c).is_err());
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut filter = BloomFilter::new_with_fpr(100, 0.05).unwrap();
        filter.insert(b"ads.example.org");
        let bytes = filter.to_bytes().unwrap();
        let restored = BloomFilter::from_bytes(&bytes).unwrap();
        assert!(restored.contains(b"ads.example.org"));
        assert_eq!(restored.size_bits(), filter.size_bits());
        assert_eq!(restored.hash_count(), filter.hash_count());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = BloomFilter::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(err.is_format_error());
    }
}
