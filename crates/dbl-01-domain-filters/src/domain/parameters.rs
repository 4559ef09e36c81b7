//! Optimal bloom filter parameter calculation
//!
//! Formulas:
//! - m = -n*ln(fpr) / (ln(2)^2)  -- optimal bits
//! - k = (m/n) * ln(2)           -- optimal hash functions
//! - FPR = (1 - e^(-kn/m))^k

use std::f64::consts::LN_2;

/// Bloom filter parameters
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    /// Number of bits in the filter
    pub size_bits: usize,
    /// Number of hash functions
    pub hash_count: usize,
    /// Expected false positive rate with these parameters
    pub expected_fpr: f64,
}

/// Calculate optimal bloom filter parameters for `num_elements` at `target_fpr`
pub fn calculate_optimal_parameters(num_elements: usize, target_fpr: f64) -> BloomFilterParams {
    if num_elements == 0 {
        return BloomFilterParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 1.0,
        };
    }

    let n = num_elements as f64;
    let ln2_squared = LN_2 * LN_2;

    let m = ((-n * target_fpr.ln() / ln2_squared).ceil() as usize).max(1);

    let k = ((m as f64 / n) * LN_2).round() as usize;
    let k = k.clamp(1, 32);

    let expected_fpr = calculate_fpr(m, num_elements, k);

    BloomFilterParams {
        size_bits: m,
        hash_count: k,
        expected_fpr,
    }
}

/// False positive rate for m bits, n elements and k hash functions
pub fn calculate_fpr(m: usize, n: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_parameters_for_one_percent() {
        // n=100, FPR=0.01 → k≈7, m≈959
        let params = calculate_optimal_parameters(100, 0.01);
        assert!((5..=9).contains(&params.hash_count), "k={}", params.hash_count);
        assert!((800..=1200).contains(&params.size_bits), "m={}", params.size_bits);
        assert!(params.expected_fpr <= 0.011);
    }

    #[test]
    fn test_empty_set_gets_minimal_filter() {
        let params = calculate_optimal_parameters(0, 0.01);
        assert_eq!(params.size_bits, 1);
        assert_eq!(params.hash_count, 1);
    }

    #[test]
    fn test_fpr_grows_with_load() {
        let light = calculate_fpr(10_000, 100, 7);
        let heavy = calculate_fpr(10_000, 5_000, 7);
        assert!(light < heavy);
        assert_eq!(calculate_fpr(0, 10, 3), 1.0);
    }
}
