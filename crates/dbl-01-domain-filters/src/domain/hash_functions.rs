//! Hash functions
//!
//! - MurmurHash3 double hashing for bloom filter bit positions
//! - The 31-multiplier string hash that assigns domains to file buckets
//! - MD5 / SHA-1 digests for hash-based block lists

use std::io::Cursor;

use md5::Md5;
use sha1::{Digest, Sha1};
use shared_types::HashAlgorithm;

/// Hash an element with MurmurHash3 using a seed
pub fn murmur_hash(element: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(element);

    // Use murmur3 128-bit hash and take the lower 64 bits
    let hash = murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0);
    hash as u64
}

/// Compute k bit positions for an element
///
/// Uses double hashing: h(i) = h1 + i * h2
pub fn hash_positions(element: &[u8], k: usize, m: usize) -> impl Iterator<Item = usize> {
    let h1 = murmur_hash(element, 0);
    let h2 = murmur_hash(element, 1);
    let m = m.max(1) as u64;

    (0..k).map(move |i| {
        let hash = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (hash % m) as usize
    })
}

/// Polynomial string hash over UTF-16 code units (`h = 31 * h + c`).
///
/// Bucket assignment in string filter files depends on this exact value;
/// files written by earlier releases must keep mapping to the same buckets.
pub fn string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Digest `input` with the given algorithm
pub fn digest(algorithm: HashAlgorithm, input: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Md5 => Md5::digest(input).to_vec(),
        HashAlgorithm::Sha1 => Sha1::digest(input).to_vec(),
    }
}
