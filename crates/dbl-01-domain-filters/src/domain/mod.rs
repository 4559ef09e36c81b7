//! Domain Layer - Pure filter vocabulary
//!
//! This layer contains:
//! - The `DomainFilter` capability and `FilterNode` introspection
//! - Decisions and their attributes
//! - Core Bloom filter implementation and parameter calculation
//! - Hash functions (bloom positions, bucket hash, digests)
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod bloom_filter;
pub mod decision;
pub mod filter;
pub mod hash_functions;
pub mod parameters;

pub use bloom_filter::BloomFilter;
pub use decision::{Attributes, Decision, FilterOrigin};
pub use filter::{
    owned_key_bytes, DecisionFor, DomainFilter, Domains, FilterNode, FilterShape, FilterValue,
    SharedFilter,
};
pub use parameters::{calculate_fpr, calculate_optimal_parameters, BloomFilterParams};
