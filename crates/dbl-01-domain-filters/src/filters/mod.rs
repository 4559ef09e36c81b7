//! Filter combinators
//!
//! The free functions in this module are the intended way to compose
//! filters. Each returns a simplified filter:
//!
//! - `and([])` and `or([])` are the constant "not blocked" filter
//! - a single operand is returned as is
//! - a constant "not blocked" operand makes `and` constant, a constant
//!   "blocked" operand makes `or` constant, the neutral constants drop out
//! - `not(not(x))` is `x`, `not` of a constant is the other constant
//! - decorating a constant filter returns the constant

pub mod attribute;
pub mod bloom;
pub mod caching;
pub mod constant;
pub mod hashing;
pub mod hostname;
pub mod logic;
pub mod replace;
pub mod set;

use std::sync::Arc;

use serde_json::Value;
use shared_types::HashAlgorithm;

pub use attribute::{AttributeFilter, AttributeScope};
pub use bloom::{build_bloom, read_bloom_file, write_bloom_file, BloomDomainFilter};
pub use caching::{CacheMode, CacheStats, CachingFilter};
pub use constant::StaticFilter;
pub use hashing::HashingFilter;
pub use hostname::HostnameFilter;
pub use logic::{And, Not, Or, ParallelOr};
pub use replace::ReplaceFilter;
pub use set::SetFilter;

use crate::domain::{FilterShape, FilterValue, SharedFilter};
use crate::error::FilterError;

fn constant_verdict<T: FilterValue + ?Sized>(filter: &SharedFilter<T>) -> Option<bool> {
    match filter.shape() {
        FilterShape::Constant(blocked) => Some(blocked),
        _ => None,
    }
}

pub fn constant<T: FilterValue + ?Sized>(blocked: bool) -> SharedFilter<T> {
    Arc::new(StaticFilter::<T>::new(blocked))
}

/// Drop neutral constants; `absorbing` short-circuits to that constant.
fn simplify<T: FilterValue + ?Sized>(
    filters: Vec<SharedFilter<T>>,
    absorbing: bool,
    neutral_result: bool,
    build: impl FnOnce(Vec<SharedFilter<T>>) -> SharedFilter<T>,
) -> SharedFilter<T> {
    if filters.is_empty() {
        return constant(false);
    }

    let mut kept = Vec::with_capacity(filters.len());
    for filter in filters {
        match constant_verdict(&filter) {
            Some(verdict) if verdict == absorbing => return filter,
            Some(_) => {}
            None => kept.push(filter),
        }
    }

    if kept.is_empty() {
        return constant(neutral_result);
    }
    match <[SharedFilter<T>; 1]>::try_from(kept) {
        Ok([only]) => only,
        Err(kept) => build(kept),
    }
}

pub fn and<T: FilterValue + ?Sized>(filters: Vec<SharedFilter<T>>) -> SharedFilter<T> {
    simplify(filters, false, true, |kept| Arc::new(And::new(kept)))
}

pub fn or<T: FilterValue + ?Sized>(filters: Vec<SharedFilter<T>>) -> SharedFilter<T> {
    simplify(filters, true, false, |kept| Arc::new(Or::new(kept)))
}

/// Unordered OR evaluated on the rayon pool.
pub fn parallel_or<T: FilterValue + ?Sized>(filters: Vec<SharedFilter<T>>) -> SharedFilter<T> {
    simplify(filters, true, false, |kept| Arc::new(ParallelOr::new(kept)))
}

pub fn not<T: FilterValue + ?Sized>(filter: SharedFilter<T>) -> SharedFilter<T> {
    match filter.shape() {
        FilterShape::Constant(blocked) => constant(!blocked),
        FilterShape::Negation(inner) => inner,
        FilterShape::Opaque => Arc::new(Not::new(filter)),
    }
}

pub fn hostname(filter: SharedFilter<str>) -> SharedFilter<str> {
    if constant_verdict(&filter).is_some() {
        return filter;
    }
    Arc::new(HostnameFilter::new(filter))
}

pub fn replace(
    filter: SharedFilter<str>,
    pattern: &str,
    replacement: &str,
) -> Result<SharedFilter<str>, FilterError> {
    if constant_verdict(&filter).is_some() {
        return Ok(filter);
    }
    Ok(Arc::new(ReplaceFilter::new(filter, pattern, replacement)?))
}

pub fn hashing(algorithm: HashAlgorithm, filter: SharedFilter<[u8]>) -> SharedFilter<str> {
    if let Some(blocked) = constant_verdict(&filter) {
        return constant(blocked);
    }
    Arc::new(HashingFilter::new(algorithm, filter))
}

pub fn caching(filter: SharedFilter<str>, capacity: usize, mode: CacheMode) -> SharedFilter<str> {
    if constant_verdict(&filter).is_some() {
        return filter;
    }
    Arc::new(CachingFilter::new(filter, capacity, mode))
}

pub fn attribute<T: FilterValue + ?Sized>(
    filter: SharedFilter<T>,
    key: &str,
    value: Value,
    scope: AttributeScope,
) -> SharedFilter<T> {
    Arc::new(AttributeFilter::new(filter, key, value, scope))
}

pub fn bloom<T: FilterValue + ?Sized>(
    filter: SharedFilter<T>,
    false_positive_rate: f64,
) -> Result<SharedFilter<T>, FilterError> {
    if constant_verdict(&filter).is_some() {
        return Ok(filter);
    }
    Ok(Arc::new(BloomDomainFilter::new(filter, false_positive_rate)?))
}
