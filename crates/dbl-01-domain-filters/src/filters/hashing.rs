//! Digest lookup for hash-based lists

use shared_types::HashAlgorithm;

use crate::domain::hash_functions::digest;
use crate::domain::{DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin, SharedFilter};
use crate::error::FilterError;

/// Hashes a domain and asks a digest filter about it.
pub struct HashingFilter {
    algorithm: HashAlgorithm,
    inner: SharedFilter<[u8]>,
    origin: FilterOrigin,
}

impl HashingFilter {
    pub fn new(algorithm: HashAlgorithm, inner: SharedFilter<[u8]>) -> Self {
        let origin = FilterOrigin::new(None, format!("{}({})", algorithm, inner.name()));
        Self {
            algorithm,
            inner,
            origin,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl DomainFilter<str> for HashingFilter {
    fn is_blocked(&self, value: &str) -> DecisionFor<str> {
        let hashed = digest(self.algorithm, value.as_bytes());
        self.inner
            .is_blocked(&hashed)
            .with_value(value.to_string())
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn domains(&self) -> Result<Domains<'_, String>, FilterError> {
        Err(FilterError::NotEnumerable(self.name()))
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        vec![FilterNode::Hash(self.inner.clone())]
    }
}
