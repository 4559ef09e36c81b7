//! The domain filter capability
//!
//! Every filter variant (storage leaves, bloom and cache decorators, boolean
//! combinators, transforms) implements [`DomainFilter`] for one value type:
//! `str` for domain names, `[u8]` for fixed-length digests.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use super::decision::Decision;
use crate::error::FilterError;

/// Shared handle to a filter; composed filters hold their children this way.
pub type SharedFilter<T> = Arc<dyn DomainFilter<T>>;

/// Lazy enumeration of a filter's entries.
pub type Domains<'a, V> = Box<dyn Iterator<Item = Result<V, FilterError>> + 'a>;

/// Decision type produced by a filter over `T`.
pub type DecisionFor<T> = Decision<<T as FilterValue>::Owned>;

/// Value types a filter can be asked about.
pub trait FilterValue: Hash + Eq + Send + Sync + 'static {
    type Owned: Borrow<Self> + Clone + Hash + Eq + fmt::Debug + Send + Sync + 'static;

    fn to_owned_value(&self) -> Self::Owned;

    /// Bytes fed into probabilistic structures.
    fn key_bytes(&self) -> &[u8];

    /// Wrap a filter over this value type for introspection.
    fn into_node(filter: SharedFilter<Self>) -> FilterNode;
}

impl FilterValue for str {
    type Owned = String;

    fn to_owned_value(&self) -> String {
        self.to_string()
    }

    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn into_node(filter: SharedFilter<Self>) -> FilterNode {
        FilterNode::Domain(filter)
    }
}

impl FilterValue for [u8] {
    type Owned = Vec<u8>;

    fn to_owned_value(&self) -> Vec<u8> {
        self.to_vec()
    }

    fn key_bytes(&self) -> &[u8] {
        self
    }

    fn into_node(filter: SharedFilter<Self>) -> FilterNode {
        FilterNode::Hash(filter)
    }
}

/// Key bytes of an owned value.
pub fn owned_key_bytes<T: FilterValue + ?Sized>(value: &T::Owned) -> &[u8] {
    let borrowed: &T = value.borrow();
    borrowed.key_bytes()
}

/// Structural facts the combinator algebra uses to simplify expressions.
pub enum FilterShape<T: FilterValue + ?Sized> {
    /// Nothing known about the filter.
    Opaque,
    /// The filter answers the same verdict for every input.
    Constant(bool),
    /// The filter is the complement of the contained filter.
    Negation(SharedFilter<T>),
}

/// Membership capability shared by every filter variant.
pub trait DomainFilter<T: FilterValue + ?Sized>: Send + Sync {
    /// Check a value. Absence is a "not blocked" decision, never an error.
    fn is_blocked(&self, value: &T) -> DecisionFor<T>;

    /// Number of entries, as reported by the backing lists.
    fn size(&self) -> usize;

    /// Enumerate entries. Expensive for file-backed filters; unsupported
    /// after lossy transforms.
    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError>;

    /// Debug description, composed for combinators.
    fn name(&self) -> String;

    /// Only primitive filters own a list id.
    fn list_id(&self) -> Option<i32> {
        None
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        Vec::new()
    }

    fn shape(&self) -> FilterShape<T> {
        FilterShape::Opaque
    }
}

/// A filter of either value type, for introspection and registries.
#[derive(Clone)]
pub enum FilterNode {
    Domain(SharedFilter<str>),
    Hash(SharedFilter<[u8]>),
}

impl FilterNode {
    pub fn name(&self) -> String {
        match self {
            FilterNode::Domain(f) => f.name(),
            FilterNode::Hash(f) => f.name(),
        }
    }

    pub fn list_id(&self) -> Option<i32> {
        match self {
            FilterNode::Domain(f) => f.list_id(),
            FilterNode::Hash(f) => f.list_id(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            FilterNode::Domain(f) => f.size(),
            FilterNode::Hash(f) => f.size(),
        }
    }

    pub fn child_filters(&self) -> Vec<FilterNode> {
        match self {
            FilterNode::Domain(f) => f.child_filters(),
            FilterNode::Hash(f) => f.child_filters(),
        }
    }

    pub fn as_domain(&self) -> Option<&SharedFilter<str>> {
        match self {
            FilterNode::Domain(f) => Some(f),
            FilterNode::Hash(_) => None,
        }
    }

    pub fn as_hash(&self) -> Option<&SharedFilter<[u8]>> {
        match self {
            FilterNode::Hash(f) => Some(f),
            FilterNode::Domain(_) => None,
        }
    }

    /// Every list id referenced anywhere in this filter tree.
    pub fn list_ids(&self) -> BTreeSet<i32> {
        let mut ids = BTreeSet::new();
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            if let Some(id) = node.list_id() {
                ids.insert(id);
            }
            pending.extend(node.child_filters());
        }
        ids
    }

    pub fn references_list(&self, id: i32) -> bool {
        self.list_ids().contains(&id)
    }
}

impl fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Domain(filter) => write!(f, "Domain({})", filter.name()),
            FilterNode::Hash(filter) => write!(f, "Hash({})", filter.name()),
        }
    }
}
