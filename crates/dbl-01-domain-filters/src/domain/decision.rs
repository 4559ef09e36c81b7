//! Filter decisions
//!
//! A decision records the value that was checked, the verdict, which filter
//! produced the verdict and any attributes attached on the way out of the
//! combinator chain.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Cross-cutting facts attached to a decision (redirect target, profile id, ...)
pub type Attributes = BTreeMap<String, Value>;

/// Identity of the filter instance that produced a verdict
///
/// Built once when the filter is constructed, so cloning it on the request
/// path is a reference-count bump.
#[derive(Clone, PartialEq, Eq)]
pub struct FilterOrigin {
    list_id: Option<i32>,
    name: Arc<str>,
}

impl FilterOrigin {
    pub fn new(list_id: Option<i32>, name: impl Into<Arc<str>>) -> Self {
        Self {
            list_id,
            name: name.into(),
        }
    }

    /// List id of the producing filter, if it is a primitive filter
    pub fn list_id(&self) -> Option<i32> {
        self.list_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FilterOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.list_id {
            Some(id) => write!(f, "{}#{}", self.name, id),
            None => f.write_str(&self.name),
        }
    }
}

/// Result of a membership check
#[derive(Clone, Debug)]
pub struct Decision<V> {
    /// The value that was checked
    pub value: V,
    /// Whether the value is blocked
    pub blocked: bool,
    /// The filter that produced the verdict
    pub origin: FilterOrigin,
    /// Attributes attached by decorators
    pub attributes: Attributes,
}

impl<V> Decision<V> {
    pub fn new(value: V, blocked: bool, origin: FilterOrigin) -> Self {
        Self {
            value,
            blocked,
            origin,
            attributes: Attributes::new(),
        }
    }

    pub fn blocked(value: V, origin: FilterOrigin) -> Self {
        Self::new(value, true, origin)
    }

    pub fn passed(value: V, origin: FilterOrigin) -> Self {
        Self::new(value, false, origin)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// List id of the filter that produced the verdict
    pub fn list_id(&self) -> Option<i32> {
        self.origin.list_id()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Replace the checked value, keeping verdict, origin and attributes
    pub fn with_value<W>(self, value: W) -> Decision<W> {
        Decision {
            value,
            blocked: self.blocked,
            origin: self.origin,
            attributes: self.attributes,
        }
    }
}
