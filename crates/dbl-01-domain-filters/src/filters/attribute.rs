//! Decision attribute tagging

use serde_json::Value;

use crate::domain::{
    DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin, FilterValue, SharedFilter,
};
use crate::error::FilterError;

/// Which decisions get the attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeScope {
    Always,
    Blocked,
}

/// Attaches a key/value pair to decisions of the wrapped filter.
pub struct AttributeFilter<T: FilterValue + ?Sized> {
    inner: SharedFilter<T>,
    key: String,
    value: Value,
    scope: AttributeScope,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> AttributeFilter<T> {
    pub fn new(
        inner: SharedFilter<T>,
        key: impl Into<String>,
        value: Value,
        scope: AttributeScope,
    ) -> Self {
        let key = key.into();
        let origin = FilterOrigin::new(None, format!("attribute({}, {}={})", inner.name(), key, value));
        Self {
            inner,
            key,
            value,
            scope,
            origin,
        }
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for AttributeFilter<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        let decision = self.inner.is_blocked(value);
        if self.scope == AttributeScope::Always || decision.blocked {
            decision.with_attribute(self.key.clone(), self.value.clone())
        } else {
            decision
        }
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

    fn child_filters(&self) -> Vec<FilterNode> {
        vec![T::into_node(self.inner.clone())]
    }
}
