//! Regex rewrite before lookup

use regex::Regex;

use crate::domain::{DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin, SharedFilter};
use crate::error::FilterError;

/// Rewrites the value with a regex substitution and asks the inner filter.
///
/// The decision reports the original value. Enumeration is refused since
/// the inner entries no longer describe what this filter matches.
pub struct ReplaceFilter {
    inner: SharedFilter<str>,
    pattern: Regex,
    replacement: String,
    origin: FilterOrigin,
}

impl ReplaceFilter {
    pub fn new(
        inner: SharedFilter<str>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, FilterError> {
        let pattern = Regex::new(pattern)?;
        let replacement = replacement.into();
        let origin = FilterOrigin::new(
            None,
            format!("replace({}, /{}/ -> {:?})", inner.name(), pattern, replacement),
        );
        Ok(Self {
            inner,
            pattern,
            replacement,
            origin,
        })
    }
}

impl DomainFilter<str> for ReplaceFilter {
    fn is_blocked(&self, value: &str) -> DecisionFor<str> {
        let rewritten = self.pattern.replace_all(value, self.replacement.as_str());
        self.inner
            .is_blocked(&rewritten)
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
        vec![FilterNode::Domain(self.inner.clone())]
    }
}
