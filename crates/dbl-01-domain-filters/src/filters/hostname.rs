//! Hostname suffix expansion
//!
//! `a.b.c.com` is probed as `.com`, `.c.com`, `.b.c.com`, `.a.b.c.com`,
//! then `a.b.c.com`, stopping at the first block. A leading-dot entry
//! therefore covers its own apex as well as every subdomain.

use crate::domain::{DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin, SharedFilter};
use crate::error::FilterError;

pub struct HostnameFilter {
    inner: SharedFilter<str>,
    origin: FilterOrigin,
}

impl HostnameFilter {
    pub fn new(inner: SharedFilter<str>) -> Self {
        let origin = FilterOrigin::new(None, format!("hostname({})", inner.name()));
        Self { inner, origin }
    }
}

impl DomainFilter<str> for HostnameFilter {
    fn is_blocked(&self, value: &str) -> DecisionFor<str> {
        let host = value.strip_suffix('.').unwrap_or(value);
        if host.split('.').filter(|label| !label.is_empty()).count() < 2 {
            return DecisionFor::<str>::passed(value.to_string(), self.origin.clone());
        }

        let apex = format!(".{host}");
        let probes = host
            .rmatch_indices('.')
            .map(|(start, _)| &host[start..])
            .chain([apex.as_str(), host]);
        for probe in probes {
            let decision = self.inner.is_blocked(probe);
            if decision.blocked {
                return decision.with_value(value.to_string());
            }
        }
        DecisionFor::<str>::passed(value.to_string(), self.origin.clone())
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn domains(&self) -> Result<Domains<'_, String>, FilterError> {
        self.inner.domains()
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        vec![FilterNode::Domain(self.inner.clone())]
    }
}
