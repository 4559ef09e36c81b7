//! # Inbound Ports (Driving Ports)
//!
//! The API the blacklist service exposes to request handlers and to the
//! configuration layer that feeds it list descriptions.

use std::sync::Arc;

use dbl_01_domain_filters::FilterNode;
use shared_types::{BlacklistSource, ListId};

use super::outbound::FilterChangeListener;
use crate::service::UpdateTicket;

/// Filter lookup and update submission.
///
/// Lookups never block on an update cycle in progress.
pub trait FilterRegistryApi: Send + Sync {
    /// Filter for the newest live version of `id`, if one is loaded
    fn get_filter(&self, id: ListId) -> Option<FilterNode>;

    /// Queue an update cycle for the complete set of configured lists.
    ///
    /// Cycles run one at a time in submission order.
    fn set_filters(&self, sources: Vec<BlacklistSource>) -> UpdateTicket;

    fn add_listener(&self, listener: Arc<dyn FilterChangeListener>);
}
