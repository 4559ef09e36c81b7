//! # Outbound Ports (Driven Ports)
//!
//! Callbacks the service drives after an update cycle.

/// Notified after an update cycle that changed which artifact backs a list.
///
/// Called on the update worker, after the cache index has been persisted.
pub trait FilterChangeListener: Send + Sync {
    fn on_filters_changed(&self);
}

impl<F> FilterChangeListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_filters_changed(&self) {
        self()
    }
}
