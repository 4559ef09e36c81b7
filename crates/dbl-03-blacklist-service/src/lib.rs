//! # DBL-03 Blacklist Service
//!
//! Keeps one live filter per configured block list and moves the cache
//! forward as list versions change.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `BlacklistConfig`, `UpdateSummary`
//! - **Ports Layer** (`ports/`): `FilterRegistryApi` (inbound),
//!   `FilterChangeListener` (outbound)
//! - **Service Layer** (`service/`): `FilterRegistry`, the artifact loader
//!   and the serialized `UpdateWorker`
//!
//! ## Invariants
//!
//! - At most one update cycle runs at a time
//! - A list's version only moves forward
//! - A filter in use is never closed by the cycle that superseded it
//!
//! ## Usage Example
//!
//! ```ignore
//! use dbl_03_blacklist_service::{BlacklistConfig, DomainBlacklistService, FilterRegistryApi};
//!
//! let service = DomainBlacklistService::start(BlacklistConfig::from_env())?;
//! service.set_filters(sources).wait().await?;
//!
//! if let Some(filter) = service.get_domain_filter(7) {
//!     let decision = filter.is_blocked("ads.example.com");
//! }
//! ```

pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use domain::{BlacklistConfig, UpdateSummary};
pub use error::RegistryError;
pub use metrics::{MetricsSnapshot, RegistryMetrics};
pub use ports::{FilterChangeListener, FilterRegistryApi};
pub use service::{DomainBlacklistService, FilterRegistry, UpdateTicket};
