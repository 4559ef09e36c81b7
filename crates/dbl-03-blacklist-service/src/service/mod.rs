//! Service Layer - Registry, loader and update worker

pub mod blacklist_service;
pub mod loader;
pub mod registry;
pub mod worker;

pub use blacklist_service::DomainBlacklistService;
pub use registry::FilterRegistry;
pub use worker::{UpdateTicket, UpdateWorker};
