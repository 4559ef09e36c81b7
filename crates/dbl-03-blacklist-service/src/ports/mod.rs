//! Ports Layer - Hexagonal Architecture Interfaces

pub mod inbound;
pub mod outbound;

pub use inbound::FilterRegistryApi;
pub use outbound::FilterChangeListener;
