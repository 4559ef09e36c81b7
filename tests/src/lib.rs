//! # Domain Blacklist Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Temp workspaces and list builders
//! └── integration/
//!     ├── composition.rs  # File-backed filters under combinators
//!     ├── flows.rs        # Update cycles through the service
//!     └── migration.rs    # Caches left by older releases
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dbl-tests
//! cargo test -p dbl-tests integration::flows::
//!
//! # Benchmarks
//! cargo bench -p dbl-tests
//! ```

pub mod fixtures;
pub mod integration;
