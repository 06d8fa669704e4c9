//! Store seeding functionality
//!
//! Populates empty collections with the demo tenants and accounts the service
//! ships with, so a fresh data file is immediately usable.

pub mod defaults;

pub use defaults::{SEED_PASSWORD, seed_defaults};
