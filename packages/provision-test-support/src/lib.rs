//! Test support for provisioning tests
//!
//! This crate provides an in-memory secret store with fetch accounting and
//! unified logging initialization shared by unit and integration tests.

pub mod logging;
pub mod memory_store;

pub use memory_store::MemorySecretStore;
