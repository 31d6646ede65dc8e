//! Taskwire: a transport-neutral task routing framework.
//!
//! This facade re-exports the core crate unconditionally and each
//! optional subsystem behind its own feature flag, mirroring the
//! teacher's `r2e` facade crate (`r2e/src/lib.rs`).

pub extern crate taskwire_core;
pub use taskwire_core::*;

#[cfg(feature = "http")]
pub use taskwire_http;

#[cfg(feature = "broker")]
pub use taskwire_broker;

#[cfg(feature = "security")]
pub use taskwire_security;

#[cfg(feature = "data")]
pub use taskwire_data;

#[cfg(feature = "test")]
pub use taskwire_test;
