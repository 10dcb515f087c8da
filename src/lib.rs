//! Catalog application library
//!
//! Wires the catalog engine into the module registry and HTTP server.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{build_store, run};
