//! Lemming REST server: the HTTP surface over `lemming-core`.
//!
//! Split into a library so route tests can build the router without a
//! listener.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
