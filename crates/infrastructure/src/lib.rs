//! Riptide Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in the
//! application layer: the reqwest HTTP transport, the system clock, and the
//! file-backed credential store.

pub mod adapters;
pub mod persistence;

pub use adapters::{ReqwestTransport, SystemClock};
pub use persistence::FileCredentialStore;
