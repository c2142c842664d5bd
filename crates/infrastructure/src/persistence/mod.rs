//! File-backed persistence for session state.

mod credential_store;

pub use credential_store::FileCredentialStore;
