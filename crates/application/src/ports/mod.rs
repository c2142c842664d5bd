//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the sync core and external systems.
//! Each port is a trait implemented by an adapter in the infrastructure
//! layer, or by a mock in tests.

mod clock;
mod credential_store;
mod transport;

pub use clock::Clock;
pub use credential_store::{CredentialStore, CredentialStoreError};
pub use transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};
