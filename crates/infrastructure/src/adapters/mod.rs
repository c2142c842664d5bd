//! Port adapters backed by real system resources.

mod reqwest_transport;
mod system_clock;

pub use reqwest_transport::ReqwestTransport;
pub use system_clock::SystemClock;
