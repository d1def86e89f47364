//! Model Context Protocol plumbing
//!
//! JSON-RPC message types, the HTTP transport and the shared session with the
//! analysis service.

pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use session::{Session, SessionManager};
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
pub use types::*;
