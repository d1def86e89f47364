//! Version information for Sidekick
//!
//! The analysis service receives these values as the client identity during
//! the session handshake.

/// The version of Sidekick, set at build time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the application
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Name announced in the handshake `clientInfo`
pub fn client_name() -> String {
    format!("{}-mcp-client", APP_NAME)
}

/// User agent sent with every request to the analysis service
pub fn user_agent() -> String {
    format!("{}/{}", APP_NAME, VERSION)
}
