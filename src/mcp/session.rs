//! Persistent handshake with the analysis service

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{AnalysisFailure, ErrorKind};
use crate::mcp::{
    transport::Transport,
    types::{ClientInfo, JsonRpcRequest, SESSION_HEADER},
};
use crate::utils::text::string;
use crate::version;

/// State of the shared session.
///
/// `initialized` is true exactly when `session_token` holds a token the
/// endpoint issued during the last successful handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub endpoint: String,
    pub session_token: Option<String>,
    pub initialized: bool,
}

/// Owns the process-wide session.
///
/// Token reads are cheap and concurrent. Handshakes are serialized through
/// `init_lock`, so at most one is in flight and callers arriving meanwhile wait
/// for its outcome.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    state: RwLock<Session>,
    init_lock: Mutex<()>,
    protocol_version: String,
    handshake_timeout: Duration,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self {
            transport,
            state: RwLock::new(Session {
                endpoint: config.endpoint.clone(),
                session_token: None,
                initialized: false,
            }),
            init_lock: Mutex::new(()),
            protocol_version: config.protocol_version.clone(),
            handshake_timeout: config.handshake_timeout(),
        }
    }

    /// Pure read of the readiness flag; never performs I/O
    pub fn ensure_ready(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .initialized
    }

    /// Run `f` against the current token, `None` when the session is not ready
    pub fn with_token<R>(&self, f: impl FnOnce(&str) -> R) -> Option<R> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match (&state.session_token, state.initialized) {
            (Some(token), true) => Some(f(token)),
            _ => None,
        }
    }

    /// Copy of the current session state
    pub fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Perform the handshake, replacing any existing session
    pub async fn initialize(&self) -> Result<(), AnalysisFailure> {
        let _guard = self.init_lock.lock().await;
        self.handshake().await
    }

    /// Initialize only if not ready yet; concurrent callers share one handshake
    pub async fn ensure_initialized(&self) -> Result<(), AnalysisFailure> {
        if self.ensure_ready() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;

        // Someone else may have finished the handshake while we waited
        if self.ensure_ready() {
            debug!("Session became ready while waiting for the init lock");
            return Ok(());
        }

        self.handshake().await
    }

    /// Forget the current token so the next call re-handshakes
    pub fn reset(&self) {
        if self.ensure_ready() {
            info!("Resetting analysis session");
        }
        self.set_token(None);
    }

    /// Reset only while `token` is still the current one; a newer session is kept
    pub fn reset_if(&self, token: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.session_token.as_deref() != Some(token) {
            debug!("Session already replaced, keeping the current token");
            return false;
        }

        info!("Resetting analysis session");
        state.session_token = None;
        state.initialized = false;
        true
    }

    async fn handshake(&self) -> Result<(), AnalysisFailure> {
        info!("Initializing analysis session...");

        let request = JsonRpcRequest::initialize(
            &self.protocol_version,
            ClientInfo {
                name: version::client_name(),
                version: version::VERSION.to_string(),
            },
        );

        let response = match self
            .transport
            .post(&request, None, self.handshake_timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Session handshake failed: {}", e);
                self.set_token(None);
                return Err(e.into());
            }
        };

        if !response.is_success() {
            warn!("Session handshake returned status {}", response.status);
            self.set_token(None);
            return Err(AnalysisFailure::new(
                ErrorKind::RemoteError(response.status),
                string::truncate(&response.body, 500),
            ));
        }

        let token = response
            .header(SESSION_HEADER)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        match token {
            Some(token) => {
                info!(
                    "Analysis session initialized (ID: {}...)",
                    token.chars().take(8).collect::<String>()
                );
                self.set_token(Some(token));
                Ok(())
            }
            None => {
                warn!("Handshake response carried no {} header", SESSION_HEADER);
                self.set_token(None);
                Err(AnalysisFailure::new(
                    ErrorKind::NoSessionToken,
                    "No session ID returned from the analysis service",
                ))
            }
        }
    }

    fn set_token(&self, token: Option<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.initialized = token.is_some();
        state.session_token = token;
    }
}
