//! Parsergate core library.
//!
//! A session and protected-action client for the parser backend. UI
//! fragments (login form, logout button, "run parser" button) share one
//! [`SessionClient`] and never keep their own idea of whether the user is
//! logged in.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use parsergate_core::{ClientConfig, LoginCredentials, SessionClient};
//!
//! let client = SessionClient::new(ClientConfig::new("http://localhost:8000")?)?;
//! client.session().verify().await;
//! let login = client.auth().login(LoginCredentials::new("bob", "pw")).await;
//! if login.success {
//!     let result = client.actions().run_parser().await;
//!     println!("{}", result.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod api;
pub mod auth;
pub mod config;
pub mod result;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

pub use actions::ProtectedActionInvoker;
pub use api::{ApiClient, ApiError, FailureKind, Transport};
pub use auth::{AuthGateway, LoginCredentials, Registration, SessionManager, SessionState, Subscription};
pub use config::{ClientConfig, Config, CredentialMode};
pub use result::ActionResult;

/// One transport, one session, and the two writers wired to them.
/// Clone is cheap - every clone shares the same session state.
#[derive(Clone)]
pub struct SessionClient {
    session: SessionManager,
    auth: AuthGateway,
    actions: ProtectedActionInvoker,
}

impl SessionClient {
    /// Build a client talking HTTP to the configured backend.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(config)?;
        Ok(Self::with_transport(Arc::new(api)))
    }

    /// Build a client on top of any transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let session = SessionManager::new(Arc::clone(&transport));
        let auth = AuthGateway::new(Arc::clone(&transport), session.clone());
        let actions = ProtectedActionInvoker::new(transport, session.clone());
        Self {
            session,
            auth,
            actions,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn auth(&self) -> &AuthGateway {
        &self.auth
    }

    pub fn actions(&self) -> &ProtectedActionInvoker {
        &self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::paths;
    use crate::testutil::ScriptedTransport;

    #[tokio::test]
    async fn test_components_share_one_session() {
        let transport = ScriptedTransport::new();
        transport.ok(paths::LOGIN, serde_json::json!({}));
        transport.fail(paths::RUN_PARSER, 403, "");
        let client = SessionClient::with_transport(transport.clone());
        let header = client.clone();

        assert!(client.auth().login(LoginCredentials::new("bob", "pw")).await.success);
        assert_eq!(header.session().state(), SessionState::Authenticated);

        let result = client.actions().run_parser().await;
        assert!(!result.success);
        assert_eq!(header.session().state(), SessionState::Anonymous);
    }

    #[test]
    fn test_new_builds_http_client() {
        let client = SessionClient::new(ClientConfig::new("http://localhost:8000").unwrap()).unwrap();
        assert_eq!(client.session().state(), SessionState::Unknown);
    }
}
