//! Register, login and logout against the backend.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{paths, ApiError, Transport};
use crate::result::ActionResult;

use super::credentials::{LoginCredentials, Registration};
use super::session::SessionManager;

#[derive(Clone)]
pub struct AuthGateway {
    transport: Arc<dyn Transport>,
    session: SessionManager,
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Validation(format!("Could not encode request: {}", e)))
}

impl AuthGateway {
    pub fn new(transport: Arc<dyn Transport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    /// Create an account. Registration does not log the user in.
    pub async fn register(&self, registration: Registration) -> ActionResult {
        if let Err(e) = registration.validate() {
            return e.into();
        }
        let body = match to_body(&registration) {
            Ok(body) => body,
            Err(e) => return e.into(),
        };
        drop(registration);

        match self.transport.request(Method::POST, paths::REGISTER, Some(body)).await {
            Ok(_) => {
                info!("Registration accepted");
                ActionResult::ok("Registration successful!")
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Registration failed");
                e.into()
            }
        }
    }

    /// Log in. Only a successful response marks the session authenticated;
    /// any failure leaves the session state untouched.
    pub async fn login(&self, credentials: LoginCredentials) -> ActionResult {
        if let Err(e) = credentials.validate() {
            return e.into();
        }
        let body = match to_body(&credentials) {
            Ok(body) => body,
            Err(e) => return e.into(),
        };
        let name = credentials.name.clone();
        drop(credentials);

        match self.transport.request(Method::POST, paths::LOGIN, Some(body)).await {
            Ok(_) => {
                self.session.mark_authenticated();
                info!(user = %name, "Login successful");
                ActionResult::ok("Login successful!")
            }
            Err(e) => {
                warn!(user = %name, error = %e, kind = ?e.kind(), "Login failed");
                e.into()
            }
        }
    }

    /// Log out. The request is best effort; locally the session always ends
    /// up anonymous.
    pub async fn logout(&self) -> ActionResult {
        let outcome = self.transport.request(Method::POST, paths::LOGOUT, None).await;
        self.session.force_anonymous();

        match outcome {
            Ok(_) => {
                info!("Logged out");
                ActionResult::ok("Logged out")
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed; session cleared locally");
                e.into()
            }
        }
    }
}
