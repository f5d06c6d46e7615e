use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::api::{paths, Transport};
use crate::auth::{SessionManager, SessionState};
use crate::result::ActionResult;

/// Gates backend actions on the session state.
///
/// Calls are independent: concurrent invocations of the same action each
/// reach the backend.
#[derive(Clone)]
pub struct ProtectedActionInvoker {
    transport: Arc<dyn Transport>,
    session: SessionManager,
}

impl ProtectedActionInvoker {
    pub fn new(transport: Arc<dyn Transport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    /// Run the protected action at `action_path`.
    pub async fn invoke(&self, action_path: &str) -> ActionResult {
        self.execute(action_path, "Action completed successfully").await
    }

    /// Start the vacancy parser.
    pub async fn run_parser(&self) -> ActionResult {
        self.execute(paths::RUN_PARSER, "Parser operation successful!").await
    }

    async fn execute(&self, action_path: &str, success_message: &str) -> ActionResult {
        // An unknown session gets verified first; a known-anonymous one is refused locally.
        let state = match self.session.state() {
            SessionState::Authenticated => SessionState::Authenticated,
            SessionState::Unknown | SessionState::Checking => self.session.verify().await,
            SessionState::Anonymous => SessionState::Anonymous,
        };
        if !state.is_authenticated() {
            debug!(action = action_path, state = state.label(), "Protected action refused locally");
            return ActionResult::not_authenticated();
        }

        match self.transport.request(Method::POST, action_path, None).await {
            Ok(payload) => {
                info!(action = action_path, "Protected action succeeded");
                ActionResult::ok_with_payload(success_message, payload)
            }
            Err(e) if e.is_authorization() => {
                warn!(action = action_path, status = ?e.status(), "Protected action rejected; session is no longer valid");
                self.session.force_anonymous();
                e.into()
            }
            Err(e) => {
                warn!(action = action_path, error = %e, "Protected action failed");
                e.into()
            }
        }
    }
}
