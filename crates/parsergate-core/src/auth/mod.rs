//! Authentication module for the client-side session lifecycle.
//!
//! This module provides:
//! - `SessionManager`: the single shared answer to "is this client authenticated"
//! - `AuthGateway`: register, login and logout, the session's only identity writers
//! - `LoginCredentials` / `Registration`: request bodies, validated before sending
//!
//! The backend-issued credential is an HTTP-only cookie; nothing here reads it.

pub mod credentials;
pub mod gateway;
pub mod session;

pub use credentials::{LoginCredentials, Registration};
pub use gateway::AuthGateway;
pub use session::{SessionManager, SessionState, Subscription};
