//! REST transport for the parser backend.
//!
//! This module provides the `Transport` seam and its `reqwest` implementation,
//! `ApiClient`, together with the endpoint paths the backend exposes.
//!
//! Authentication is cookie based: the backend sets an HTTP-only session
//! cookie on login, and the client's cookie jar sends it back automatically.

pub mod client;
pub mod error;

pub use client::{ApiClient, Transport};
pub use error::{ApiError, FailureKind};

/// Backend endpoint paths, relative to the configured base URL.
pub mod paths {
    pub const REGISTER: &str = "/api/v1/register";
    pub const LOGIN: &str = "/api/v1/login";
    pub const CHECK_USER: &str = "/api/v1/check_user";
    pub const LOGOUT: &str = "/api/v1/logout";
    pub const RUN_PARSER: &str = "/api/v1/run_parser";
}
