//! Protected backend actions.
//!
//! `ProtectedActionInvoker` only calls the backend while the session is
//! authenticated, and drops the session back to anonymous when the backend
//! answers 401/403.

pub mod invoker;

pub use invoker::ProtectedActionInvoker;
