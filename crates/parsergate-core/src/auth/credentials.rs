use std::fmt;

use serde::Serialize;

use crate::api::ApiError;

/// Login form contents. Consumed by [`AuthGateway::login`](super::AuthGateway::login).
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub name: String,
    pub password: String,
}

/// Registration form contents. Consumed by [`AuthGateway::register`](super::AuthGateway::register).
#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation("Name and password required".to_string()));
        }
        Ok(())
    }
}

impl Registration {
    pub fn new(email: impl Into<String>, name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() || self.name.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation("Email, name and password required".to_string()));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(ApiError::Validation(format!("'{}' is not a valid email address", self.email.trim())));
        }
        Ok(())
    }
}

/// Shape check only: `local@domain.tld`, no whitespace, one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !domain.starts_with('.'),
        None => false,
    }
}

// Passwords never reach log output.
impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}
