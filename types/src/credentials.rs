//! Client-side credential checks run before any login call.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[a-zA-Z0-9+._%\-]{1,256}",
        r"@",
        r"[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}",
        r"(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    ))
    .expect("email pattern is valid")
});

static PASSWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{6,10}$").expect("password pattern is valid"));

#[must_use]
pub fn check_email(email: &str) -> bool {
    !email.is_empty() && EMAIL_PATTERN.is_match(email)
}

/// Six to ten ASCII letters or digits.
#[must_use]
pub fn check_password(password: &str) -> bool {
    !password.is_empty() && PASSWORD_PATTERN.is_match(password)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be 6-10 letters or digits")]
    InvalidPassword,
}

/// An email/password pair that passed both checks.
///
/// Note: `Debug` is manually implemented to redact the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let email = email.into();
        let password = password.into();
        if !check_email(&email) {
            return Err(CredentialError::InvalidEmail);
        }
        if !check_password(&password) {
            return Err(CredentialError::InvalidPassword);
        }
        Ok(Self { email, password })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
