use crate::{AuthToken, check_email, check_password};

/// Login form state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginState {
    pub email: String,
    pub password: String,
    pub is_loading: bool,
    pub error_message: String,
    /// Set once the server accepted the credentials.
    pub token: Option<AuthToken>,
}

impl LoginState {
    #[must_use]
    pub fn is_email_valid(&self) -> bool {
        check_email(&self.email)
    }

    #[must_use]
    pub fn is_password_valid(&self) -> bool {
        check_password(&self.password)
    }

    #[must_use]
    pub fn is_form_valid(&self) -> bool {
        self.is_email_valid() && self.is_password_valid()
    }

    #[must_use]
    pub fn is_login_successful(&self) -> bool {
        self.token.is_some()
    }
}
