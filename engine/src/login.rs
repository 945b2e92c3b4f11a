//! Login form view-model.

use std::sync::Arc;

use staffdir_providers::LoginService;
use staffdir_types::{Credentials, LoginState};

use crate::state::{StateContainer, Subscription};

/// What a call to [`LoginViewModel::login`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAttempt {
    /// The form did not validate; no request was made.
    InvalidForm,
    /// Another login is still running; no request was made.
    InFlight,
    Succeeded,
    /// The server or transport rejected the attempt; carries the shown message.
    Failed(String),
}

#[derive(Debug)]
pub struct LoginViewModel<L> {
    service: L,
    state: StateContainer<LoginState>,
}

impl<L: LoginService> LoginViewModel<L> {
    pub fn new(service: L) -> Self {
        Self {
            service,
            state: StateContainer::new(LoginState::default()),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription<LoginState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<LoginState> {
        self.state.snapshot()
    }

    pub fn update_email(&self, email: impl Into<String>) {
        let email = email.into();
        self.state.update(|current| {
            (current.email != email).then(|| LoginState {
                email,
                ..current.clone()
            })
        });
    }

    pub fn update_password(&self, password: impl Into<String>) {
        let password = password.into();
        self.state.update(|current| {
            (current.password != password).then(|| LoginState {
                password,
                ..current.clone()
            })
        });
    }

    #[must_use]
    pub fn is_email_valid(&self) -> bool {
        self.state.snapshot().is_email_valid()
    }

    #[must_use]
    pub fn is_password_valid(&self) -> bool {
        self.state.snapshot().is_password_valid()
    }

    #[must_use]
    pub fn is_form_valid(&self) -> bool {
        self.state.snapshot().is_form_valid()
    }

    #[must_use]
    pub fn is_login_successful(&self) -> bool {
        self.state.snapshot().is_login_successful()
    }

    /// Submit the current form.
    ///
    /// The form check and the switch to loading happen in one update, so two
    /// overlapping calls cannot both reach the service.
    pub async fn login(&self) -> LoginAttempt {
        let mut rejected = None;
        let mut submitted = None;
        self.state.update(|current| {
            if current.is_loading {
                rejected = Some(LoginAttempt::InFlight);
                return None;
            }
            let Ok(credentials) = Credentials::new(&current.email, &current.password) else {
                rejected = Some(LoginAttempt::InvalidForm);
                return None;
            };
            submitted = Some(credentials);
            Some(LoginState {
                is_loading: true,
                error_message: String::new(),
                ..current.clone()
            })
        });
        if let Some(attempt) = rejected {
            tracing::debug!(?attempt, "Login not submitted");
            return attempt;
        }
        let Some(credentials) = submitted else {
            return LoginAttempt::InvalidForm;
        };

        tracing::info!(email = credentials.email(), "Login submitted");
        let mut pending = PendingLogin {
            state: &self.state,
            finished: false,
        };
        let result = self.service.login(&credentials).await;
        pending.finished = true;
        match result {
            Ok(token) => {
                tracing::info!("Login succeeded");
                self.state.update(|current| {
                    Some(LoginState {
                        is_loading: false,
                        error_message: String::new(),
                        token: Some(token),
                        ..current.clone()
                    })
                });
                LoginAttempt::Succeeded
            }
            Err(err) => {
                tracing::warn!(error = %err, "Login failed");
                let message = err.message;
                self.state.update(|current| {
                    Some(LoginState {
                        is_loading: false,
                        error_message: message.clone(),
                        token: None,
                        ..current.clone()
                    })
                });
                LoginAttempt::Failed(message)
            }
        }
    }

    /// Forget a completed login so the form can be submitted again.
    pub fn reset_login_state(&self) {
        self.state.update(|current| {
            current.is_login_successful().then(|| LoginState {
                token: None,
                ..current.clone()
            })
        });
    }
}

/// Clears `is_loading` if a submitted login is dropped before the service answers.
struct PendingLogin<'a> {
    state: &'a StateContainer<LoginState>,
    finished: bool,
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::debug!("Login abandoned before completion");
        self.state.update(|current| {
            current.is_loading.then(|| LoginState {
                is_loading: false,
                ..current.clone()
            })
        });
    }
}
