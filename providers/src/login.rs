//! Credential exchange: `POST {base}/login`.

use serde::{Deserialize, Serialize};
use staffdir_types::{AuthToken, Credentials, FetchError};

use crate::{
    HttpClient, LoginService, MAX_JSON_BODY_BYTES, connection_error, json_body_error,
    read_body_with_limit, read_capped_error_body, status_error_message,
};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct LoginErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpLoginService {
    http: HttpClient,
}

impl HttpLoginService {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl LoginService for HttpLoginService {
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, FetchError> {
        let url = self.http.settings().endpoint("login");
        let payload = LoginRequest {
            email: credentials.email(),
            password: credentials.password(),
        };

        tracing::debug!(url = %url, email = credentials.email(), "Submitting login");
        let request = self.http.authorize(self.http.inner().post(url).json(&payload));
        let response = request.send().await.map_err(|e| connection_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(FetchError::http(status.as_u16(), login_error_message(status, &body)));
        }

        let body = read_body_with_limit(response, MAX_JSON_BODY_BYTES)
            .await
            .map_err(|e| json_body_error(&e))?;
        let parsed: LoginResponse = serde_json::from_slice(&body)
            .map_err(|e| FetchError::parse(format!("Connection error: {e}")))?;
        AuthToken::new(parsed.token)
            .map_err(|_| FetchError::parse("Connection error: server returned an empty token"))
    }
}

/// The server's own `{"error": ...}` text when present, the generic status text otherwise.
fn login_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<LoginErrorBody>(body) {
        Ok(parsed) if !parsed.error.trim().is_empty() => parsed.error,
        _ => status_error_message(status, body),
    }
}
