//! Remote collaborators for the staff directory.
//!
//! # Architecture
//!
//! The engine never talks HTTP. It consumes three capabilities:
//!
//! - [`RecordSource`] - fetch the directory listing (one page)
//! - [`AssetSource`] - fetch and decode one avatar image
//! - [`LoginService`] - exchange credentials for a session token
//!
//! This crate defines those traits and ships reqwest-backed implementations
//! ([`HttpRecordSource`], [`HttpAssetSource`], [`HttpLoginService`]) that share
//! one [`HttpClient`].
//!
//! # Error Handling
//!
//! Every transport, status, parse and decode failure is converted to a
//! [`FetchError`] at this boundary. Callers only ever branch on `Ok`/`Err`; the
//! message inside the error is already fit for display.

mod assets;
mod login;
mod records;

pub use assets::HttpAssetSource;
pub use login::HttpLoginService;
pub use records::HttpRecordSource;

pub use staffdir_types;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use staffdir_types::{AssetHandle, AuthToken, Credentials, FetchError, FetchErrorKind, Record};
use thiserror::Error;
use url::Url;

/// Public reqres API used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://reqres.in/api";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Avatar bodies larger than this are rejected before decoding.
pub const DEFAULT_MAX_ASSET_BYTES: usize = 8 * 1024 * 1024;
/// Listing and login bodies larger than this are rejected before parsing.
pub const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

const MAX_REDIRECTS: usize = 5;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;
const API_KEY_HEADER: &str = "x-api-key";

// ============================================================================
// Capabilities
// ============================================================================

/// Produces the base directory listing.
///
/// Implementations make a single attempt; the engine calls this at most once per
/// load cycle.
pub trait RecordSource: Send + Sync + 'static {
    fn fetch_records(&self) -> impl Future<Output = Result<Vec<Record>, FetchError>> + Send;
}

/// Produces one decoded asset for a reference URL.
pub trait AssetSource: Send + Sync + 'static {
    fn fetch_asset(
        &self,
        asset_ref: &str,
    ) -> impl Future<Output = Result<AssetHandle, FetchError>> + Send;
}

/// Exchanges validated credentials for a session token.
pub trait LoginService: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthToken, FetchError>> + Send;
}

// ============================================================================
// HTTP client
// ============================================================================

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Endpoint and transport settings shared by every HTTP collaborator.
#[derive(Clone)]
pub struct HttpSettings {
    base_url: Url,
    api_key: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Permit plain `http://` URLs (local mocks, test servers).
    pub allow_insecure_http: bool,
    pub max_asset_bytes: usize,
}

// Manual Debug impl to prevent leaking the API key in logs.
impl std::fmt::Debug for HttpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSettings")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("allow_insecure_http", &self.allow_insecure_http)
            .field("max_asset_bytes", &self.max_asset_bytes)
            .finish()
    }
}

impl HttpSettings {
    /// Validate `base_url` and fill every other field with its default.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
            return Err(invalid("URL has no host".to_string()));
        }
        Ok(Self {
            base_url: parsed,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            allow_insecure_http: false,
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` with `segment` appended as a new path segment.
    #[must_use]
    pub fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.base_url.clone();
        // Validated in `new`: the base always has a host, so it can carry segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url
    }
}

/// A configured reqwest client plus the settings it was built from.
///
/// Cheap to clone; all collaborators built from one `HttpClient` share a
/// connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    settings: Arc<HttpSettings>,
}

impl HttpClient {
    pub fn new(settings: HttpSettings) -> Result<Self, ClientError> {
        let client = base_client_builder(&settings).build()?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    pub(crate) fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Attach the API key header, when one is configured.
    ///
    /// Only used for requests against the configured API; avatar URLs may point
    /// at third-party hosts and never receive the key.
    pub(crate) fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }
}

fn base_client_builder(settings: &HttpSettings) -> reqwest::ClientBuilder {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("staffdir/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .https_only(!settings.allow_insecure_http)
        .default_headers(default_headers)
}

// ============================================================================
// Body helpers
// ============================================================================

/// Read an error body for display, truncating at 32 KiB.
///
/// Read failures end the body early rather than masking the status error.
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).trim().to_string()
}

#[derive(Debug)]
pub(crate) enum BodyReadError {
    TooLarge { limit: usize },
    Transport(reqwest::Error),
}

/// Read a full success body, failing once it grows past `limit` bytes.
pub(crate) async fn read_body_with_limit(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyReadError> {
    use futures_util::StreamExt;

    if let Some(len) = response.content_length()
        && len > limit as u64
    {
        return Err(BodyReadError::TooLarge { limit });
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyReadError::Transport)?;
        if body.len() + chunk.len() > limit {
            return Err(BodyReadError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// `Error: <body>` when the server explained itself, `Error: HTTP <status>` otherwise.
pub(crate) fn status_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if body.is_empty() {
        format!("Error: HTTP {}", status.as_u16())
    } else {
        format!("Error: {body}")
    }
}

pub(crate) fn connection_error(err: &reqwest::Error) -> FetchError {
    FetchError::transport(format!("Connection error: {err}"))
}

pub(crate) fn json_body_error(err: &BodyReadError) -> FetchError {
    match err {
        BodyReadError::TooLarge { limit } => FetchError::new(
            FetchErrorKind::TooLarge,
            format!("Connection error: response exceeds {limit} bytes"),
        ),
        BodyReadError::Transport(e) => connection_error(e),
    }
}
