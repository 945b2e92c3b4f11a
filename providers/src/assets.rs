//! Avatar download and decode.

use staffdir_types::{AssetHandle, FetchError, FetchErrorKind};

use crate::{AssetSource, BodyReadError, HttpClient, read_body_with_limit};

const DECODE_FAILED: &str = "Failed to decode bitmap";

#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    http: HttpClient,
}

impl HttpAssetSource {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

fn load_error(kind: FetchErrorKind, cause: impl std::fmt::Display) -> FetchError {
    FetchError::new(kind, format!("Failed to load image: {cause}"))
}

impl AssetSource for HttpAssetSource {
    async fn fetch_asset(&self, asset_ref: &str) -> Result<AssetHandle, FetchError> {
        let response = self
            .http
            .inner()
            .get(asset_ref)
            .send()
            .await
            .map_err(|e| load_error(FetchErrorKind::Transport, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(load_error(
                FetchErrorKind::Http {
                    status: status.as_u16(),
                },
                format_args!("HTTP {}", status.as_u16()),
            ));
        }

        let limit = self.http.settings().max_asset_bytes;
        let bytes = read_body_with_limit(response, limit)
            .await
            .map_err(|e| match e {
                BodyReadError::TooLarge { limit } => load_error(
                    FetchErrorKind::TooLarge,
                    format_args!("response exceeds {limit} bytes"),
                ),
                BodyReadError::Transport(e) => load_error(FetchErrorKind::Transport, e),
            })?;

        // Decoding is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| {
                tracing::warn!(%e, "Image decode task failed");
                FetchError::decode(DECODE_FAILED)
            })?
    }
}

/// Decode any supported format into an RGBA8 handle.
pub(crate) fn decode_image(bytes: &[u8]) -> Result<AssetHandle, FetchError> {
    let image = image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!(%e, "Rejected undecodable image");
        FetchError::decode(DECODE_FAILED)
    })?;
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    AssetHandle::from_rgba8(width, height, rgba.into_raw())
        .ok_or_else(|| FetchError::decode(DECODE_FAILED))
}
