//! Directory listing over HTTP.
//!
//! `GET {base}/users?page=1`, parsed from the `data` array of the response.

use std::collections::HashSet;

use serde::Deserialize;
use staffdir_types::{FetchError, Record, RecordId};

use crate::{
    HttpClient, MAX_JSON_BODY_BYTES, RecordSource, connection_error, json_body_error,
    read_body_with_limit, read_capped_error_body, status_error_message,
};

/// Only the first page is ever requested.
const FIRST_PAGE: &str = "1";

#[derive(Debug, Deserialize)]
struct UsersPage {
    data: Vec<UserEntry>,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    avatar: String,
}

impl From<UserEntry> for Record {
    fn from(entry: UserEntry) -> Self {
        Self {
            id: RecordId::new(entry.id),
            email: entry.email,
            first_name: entry.first_name,
            last_name: entry.last_name,
            asset_ref: entry.avatar,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRecordSource {
    http: HttpClient,
}

impl HttpRecordSource {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl RecordSource for HttpRecordSource {
    async fn fetch_records(&self) -> Result<Vec<Record>, FetchError> {
        let mut url = self.http.settings().endpoint("users");
        url.query_pairs_mut().append_pair("page", FIRST_PAGE);

        tracing::debug!(url = %url, "Fetching directory listing");
        let request = self.http.authorize(self.http.inner().get(url));
        let response = request.send().await.map_err(|e| connection_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(FetchError::http(
                status.as_u16(),
                status_error_message(status, &body),
            ));
        }

        let body = read_body_with_limit(response, MAX_JSON_BODY_BYTES)
            .await
            .map_err(|e| json_body_error(&e))?;
        parse_users_page(&body)
    }
}

fn parse_users_page(body: &[u8]) -> Result<Vec<Record>, FetchError> {
    let page: UsersPage = serde_json::from_slice(body)
        .map_err(|e| FetchError::parse(format!("Connection error: {e}")))?;

    let mut seen = HashSet::with_capacity(page.data.len());
    Ok(page
        .data
        .into_iter()
        .filter(|entry| {
            let first = seen.insert(entry.id);
            if !first {
                tracing::warn!(id = entry.id, "Dropping repeated user id from listing");
            }
            first
        })
        .map(Record::from)
        .collect())
}
