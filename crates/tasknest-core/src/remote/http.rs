//! REST client for the remote record store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{RemoteClient, RemoteError, WireRecord};
use crate::models::{Record, RecordId};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// [`RemoteClient`] speaking JSON over HTTP.
///
/// Routes, relative to the base URL:
/// `GET /v1/owners/{owner}/records`, `PUT /v1/owners/{owner}/records/{id}` and
/// `DELETE /v1/owners/{owner}/records/{id}`.
#[derive(Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteClient")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpRemoteClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(
            base_url,
            access_token,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| RemoteError::InvalidConfiguration(error.to_string()))?;
        Ok(Self {
            base_url,
            access_token: normalize_text_option(access_token),
            client,
        })
    }

    fn records_url(&self, owner_id: &str) -> String {
        format!(
            "{}/v1/owners/{}/records",
            self.base_url,
            urlencoding::encode(owner_id)
        )
    }

    fn record_url(&self, owner_id: &str, id: &RecordId) -> String {
        format!(
            "{}/{}",
            self.records_url(owner_id),
            urlencoding::encode(id.as_str())
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn fetch_all(&self, owner_id: &str) -> Result<Vec<Record>, RemoteError> {
        let response = self
            .authorized(self.client.get(self.records_url(owner_id)))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let payload = response.json::<Vec<WireRecord>>().await?;
        payload.into_iter().map(Record::try_from).collect()
    }

    async fn upsert(&self, owner_id: &str, record: &Record) -> Result<(), RemoteError> {
        let payload = WireRecord::try_from(record)?;
        let response = self
            .authorized(self.client.put(self.record_url(owner_id, &record.id)))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }

    async fn delete(&self, owner_id: &str, id: &RecordId) -> Result<(), RemoteError> {
        let response = self
            .authorized(self.client.delete(self.record_url(owner_id, id)))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::DeadlineExceeded(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::Unavailable(error.to_string())
        } else if error.is_decode() || error.is_body() {
            Self::InvalidPayload(error.to_string())
        } else {
            Self::Api(error.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RemoteError::DeadlineExceeded(message)
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::INSUFFICIENT_STORAGE => {
            RemoteError::ResourceExhausted(message)
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            RemoteError::Unavailable(message)
        }
        _ => RemoteError::Api(message),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<RemoteErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String, RemoteError> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("remote base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "remote base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn record_urls_encode_owner_and_id() {
        let client = HttpRemoteClient::new("https://api.example.com", None).unwrap();
        let id: RecordId = "a b/c".parse().unwrap();
        assert_eq!(
            client.record_url("user@example.com", &id),
            "https://api.example.com/v1/owners/user%40example.com/records/a%20b%2Fc"
        );
    }

    #[test]
    fn status_errors_are_classified() {
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(status_error(StatusCode::GATEWAY_TIMEOUT, "").is_transient());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(!status_error(StatusCode::UNAUTHORIZED, "").is_transient());
        assert!(!status_error(StatusCode::UNPROCESSABLE_ENTITY, "{\"message\":\"bad title\"}")
            .is_transient());
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        let message = parse_api_error(StatusCode::BAD_REQUEST, r#"{"message":" invalid "}"#);
        assert_eq!(message, "invalid (400)");
        assert_eq!(parse_api_error(StatusCode::BAD_REQUEST, ""), "HTTP 400");
    }

    #[test]
    fn debug_redacts_token() {
        let client =
            HttpRemoteClient::new("https://api.example.com", Some("secret".to_string())).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret"));
    }
}
