// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instagram API client for the OAuth handshake and media listing.
//!
//! Handles:
//! - Authorize URL construction
//! - Code exchange and short → long-lived token exchange
//! - Long-lived token refresh
//! - Media page fetches (first page and opaque `next` links)
//! - Bad-token detection, so callers can drop dead credentials
//!
//! No call retries on its own.

use crate::config::Config;
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Scopes requested during authorization.
pub const SCOPES: &str = "user_profile,user_media";

/// Fields requested for every media item.
pub const MEDIA_FIELDS: &str = "caption,id,media_type,media_url,thumbnail_url,permalink,children{media_type,media_url,thumbnail_url,id},timestamp";

/// `meta.error_type` values that mean the token is no longer usable.
const BAD_TOKEN_ERROR_TYPES: &[&str] = &["OAuthAccessTokenException"];

/// Graph API error code for an invalid or expired access token.
const GRAPH_INVALID_TOKEN_CODE: i64 = 190;

/// Instagram API client.
#[derive(Clone)]
pub struct InstagramClient {
    http: reqwest::Client,
    api_url: String,
    graph_url: String,
    client_id: String,
    client_secret: String,
    /// Sent unchanged in both the authorize URL and the code exchange
    redirect_uri: String,
}

impl InstagramClient {
    /// Create a new client from application config.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.instagram_api_url.trim_end_matches('/').to_string(),
            graph_url: config.instagram_graph_url.trim_end_matches('/').to_string(),
            client_id: config.instagram_client_id.clone(),
            client_secret: config.instagram_client_secret.clone(),
            redirect_uri: config.callback_url(),
        })
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Build the URL the user visits to grant access.
    ///
    /// `state` comes back untouched on the redirect and identifies the profile.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/oauth/authorize/?\
             client_id={}&\
             redirect_uri={}&\
             scope={}&\
             response_type=code&\
             state={}",
            self.api_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            SCOPES,
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for a short-lived token.
    pub async fn exchange_code(&self, code: &str) -> Result<ShortLivedToken, AppError> {
        let url = format!("{}/oauth/access_token", self.api_url);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        check_response_json(response).await
    }

    /// Look up the Instagram account behind a short-lived token.
    pub async fn fetch_user_details(
        &self,
        token: &ShortLivedToken,
    ) -> Result<UserDetails, AppError> {
        let url = format!("{}/{}", self.graph_url, token.user_id);
        self.get_json(
            &url,
            &[
                ("fields", "id,username"),
                ("access_token", token.access_token.as_str()),
            ],
        )
        .await
    }

    /// Trade a short-lived token for a long-lived one.
    pub async fn exchange_for_long_lived_token(
        &self,
        token: &ShortLivedToken,
    ) -> Result<LongLivedToken, AppError> {
        let url = format!("{}/access_token", self.graph_url);
        self.get_json(
            &url,
            &[
                ("grant_type", "ig_exchange_token"),
                ("client_secret", self.client_secret.as_str()),
                ("access_token", token.access_token.as_str()),
            ],
        )
        .await
    }

    /// Extend a long-lived token before it expires.
    pub async fn refresh_long_lived_token(
        &self,
        access_code: &str,
    ) -> Result<LongLivedToken, AppError> {
        let url = format!("{}/refresh_access_token", self.graph_url);
        self.get_json(
            &url,
            &[
                ("grant_type", "ig_refresh_token"),
                ("access_token", access_code),
            ],
        )
        .await
    }

    // ─── Media ───────────────────────────────────────────────────────────────

    /// Fetch the first page of a user's media.
    pub async fn fetch_media_page(
        &self,
        access_code: &str,
        user_id: &str,
        page_size: usize,
    ) -> Result<MediaPage, AppError> {
        let url = format!("{}/{}/media", self.graph_url, user_id);
        let limit = page_size.to_string();
        self.get_json(
            &url,
            &[
                ("fields", MEDIA_FIELDS),
                ("limit", limit.as_str()),
                ("access_token", access_code),
            ],
        )
        .await
    }

    /// Follow an opaque `paging.next` link from a previous page.
    pub async fn fetch_media_page_url(&self, next_url: &str) -> Result<MediaPage, AppError> {
        self.get_json(next_url, &[]).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        check_response_json(response).await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let url = redact_url(response.url());
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = classify_error(&url, status.as_u16(), &body);
        tracing::warn!(url = %url, status = status.as_u16(), bad_token = err.is_bad_token(), "Instagram request failed");
        return Err(err);
    }

    response.json().await.map_err(|e| AppError::Http {
        url,
        status: Some(status.as_u16()),
        message: format!("JSON parse error: {}", e),
    })
}

/// Classify a non-2xx response as `BadToken` or generic `Http`.
pub fn classify_error(url: &str, status: u16, body: &str) -> AppError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| body.trim().to_string());

    if parsed.as_ref().is_some_and(is_bad_token_body) {
        return AppError::BadToken(message);
    }

    AppError::Http {
        url: url.to_string(),
        status: Some(status),
        message,
    }
}

fn is_bad_token_body(body: &Value) -> bool {
    let meta_type = body
        .pointer("/meta/error_type")
        .and_then(Value::as_str)
        .is_some_and(|t| BAD_TOKEN_ERROR_TYPES.contains(&t));

    let graph_code = body.pointer("/error/code").and_then(Value::as_i64)
        == Some(GRAPH_INVALID_TOKEN_CODE);

    meta_type || graph_code
}

fn error_message(body: &Value) -> Option<String> {
    ["/error_message", "/error/message", "/meta/error_message"]
        .iter()
        .find_map(|p| body.pointer(p).and_then(Value::as_str))
        .map(str::to_string)
}

fn transport_error(url: &str, err: reqwest::Error) -> AppError {
    let url = reqwest::Url::parse(url)
        .map(|u| redact_url(&u))
        .unwrap_or_else(|_| url.to_string());
    let timeout = err.is_timeout();
    let message = err.without_url().to_string();
    tracing::warn!(url = %url, timeout, error = %message, "Instagram request did not complete");
    AppError::Http {
        url,
        status: None,
        message,
    }
}

/// Drop the query string (it carries access tokens and the client secret).
fn redact_url(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// Short-lived token from the code exchange.
#[derive(Clone, Deserialize)]
pub struct ShortLivedToken {
    pub access_token: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
}

/// Instagram account identity.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetails {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
}

/// Long-lived (60 day) token, from an exchange or a refresh.
#[derive(Clone, Deserialize)]
pub struct LongLivedToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until expiry
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// One page of raw media items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaPage {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl MediaPage {
    pub fn next_url(&self) -> Option<&str> {
        self.paging.as_ref().and_then(|p| p.next.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

/// Instagram sends user IDs as numbers in some responses and strings in others.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> InstagramClient {
        InstagramClient::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let url = client().authorize_url("abc123");
        assert_eq!(
            url,
            "https://api.instagram.com/oauth/authorize/?client_id=TEST_CLIENT_ID&\
             redirect_uri=http%3A%2F%2Ftest.test%2Finstagram&\
             scope=user_profile,user_media&response_type=code&state=abc123"
        );
    }

    #[test]
    fn test_classify_bad_token_meta() {
        let body = r#"{"meta":{"error_type":"OAuthAccessTokenException","error_message":"expired"}}"#;
        let err = classify_error("https://graph.instagram.com/me/media", 400, body);
        assert!(err.is_bad_token());
        assert_eq!(err.to_string(), "Instagram rejected the access token: expired");
    }

    #[test]
    fn test_classify_bad_token_graph_code() {
        let body = r#"{"error":{"message":"Invalid OAuth access token","type":"OAuthException","code":190}}"#;
        assert!(classify_error("u", 400, body).is_bad_token());
    }

    #[test]
    fn test_classify_generic_error_message() {
        let body = r#"{"error_message":"bad test request"}"#;
        let err = classify_error("https://test.test/", 400, body);
        assert!(!err.is_bad_token());
        assert_eq!(
            err.to_string(),
            "Http request to https://test.test/ failed with a status of 400 and error message: bad test request"
        );
    }

    #[test]
    fn test_classify_nested_error_message() {
        let body = r#"{"error":{"message":"bad"}}"#;
        match classify_error("u", 500, body) {
            AppError::Http {
                status, message, ..
            } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "bad");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_classify_non_json_body() {
        match classify_error("u", 502, "Bad Gateway\n") {
            AppError::Http { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_redact_url_strips_query() {
        let url = reqwest::Url::parse(
            "https://graph.instagram.com/123/media?access_token=SECRET&limit=5",
        )
        .unwrap();
        assert_eq!(redact_url(&url), "https://graph.instagram.com/123/media");
    }

    #[test]
    fn test_short_lived_token_accepts_numeric_user_id() {
        let token: ShortLivedToken =
            serde_json::from_str(r#"{"access_token":"T","user_id":17841400000000000}"#).unwrap();
        assert_eq!(token.user_id, "17841400000000000");
    }
}
