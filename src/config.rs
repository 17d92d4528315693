//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup; a `.env` file is honoured for local
//! development.

use std::env;
use std::time::Duration;

pub const DEFAULT_INSTAGRAM_API_URL: &str = "https://api.instagram.com";
pub const DEFAULT_INSTAGRAM_GRAPH_URL: &str = "https://graph.instagram.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Instagram app registration ---
    /// Instagram app client ID (public)
    pub instagram_client_id: String,
    /// Instagram app client secret (not an access token)
    pub instagram_client_secret: String,
    /// Base URL for OAuth/token endpoints
    pub instagram_api_url: String,
    /// Base URL for Graph endpoints (user, media, long-lived tokens)
    pub instagram_graph_url: String,

    // --- OAuth redirect handling ---
    /// Public base URL of this service, used to build the callback URL
    pub base_url: String,
    /// Path (no leading slash) that receives the Instagram redirect
    pub auth_callback_route: String,
    /// Where the browser lands after a successful handshake
    pub success_redirect_to: String,
    /// Where the browser lands after a failed handshake
    pub failure_redirect_to: String,

    // --- Feed behaviour ---
    /// Drop videos (and all-video carousels) from feeds
    pub ignore_video: bool,
    /// Items fetched when the caller gives no limit
    pub feed_limit: usize,
    /// Per-request timeout for Instagram calls
    pub http_timeout: Duration,
    /// Address notified when a scheduled refresh fails
    pub notify_on_error: Option<String>,

    // --- Service ---
    /// Bearer token for admin and task endpoints (disabled when unset)
    pub admin_token: Option<String>,
    /// GCP project ID; Firestore is used when present
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            instagram_client_id: "TEST_CLIENT_ID".to_string(),
            instagram_client_secret: "TEST_CLIENT_SECRET".to_string(),
            instagram_api_url: DEFAULT_INSTAGRAM_API_URL.to_string(),
            instagram_graph_url: DEFAULT_INSTAGRAM_GRAPH_URL.to_string(),
            base_url: "http://test.test".to_string(),
            auth_callback_route: "instagram".to_string(),
            success_redirect_to: "/instagram-auth-success".to_string(),
            failure_redirect_to: "/instagram-auth-failure".to_string(),
            ignore_video: false,
            feed_limit: 20,
            http_timeout: Duration::from_secs(30),
            notify_on_error: None,
            admin_token: Some("test_admin_token".to_string()),
            gcp_project_id: None,
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            instagram_client_id: env::var("INSTAGRAM_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("INSTAGRAM_CLIENT_ID"))?,
            instagram_client_secret: env::var("INSTAGRAM_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("INSTAGRAM_CLIENT_SECRET"))?,
            instagram_api_url: env::var("INSTAGRAM_API_URL")
                .unwrap_or_else(|_| DEFAULT_INSTAGRAM_API_URL.to_string()),
            instagram_graph_url: env::var("INSTAGRAM_GRAPH_URL")
                .unwrap_or_else(|_| DEFAULT_INSTAGRAM_GRAPH_URL.to_string()),

            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            auth_callback_route: env::var("AUTH_CALLBACK_ROUTE")
                .map(|v| v.trim_matches('/').to_string())
                .unwrap_or_else(|_| "instagram/auth/callback".to_string()),
            success_redirect_to: env::var("SUCCESS_REDIRECT_TO")
                .unwrap_or_else(|_| "/instagram-auth-success".to_string()),
            failure_redirect_to: env::var("FAILURE_REDIRECT_TO")
                .unwrap_or_else(|_| "/instagram-auth-failure".to_string()),

            ignore_video: parse_bool("IGNORE_VIDEO")?,
            feed_limit: parse_number("FEED_LIMIT", 20)?,
            http_timeout: Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", 30)?),
            notify_on_error: optional("NOTIFY_ON_ERROR"),

            admin_token: optional("ADMIN_TOKEN"),
            gcp_project_id: optional("GCP_PROJECT_ID"),
            port: parse_number("PORT", 8080)?,
        })
    }

    /// The redirect URI registered with Instagram.
    ///
    /// Must match byte-for-byte between the authorize URL and the code
    /// exchange, so it is only ever built here.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.auth_callback_route.trim_start_matches('/')
        )
    }
}

/// Read an env var, treating blank values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(name: &'static str) -> Result<bool, ConfigError> {
    match optional(name).as_deref() {
        None => Ok(false),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("FALSE") | Some("no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid(name, other.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name, raw)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("INSTAGRAM_CLIENT_ID", "test_id");
        env::set_var("INSTAGRAM_CLIENT_SECRET", " test_secret ");
        env::set_var("IGNORE_VIDEO", "true");
        env::set_var("AUTH_CALLBACK_ROUTE", "/ig/callback/");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.instagram_client_id, "test_id");
        assert_eq!(config.instagram_client_secret, "test_secret");
        assert!(config.ignore_video);
        assert_eq!(config.auth_callback_route, "ig/callback");
        assert_eq!(config.feed_limit, 20);
    }

    #[test]
    fn test_callback_url_joins_base_and_route() {
        let config = Config {
            base_url: "https://example.com/".to_string(),
            auth_callback_route: "instagram/auth/callback".to_string(),
            ..Config::default()
        };

        assert_eq!(
            config.callback_url(),
            "https://example.com/instagram/auth/callback"
        );
    }

    #[test]
    fn test_default_callback_url() {
        assert_eq!(Config::default().callback_url(), "http://test.test/instagram");
    }
}
