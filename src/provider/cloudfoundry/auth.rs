//! # UAA Authentication
//!
//! Password-grant tokens for the CF API. The token endpoint is discovered
//! from the `login` link of the API root document on first use. A token is
//! reused until [`TOKEN_EXPIRY_MARGIN_SECS`] before it expires.

use super::types::{RootInfo, TokenResponse};
use crate::constants::TOKEN_EXPIRY_MARGIN_SECS;
use crate::observability::metrics::increment_token_refreshes;
use crate::provider::{ApiError, ApiResult};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Tokens without `expires_in` are assumed to live this long
const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

/// CF user credentials, wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

struct CachedToken {
    value: Zeroizing<String>,
    refresh_at: Instant,
}

/// Lazily fetched, shared bearer token
pub struct TokenProvider {
    http: reqwest::Client,
    api_endpoint: String,
    credentials: Credentials,
    token_url: Mutex<Option<String>>,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("api_endpoint", &self.api_endpoint)
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, api_endpoint: &str, credentials: Credentials) -> Self {
        Self {
            http,
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            credentials,
            token_url: Mutex::new(None),
            cached: Mutex::new(None),
        }
    }

    /// Current token, fetching a new one when none is cached or it is about to expire
    pub async fn token(&self) -> ApiResult<Zeroizing<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }
        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop `rejected` so the next [`token`](Self::token) call fetches a new one
    ///
    /// A token refreshed concurrently by another caller is kept.
    pub async fn invalidate(&self, rejected: &str) {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|t| t.value.as_str() == rejected) {
            debug!("Discarding rejected CF token");
            *cached = None;
        }
    }

    async fn token_url(&self) -> ApiResult<String> {
        let mut url = self.token_url.lock().await;
        if let Some(url) = url.as_ref() {
            return Ok(url.clone());
        }
        let response = self
            .http
            .get(format!("{}/", self.api_endpoint))
            .send()
            .await
            .map_err(super::transport_error)?;
        let root: RootInfo = super::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| super::decode_error("API root", &e))?;
        let login = root
            .links
            .login
            .or(root.links.uaa)
            .ok_or_else(|| ApiError::Permanent {
                message: format!("{} does not advertise a login endpoint", self.api_endpoint),
                status: None,
            })?;
        let discovered = format!(
            "{}{}",
            login.href.trim_end_matches('/'),
            paths::uaa::token()
        );
        info!("Discovered UAA token endpoint {}", discovered);
        *url = Some(discovered.clone());
        Ok(discovered)
    }

    async fn fetch(&self) -> ApiResult<CachedToken> {
        let url = self.token_url().await?;
        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        let response = self
            .http
            .post(&url)
            .basic_auth(paths::uaa::DEFAULT_CLIENT_ID, Some(""))
            .form(&form)
            .send()
            .await
            .map_err(super::transport_error)?;
        let response = super::check_status(response).await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| super::decode_error("token response", &e))?;

        increment_token_refreshes();
        let ttl = body.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        debug!("Fetched CF token valid for {}s", ttl);
        Ok(CachedToken {
            value: Zeroizing::new(body.access_token),
            refresh_at: Instant::now() + refresh_after(ttl),
        })
    }
}

/// Time after which a token with the given lifetime is refreshed
fn refresh_after(ttl_secs: u64) -> Duration {
    Duration::from_secs(ttl_secs.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_margin() {
        assert_eq!(refresh_after(3600), Duration::from_secs(3570));
        assert_eq!(refresh_after(10), Duration::ZERO);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "admin@example.com".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("admin@example.com"));
        assert!(!printed.contains("hunter2"));
    }
}
