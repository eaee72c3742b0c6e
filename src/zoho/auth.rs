//! Authorization header providers for Zoho API calls.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{Error, Result};

/// Refresh this long before the upstream expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
/// Upper bound on a server-reported token lifetime.
const MAX_EXPIRES_IN_SECS: i64 = 86_400;

/// Source of credentials for upstream requests.
#[async_trait]
pub trait Authorizer: Send + Sync {
  /// Headers carrying a credential valid at call time.
  async fn authorized_headers(&self) -> Result<HeaderMap>;

  /// Release anything held by the authorizer. Called once at shutdown.
  async fn close(&self) {}
}

fn auth_headers(token: &str, endpoint: &str) -> Result<HeaderMap> {
  let mut value = HeaderValue::from_str(&format!("Zoho-oauthtoken {}", token))
    .map_err(|e| Error::upstream(endpoint, None, format!("access token is not a valid header: {}", e)))?;
  value.set_sensitive(true);

  let mut headers = HeaderMap::new();
  headers.insert(AUTHORIZATION, value);
  Ok(headers)
}

/// Fixed access token, e.g. from `ZOHO_ACCESS_TOKEN`.
pub struct StaticToken {
  token: String,
}

impl StaticToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self {
      token: token.into(),
    }
  }
}

#[async_trait]
impl Authorizer for StaticToken {
  async fn authorized_headers(&self) -> Result<HeaderMap> {
    auth_headers(&self.token, "static token")
  }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: Option<String>,
  expires_in: Option<i64>,
  error: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
  access_token: String,
  expires_at: DateTime<Utc>,
}

/// OAuth2 refresh-token flow against the Zoho accounts server.
///
/// The access token is reused until shortly before it expires.
pub struct OAuthRefresher {
  http: reqwest::Client,
  token_url: Url,
  client_id: String,
  client_secret: String,
  refresh_token: String,
  cached: Mutex<Option<CachedToken>>,
}

impl OAuthRefresher {
  pub fn new(
    http: reqwest::Client,
    accounts_url: &Url,
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    refresh_token: impl Into<String>,
  ) -> Result<Self> {
    let token_url = accounts_url
      .join("oauth/v2/token")
      .map_err(|e| Error::upstream(accounts_url.as_str(), None, format!("invalid accounts URL: {}", e)))?;

    Ok(Self {
      http,
      token_url,
      client_id: client_id.into(),
      client_secret: client_secret.into(),
      refresh_token: refresh_token.into(),
      cached: Mutex::new(None),
    })
  }

  async fn refresh(&self) -> Result<CachedToken> {
    let endpoint = self.token_url.as_str();
    tracing::debug!(endpoint, "refreshing Zoho access token");

    let response = self
      .http
      .post(self.token_url.clone())
      .form(&[
        ("grant_type", "refresh_token"),
        ("client_id", self.client_id.as_str()),
        ("client_secret", self.client_secret.as_str()),
        ("refresh_token", self.refresh_token.as_str()),
      ])
      .send()
      .await
      .map_err(|e| Error::upstream(endpoint, e.status().map(|s| s.as_u16()), e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::upstream(endpoint, Some(status.as_u16()), body));
    }

    let body: TokenResponse = response
      .json()
      .await
      .map_err(|e| Error::upstream(endpoint, Some(status.as_u16()), format!("malformed token response: {}", e)))?;

    // Zoho reports some failures as 200 with an `error` field
    let access_token = match (body.access_token, body.error) {
      (Some(token), None) => token,
      (_, Some(error)) => return Err(Error::upstream(endpoint, Some(status.as_u16()), error)),
      (None, None) => {
        return Err(Error::upstream(
          endpoint,
          Some(status.as_u16()),
          "token response has no access_token",
        ))
      }
    };

    let lifetime = body
      .expires_in
      .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
      .clamp(0, MAX_EXPIRES_IN_SECS)
      .saturating_sub(EXPIRY_MARGIN_SECS)
      .max(0);
    let expires_at = Duration::try_seconds(lifetime)
      .and_then(|ttl| Utc::now().checked_add_signed(ttl))
      .ok_or_else(|| {
        Error::upstream(
          endpoint,
          Some(status.as_u16()),
          format!("token lifetime out of range: {}s", lifetime),
        )
      })?;

    Ok(CachedToken {
      access_token,
      expires_at,
    })
  }
}

#[async_trait]
impl Authorizer for OAuthRefresher {
  async fn authorized_headers(&self) -> Result<HeaderMap> {
    let mut cached = self.cached.lock().await;

    let token = match cached.as_ref() {
      Some(token) if token.expires_at > Utc::now() => token.clone(),
      _ => {
        let token = self.refresh().await?;
        *cached = Some(token.clone());
        token
      }
    };

    auth_headers(&token.access_token, self.token_url.as_str())
  }

  async fn close(&self) {
    self.cached.lock().await.take();
    tracing::debug!("dropped cached Zoho access token");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;
  use serde_json::json;

  fn refresher(server: &MockServer) -> OAuthRefresher {
    let accounts = Url::parse(&server.base_url()).unwrap();
    OAuthRefresher::new(reqwest::Client::new(), &accounts, "cid", "secret", "refresh").unwrap()
  }

  #[tokio::test]
  async fn test_static_token_header() {
    let headers = StaticToken::new("abc").authorized_headers().await.unwrap();
    assert_eq!(headers[AUTHORIZATION], "Zoho-oauthtoken abc");
    assert!(headers[AUTHORIZATION].is_sensitive());
  }

  #[tokio::test]
  async fn test_refresh_token_is_reused() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when
        .method(POST)
        .path("/oauth/v2/token")
        .form_urlencoded_tuple("grant_type", "refresh_token")
        .form_urlencoded_tuple("refresh_token", "refresh");
      then
        .status(200)
        .json_body(json!({"access_token": "tok-1", "expires_in": 3600}));
    });

    let auth = refresher(&server);
    let first = auth.authorized_headers().await.unwrap();
    let second = auth.authorized_headers().await.unwrap();

    assert_eq!(first[AUTHORIZATION], "Zoho-oauthtoken tok-1");
    assert_eq!(second[AUTHORIZATION], "Zoho-oauthtoken tok-1");
    assert_eq!(mock.calls(), 1);
  }

  #[tokio::test]
  async fn test_expired_token_is_refreshed() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when.method(POST).path("/oauth/v2/token");
      // Shorter than the safety margin, so every call refreshes
      then
        .status(200)
        .json_body(json!({"access_token": "tok-short", "expires_in": 30}));
    });

    let auth = refresher(&server);
    auth.authorized_headers().await.unwrap();
    auth.authorized_headers().await.unwrap();
    assert_eq!(mock.calls(), 2);
  }

  #[tokio::test]
  async fn test_huge_expires_in_is_clamped() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when.method(POST).path("/oauth/v2/token");
      then
        .status(200)
        .json_body(json!({"access_token": "tok-long", "expires_in": i64::MAX}));
    });

    let auth = refresher(&server);
    let headers = auth.authorized_headers().await.unwrap();
    assert_eq!(headers[AUTHORIZATION], "Zoho-oauthtoken tok-long");
    auth.authorized_headers().await.unwrap();
    assert_eq!(mock.calls(), 1);
  }

  #[tokio::test]
  async fn test_negative_expires_in_refreshes_every_call() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when.method(POST).path("/oauth/v2/token");
      then
        .status(200)
        .json_body(json!({"access_token": "tok-neg", "expires_in": i64::MIN}));
    });

    let auth = refresher(&server);
    auth.authorized_headers().await.unwrap();
    auth.authorized_headers().await.unwrap();
    assert_eq!(mock.calls(), 2);
  }

  #[tokio::test]
  async fn test_error_field_is_upstream_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(POST).path("/oauth/v2/token");
      then.status(200).json_body(json!({"error": "invalid_code"}));
    });

    let err = refresher(&server).authorized_headers().await.unwrap_err();
    match err {
      Error::Upstream {
        status, message, ..
      } => {
        assert_eq!(status, Some(200));
        assert_eq!(message, "invalid_code");
      }
      other => panic!("expected upstream error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_non_success_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(POST).path("/oauth/v2/token");
      then.status(401).body("unauthorized");
    });

    let err = refresher(&server).authorized_headers().await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: Some(401), .. }));
  }
}
