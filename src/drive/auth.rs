//! OAuth 2.0 authorization-code flow against the storage provider
//! Author: kartik4091
//! Created: 2025-06-14

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::token::TokenStore;
use crate::config::OAuthSettings;
use crate::error::{AuthError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Tokens this close to expiry are refreshed before use
const EXPIRY_THRESHOLD_SECS: i64 = 60;

/// Access and refresh tokens as persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

impl TokenSet {
    /// True when the token expires within `threshold_seconds`; tokens
    /// without an expiry never expire
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + chrono::Duration::seconds(threshold_seconds) >= expires_at,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(bearer),
            expires_at: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            scope: response.scope,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Consent URL, code exchange and refresh for one client registration
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    settings: OAuthSettings,
    http: Client,
}

impl OAuthFlow {
    pub fn new(settings: OAuthSettings) -> Result<Self> {
        settings.require_client()?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AuthError::Request)?;
        Ok(Self { settings, http })
    }

    /// Browser URL asking the user to grant access
    pub fn authorization_url(&self, state: &str) -> String {
        let scope = self.settings.scopes.join(" ");
        let params = [
            ("response_type", "code"),
            ("client_id", self.settings.client_id.as_str()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.settings.auth_uri, query)
    }

    /// Accepts either the full redirect URL or the bare code
    pub fn code_from_redirect(input: &str) -> Result<String> {
        let input = input.trim();
        let Ok(url) = Url::parse(input) else {
            if input.is_empty() {
                return Err(AuthError::MissingCode.into());
            }
            return Ok(input.to_string());
        };

        let mut code = None;
        let mut error = None;
        let mut description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(AuthError::Provider { error, description }.into());
        }
        code.filter(|c| !c.is_empty()).ok_or_else(|| AuthError::MissingCode.into())
    }

    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", self.settings.client_id.clone()),
            ("redirect_uri", self.settings.redirect_uri.clone()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let token = self.token_request(&form).await?;
        info!("🔑 Authorization code exchanged");
        Ok(token)
    }

    /// New access token; the old refresh token is kept when none is returned
    #[instrument(skip(self, current))]
    pub async fn refresh(&self, current: &TokenSet) -> Result<TokenSet> {
        let refresh_token = current
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
            ("client_id", self.settings.client_id.clone()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let mut token = self.token_request(&form).await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }
        debug!("Access token refreshed");
        Ok(token)
    }

    /// Stored token, refreshed and persisted again when close to expiry
    pub async fn valid_token(&self, store: &TokenStore) -> Result<TokenSet> {
        let token = store.load().await?.ok_or(AuthError::NotLoggedIn)?;
        if !token.is_expired(EXPIRY_THRESHOLD_SECS) {
            return Ok(token);
        }
        let refreshed = self.refresh(&token).await?;
        store.save(&refreshed).await?;
        Ok(refreshed)
    }

    async fn token_request(&self, form: &[(&str, String)]) -> Result<TokenSet> {
        let response = self
            .http
            .post(&self.settings.token_uri)
            .form(form)
            .send()
            .await
            .map_err(AuthError::Request)?;

        let status = response.status();
        let text = response.text().await.map_err(AuthError::Request)?;
        if !status.is_success() {
            let err = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(body) => AuthError::Provider { error: body.error, description: body.error_description },
                Err(_) => AuthError::Provider { error: format!("http_{}", status.as_u16()), description: Some(text) },
            };
            return Err(err.into());
        }

        let response: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::Provider { error: "invalid_response".into(), description: Some(e.to_string()) })?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mockito::Matcher;

    fn settings(token_uri: String) -> OAuthSettings {
        OAuthSettings {
            client_id: "client-1".into(),
            client_secret: Some("secret-1".into()),
            token_uri,
            ..OAuthSettings::default()
        }
    }

    #[test]
    fn authorization_url_carries_offline_consent() {
        let flow = OAuthFlow::new(settings("http://localhost/token".into())).unwrap();
        let url = flow.authorization_url("xyz");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2F"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fdrive.file"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn missing_client_id_is_a_config_error() {
        let err = OAuthFlow::new(OAuthSettings::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn code_is_taken_from_redirect_url() {
        let code = OAuthFlow::code_from_redirect("http://localhost:8080/?state=s&code=4%2F0Abc&scope=x").unwrap();
        assert_eq!(code, "4/0Abc");
        assert_eq!(OAuthFlow::code_from_redirect("  4/0Abc ").unwrap(), "4/0Abc");
        assert!(matches!(
            OAuthFlow::code_from_redirect("http://localhost:8080/?state=s"),
            Err(Error::AuthError(AuthError::MissingCode))
        ));
        assert!(matches!(
            OAuthFlow::code_from_redirect("http://localhost:8080/?error=access_denied"),
            Err(Error::AuthError(AuthError::Provider { .. }))
        ));
    }

    #[test]
    fn expiry_uses_threshold() {
        let mut token = TokenSet {
            access_token: "a".into(),
            refresh_token: None,
            token_type: bearer(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(30)),
            scope: None,
        };
        assert!(token.is_expired(60));
        assert!(!token.is_expired(0));
        token.expires_at = None;
        assert!(!token.is_expired(3600));
    }

    #[tokio::test]
    async fn exchange_posts_form_and_parses_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "at", "refresh_token": "rt", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let flow = OAuthFlow::new(settings(format!("{}/token", server.url()))).unwrap();
        let token = flow.exchange_code("the-code").await.unwrap();

        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
        assert!(!token.is_expired(60));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
            .with_status(200)
            .with_body(r#"{"access_token": "at-2", "expires_in": 3599}"#)
            .create_async()
            .await;

        let flow = OAuthFlow::new(settings(format!("{}/token", server.url()))).unwrap();
        let current = TokenSet {
            access_token: "at-1".into(),
            refresh_token: Some("rt-1".into()),
            token_type: bearer(),
            expires_at: None,
            scope: None,
        };
        let token = flow.refresh(&current).await.unwrap();
        assert_eq!(token.access_token, "at-2");
        assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));
    }

    #[tokio::test]
    async fn provider_errors_are_mapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#)
            .create_async()
            .await;

        let flow = OAuthFlow::new(settings(format!("{}/token", server.url()))).unwrap();
        let err = flow.exchange_code("stale").await.unwrap_err();
        match err {
            Error::AuthError(AuthError::Provider { error, description }) => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description.as_deref(), Some("Bad Request"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails_fast() {
        let flow = OAuthFlow::new(settings("http://127.0.0.1:9/token".into())).unwrap();
        let token = TokenSet {
            access_token: "a".into(),
            refresh_token: None,
            token_type: bearer(),
            expires_at: None,
            scope: None,
        };
        assert!(matches!(
            flow.refresh(&token).await,
            Err(Error::AuthError(AuthError::NoRefreshToken))
        ));
    }
}
