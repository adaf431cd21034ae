//! services/web/src/adapters/oauth.rs
//!
//! This module contains the adapter for the Google and Facebook OAuth 2.0
//! authorization-code flows. It implements the `IdentityProvider` port from the
//! `core` crate, using `oauth2` for the code exchange and `reqwest` for the
//! profile lookup.

use crate::config::OAuthCredentials;
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, url, AuthType, AuthUrl, AuthorizationCode,
    ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use secrets_core::domain::Provider;
use secrets_core::ports::{AuthorizationRequest, IdentityProvider, PortError, PortResult};
use serde_json::Value;

//=========================================================================================
// Provider Endpoints
//=========================================================================================

/// The fixed endpoints and profile layout of one provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub profile_url: &'static str,
    /// Field of the profile JSON carrying the stable subject id.
    pub subject_field: &'static str,
    pub scopes: &'static [&'static str],
}

impl ProviderEndpoints {
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Google => Self {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                profile_url: "https://www.googleapis.com/oauth2/v3/userinfo",
                subject_field: "sub",
                scopes: &["profile"],
            },
            Provider::Facebook => Self {
                auth_url: "https://www.facebook.com/v19.0/dialog/oauth",
                token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
                profile_url: "https://graph.facebook.com/me?fields=id",
                subject_field: "id",
                scopes: &[],
            },
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityProvider` port for one OAuth provider.
#[derive(Clone)]
pub struct OAuthProvider {
    provider: Provider,
    client: BasicClient,
    http: reqwest::Client,
    endpoints: ProviderEndpoints,
}

impl OAuthProvider {
    /// Creates a new `OAuthProvider` that redirects back to `callback_url`.
    pub fn new(
        provider: Provider,
        credentials: &OAuthCredentials,
        callback_url: String,
    ) -> Result<Self, url::ParseError> {
        let endpoints = ProviderEndpoints::for_provider(provider);
        let client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            AuthUrl::new(endpoints.auth_url.to_string())?,
            Some(TokenUrl::new(endpoints.token_url.to_string())?),
        )
        // Facebook rejects HTTP basic client authentication.
        .set_auth_type(AuthType::RequestBody)
        .set_redirect_uri(RedirectUrl::new(callback_url)?);

        Ok(Self {
            provider,
            client,
            http: reqwest::Client::new(),
            endpoints,
        })
    }
}

/// Pulls the subject id out of a profile document. Facebook ids are strings,
/// but some clients serialize them as numbers.
fn subject_from_profile(profile: &Value, field: &str) -> Option<String> {
    match profile.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for OAuthProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorize_url(&self) -> AuthorizationRequest {
        let (url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.endpoints.scopes.iter().map(|s| Scope::new(s.to_string())))
            .url();

        AuthorizationRequest {
            url: url.to_string(),
            csrf_state: csrf_token.secret().clone(),
        }
    }

    async fn fetch_subject(&self, code: &str) -> PortResult<String> {
        // 1. Exchange the authorization code for an access token
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| PortError::Unexpected(format!("{} token exchange: {}", self.provider, e)))?;

        // 2. Fetch the profile with that token
        let profile: Value = self
            .http
            .get(self.endpoints.profile_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Unavailable(format!("{} profile: {}", self.provider, e)))?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("{} profile: {}", self.provider, e)))?;

        // 3. Extract the stable subject id
        subject_from_profile(&profile, self.endpoints.subject_field).ok_or_else(|| {
            PortError::Unexpected(format!(
                "{} profile has no '{}' field",
                self.provider, self.endpoints.subject_field
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
        }
    }

    #[test]
    fn google_authorize_url_requests_profile_scope() {
        let provider = OAuthProvider::new(
            Provider::Google,
            &credentials(),
            "http://localhost:3000/auth/google/secrets".to_string(),
        )
        .unwrap();
        let request = provider.authorize_url();

        let url = url::Url::parse(&request.url).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(param("client_id").as_deref(), Some("client-123"));
        assert_eq!(param("scope").as_deref(), Some("profile"));
        assert_eq!(param("response_type").as_deref(), Some("code"));
        assert_eq!(
            param("redirect_uri").as_deref(),
            Some("http://localhost:3000/auth/google/secrets")
        );
        assert_eq!(param("state"), Some(request.csrf_state.clone()));
    }

    #[test]
    fn csrf_state_is_fresh_per_request() {
        let provider = OAuthProvider::new(
            Provider::Facebook,
            &credentials(),
            "http://localhost:3000/auth/facebook/secrets".to_string(),
        )
        .unwrap();
        assert_ne!(
            provider.authorize_url().csrf_state,
            provider.authorize_url().csrf_state
        );
    }

    #[test]
    fn subject_extraction() {
        assert_eq!(
            subject_from_profile(&json!({"sub": "1089", "name": "A"}), "sub"),
            Some("1089".to_string())
        );
        assert_eq!(
            subject_from_profile(&json!({"id": 4242}), "id"),
            Some("4242".to_string())
        );
        assert_eq!(subject_from_profile(&json!({"id": ""}), "id"), None);
        assert_eq!(subject_from_profile(&json!({"name": "A"}), "sub"), None);
    }
}
