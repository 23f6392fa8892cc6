use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{Client, Response, Url};

use crate::config::IdentityConfig;
use crate::error::{SessionError, SessionResult};
use crate::session::token::{TokenResponse, TokenSet};

/// The external identity provider, reduced to what the storefront needs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to sign in. `state` comes back on the
    /// callback unchanged.
    fn authorization_url(&self, state: &str) -> SessionResult<Url>;

    async fn exchange_code(&self, code: &str, now: DateTime<Utc>) -> SessionResult<TokenSet>;

    async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> SessionResult<TokenSet>;

    async fn logout(&self, tokens: &TokenSet) -> SessionResult<()>;
}

/// Keycloak realm reached through its OpenID Connect endpoints.
pub struct KeycloakProvider {
    http: Client,
    endpoint_base: String,
    client_id: String,
    redirect_uri: String,
}

impl KeycloakProvider {
    pub fn new(http: Client, config: &IdentityConfig) -> Self {
        Self {
            http,
            endpoint_base: format!(
                "{}/realms/{}/protocol/openid-connect",
                config.url.trim_end_matches('/'),
                config.realm
            ),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    async fn token_request(
        &self,
        form: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> SessionResult<TokenSet> {
        let response = self
            .http
            .post(format!("{}/token", self.endpoint_base))
            .form(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let tokens = response.json::<TokenResponse>().await?;
        Ok(tokens.into_token_set(now))
    }
}

async fn ensure_success(response: Response) -> SessionResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(SessionError::ProviderStatus { status, body })
    }
}

#[async_trait]
impl IdentityProvider for KeycloakProvider {
    fn authorization_url(&self, state: &str) -> SessionResult<Url> {
        Url::parse_with_params(
            &format!("{}/auth", self.endpoint_base),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid"),
                ("state", state),
            ],
        )
        .map_err(|e| SessionError::InvalidUrl(e.to_string()))
    }

    async fn exchange_code(&self, code: &str, now: DateTime<Utc>) -> SessionResult<TokenSet> {
        debug!("Exchanging authorization code with {}", self.endpoint_base);
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
            now,
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> SessionResult<TokenSet> {
        debug!("Refreshing access token");
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ],
            now,
        )
        .await
    }

    async fn logout(&self, tokens: &TokenSet) -> SessionResult<()> {
        let mut form = vec![("client_id", self.client_id.as_str())];
        if let Some(refresh_token) = &tokens.refresh_token {
            form.push(("refresh_token", refresh_token.as_str()));
        }
        let response = self
            .http
            .post(format!("{}/logout", self.endpoint_base))
            .form(&form)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
