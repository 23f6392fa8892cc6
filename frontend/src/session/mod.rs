//! Identity session lifecycle: login, logout, bearer-token supply and the
//! role guard.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RefreshConfig;
use crate::error::{SessionError, SessionResult};

pub mod cookies;
pub mod provider;
pub mod token;

pub use cookies::{CookieStore, ResponseCookies};
pub use provider::{IdentityProvider, KeycloakProvider};
pub use token::TokenSet;

/// Role required to browse the product catalogue.
pub const CLIENT_ROLE: &str = "CLIENT";

/// Tokens expiring sooner than this are refreshed before use.
const MIN_TOKEN_VALIDITY_SECS: i64 = 5;

/// What happens once a user has been idle longer than the session timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InactivityAction {
    Logout,
    Login,
    None,
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub session_timeout: TimeDelta,
    pub on_inactivity: InactivityAction,
    pub min_validity: TimeDelta,
}

impl RefreshPolicy {
    pub fn new(session_timeout_ms: u64, on_inactivity: InactivityAction) -> Self {
        Self {
            session_timeout: TimeDelta::milliseconds(session_timeout_ms as i64),
            on_inactivity,
            min_validity: TimeDelta::seconds(MIN_TOKEN_VALIDITY_SECS),
        }
    }
}

impl From<&RefreshConfig> for RefreshPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self::new(config.session_timeout_ms, config.on_inactivity_timeout)
    }
}

/// Per-browser authentication state. It stays on the server; the browser
/// only holds the id of its entry.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    authenticated: bool,
    tokens: Option<TokenSet>,
    last_activity: Option<DateTime<Utc>>,
    pending_login: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn tokens(&self) -> Option<&TokenSet> {
        self.tokens.as_ref()
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    pub fn username(&self) -> Option<String> {
        self.tokens
            .as_ref()
            .and_then(TokenSet::claims)
            .and_then(|claims| claims.preferred_username)
    }

    fn sign_out(&mut self) -> Option<TokenSet> {
        self.authenticated = false;
        self.pending_login = None;
        self.tokens.take()
    }
}

/// Why no bearer token could be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUnavailable {
    NotAuthenticated,
    Inactive(InactivityAction),
    RefreshFailed,
}

/// Outcome of the pre-navigation role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Unauthenticated,
    Forbidden,
}

pub struct SessionGateway {
    provider: Arc<dyn IdentityProvider>,
    policy: RefreshPolicy,
    client_id: String,
    realm: String,
    cookie_domain: String,
}

impl SessionGateway {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        policy: RefreshPolicy,
        client_id: impl Into<String>,
        realm: impl Into<String>,
        cookie_domain: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            client_id: client_id.into(),
            realm: realm.into(),
            cookie_domain: cookie_domain.into(),
        }
    }

    /// Path under which the identity realm keeps its cookies.
    pub fn realm_cookie_path(&self) -> String {
        format!("/realms/{}/", self.realm)
    }

    /// Starts the interactive login flow and returns where to redirect.
    pub fn login(&self, state: &mut SessionState) -> SessionResult<Url> {
        let nonce = Uuid::new_v4().to_string();
        let url = self.provider.authorization_url(&nonce)?;
        state.pending_login = Some(nonce);
        Ok(url)
    }

    /// Finishes the login flow once the provider redirects back.
    pub async fn complete_login(
        &self,
        state: &mut SessionState,
        code: &str,
        returned_state: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<()> {
        if state.pending_login.take().as_deref() != Some(returned_state) {
            return Err(SessionError::StateMismatch);
        }
        let tokens = self.provider.exchange_code(code, now).await?;
        state.tokens = Some(tokens);
        state.authenticated = true;
        state.last_activity = Some(now);
        info!("User {} signed in", state.username().unwrap_or_default());
        Ok(())
    }

    /// Signs out locally first, then at the provider, then clears the realm
    /// cookies. The cookies go even when the provider call fails; that
    /// failure is still returned.
    pub async fn logout(
        &self,
        state: &mut SessionState,
        cookies: &mut dyn CookieStore,
    ) -> SessionResult<()> {
        let tokens = state.sign_out();
        let result = match &tokens {
            Some(tokens) => self.provider.logout(tokens).await,
            None => Ok(()),
        };
        cookies.delete_all(&self.realm_cookie_path(), &self.cookie_domain);
        result
    }

    pub fn touch(&self, state: &mut SessionState, now: DateTime<Utc>) {
        state.last_activity = Some(now);
    }

    /// Access token for outgoing API calls. Applies the inactivity policy
    /// and refreshes tokens close to expiry.
    pub async fn bearer_token(
        &self,
        state: &mut SessionState,
        now: DateTime<Utc>,
    ) -> Result<String, TokenUnavailable> {
        if !state.authenticated {
            return Err(TokenUnavailable::NotAuthenticated);
        }

        if let Some(last) = state.last_activity {
            let idle = now - last;
            if idle > self.policy.session_timeout
                && self.policy.on_inactivity != InactivityAction::None
            {
                let action = self.policy.on_inactivity;
                info!("Session idle for {}s, applying {action:?}", idle.num_seconds());
                let tokens = state.sign_out();
                if action == InactivityAction::Logout {
                    if let Some(tokens) = tokens {
                        if let Err(e) = self.provider.logout(&tokens).await {
                            warn!("Provider logout after inactivity failed: {e}");
                        }
                    }
                }
                return Err(TokenUnavailable::Inactive(action));
            }
        }

        let Some(tokens) = &state.tokens else {
            state.authenticated = false;
            return Err(TokenUnavailable::NotAuthenticated);
        };
        if !tokens.expires_within(now, self.policy.min_validity) {
            return Ok(tokens.access_token.clone());
        }

        let refreshed = match tokens.refresh_token.clone() {
            Some(refresh_token) => self.provider.refresh(&refresh_token, now).await,
            None => Err(SessionError::MissingRefreshToken),
        };
        match refreshed {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                state.tokens = Some(tokens);
                Ok(access_token)
            }
            Err(e) => {
                warn!("Token refresh failed, signing out: {e}");
                state.sign_out();
                Err(TokenUnavailable::RefreshFailed)
            }
        }
    }

    /// Route guard: the session must be authenticated and carry `role`.
    pub fn require_role(&self, state: &SessionState, role: &str) -> GuardDecision {
        if !state.authenticated {
            return GuardDecision::Unauthenticated;
        }
        let granted = state
            .tokens
            .as_ref()
            .and_then(TokenSet::claims)
            .is_some_and(|claims| claims.has_role(role, &self.client_id));
        if granted {
            GuardDecision::Allow
        } else {
            GuardDecision::Forbidden
        }
    }
}
