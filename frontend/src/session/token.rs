use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Tokens issued to this browser session by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// True when the access token is already expired or will be within
    /// `window`.
    pub fn expires_within(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.expires_at - now <= window
    }

    pub fn claims(&self) -> Option<AccessClaims> {
        decode_claims(&self.access_token)
    }
}

/// Body of a successful OpenID Connect token endpoint call.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl TokenResponse {
    pub fn into_token_set(self, now: DateTime<Utc>) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            expires_at: now + TimeDelta::seconds(self.expires_in),
            // Keycloak reports 0 for offline tokens.
            refresh_expires_at: self
                .refresh_expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + TimeDelta::seconds(secs)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleSet {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The access-token claims the storefront reads. The signature is not
/// checked here; the backends verify every token they receive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub realm_access: Option<RoleSet>,
    #[serde(default)]
    pub resource_access: HashMap<String, RoleSet>,
}

impl AccessClaims {
    /// Checks realm roles and the roles granted to `client_id`.
    pub fn has_role(&self, role: &str, client_id: &str) -> bool {
        let realm = self
            .realm_access
            .as_ref()
            .is_some_and(|access| access.roles.iter().any(|r| r == role));
        let client = self
            .resource_access
            .get(client_id)
            .is_some_and(|access| access.roles.iter().any(|r| r == role));
        realm || client
    }
}

pub fn decode_claims(token: &str) -> Option<AccessClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::{Value, json};

    use super::*;

    pub(crate) fn unsigned_token(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn reads_realm_and_client_roles() {
        let token = unsigned_token(json!({
            "preferred_username": "amina",
            "realm_access": {"roles": ["CLIENT", "offline_access"]},
            "resource_access": {"e-com-ui_client": {"roles": ["ADMIN"]}}
        }));
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.preferred_username.as_deref(), Some("amina"));
        assert!(claims.has_role("CLIENT", "e-com-ui_client"));
        assert!(claims.has_role("ADMIN", "e-com-ui_client"));
        assert!(!claims.has_role("ADMIN", "another-client"));
        assert!(!claims.has_role("MANAGER", "e-com-ui_client"));
    }

    #[test]
    fn missing_role_claims_grant_nothing() {
        let claims = decode_claims(&unsigned_token(json!({"sub": "42"}))).unwrap();
        assert!(!claims.has_role("CLIENT", "e-com-ui_client"));
    }

    #[test]
    fn garbage_tokens_have_no_claims() {
        assert!(decode_claims("not-a-jwt").is_none());
        assert!(decode_claims("a.%%%.c").is_none());
    }

    #[test]
    fn token_response_sets_absolute_expiry() {
        let now = Utc::now();
        let set = TokenResponse {
            access_token: "a".into(),
            expires_in: 300,
            refresh_token: Some("r".into()),
            refresh_expires_in: Some(0),
            id_token: None,
        }
        .into_token_set(now);

        assert_eq!(set.expires_at, now + TimeDelta::seconds(300));
        assert_eq!(set.refresh_expires_at, None);
        assert!(!set.expires_within(now, TimeDelta::seconds(5)));
        assert!(set.expires_within(now + TimeDelta::seconds(296), TimeDelta::seconds(5)));
    }
}
