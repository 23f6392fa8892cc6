//! Configuration model loaded from `config/*.yaml` and `APP__*` variables.

use std::path::Path;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::session::InactivityAction;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Signing key material for the session cookie, at least 64 bytes.
    pub secret: String,
    pub templates_dir: String,
    pub product_url: String,
    pub order_url: String,
    /// Public origin of this storefront, e.g. `http://localhost:4200`.
    pub app_origin: String,
    pub default_page_size: u32,
    pub identity: IdentityConfig,
    pub bearer: BearerConfig,
    pub refresh: RefreshConfig,
    pub sessions: SessionsConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IdentityConfig {
    pub url: String,
    pub realm: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    /// Cookies the identity realm may leave on this origin.
    #[serde(default)]
    pub realm_cookie_names: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BearerConfig {
    pub url_pattern: String,
    pub methods: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RefreshConfig {
    pub session_timeout_ms: u64,
    pub on_inactivity_timeout: InactivityAction,
}

/// Bounds on the server-side per-browser state.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub max_entries: usize,
}

fn file_layers(config_dir: &Path, app_env: &str) -> ConfigBuilder<DefaultState> {
    Config::builder()
        .add_source(File::from(config_dir.join("default")))
        .add_source(File::from(config_dir.join(app_env)).required(false))
}

/// Loads `default.yaml`, then `{app_env}.yaml` if present, then `APP__*`
/// environment variables (`APP__IDENTITY__REALM` sets `identity.realm`).
pub fn load(config_dir: &Path, app_env: &str) -> Result<ServerConfig, ConfigError> {
    file_layers(config_dir, app_env)
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

impl ServerConfig {
    /// Host part of `app_origin`, used as the domain of cookies cleared on
    /// logout.
    pub fn cookie_domain(&self) -> String {
        reqwest::Url::parse(&self.app_origin)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string())
    }
}
