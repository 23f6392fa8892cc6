//! Backend access: the bearer-token interceptor and the REST page sources.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::config::BearerConfig;
use crate::error::FetchError;
use crate::listing::PageSource;
use crate::models::{Order, Page, Product};
use crate::query::QueryParams;

/// Which requests get an `Authorization: Bearer` header: URLs under
/// `origin` (case-insensitive) sent with one of `methods`.
#[derive(Debug, Clone)]
pub struct BearerRule {
    origin: String,
    methods: Vec<Method>,
}

impl BearerRule {
    pub fn new(origin: &str, methods: Vec<Method>) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_ascii_lowercase(),
            methods,
        }
    }

    pub fn matches(&self, method: &Method, url: &str) -> bool {
        if !self.methods.contains(method) {
            return false;
        }
        match url.to_ascii_lowercase().strip_prefix(&self.origin) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl From<&BearerConfig> for BearerRule {
    fn from(config: &BearerConfig) -> Self {
        let methods = config
            .methods
            .iter()
            .filter_map(|name| match Method::from_bytes(name.to_ascii_uppercase().as_bytes()) {
                Ok(method) => Some(method),
                Err(_) => {
                    warn!("Ignoring unknown HTTP method {name:?} in bearer config");
                    None
                }
            })
            .collect();
        Self::new(&config.url_pattern, methods)
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// Token resolved for one browser session by the request currently
/// handling it.
#[derive(Debug, Default)]
pub struct TokenCell(RwLock<Option<String>>);

impl TokenCell {
    pub async fn set(&self, token: Option<String>) {
        *self.0.write().await = token;
    }
}

#[async_trait]
impl TokenSource for TokenCell {
    async fn bearer_token(&self) -> Option<String> {
        self.0.read().await.clone()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    rules: Arc<Vec<BearerRule>>,
}

impl ApiClient {
    pub fn new(http: Client, rules: Vec<BearerRule>) -> Self {
        Self {
            http,
            rules: Arc::new(rules),
        }
    }

    fn wants_bearer(&self, method: &Method, url: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(method, url))
    }

    pub async fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        params: &QueryParams,
        tokens: &dyn TokenSource,
    ) -> Result<R, FetchError> {
        let mut request = self.http.get(url).query(params.pairs());
        if self.wants_bearer(&Method::GET, url) {
            if let Some(token) = tokens.bearer_token().await {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<R>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(FetchError::Status { status, body })
        }
    }
}

/// A listing endpoint answering with Spring `Page` documents.
pub struct RestPageSource<T> {
    client: ApiClient,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestPageSource<T> {
    pub fn new(client: ApiClient, endpoint: String, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            endpoint,
            tokens,
            _item: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RestPageSource<Product> {
    pub fn products(client: ApiClient, base_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        let endpoint = format!("{}/api/products/search", base_url.trim_end_matches('/'));
        Self::new(client, endpoint, tokens)
    }
}

impl RestPageSource<Order> {
    pub fn orders(client: ApiClient, base_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        let endpoint = format!("{}/api/orders", base_url.trim_end_matches('/'));
        Self::new(client, endpoint, tokens)
    }
}

#[async_trait]
impl<T> PageSource<T> for RestPageSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, params: &QueryParams) -> Result<Page<T>, FetchError> {
        let page: Page<T> = self
            .client
            .get_json(&self.endpoint, params, self.tokens.as_ref())
            .await?;
        page.check_invariants()?;
        debug!(
            "Fetched page {} of {} from {} ({} items)",
            page.number + 1,
            page.total_pages,
            self.endpoint,
            page.number_of_elements
        );
        Ok(page)
    }
}
