//! Server-side state of each browser session. The session cookie only
//! carries the id of its entry here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;

use crate::api::{ApiClient, RestPageSource, TokenCell};
use crate::config::SessionsConfig;
use crate::listing::{ListingService, OrderListing, ProductListing};
use crate::models::{Order, Product};
use crate::query::ProductFilter;
use crate::session::SessionState;

pub type ProductListingService = ListingService<Product, ProductFilter>;
pub type OrderListingService = ListingService<Order, ()>;

/// Everything one browser session owns: its sign-in state, its listings and
/// the bearer token those listings send.
pub struct BrowserSession {
    pub products: ProductListingService,
    pub orders: OrderListingService,
    pub token: Arc<TokenCell>,
    auth: Mutex<SessionState>,
    last_seen: Mutex<DateTime<Utc>>,
}

impl BrowserSession {
    pub fn auth_state(&self) -> SessionState {
        self.auth.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn store_auth(&self, state: SessionState) {
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn seen_at(&self, now: DateTime<Utc>) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    fn last_seen(&self) -> DateTime<Utc> {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Browser sessions by id. Entries idle longer than `idle_timeout` are
/// swept when a new one is created, and the least recently seen entry makes
/// room once `capacity` is reached.
pub struct SessionRegistry {
    client: ApiClient,
    product_url: String,
    order_url: String,
    page_size: u32,
    idle_timeout: TimeDelta,
    capacity: usize,
    entries: Mutex<HashMap<String, Arc<BrowserSession>>>,
}

impl SessionRegistry {
    pub fn new(client: ApiClient, product_url: &str, order_url: &str, page_size: u32) -> Self {
        Self {
            client,
            product_url: product_url.to_string(),
            order_url: order_url.to_string(),
            page_size,
            idle_timeout: TimeDelta::minutes(30),
            capacity: 10_000,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, limits: &SessionsConfig) -> Self {
        self.idle_timeout = TimeDelta::seconds(limits.idle_timeout_secs as i64);
        self.capacity = limits.max_entries.max(1);
        self
    }

    /// The live entry for `session_key`, if any.
    pub fn get(&self, session_key: &str, now: DateTime<Utc>) -> Option<Arc<BrowserSession>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(session_key)?.clone();
        if now - entry.last_seen() > self.idle_timeout {
            entries.remove(session_key);
            return None;
        }
        entry.seen_at(now);
        Some(entry)
    }

    pub fn get_or_create(&self, session_key: &str, now: DateTime<Utc>) -> Arc<BrowserSession> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(session_key) {
            if now - entry.last_seen() <= self.idle_timeout {
                entry.seen_at(now);
                return entry.clone();
            }
        }

        let before = entries.len();
        entries.retain(|_, entry| now - entry.last_seen() <= self.idle_timeout);
        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen())
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => entries.remove(&key),
                None => break,
            };
        }
        if entries.len() < before {
            debug!("Evicted {} browser sessions", before - entries.len());
        }

        let entry = Arc::new(self.build(now));
        entries.insert(session_key.to_string(), entry.clone());
        entry
    }

    pub fn remove(&self, session_key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(&self, now: DateTime<Utc>) -> BrowserSession {
        let token = Arc::new(TokenCell::default());
        let products = RestPageSource::products(self.client.clone(), &self.product_url, token.clone());
        let orders = RestPageSource::orders(self.client.clone(), &self.order_url, token.clone());
        BrowserSession {
            products: ListingService::new(ProductListing::products(self.page_size), Arc::new(products)),
            orders: ListingService::new(OrderListing::orders(self.page_size), Arc::new(orders)),
            token,
            auth: Mutex::new(SessionState::default()),
            last_seen: Mutex::new(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Client;

    use super::*;

    fn registry(idle_timeout_secs: u64, max_entries: usize) -> SessionRegistry {
        SessionRegistry::new(
            ApiClient::new(Client::new(), vec![]),
            "http://localhost:1",
            "http://localhost:2",
            10,
        )
        .with_limits(&SessionsConfig {
            idle_timeout_secs,
            max_entries,
        })
    }

    #[test]
    fn same_session_gets_same_entry() {
        let registry = registry(60, 10);
        let now = Utc::now();
        let a = registry.get_or_create("sid-1", now);
        let b = registry.get_or_create("sid-1", now);
        let c = registry.get_or_create("sid-2", now);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn removal_forgets_filter_state() {
        let registry = registry(60, 10);
        let now = Utc::now();
        let session = registry.get_or_create("sid-1", now);
        session
            .products
            .set_filter(ProductFilter {
                name: Some("shoe".into()),
                ..Default::default()
            })
            .await;

        assert!(registry.remove("sid-1"));
        assert!(!registry.remove("sid-1"));

        let fresh = registry.get_or_create("sid-1", now);
        assert_eq!(fresh.products.view().await.filter, ProductFilter::default());
    }

    #[test]
    fn idle_entries_are_swept() {
        let registry = registry(60, 10);
        let start = Utc::now();
        registry.get_or_create("idle", start);
        registry.get_or_create("busy", start);

        let later = start + TimeDelta::seconds(45);
        assert!(registry.get("busy", later).is_some());

        let much_later = start + TimeDelta::seconds(90);
        registry.get_or_create("new", much_later);

        assert_eq!(registry.len(), 2);
        assert!(registry.get("idle", much_later).is_none());
        assert!(registry.get("busy", much_later).is_some());
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let registry = registry(60, 10);
        let start = Utc::now();
        registry.get_or_create("sid-1", start);

        assert!(registry.get("sid-1", start + TimeDelta::seconds(61)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_seen() {
        let registry = registry(3600, 3);
        let start = Utc::now();
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            registry.get_or_create(key, start + TimeDelta::seconds(i as i64));
        }
        registry.get("a", start + TimeDelta::seconds(5));

        for i in 0..50 {
            registry.get_or_create(&format!("visitor-{i}"), start + TimeDelta::seconds(10 + i));
        }

        assert_eq!(registry.len(), 3);
        assert!(registry.get("a", start + TimeDelta::seconds(100)).is_none());
        assert!(registry.get("visitor-49", start + TimeDelta::seconds(100)).is_some());
    }
}
