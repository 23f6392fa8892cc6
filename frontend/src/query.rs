//! Query-parameter state shared by the listing views.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const PAGE_KEY: &str = "page";
pub const SIZE_KEY: &str = "size";

/// Insertion-ordered set of query parameters. Each key appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, overwriting in place when it is already present.
    pub fn set(&mut self, key: &str, value: impl Display) {
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    /// Sets `key` only when a value is present. `None` leaves the set untouched.
    pub fn set_if_present<V: Display>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Search constraints a listing contributes to its query.
pub trait ListingFilter: Clone + Default + Serialize + Send + Sync + 'static {
    fn apply(&self, params: &mut QueryParams);
}

/// Orders carry no filter fields; only `page` and `size` are sent.
impl ListingFilter for () {
    fn apply(&self, _params: &mut QueryParams) {}
}

/// Optional constraints understood by `/api/products/search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_quantity: Option<u32>,
    pub max_quantity: Option<u32>,
}

impl ListingFilter for ProductFilter {
    fn apply(&self, params: &mut QueryParams) {
        params.set_if_present("id", self.id.as_deref());
        params.set_if_present("name", self.name.as_deref());
        params.set_if_present("description", self.description.as_deref());
        params.set_if_present("minPrice", self.min_price);
        params.set_if_present("maxPrice", self.max_price);
        params.set_if_present("minQuantity", self.min_quantity);
        params.set_if_present("maxQuantity", self.max_quantity);
    }
}
