use std::str::FromStr;

use log::warn;
use serde::Deserialize;

use crate::query::ProductFilter;

/// Product search form as posted by the browser. Every field arrives as
/// text and blank inputs mean "not set".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchForm {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_quantity: Option<String>,
    pub max_quantity: Option<String>,
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn number<N: FromStr>(field: &str, value: Option<String>) -> Option<N> {
    let raw = text(value)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring non-numeric {field} filter {raw:?}");
            None
        }
    }
}

impl From<ProductSearchForm> for ProductFilter {
    fn from(form: ProductSearchForm) -> Self {
        Self {
            id: text(form.id),
            name: text(form.name),
            description: text(form.description),
            min_price: number("minPrice", form.min_price),
            max_price: number("maxPrice", form.max_price),
            min_quantity: number("minQuantity", form.min_quantity),
            max_quantity: number("maxQuantity", form.max_quantity),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageSizeForm {
    pub size: u32,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
