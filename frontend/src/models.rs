use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One fetched slice of a server-side result set, as returned by the
/// Spring Data backends.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub size: u32,
    /// Zero-based index of this page.
    pub number: u32,
    pub number_of_elements: u32,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageInvariantError {
    #[error("numberOfElements is {declared} but content holds {actual} items")]
    ElementCount { declared: u32, actual: usize },
    #[error("empty flag is {flag} but numberOfElements is {count}")]
    EmptyFlag { flag: bool, count: u32 },
    #[error("page number {number} is outside 0..{total_pages}")]
    NumberOutOfRange { number: u32, total_pages: u32 },
}

impl<T> Page<T> {
    pub fn check_invariants(&self) -> Result<(), PageInvariantError> {
        if self.number_of_elements as usize != self.content.len() {
            return Err(PageInvariantError::ElementCount {
                declared: self.number_of_elements,
                actual: self.content.len(),
            });
        }
        if self.empty != (self.number_of_elements == 0) {
            return Err(PageInvariantError::EmptyFlag {
                flag: self.empty,
                count: self.number_of_elements,
            });
        }
        if self.total_pages > 0 && self.number >= self.total_pages {
            return Err(PageInvariantError::NumberOutOfRange {
                number: self.number,
                total_pages: self.total_pages,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// The catalogue allows products without a price or stock count.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Workflow states of an order, in workflow order. The client never
/// transitions them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    New,
    Processing,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_date: NaiveDate,
    pub order_state: OrderState,
    #[serde(default)]
    pub products: Vec<Product>,
}

pub type ProductPage = Page<Product>;
pub type OrderPage = Page<Order>;

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(content: Vec<u8>, number: u32, total_pages: u32) -> Page<u8> {
        let n = content.len() as u32;
        Page {
            content,
            total_pages,
            total_elements: n as u64,
            size: 10,
            number,
            number_of_elements: n,
            first: number == 0,
            last: number + 1 >= total_pages,
            empty: n == 0,
        }
    }

    #[test]
    fn parses_spring_product_page() {
        let raw = r#"{
            "content": [{
                "id": "1f0a3b4c-8d2e-6f10-9a7b-0242ac120002",
                "name": "Running shoe",
                "description": null,
                "price": 59.9,
                "quantity": 12
            }],
            "pageable": {"pageNumber": 0, "pageSize": 10},
            "totalPages": 1,
            "totalElements": 1,
            "size": 10,
            "number": 0,
            "numberOfElements": 1,
            "first": true,
            "last": true,
            "empty": false
        }"#;

        let page: ProductPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].name, "Running shoe");
        assert_eq!(page.content[0].description, None);
        assert!(page.check_invariants().is_ok());
    }

    #[test]
    fn product_without_price_or_quantity_still_decodes() {
        let raw = r#"{
            "id": "1f0a3b4c-8d2e-6f10-9a7b-0242ac120002",
            "name": "Gift card",
            "description": "Any amount",
            "price": null,
            "quantity": null
        }"#;

        let product: Product = serde_json::from_str(raw).unwrap();
        assert_eq!(product.price, None);
        assert_eq!(product.quantity, None);

        let product: Product = serde_json::from_str(
            r#"{"id": "1f0a3b4c-8d2e-6f10-9a7b-0242ac120002", "name": "Voucher", "quantity": -2}"#,
        )
        .unwrap();
        assert_eq!(product.price, None);
        assert_eq!(product.quantity, Some(-2));
    }

    #[test]
    fn unknown_order_state_is_rejected() {
        let raw = r#"{"id": 7, "orderDate": "2025-03-14", "orderState": "PENDING"}"#;
        assert!(serde_json::from_str::<Order>(raw).is_err());
    }

    #[test]
    fn parses_orders_with_upper_case_state() {
        let raw = r#"{
            "id": 7,
            "orderDate": "2025-03-14",
            "orderState": "PROCESSING"
        }"#;

        let order: Order = serde_json::from_str(raw).unwrap();
        assert_eq!(order.order_state, OrderState::Processing);
        assert_eq!(order.order_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert!(order.products.is_empty());
    }

    #[test]
    fn order_states_follow_workflow_order() {
        assert!(OrderState::New < OrderState::Processing);
        assert!(OrderState::Processing < OrderState::Delivered);
        assert!(OrderState::Delivered < OrderState::Cancelled);
    }

    #[test]
    fn empty_page_with_zero_total_pages_is_consistent() {
        assert!(page_of(vec![], 0, 0).check_invariants().is_ok());
    }

    #[test]
    fn rejects_mismatched_element_count() {
        let mut page = page_of(vec![1, 2], 0, 1);
        page.number_of_elements = 3;
        assert_eq!(
            page.check_invariants(),
            Err(PageInvariantError::ElementCount {
                declared: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn rejects_wrong_empty_flag() {
        let mut page = page_of(vec![1], 0, 1);
        page.empty = true;
        assert!(matches!(
            page.check_invariants(),
            Err(PageInvariantError::EmptyFlag { .. })
        ));
    }

    #[test]
    fn rejects_number_past_last_page() {
        let page = page_of(vec![1], 3, 2);
        assert!(matches!(
            page.check_invariants(),
            Err(PageInvariantError::NumberOutOfRange { .. })
        ));
    }
}
