use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::http::header;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use reqwest::Method;
use serde_json::json;

use ecom_ui::api::{ApiClient, BearerRule, RestPageSource, TokenCell};
use ecom_ui::error::FetchError;
use ecom_ui::listing::{FetchOutcome, ListingService, OrderListing, PageSource};
use ecom_ui::query::QueryParams;

type Headers = Arc<Mutex<Vec<Option<String>>>>;

async fn spawn_orders(body: serde_json::Value) -> (String, Headers) {
    spawn_order_pages(vec![body]).await
}

/// Serves `bodies` in turn, repeating the last one.
async fn spawn_order_pages(bodies: Vec<serde_json::Value>) -> (String, Headers) {
    let headers: Headers = Arc::default();
    let served = Arc::new(AtomicUsize::new(0));
    let seen = headers.clone();
    let server = HttpServer::new(move || {
        let seen = seen.clone();
        let bodies = bodies.clone();
        let served = served.clone();
        App::new().route(
            "/api/orders",
            web::get().to(move |req: HttpRequest| {
                let seen = seen.clone();
                let n = served.fetch_add(1, Ordering::SeqCst);
                let body = bodies[n.min(bodies.len() - 1)].clone();
                async move {
                    seen.lock().unwrap().push(
                        req.headers()
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    );
                    HttpResponse::Ok().json(body)
                }
            }),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let origin = format!("http://{}", server.addrs()[0]);
    actix_web::rt::spawn(server.run());
    (origin, headers)
}

fn empty_page() -> serde_json::Value {
    json!({
        "content": [],
        "totalPages": 0,
        "totalElements": 0,
        "size": 10,
        "number": 0,
        "numberOfElements": 0,
        "first": true,
        "last": true,
        "empty": true
    })
}

async fn signed_in_cell() -> Arc<TokenCell> {
    let cell = Arc::new(TokenCell::default());
    cell.set(Some("tok".into())).await;
    cell
}

#[actix_web::test]
async fn bearer_is_withheld_from_other_origins() {
    let (origin, headers) = spawn_orders(empty_page()).await;
    let client = ApiClient::new(
        reqwest::Client::new(),
        vec![BearerRule::new("http://localhost:8888", vec![Method::GET])],
    );
    let source = RestPageSource::orders(client, &origin, signed_in_cell().await);

    let page = source.fetch(&QueryParams::new()).await.unwrap();

    assert!(page.empty);
    assert_eq!(headers.lock().unwrap().as_slice(), &[None]);
}

#[actix_web::test]
async fn bearer_is_attached_for_matching_origin() {
    let (origin, headers) = spawn_orders(empty_page()).await;
    let client = ApiClient::new(
        reqwest::Client::new(),
        vec![BearerRule::new(&origin, vec![Method::GET])],
    );
    let source = RestPageSource::orders(client, &origin, signed_in_cell().await);

    source.fetch(&QueryParams::new()).await.unwrap();

    assert_eq!(
        headers.lock().unwrap().as_slice(),
        &[Some("Bearer tok".to_string())]
    );
}

#[actix_web::test]
async fn inconsistent_page_is_rejected() {
    let mut page = empty_page();
    page["numberOfElements"] = json!(3);
    let (origin, _) = spawn_orders(page).await;
    let client = ApiClient::new(reqwest::Client::new(), Vec::new());
    let source = RestPageSource::orders(client, &origin, Arc::new(TokenCell::default()));

    let result = source.fetch(&QueryParams::new()).await;

    assert!(matches!(result, Err(FetchError::MalformedPage(_))));
}

fn order_page(state: &str, number: u32) -> serde_json::Value {
    json!({
        "content": [{
            "id": 4711,
            "orderDate": "2024-03-18",
            "orderState": state,
            "products": []
        }],
        "totalPages": 3,
        "totalElements": 3,
        "size": 1,
        "number": number,
        "numberOfElements": 1,
        "first": number == 0,
        "last": number == 2,
        "empty": false
    })
}

#[actix_web::test]
async fn unknown_order_state_fails_the_fetch_and_keeps_the_last_page() {
    let (origin, _) =
        spawn_order_pages(vec![order_page("DELIVERED", 0), order_page("SHIPPED", 1)]).await;
    let client = ApiClient::new(reqwest::Client::new(), Vec::new());
    let source = RestPageSource::orders(client, &origin, Arc::new(TokenCell::default()));
    let service = ListingService::new(OrderListing::orders(1), Arc::new(source));

    assert_eq!(service.initialize().await, FetchOutcome::Applied);
    assert_eq!(service.page_changed(2).await, FetchOutcome::Failed);

    let view = service.view().await;
    assert!(!view.is_loading);
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, 4711);
    assert_eq!(view.total_elements, 3);
}
