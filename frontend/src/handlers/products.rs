use actix_session::Session;
use actix_web::{HttpResponse, get, post, web};
use tera::Tera;

use crate::forms::{PageSizeForm, ProductSearchForm};
use crate::handlers::{Access, open_listings, page_context, redirect, render_template};
use crate::session::{CLIENT_ROLE, SessionGateway};
use crate::state::SessionRegistry;

#[get("/products")]
pub async fn show_products(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    tera: web::Data<Tera>,
) -> actix_web::Result<HttpResponse> {
    let (listings, state) =
        match open_listings(&session, &gateway, &registry, Some(CLIENT_ROLE)).await? {
            Access::Granted { listings, state } => (listings, state),
            Access::Denied(response) => return Ok(response),
        };

    listings.products.initialize_once().await;

    let mut context = page_context(&state, "products");
    context.insert("listing", &listings.products.view().await);
    Ok(render_template(&tera, "products.html", &context))
}

#[post("/products/search")]
pub async fn search_products(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    web::Form(form): web::Form<ProductSearchForm>,
) -> actix_web::Result<HttpResponse> {
    let listings = match open_listings(&session, &gateway, &registry, Some(CLIENT_ROLE)).await? {
        Access::Granted { listings, .. } => listings,
        Access::Denied(response) => return Ok(response),
    };

    listings.products.set_filter(form.into()).await;
    listings.products.search().await;
    Ok(redirect("/products"))
}

#[get("/products/page/{page}")]
pub async fn change_page(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    page: web::Path<u32>,
) -> actix_web::Result<HttpResponse> {
    let listings = match open_listings(&session, &gateway, &registry, Some(CLIENT_ROLE)).await? {
        Access::Granted { listings, .. } => listings,
        Access::Denied(response) => return Ok(response),
    };

    listings.products.page_changed(page.into_inner()).await;
    Ok(redirect("/products"))
}

#[post("/products/size")]
pub async fn change_size(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    web::Form(form): web::Form<PageSizeForm>,
) -> actix_web::Result<HttpResponse> {
    let listings = match open_listings(&session, &gateway, &registry, Some(CLIENT_ROLE)).await? {
        Access::Granted { listings, .. } => listings,
        Access::Denied(response) => return Ok(response),
    };

    listings.products.size_changed(form.size).await;
    Ok(redirect("/products"))
}
