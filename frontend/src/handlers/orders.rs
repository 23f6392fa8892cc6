use actix_session::Session;
use actix_web::{HttpResponse, get, post, web};
use tera::Tera;

use crate::forms::PageSizeForm;
use crate::handlers::{Access, open_listings, page_context, redirect, render_template};
use crate::session::SessionGateway;
use crate::state::SessionRegistry;

// The orders view has no role requirement; the backend still checks the
// bearer token.

#[get("/orders")]
pub async fn show_orders(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    tera: web::Data<Tera>,
) -> actix_web::Result<HttpResponse> {
    let (listings, state) = match open_listings(&session, &gateway, &registry, None).await? {
        Access::Granted { listings, state } => (listings, state),
        Access::Denied(response) => return Ok(response),
    };

    listings.orders.initialize_once().await;

    let mut context = page_context(&state, "orders");
    context.insert("listing", &listings.orders.view().await);
    Ok(render_template(&tera, "orders.html", &context))
}

#[post("/orders/search")]
pub async fn search_orders(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
) -> actix_web::Result<HttpResponse> {
    let listings = match open_listings(&session, &gateway, &registry, None).await? {
        Access::Granted { listings, .. } => listings,
        Access::Denied(response) => return Ok(response),
    };

    listings.orders.search().await;
    Ok(redirect("/orders"))
}

#[get("/orders/page/{page}")]
pub async fn change_page(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    page: web::Path<u32>,
) -> actix_web::Result<HttpResponse> {
    let listings = match open_listings(&session, &gateway, &registry, None).await? {
        Access::Granted { listings, .. } => listings,
        Access::Denied(response) => return Ok(response),
    };

    listings.orders.page_changed(page.into_inner()).await;
    Ok(redirect("/orders"))
}

#[post("/orders/size")]
pub async fn change_size(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    web::Form(form): web::Form<PageSizeForm>,
) -> actix_web::Result<HttpResponse> {
    let listings = match open_listings(&session, &gateway, &registry, None).await? {
        Access::Granted { listings, .. } => listings,
        Access::Denied(response) => return Ok(response),
    };

    listings.orders.size_changed(form.size).await;
    Ok(redirect("/orders"))
}
