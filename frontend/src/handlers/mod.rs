use std::sync::Arc;

use actix_session::Session;
use actix_web::{HttpResponse, Responder, get, http::header, web};
use chrono::{DateTime, Utc};
use log::error;
use tera::{Context, Tera};
use uuid::Uuid;

use crate::session::{GuardDecision, InactivityAction, SessionGateway, SessionState, TokenUnavailable};
use crate::state::{BrowserSession, SessionRegistry};

pub mod auth;
pub mod orders;
pub mod products;

const SESSION_ID_KEY: &str = "sid";

/// Registers every storefront route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(products::show_products)
        .service(products::search_products)
        .service(products::change_page)
        .service(products::change_size)
        .service(orders::show_orders)
        .service(orders::search_orders)
        .service(orders::change_page)
        .service(orders::change_size)
        .service(auth::login)
        .service(auth::callback)
        .service(auth::logout);
}

#[get("/")]
async fn index() -> impl Responder {
    redirect("/products")
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn render_template(tera: &Tera, template: &str, context: &Context) -> HttpResponse {
    match tera.render(template, context) {
        Ok(body) => HttpResponse::Ok().content_type("text/html").body(body),
        Err(err) => {
            error!("Failed to render {template}: {err}");
            HttpResponse::InternalServerError().body("Template render error")
        }
    }
}

fn session_id(session: &Session) -> actix_web::Result<Option<String>> {
    Ok(session.get::<String>(SESSION_ID_KEY)?)
}

/// The server-side entry of this browser, if it has a live one.
pub fn find_browser(
    session: &Session,
    registry: &SessionRegistry,
    now: DateTime<Utc>,
) -> actix_web::Result<Option<Arc<BrowserSession>>> {
    Ok(session_id(session)?.and_then(|key| registry.get(&key, now)))
}

/// The server-side entry of this browser. A browser without an id gets a
/// fresh one.
pub fn open_browser(
    session: &Session,
    registry: &SessionRegistry,
    now: DateTime<Utc>,
) -> actix_web::Result<Arc<BrowserSession>> {
    let key = match session_id(session)? {
        Some(key) => key,
        None => {
            let key = Uuid::new_v4().to_string();
            session.insert(SESSION_ID_KEY, &key)?;
            key
        }
    };
    Ok(registry.get_or_create(&key, now))
}

/// Drops everything the server keeps for this browser.
pub fn forget_browser(session: &Session, registry: &SessionRegistry) -> actix_web::Result<()> {
    if let Some(key) = session_id(session)? {
        registry.remove(&key);
    }
    session.remove(SESSION_ID_KEY);
    Ok(())
}

pub enum Access {
    Granted {
        listings: Arc<BrowserSession>,
        state: SessionState,
    },
    Denied(HttpResponse),
}

/// Common prologue of the listing routes: refreshes the bearer token,
/// records activity, applies the route guard and resolves the session's
/// listings. A session signed out here loses its listings too.
pub async fn open_listings(
    session: &Session,
    gateway: &SessionGateway,
    registry: &SessionRegistry,
    required_role: Option<&str>,
) -> actix_web::Result<Access> {
    let now = Utc::now();
    let mut browser = open_browser(session, registry, now)?;
    let mut state = browser.auth_state();
    let token = gateway.bearer_token(&mut state, now).await;

    if matches!(
        token,
        Err(TokenUnavailable::Inactive(_) | TokenUnavailable::RefreshFailed)
    ) {
        forget_browser(session, registry)?;
        browser = open_browser(session, registry, now)?;
    }
    gateway.touch(&mut state, now);
    browser.store_auth(state.clone());

    if token == Err(TokenUnavailable::Inactive(InactivityAction::Login)) {
        return Ok(Access::Denied(redirect("/login")));
    }

    if let Some(role) = required_role {
        match gateway.require_role(&state, role) {
            GuardDecision::Allow => {}
            GuardDecision::Unauthenticated => return Ok(Access::Denied(redirect("/login"))),
            GuardDecision::Forbidden => {
                return Ok(Access::Denied(
                    HttpResponse::Forbidden().body(format!("The {role} role is required")),
                ));
            }
        }
    }

    browser.token.set(token.ok()).await;
    Ok(Access::Granted {
        listings: browser,
        state,
    })
}

pub fn page_context(state: &SessionState, current_page: &str) -> Context {
    let mut context = Context::new();
    context.insert("authenticated", &state.is_authenticated());
    context.insert("username", &state.username());
    context.insert("current_page", current_page);
    context
}
