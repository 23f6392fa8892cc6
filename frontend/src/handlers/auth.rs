use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::Utc;
use log::{error, warn};

use crate::config::ServerConfig;
use crate::forms::CallbackQuery;
use crate::handlers::{find_browser, forget_browser, open_browser, redirect};
use crate::session::{ResponseCookies, SessionGateway};
use crate::state::SessionRegistry;

#[get("/login")]
pub async fn login(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
) -> actix_web::Result<HttpResponse> {
    let browser = open_browser(&session, &registry, Utc::now())?;
    let mut state = browser.auth_state();
    match gateway.login(&mut state) {
        Ok(url) => {
            browser.store_auth(state);
            Ok(redirect(url.as_str()))
        }
        Err(err) => {
            error!("Cannot start login: {err}");
            Ok(HttpResponse::InternalServerError().finish())
        }
    }
}

#[get("/auth/callback")]
pub async fn callback(
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    query: web::Query<CallbackQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    if let Some(err) = query.error {
        warn!("Identity provider refused the login: {err}");
        return Ok(redirect("/"));
    }
    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Ok(HttpResponse::BadRequest().body("Missing code or state"));
    };

    let now = Utc::now();
    let browser = open_browser(&session, &registry, now)?;
    let mut state = browser.auth_state();
    let result = gateway
        .complete_login(&mut state, &code, &returned_state, now)
        .await;
    browser.store_auth(state);

    match result {
        Ok(()) => Ok(redirect("/products")),
        Err(err) => {
            error!("Login failed: {err}");
            Ok(HttpResponse::Unauthorized().body("Login failed"))
        }
    }
}

#[post("/logout")]
pub async fn logout(
    req: HttpRequest,
    session: Session,
    gateway: web::Data<SessionGateway>,
    registry: web::Data<SessionRegistry>,
    config: web::Data<ServerConfig>,
) -> actix_web::Result<HttpResponse> {
    let mut names: Vec<String> = req
        .cookies()
        .map(|cookies| cookies.iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    names.extend(config.identity.realm_cookie_names.iter().cloned());
    let mut cookies = ResponseCookies::new(names);

    let mut state = find_browser(&session, &registry, Utc::now())?
        .map(|browser| browser.auth_state())
        .unwrap_or_default();
    if let Err(err) = gateway.logout(&mut state, &mut cookies).await {
        warn!("Identity provider logout failed: {err}");
    }
    forget_browser(&session, &registry)?;

    let mut response = redirect(&config.identity.post_logout_redirect_uri);
    cookies.apply_to(&mut response);
    Ok(response)
}
