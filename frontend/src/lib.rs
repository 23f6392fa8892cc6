use std::io;
use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::Key;
use actix_web::{App, HttpServer, middleware, web};
use log::info;
use tera::Tera;

use crate::api::{ApiClient, BearerRule};
use crate::config::ServerConfig;
use crate::session::{KeycloakProvider, RefreshPolicy, SessionGateway};
use crate::state::SessionRegistry;

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod pagination;
pub mod query;
pub mod session;
pub mod state;

/// Shared application data handed to every worker.
#[derive(Clone)]
pub struct Services {
    pub config: web::Data<ServerConfig>,
    pub tera: web::Data<Tera>,
    pub gateway: web::Data<SessionGateway>,
    pub registry: web::Data<SessionRegistry>,
    key: Key,
}

impl Services {
    pub fn build(config: ServerConfig) -> io::Result<Self> {
        let tera = Tera::new(&config.templates_dir)
            .map_err(|e| io::Error::other(format!("Template parsing error(s): {e}")))?;
        let key = Key::try_from(config.secret.as_bytes())
            .map_err(|e| io::Error::other(format!("Invalid session secret: {e}")))?;

        let http = reqwest::Client::new();
        let api = ApiClient::new(http.clone(), vec![BearerRule::from(&config.bearer)]);
        let registry = SessionRegistry::new(
            api,
            &config.product_url,
            &config.order_url,
            config.default_page_size,
        )
        .with_limits(&config.sessions);
        let gateway = SessionGateway::new(
            Arc::new(KeycloakProvider::new(http, &config.identity)),
            RefreshPolicy::from(&config.refresh),
            config.identity.client_id.clone(),
            config.identity.realm.clone(),
            config.cookie_domain(),
        );

        Ok(Self {
            config: web::Data::new(config),
            tera: web::Data::new(tera),
            gateway: web::Data::new(gateway),
            registry: web::Data::new(registry),
            key,
        })
    }

    pub fn session_middleware(&self) -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_secure(false)
            .build()
    }

    /// Installs the shared data and every route on an app.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.tera.clone())
            .app_data(self.gateway.clone())
            .app_data(self.registry.clone())
            .configure(handlers::configure);
    }
}

pub async fn run(config: ServerConfig) -> io::Result<()> {
    let services = Services::build(config)?;
    let address = services.config.address.clone();
    let port = services.config.port;

    info!("Starting storefront on {address}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(services.session_middleware())
            .wrap(middleware::Logger::default())
            .configure(|cfg| services.register(cfg))
    })
    .bind((address, port))?
    .run()
    .await
}
