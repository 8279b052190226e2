mod auth;
mod catalog;
mod dashboard;
mod export;
mod invoices;
pub mod password;
pub mod session;
pub mod template;
mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    response::Html,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::{
    config::Config,
    db::{Catalog, Database},
    errors::Result,
};

pub use users::ensure_admin;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub t: template::Template,
    pub sessions: session::SessionStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> anyhow::Result<Self> {
        let t = template::Template::new(&config.templates_dir)?;
        Ok(Self {
            db,
            t,
            sessions: session::SessionStore::new(),
            config: Arc::new(config),
        })
    }
}

pub fn new_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/home", get(home))
        .route("/dashboard", get(dashboard::get))
        .route("/exportar", get(export::get))
        .route(
            "/nf",
            get(invoices::get)
                .post(invoices::post)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .merge(auth::new_router())
        .merge(users::new_router())
        .merge(catalog::new_router(Catalog::Projects))
        .merge(catalog::new_router(Catalog::Categories))
        .nest_service("/uploads", uploads)
        .with_state(state)
}

pub async fn start_web_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    let app = new_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("open website at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn home(State(s): State<AppState>, headers: HeaderMap) -> Result<Html<String>> {
    #[derive(Serialize)]
    struct Ctx {
        usuario_nome: Option<String>,
    }

    s.t.render(
        "home.hbs",
        &Ctx {
            usuario_nome: s.sessions.current(&headers).map(|u| u.user_name),
        },
    )
}
