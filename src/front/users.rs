use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};

use super::{auth::require_login, password, AppState};
use crate::{
    config::Config,
    db::Database,
    errors::{Error, Result},
    models::{NewUser, User},
};

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/usuarios", get(get_users).post(post_user))
        .route("/bloquear/:id", get(block))
        .route("/ativar/:id", get(activate))
}

/// Creates the configured administrator on first start.
pub async fn ensure_admin(db: &Database, config: &Config) -> Result<()> {
    if db.find_user_by_login(&config.admin_login).await?.is_some() {
        return Ok(());
    }

    let hash = password::hash(&config.admin_password)?;
    db.create_user(&NewUser {
        name: &config.admin_name,
        login: &config.admin_login,
        password_hash: &hash,
    })
    .await?;
    log::warn!(
        "created default user '{}'; change its password",
        config.admin_login
    );
    Ok(())
}

async fn get_users(State(s): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Err(redirect) = require_login(&s, &headers) {
        return Ok(redirect);
    }

    #[derive(Serialize)]
    struct Ctx {
        usuarios: Vec<User>,
    }

    let usuarios = s.db.list_users().await?;
    Ok(s.t.render("usuarios.hbs", &Ctx { usuarios })?.into_response())
}

#[derive(Deserialize)]
struct UserForm {
    nome: String,
    usuario: String,
    senha: String,
}

async fn post_user(
    State(s): State<AppState>,
    headers: HeaderMap,
    Form(f): Form<UserForm>,
) -> Result<Response> {
    if let Err(redirect) = require_login(&s, &headers) {
        return Ok(redirect);
    }

    let (nome, usuario) = (f.nome.trim(), f.usuario.trim());
    if nome.is_empty() || usuario.is_empty() || f.senha.is_empty() {
        return Err(Error::bad_request("Nome, usuário e senha são obrigatórios"));
    }

    let hash = password::hash(&f.senha)?;
    let id = s
        .db
        .create_user(&NewUser {
            name: nome,
            login: usuario,
            password_hash: &hash,
        })
        .await?;
    log::info!("user {id} ('{usuario}') created");

    Ok(Redirect::to("/usuarios").into_response())
}

async fn block(s: State<AppState>, headers: HeaderMap, id: Path<i64>) -> Result<Response> {
    set_active(s, headers, id, false).await
}

async fn activate(s: State<AppState>, headers: HeaderMap, id: Path<i64>) -> Result<Response> {
    set_active(s, headers, id, true).await
}

async fn set_active(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    active: bool,
) -> Result<Response> {
    if let Err(redirect) = require_login(&s, &headers) {
        return Ok(redirect);
    }

    s.db.set_user_active(id, active).await?;
    log::info!("user {id} active={active}");
    Ok(Redirect::to("/usuarios").into_response())
}
