use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};

use super::{password, session::Session, AppState};
use crate::errors::Result;

const INVALID_CREDENTIALS: &str = "Usuário ou senha inválidos";
const BLOCKED: &str = "Usuário bloqueado";

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(get_login).post(post_login))
        .route("/logout", get(logout))
}

/// Sends anonymous visitors to the login page.
pub fn require_login(s: &AppState, headers: &HeaderMap) -> Result<Session, Response> {
    s.sessions
        .current(headers)
        .ok_or_else(|| Redirect::to("/login").into_response())
}

#[derive(Serialize, Default)]
struct LoginCtx {
    erro: Option<&'static str>,
}

async fn get_login(State(s): State<AppState>) -> Result<Response> {
    Ok(s.t.render("login.hbs", &LoginCtx::default())?.into_response())
}

#[derive(Deserialize)]
struct LoginForm {
    usuario: String,
    senha: String,
}

async fn post_login(State(s): State<AppState>, Form(f): Form<LoginForm>) -> Result<Response> {
    let user = s.db.find_user_by_login(f.usuario.trim()).await?;

    let erro = match &user {
        Some(u) if password::verify(&f.senha, &u.password_hash) => (!u.active).then_some(BLOCKED),
        _ => Some(INVALID_CREDENTIALS),
    };

    match (user, erro) {
        (Some(u), None) => {
            let cookie = s.sessions.open(Session {
                user_id: u.id,
                user_name: u.name,
            });
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/home")).into_response())
        }
        (_, erro) => {
            log::info!("login refused for '{}'", f.usuario);
            Ok(s.t.render("login.hbs", &LoginCtx { erro })?.into_response())
        }
    }
}

async fn logout(State(s): State<AppState>, headers: HeaderMap) -> Response {
    let cookie = s.sessions.close(&headers);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/login")).into_response()
}
