//! `/obras` and `/categorias`: list, create, rename and guarded delete.

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    db::Catalog,
    errors::{Error, Result},
    models::CatalogEntry,
};

fn base_path(catalog: Catalog) -> &'static str {
    match catalog {
        Catalog::Projects => "/obras",
        Catalog::Categories => "/categorias",
    }
}

fn title(catalog: Catalog) -> &'static str {
    match catalog {
        Catalog::Projects => "Obras",
        Catalog::Categories => "Categorias",
    }
}

pub fn new_router(catalog: Catalog) -> Router<AppState> {
    let base = base_path(catalog);
    Router::new()
        .route(
            base,
            get(move |State(s): State<AppState>| list(s, catalog)).post(
                move |State(s): State<AppState>, Form(f): Form<NameForm>| create(s, catalog, f),
            ),
        )
        .route(
            &format!("{base}/editar/:id"),
            post(
                move |State(s): State<AppState>, Path(id): Path<i64>, Form(f): Form<NameForm>| {
                    rename(s, catalog, id, f)
                },
            ),
        )
        .route(
            &format!("{base}/excluir/:id"),
            post(move |State(s): State<AppState>, Path(id): Path<i64>| remove(s, catalog, id)),
        )
}

#[derive(Deserialize)]
struct NameForm {
    nome: String,
}

impl NameForm {
    fn name(&self) -> Result<&str> {
        match self.nome.trim() {
            "" => Err(Error::bad_request("O nome é obrigatório")),
            name => Ok(name),
        }
    }
}

async fn list(s: AppState, catalog: Catalog) -> Result<Html<String>> {
    #[derive(Serialize)]
    struct Ctx {
        titulo: &'static str,
        base: &'static str,
        itens: Vec<CatalogEntry>,
    }

    let itens = s.db.list(catalog).await?;
    s.t.render(
        "catalogo.hbs",
        &Ctx {
            titulo: title(catalog),
            base: base_path(catalog),
            itens,
        },
    )
}

async fn create(s: AppState, catalog: Catalog, f: NameForm) -> Result<Redirect> {
    let id = s.db.create(catalog, f.name()?).await?;
    log::info!("{} {id} created", catalog.label());
    Ok(Redirect::to(base_path(catalog)))
}

async fn rename(s: AppState, catalog: Catalog, id: i64, f: NameForm) -> Result<Redirect> {
    s.db.rename(catalog, id, f.name()?).await?;
    Ok(Redirect::to(base_path(catalog)))
}

async fn remove(s: AppState, catalog: Catalog, id: i64) -> Result<Redirect> {
    s.db.delete(catalog, id).await?;
    log::info!("{} {id} deleted", catalog.label());
    Ok(Redirect::to(base_path(catalog)))
}
