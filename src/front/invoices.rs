//! `/nf`: invoice list and creation, with an optional attached file.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    response::{Html, Redirect},
};
use chrono::NaiveDate;
use serde::Serialize;

use super::AppState;
use crate::{
    currency::{self, Money},
    db::Catalog,
    errors::{Error, Result},
    models::{CatalogEntry, NewInvoice},
};

pub async fn get(State(s): State<AppState>) -> Result<Html<String>> {
    #[derive(Serialize)]
    struct Row {
        id: i64,
        numero: String,
        valor: Money,
        data: String,
        pagamento: Option<String>,
        observacao: Option<String>,
        arquivo: Option<String>,
        obra: String,
        categoria: String,
    }

    #[derive(Serialize)]
    struct Ctx {
        obras: Vec<CatalogEntry>,
        categorias: Vec<CatalogEntry>,
        nfs: Vec<Row>,
    }

    let nfs = s
        .db
        .list_invoices()
        .await?
        .into_iter()
        .map(|i| Row {
            id: i.id,
            valor: i.amount(),
            numero: i.number,
            data: i.date,
            pagamento: i.payment_method,
            observacao: i.note,
            arquivo: i.file_name,
            obra: i.project_name,
            categoria: i.category_name,
        })
        .collect();

    let ctx = Ctx {
        obras: s.db.list(Catalog::Projects).await?,
        categorias: s.db.list(Catalog::Categories).await?,
        nfs,
    };
    s.t.render("nf.hbs", &ctx)
}

pub async fn post(State(s): State<AppState>, mut multipart: Multipart) -> Result<Redirect> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "arquivo" {
            let file_name = field.file_name().map(secure_filename);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if let Some(file_name) = file_name.filter(|n| !n.is_empty()) {
                upload = Some((file_name, bytes));
            }
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, text);
        }
    }

    let mut invoice = parse_invoice(&fields)?;

    if s.db.find(Catalog::Projects, invoice.project_id).await?.is_none() {
        return Err(Error::bad_request(format!(
            "Obra {} inexistente",
            invoice.project_id
        )));
    }
    if s.db.find(Catalog::Categories, invoice.category_id).await?.is_none() {
        return Err(Error::bad_request(format!(
            "Categoria {} inexistente",
            invoice.category_id
        )));
    }

    if let Some((file_name, bytes)) = upload {
        let dir = &s.config.upload_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("create {}: {e}", dir.display()))?;
        // same name overwrites the previous upload
        tokio::fs::write(dir.join(&file_name), &bytes)
            .await
            .map_err(|e| anyhow::anyhow!("write upload {file_name}: {e}"))?;
        log::info!("stored upload '{file_name}' ({} bytes)", bytes.len());
        invoice.file_name = Some(file_name);
    }

    let id = s.db.create_invoice(&invoice).await?;
    log::info!(
        "invoice {id} '{}' created: {} for project {}",
        invoice.number,
        invoice.amount,
        invoice.project_id
    );

    Ok(Redirect::to("/nf"))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> Error {
    Error::bad_request(format!("Formulário inválido: {err}"))
}

/// Validates the submitted form. The amount is checked first.
fn parse_invoice(fields: &HashMap<String, String>) -> Result<NewInvoice> {
    let amount = currency::parse_money(required(fields, "valor")?)?;

    // stored zero-padded so month prefixes and string order line up
    let raw_date = required(fields, "data")?;
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
        .map_err(|_| Error::bad_request(format!("Data inválida: '{raw_date}'. Use AAAA-MM-DD")))?
        .format("%Y-%m-%d")
        .to_string();

    Ok(NewInvoice {
        number: required(fields, "numero")?.to_string(),
        amount,
        date,
        payment_method: optional(fields, "pagamento"),
        note: optional(fields, "observacao"),
        file_name: None,
        project_id: id_field(fields, "obra")?,
        category_id: id_field(fields, "categoria")?,
    })
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::bad_request(format!("Campo obrigatório ausente: {name}")))
}

fn optional(fields: &HashMap<String, String>, name: &str) -> Option<String> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn id_field(fields: &HashMap<String, String>, name: &str) -> Result<i64> {
    let raw = required(fields, name)?;
    raw.parse()
        .map_err(|_| Error::bad_request(format!("Campo {name} inválido: '{raw}'")))
}

/// Reduces a client-supplied file name to a safe flat name: path parts and
/// anything outside `[A-Za-z0-9._-]` are dropped, whitespace becomes `_`.
pub fn secure_filename(raw: &str) -> String {
    let flattened = raw.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
