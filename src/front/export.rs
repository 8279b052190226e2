use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::{errors::Result, models::InvoiceDetail};

const FILE_NAME: &str = "relatorio_obras.csv";

const COLUMNS: [&str; 7] = [
    "Obra",
    "Numero NF",
    "Categoria",
    "Valor",
    "Data",
    "Pagamento",
    "Observação",
];

pub async fn get(State(s): State<AppState>) -> Result<Response> {
    let invoices = s.db.list_invoices().await?;
    let body = to_csv(&invoices)?;
    log::info!("exported {} invoices", invoices.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{FILE_NAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}

fn to_csv(invoices: &[InvoiceDetail]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    wtr.write_record(COLUMNS)?;
    for i in invoices {
        wtr.write_record([
            i.project_name.as_str(),
            i.number.as_str(),
            i.category_name.as_str(),
            i.amount().to_plain_string().as_str(),
            i.date.as_str(),
            i.payment_method.as_deref().unwrap_or_default(),
            i.note.as_deref().unwrap_or_default(),
        ])?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv: {e}"))
}
