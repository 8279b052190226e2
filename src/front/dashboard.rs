use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    currency::Money,
    db::Catalog,
    errors::Result,
    report::{self, DashboardFilter, ProjectFilter},
};

#[derive(Deserialize)]
pub struct DashboardQuery {
    obra: Option<String>,
    /// `YYYY-MM`
    mes: Option<String>,
}

#[derive(Serialize)]
struct ProjectOption {
    id: i64,
    name: String,
    selected: bool,
}

#[derive(Serialize)]
struct Bar {
    category: String,
    total: Money,
    /// Chart value, e.g. `1234.56`.
    value: String,
    /// from 0 to 100
    height_ratio: i64,
}

#[derive(Serialize)]
struct Ctx {
    obras: Vec<ProjectOption>,
    categorias: Vec<Bar>,
    obra_selecionada: Option<String>,
    mes_selecionado: Option<String>,
    total_gasto: Money,
    total_geral_obras: Money,
    maior_categoria: String,
    total_nfs: usize,
    ultima_data: String,
}

pub async fn get(State(s): State<AppState>, Query(q): Query<DashboardQuery>) -> Result<Html<String>> {
    let filter = DashboardFilter::new(q.obra.as_deref(), q.mes.as_deref());
    let facts = s.db.invoice_facts().await?;
    let summary = report::summarize(&facts, &filter);
    log::debug!(
        "dashboard {:?}: {} of {} invoices",
        filter,
        summary.invoice_count,
        facts.len()
    );

    let max = summary
        .by_category
        .iter()
        .map(|c| c.total)
        .max()
        .unwrap_or(Money::ZERO);

    let obras = s
        .db
        .list(Catalog::Projects)
        .await?
        .into_iter()
        .map(|p| ProjectOption {
            selected: filter.project == ProjectFilter::Project(p.id),
            id: p.id,
            name: p.name,
        })
        .collect();

    let ctx = Ctx {
        obras,
        categorias: summary
            .by_category
            .into_iter()
            .map(|c| Bar {
                value: c.total.to_plain_string(),
                height_ratio: height_ratio(c.total, max),
                category: c.category,
                total: c.total,
            })
            .collect(),
        obra_selecionada: q.obra,
        mes_selecionado: filter.month,
        total_gasto: summary.total,
        total_geral_obras: summary.grand_total,
        maior_categoria: summary.dominant_category,
        total_nfs: summary.invoice_count,
        ultima_data: summary.latest_date,
    };

    s.t.render("dashboard.hbs", &ctx)
}

/// Bar height relative to the largest category, rounded to a whole percent.
fn height_ratio(total: Money, max: Money) -> i64 {
    if max.cents() <= 0 || total.cents() <= 0 {
        return 0;
    }
    let ratio = (i128::from(total.cents()) * 100 + i128::from(max.cents()) / 2) / i128::from(max.cents());
    ratio.clamp(0, 100) as i64
}
