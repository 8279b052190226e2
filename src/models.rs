use serde::Serialize;

use crate::currency::Money;

/// Projects and categories share one shape: a named row that owns invoices.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub login: String,
    #[serde(skip)]
    pub password_hash: String,
    pub active: bool,
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub login: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: String,
    pub amount: Money,
    pub date: String,
    pub payment_method: Option<String>,
    pub note: Option<String>,
    pub file_name: Option<String>,
    pub project_id: i64,
    pub category_id: i64,
}

/// An invoice with its project and category names resolved.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct InvoiceDetail {
    pub id: i64,
    pub number: String,
    pub amount_cents: i64,
    pub date: String,
    pub payment_method: Option<String>,
    pub note: Option<String>,
    pub file_name: Option<String>,
    pub project_name: String,
    pub category_name: String,
}

impl InvoiceDetail {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// The slice of an invoice the dashboard aggregates over.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct InvoiceFact {
    pub project_id: i64,
    pub category: String,
    pub amount_cents: i64,
    pub date: String,
}

impl InvoiceFact {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}
