//! Query layer over the SQLite store.

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    errors::{Error, Result},
    models::{CatalogEntry, InvoiceDetail, InvoiceFact, NewInvoice, NewUser, User},
};

/// The two lookup tables invoices point at. Both are plain named rows whose
/// deletion is blocked while invoices reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Projects,
    Categories,
}

impl Catalog {
    fn table(self) -> &'static str {
        match self {
            Catalog::Projects => "projects",
            Catalog::Categories => "categories",
        }
    }

    fn invoice_column(self) -> &'static str {
        match self {
            Catalog::Projects => "project_id",
            Catalog::Categories => "category_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Catalog::Projects => "Obra",
            Catalog::Categories => "Categoria",
        }
    }

    fn in_use_message(self) -> &'static str {
        match self {
            Catalog::Projects => "Não é possível excluir obra com notas fiscais lançadas",
            Catalog::Categories => "Não é possível excluir categoria vinculada a notas fiscais",
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Projects and categories

    pub async fn list(&self, catalog: Catalog) -> Result<Vec<CatalogEntry>> {
        let sql = format!("SELECT id, name FROM {} ORDER BY id", catalog.table());
        Ok(sqlx::query_as::<_, CatalogEntry>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn find(&self, catalog: Catalog, id: i64) -> Result<Option<CatalogEntry>> {
        let sql = format!("SELECT id, name FROM {} WHERE id = ?", catalog.table());
        Ok(sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create(&self, catalog: Catalog, name: &str) -> Result<i64> {
        let sql = format!("INSERT INTO {} (name) VALUES (?)", catalog.table());
        let res = sqlx::query(&sql).bind(name).execute(&self.pool).await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn rename(&self, catalog: Catalog, id: i64, name: &str) -> Result<()> {
        let sql = format!("UPDATE {} SET name = ? WHERE id = ?", catalog.table());
        let res = sqlx::query(&sql)
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound {
                resource: catalog.label(),
                id,
            });
        }
        Ok(())
    }

    /// Deletes the row unless an invoice still references it.
    pub async fn delete(&self, catalog: Catalog, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists_sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", catalog.table());
        let exists: i64 = sqlx::query_scalar(&exists_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(Error::NotFound {
                resource: catalog.label(),
                id,
            });
        }

        let in_use_sql = format!(
            "SELECT COUNT(*) FROM invoices WHERE {} = ?",
            catalog.invoice_column()
        );
        let in_use: i64 = sqlx::query_scalar(&in_use_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if in_use > 0 {
            log::info!(
                "refusing to delete {} {id}: {in_use} invoice(s) reference it",
                catalog.table()
            );
            return Err(Error::bad_request(catalog.in_use_message()));
        }

        let delete_sql = format!("DELETE FROM {} WHERE id = ?", catalog.table());
        sqlx::query(&delete_sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // Invoices

    pub async fn create_invoice(&self, invoice: &NewInvoice) -> Result<i64> {
        let res = sqlx::query(
            r#"
            INSERT INTO invoices (
                number,
                amount_cents,
                date,
                payment_method,
                note,
                file_name,
                project_id,
                category_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.number)
        .bind(invoice.amount.cents())
        .bind(&invoice.date)
        .bind(&invoice.payment_method)
        .bind(&invoice.note)
        .bind(&invoice.file_name)
        .bind(invoice.project_id)
        .bind(invoice.category_id)
        .execute(&self.pool)
        .await?;

        Ok(res.last_insert_rowid())
    }

    /// Every invoice with its project and category names, oldest first.
    pub async fn list_invoices(&self) -> Result<Vec<InvoiceDetail>> {
        Ok(sqlx::query_as::<_, InvoiceDetail>(
            r#"
            SELECT
                i.id,
                i.number,
                i.amount_cents,
                i.date,
                i.payment_method,
                i.note,
                i.file_name,
                p.name AS project_name,
                c.name AS category_name
            FROM invoices i
            JOIN projects p ON p.id = i.project_id
            JOIN categories c ON c.id = i.category_id
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn invoice_facts(&self) -> Result<Vec<InvoiceFact>> {
        Ok(sqlx::query_as::<_, InvoiceFact>(
            r#"
            SELECT
                i.project_id,
                c.name AS category,
                i.amount_cents,
                i.date
            FROM invoices i
            JOIN categories c ON c.id = i.category_id
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    // Users

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, name, login, password_hash, active FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_user_by_login(&self, login: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, name, login, password_hash, active FROM users WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn create_user(&self, user: &NewUser<'_>) -> Result<i64> {
        let res = sqlx::query("INSERT INTO users (name, login, password_hash) VALUES (?, ?, ?)")
            .bind(user.name)
            .bind(user.login)
            .bind(user.password_hash)
            .execute(&self.pool)
            .await;

        match res {
            Ok(res) => Ok(res.last_insert_rowid()),
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|e| e.is_unique_violation()) =>
            {
                Err(Error::Conflict {
                    message: format!("O usuário '{}' já existe", user.login),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn set_user_active(&self, id: i64, active: bool) -> Result<()> {
        let res = sqlx::query("UPDATE users SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound {
                resource: "Usuário",
                id,
            });
        }
        Ok(())
    }
}
