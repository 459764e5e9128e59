use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

use super::{DataStore, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::{quote_identifier, validate_identifier, FilterWhere};
use crate::middleware::AuthUser;
use crate::types::{Record, RecordId, Table};

/// PostgreSQL-backed store. Each call runs in its own transaction with the caller's claims
/// published as `request.jwt.claims`, so row-level security policies see the same identity
/// the hosted REST layer would.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    assume_jwt_role: bool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self::with_pool(pool, config.assume_jwt_role))
    }

    pub fn with_pool(pool: PgPool, assume_jwt_role: bool) -> Self {
        Self { pool, assume_jwt_role }
    }

    async fn begin_as(&self, auth: &AuthUser) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
            .bind(auth.claims.to_json().to_string())
            .execute(&mut *tx)
            .await?;

        if self.assume_jwt_role {
            if let Some(role) = &auth.claims.role {
                sqlx::query("SELECT set_config('role', $1, true)")
                    .bind(role)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        Ok(tx)
    }

    /// Run a statement expected to touch exactly one row; anything else is rolled back.
    async fn single_row(
        &self,
        auth: &AuthUser,
        table: Table,
        id: &RecordId,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Record, StoreError> {
        let mut tx = self.begin_as(auth).await?;
        let rows = query.fetch_all(&mut *tx).await?;

        if rows.len() != 1 {
            tx.rollback().await?;
            return Err(StoreError::NotSingleRow {
                table,
                id: id.to_string(),
                rows: rows.len(),
            });
        }

        let record = row_to_record(&rows[0])?;
        tx.commit().await?;
        Ok(record)
    }
}

#[async_trait]
impl DataStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, auth: &AuthUser, table: Table, record: Record) -> Result<Record, StoreError> {
        let columns = checked_columns(&record)?;
        let sql = insert_sql(table, &columns);

        let mut tx = self.begin_as(auth).await?;
        let row = sqlx::query(&sql)
            .bind(Value::Object(record))
            .fetch_one(&mut *tx)
            .await?;
        let record = row_to_record(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    async fn select(&self, auth: &AuthUser, table: Table, filter: &FilterWhere) -> Result<Vec<Record>, StoreError> {
        let (sql, params) = select_sql(table, filter);

        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(param);
        }

        let mut tx = self.begin_as(auth).await?;
        let rows = query.fetch_all(&mut *tx).await?;
        tx.commit().await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn update_by_id(
        &self,
        auth: &AuthUser,
        table: Table,
        id: &RecordId,
        patch: Record,
    ) -> Result<Record, StoreError> {
        let columns = checked_columns(&patch)?;
        if columns.is_empty() {
            return Err(StoreError::InvalidInput("update requires at least one column".to_string()));
        }
        let sql = update_sql(table, &columns);
        let query = sqlx::query(&sql).bind(Value::Object(patch)).bind(id.to_string());

        self.single_row(auth, table, id, query).await
    }

    async fn delete_by_id(&self, auth: &AuthUser, table: Table, id: &RecordId) -> Result<Record, StoreError> {
        let sql = delete_sql(table);
        let query = sqlx::query(&sql).bind(id.to_string());

        self.single_row(auth, table, id, query).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn checked_columns(record: &Record) -> Result<Vec<String>, StoreError> {
    record
        .keys()
        .map(|column| {
            validate_identifier(column)
                .map(|_| column.clone())
                .map_err(|e| StoreError::InvalidInput(e.to_string()))
        })
        .collect()
}

fn row_to_record(row: &PgRow) -> Result<Record, StoreError> {
    let value: Value = row.try_get("row")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(other.to_string())),
    }
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$1` is the record as JSONB; only the supplied columns are written so defaults still apply.
fn insert_sql(table: Table, columns: &[String]) -> String {
    let table = quote_identifier(table.as_str());
    if columns.is_empty() {
        return format!(
            "WITH ins AS (INSERT INTO {t} DEFAULT VALUES RETURNING *) SELECT row_to_json(ins) AS row FROM ins",
            t = table
        );
    }
    let cols = column_list(columns);
    format!(
        "WITH ins AS (INSERT INTO {t} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{t}, $1) RETURNING *) \
         SELECT row_to_json(ins) AS row FROM ins",
        t = table,
        cols = cols
    )
}

fn select_sql(table: Table, filter: &FilterWhere) -> (String, Vec<String>) {
    let (where_clause, params) = filter.to_sql(0);
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} WHERE {}) t",
        quote_identifier(table.as_str()),
        where_clause
    );
    (sql, params)
}

/// `$1` is the patch as JSONB, `$2` the id in text form.
fn update_sql(table: Table, columns: &[String]) -> String {
    let t = quote_identifier(table.as_str());
    let assignments = columns
        .iter()
        .map(|c| {
            let c = quote_identifier(c);
            format!("{c} = src.{c}", c = c)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "WITH upd AS (UPDATE {t} SET {assignments} FROM jsonb_populate_record(NULL::{t}, $1) AS src \
         WHERE {t}.\"id\"::text = $2 RETURNING {t}.*) SELECT row_to_json(upd) AS row FROM upd",
        t = t,
        assignments = assignments
    )
}

/// `$1` is the id in text form.
fn delete_sql(table: Table) -> String {
    format!(
        "WITH del AS (DELETE FROM {} WHERE \"id\"::text = $1 RETURNING *) SELECT row_to_json(del) AS row FROM del",
        quote_identifier(table.as_str())
    )
}
