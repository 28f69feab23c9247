//! Database connection management and the Postgres record store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::models::{parse_timestamp, CalendarRecord};
use crate::store::RecordStore;
use crate::{Error, Result};

/// Create a database connection pool.
///
/// `password`, when given, overrides any password embedded in `database_url`.
pub async fn create_pool(database_url: &str, password: Option<&str>) -> Result<PgPool> {
    let mut options = PgConnectOptions::from_str(database_url).map_err(Error::Database)?;
    if let Some(password) = password {
        options = options.password(password);
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}

/// Record store backed by a direct Postgres connection.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
    select_sql: String,
    upsert_sql: String,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            select_sql: select_sql(table),
            upsert_sql: upsert_sql(table),
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn select_sql(table: &str) -> String {
    format!(
        "SELECT settings, calendar_data, updated_at::text FROM {} WHERE id = $1",
        quote_ident(table)
    )
}

fn upsert_sql(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {} (id, settings, calendar_data, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET
            settings = EXCLUDED.settings,
            calendar_data = EXCLUDED.calendar_data,
            updated_at = EXCLUDED.updated_at
        "#,
        quote_ident(table)
    )
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, id: &str) -> Result<Option<CalendarRecord>> {
        let row: Option<(Option<Value>, Option<Value>, Option<String>)> =
            sqlx::query_as(&self.select_sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(settings, calendar_data, updated_at)| CalendarRecord {
            settings: settings.unwrap_or(Value::Null),
            calendar_data: calendar_data.unwrap_or(Value::Null),
            updated_at: updated_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_default(),
        }))
    }

    async fn upsert(&self, id: &str, record: &CalendarRecord) -> Result<()> {
        sqlx::query(&self.upsert_sql)
            .bind(id)
            .bind(&record.settings)
            .bind(&record.calendar_data)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
