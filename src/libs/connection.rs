use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Json, Uuid};
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::libs::error::Result;
use crate::libs::query_builder::{PlaceholderStyle, Statement};

/// A fetched row keyed by column name, in result-column order.
pub type Row = Map<String, Value>;

/// Whatever actually talks to the database.
///
/// Implementations receive statements whose identifiers are already quoted and
/// whose values are all in `params`; they only bind and run them.
#[async_trait]
pub trait Connection: Send + Sync {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    /// Run a statement and return the rows it produced (empty for DDL/DML).
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Run an insert and return the first column of the row it returned,
    /// or `None` when nothing came back.
    async fn execute_returning_id(&self, statement: &Statement) -> Result<Option<Value>>;

    async fn close(&self) {}
}

/// PostgreSQL connection over a sqlx pool, opened on first use.
pub struct PgConnection {
    options: PgConnectOptions,
    max_connections: u32,
    pool: OnceCell<PgPool>,
}

impl PgConnection {
    pub fn new(options: PgConnectOptions) -> Self {
        Self {
            options,
            max_connections: 5,
            pool: OnceCell::new(),
        }
    }

    /// e.g. `postgres://postgres@localhost:5432/postgres?connect_timeout=10`
    pub fn from_url(database_url: &str) -> Result<Self> {
        Ok(Self::new(PgConnectOptions::from_str(database_url)?))
    }

    /// Wrap a pool the caller already opened.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            options: pool.connect_options().as_ref().clone(),
            max_connections: pool.options().get_max_connections(),
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub async fn connect(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    async fn pool(&self) -> Result<&PgPool> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                info!(
                    host = self.options.get_host(),
                    database = self.options.get_database(),
                    max_connections = self.max_connections,
                    "connecting to database"
                );
                PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect_with(self.options.clone())
                    .await
            })
            .await?;
        Ok(pool)
    }

    fn query<'q>(statement: &'q Statement) -> Query<'q, Postgres, PgArguments> {
        let mut query = sqlx::query(&statement.sql);
        for v in &statement.params {
            query = bind_value(query, v);
        }
        query
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        let rows = Self::query(statement).fetch_all(self.pool().await?).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn execute_returning_id(&self, statement: &Statement) -> Result<Option<Value>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute returning id");
        let row = Self::query(statement)
            .fetch_optional(self.pool().await?)
            .await?;
        row.map(|r| cell_to_json(&r, 0)).transpose()
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => query.bind(i),
            (None, Some(f)) => query.bind(f),
            (None, None) => query.bind(n.to_string()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(Json(value.clone())),
    }
}

fn row_to_json(row: &PgRow) -> Result<Row> {
    let mut map = Map::new();
    for (i, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_json(row, i)?);
    }
    Ok(map)
}

// sqlx refuses to decode across SQL types, so try each Rust type in turn.
// Only a real NULL becomes `Value::Null`; a type nobody decodes is an error.
fn cell_to_json(row: &PgRow, i: usize) -> Result<Value> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<i32, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<i16, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<f32, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<bool, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<String, _>(i) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<Json<Value>, _>(i) {
        return Ok(v.0);
    }
    // Exact decimals stay strings so no precision is lost.
    if let Ok(v) = row.try_get::<Decimal, _>(i) {
        return Ok(Value::from(v.to_string()));
    }
    if let Ok(v) = row.try_get::<Uuid, _>(i) {
        return Ok(Value::from(v.to_string()));
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(i) {
        return Ok(Value::from(v.to_rfc3339()));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(i) {
        return Ok(Value::from(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(i) {
        return Ok(Value::from(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveTime, _>(i) {
        return Ok(Value::from(v.to_string()));
    }

    let column = &row.columns()[i];
    Err(sqlx::Error::ColumnDecode {
        index: column.name().to_string(),
        source: format!("unsupported column type {}", column.type_info().name()).into(),
    }
    .into())
}
