use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::libs::connection::{Connection, Row};
use crate::libs::error::Result;
use crate::libs::query_builder::{RowValues, SelectQuery, StatementBuilder};
use crate::libs::schema::TableSchema;

/// A handle to one table: its schema plus the connection statements run on.
#[derive(Clone)]
pub struct Model {
    schema: Arc<TableSchema>,
    conn: Arc<dyn Connection>,
}

impl Model {
    pub fn new(schema: TableSchema, conn: Arc<dyn Connection>) -> Self {
        Self {
            schema: Arc::new(schema),
            conn,
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn builder(&self) -> StatementBuilder<'_> {
        StatementBuilder::with_style(&self.schema, self.conn.placeholder_style())
    }

    // -------- DDL --------
    pub async fn create_table(&self) -> Result<()> {
        self.conn.execute(&self.builder().create_table()).await?;
        Ok(())
    }

    pub async fn drop_table(&self) -> Result<()> {
        self.conn.execute(&self.builder().drop_table()).await?;
        Ok(())
    }

    /// Insert a row, or upsert it on primary-key conflict when `update` is set.
    ///
    /// Returns the identity column of the written row, `None` when the
    /// conflict clause left the table untouched.
    ///
    /// # Example
    /// ```ignore
    /// let row = json!({"name": "Ada", "age": 36});
    /// let id = users.insert_row(false, row.as_object().unwrap()).await?;
    /// ```
    pub async fn insert_row(&self, update: bool, values: &RowValues) -> Result<Option<Value>> {
        let statement = self.builder().insert_row(update, values)?;
        self.conn.execute_returning_id(&statement).await
    }

    /// Delete the row whose primary key columns equal `key_values`, in
    /// declaration order.
    pub async fn delete_row(&self, key_values: &[Value]) -> Result<()> {
        let statement = self.builder().delete_row(key_values)?;
        self.conn.execute(&statement).await?;
        Ok(())
    }

    pub async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let statement = self.builder().select(query)?;
        self.conn.execute(&statement).await
    }

    /// Same as [`Model::select`], decoding each row into `T`.
    pub async fn select_as<T>(&self, query: &SelectQuery) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let rows = self.select(query).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(serde_json::from_value::<T>(Value::Object(row))?);
        }
        Ok(results)
    }

    pub async fn first_as<T>(&self, query: &SelectQuery) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut all = self.select_as::<T>(&query.clone().limit(1)).await?;
        Ok(all.pop())
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Model({})", self.schema)
    }
}
