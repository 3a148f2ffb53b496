#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use schemorm::{Connection, Error, PlaceholderStyle, Result, Row, Statement};

/// In-memory stand-in for a database: records every statement and answers
/// with canned rows.
#[derive(Default)]
pub struct RecordingConnection {
    pub style: PlaceholderStyle,
    pub statements: Mutex<Vec<Statement>>,
    pub rows: Vec<Row>,
    pub returned_id: Option<Value>,
    /// Statements containing this text fail.
    pub fail_on: Option<String>,
    pub closed: Mutex<bool>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_returned_id(mut self, id: Value) -> Self {
        self.returned_id = Some(id);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.sql.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Statement> {
        self.statements.lock().unwrap().last().cloned()
    }

    fn record(&self, statement: &Statement) -> Result<()> {
        if let Some(text) = &self.fail_on {
            if statement.sql.contains(text.as_str()) {
                return Err(Error::Database(sqlx::Error::Protocol(format!(
                    "refusing {}",
                    statement.sql
                ))));
            }
        }
        self.statements.lock().unwrap().push(statement.clone());
        Ok(())
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }

    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.record(statement)?;
        if statement.sql.starts_with("SELECT") {
            Ok(self.rows.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn execute_returning_id(&self, statement: &Statement) -> Result<Option<Value>> {
        self.record(statement)?;
        Ok(self.returned_id.clone())
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}
