use serde_json::{Map, Value};
use tracing::warn;

use crate::libs::error::{Error, Result};
use crate::libs::schema::TableSchema;

/// Column name to value, in insertion order.
pub type RowValues = Map<String, Value>;

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn ddl(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `$1, $2, ...` (PostgreSQL)
    #[default]
    Numbered,
    /// `?`
    Question,
}

/// Quote a SQL identifier (table or column name).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects bound values and hands out the matching placeholder text.
struct Binder {
    style: PlaceholderStyle,
    params: Vec<Value>,
}

impl Binder {
    fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        match self.style {
            PlaceholderStyle::Numbered => format!("${}", self.params.len()),
            PlaceholderStyle::Question => "?".to_string(),
        }
    }

    fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.params,
        }
    }
}

/// Optional parts of a SELECT: projection, equality filters, ordering, limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    columns: Vec<String>,
    filters: Vec<(String, Value)>,
    order: Vec<String>,
    limit: Option<u64>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Exact-match condition, `IS NULL` for a null value. Filtering the same
    /// column twice keeps the last value.
    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.filters.iter_mut().find(|(c, _)| c == column) {
            Some(existing) => existing.1 = value,
            None => self.filters.push((column.to_string(), value)),
        }
        self
    }

    /// Add every entry of `values` as an exact-match condition.
    pub fn filters(self, values: &RowValues) -> Self {
        values
            .iter()
            .fold(self, |q, (col, val)| q.filter(col, val.clone()))
    }

    /// Ascending only.
    pub fn order_by(mut self, columns: &[&str]) -> Self {
        self.order = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Renders statements for one table.
pub struct StatementBuilder<'a> {
    schema: &'a TableSchema,
    style: PlaceholderStyle,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        Self::with_style(schema, PlaceholderStyle::default())
    }

    pub fn with_style(schema: &'a TableSchema, style: PlaceholderStyle) -> Self {
        Self { schema, style }
    }

    fn table(&self) -> String {
        quote_ident(self.schema.name())
    }

    fn check_column(&self, column: &str) -> Result<()> {
        if self.schema.has_column(column) {
            Ok(())
        } else {
            Err(Error::UnknownColumn {
                table: self.schema.name().to_string(),
                column: column.to_string(),
            })
        }
    }

    // -------- DDL --------
    pub fn create_table(&self) -> Statement {
        let cols: Vec<String> = self
            .schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
            .collect();
        Statement::ddl(format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}));",
            self.table(),
            cols.join(", "),
            quote_list(self.schema.primary_keys().iter().map(String::as_str))
        ))
    }

    pub fn drop_table(&self) -> Statement {
        Statement::ddl(format!("DROP TABLE IF EXISTS {};", self.table()))
    }

    // -------- Insert / upsert --------
    pub fn insert_row(&self, update: bool, values: &RowValues) -> Result<Statement> {
        for key in values.keys().filter(|k| !self.schema.has_column(k)) {
            warn!(table = self.schema.name(), column = %key, "ignoring value for unknown column");
        }

        let mut binder = Binder::new(self.style);
        let mut cols = Vec::new();
        let mut placeholders = Vec::new();

        // An explicit null is bound as NULL unless the column cannot hold one.
        for c in self.schema.columns() {
            let generated = self.schema.is_generated_key(&c.name);
            match values.get(&c.name) {
                Some(v) if !v.is_null() => {
                    cols.push(c.name.as_str());
                    placeholders.push(binder.bind(v.clone()));
                }
                _ if !update && generated => {}
                Some(v) if c.is_nullable() && !self.schema.is_primary_key(&c.name) => {
                    cols.push(c.name.as_str());
                    placeholders.push(binder.bind(v.clone()));
                }
                _ => {
                    return Err(Error::MissingColumnValue {
                        table: self.schema.name().to_string(),
                        column: c.name.clone(),
                    });
                }
            }
        }

        let conflict = if update {
            let pks = quote_list(self.schema.primary_keys().iter().map(String::as_str));
            let sets: Vec<String> = cols
                .iter()
                .filter(|c| !self.schema.is_primary_key(c))
                .map(|c| {
                    let col = quote_ident(c);
                    format!("{col} = EXCLUDED.{col}")
                })
                .collect();
            if sets.is_empty() {
                format!("ON CONFLICT ({pks}) DO NOTHING")
            } else {
                format!("ON CONFLICT ({pks}) DO UPDATE SET {}", sets.join(", "))
            }
        } else {
            "ON CONFLICT DO NOTHING".to_string()
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) {} RETURNING {}",
            self.table(),
            quote_list(cols),
            placeholders.join(", "),
            conflict,
            quote_ident(self.schema.identity())
        );
        Ok(binder.finish(sql))
    }

    // -------- Delete --------
    pub fn delete_row(&self, key_values: &[Value]) -> Result<Statement> {
        let pks = self.schema.primary_keys();
        if key_values.len() != pks.len() {
            return Err(Error::PrimaryKeyArityMismatch {
                table: self.schema.name().to_string(),
                expected: pks.len(),
                actual: key_values.len(),
            });
        }

        let mut binder = Binder::new(self.style);
        let conds: Vec<String> = pks
            .iter()
            .zip(key_values)
            .map(|(pk, v)| format!("{} = {}", quote_ident(pk), binder.bind(v.clone())))
            .collect();

        let sql = format!(
            "DELETE FROM {} WHERE {};",
            self.table(),
            conds.join(" AND ")
        );
        Ok(binder.finish(sql))
    }

    // -------- Select --------
    pub fn select(&self, query: &SelectQuery) -> Result<Statement> {
        for col in query
            .columns
            .iter()
            .chain(query.filters.iter().map(|(c, _)| c))
            .chain(query.order.iter())
        {
            self.check_column(col)?;
        }

        let mut binder = Binder::new(self.style);
        let projection = if query.columns.is_empty() {
            "*".to_string()
        } else {
            quote_list(query.columns.iter().map(String::as_str))
        };

        let mut sql = format!("SELECT {} FROM {}", projection, self.table());

        if !query.filters.is_empty() {
            let conds: Vec<String> = query
                .filters
                .iter()
                .map(|(c, v)| match v {
                    Value::Null => format!("{} IS NULL", quote_ident(c)),
                    v => format!("{} = {}", quote_ident(c), binder.bind(v.clone())),
                })
                .collect();
            sql += &format!(" WHERE {}", conds.join(" AND "));
        }
        if !query.order.is_empty() {
            sql += &format!(
                " ORDER BY {}",
                quote_list(query.order.iter().map(String::as_str))
            );
        }
        if let Some(limit) = query.limit {
            sql += &format!(" LIMIT {}", binder.bind(Value::from(limit)));
        }
        Ok(binder.finish(sql))
    }
}
