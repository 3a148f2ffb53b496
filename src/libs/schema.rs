// schema.rs
use std::fmt;

use crate::libs::error::{Error, Result};

/// Marker in a column type meaning "value generated by the database".
pub const GENERATED_MARKER: &str = "SERIAL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub sql_type: String,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    pub fn is_generated(&self) -> bool {
        self.sql_type.to_ascii_uppercase().contains(GENERATED_MARKER)
    }

    /// False when the type string itself forbids NULL.
    pub fn is_nullable(&self) -> bool {
        let ty = self.sql_type.to_ascii_uppercase();
        !ty.contains("NOT NULL") && !ty.contains("PRIMARY KEY")
    }
}

/// Validated description of one table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnSchema>,
    primary_keys: Vec<String>,
    generated_keys: Vec<String>,
    identity: String,
}

impl TableSchema {
    /// Build a table schema, checking that every primary key (and the identity
    /// column, when given) is one of the columns.
    ///
    /// Without an explicit identity the table returns its single generated
    /// key, or its first primary key when there is no single generated one.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnSchema>,
        primary_keys: Vec<String>,
        identity: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::missing("table_name"));
        }
        if primary_keys.is_empty() {
            return Err(Error::missing(
                "primary_keys. Must provide a list of at least one primary key",
            ));
        }
        if columns.is_empty() {
            return Err(Error::missing(
                "columns. A table should have at least one column",
            ));
        }

        for (i, c) in columns.iter().enumerate() {
            if columns[..i].iter().any(|prev| prev.name == c.name) {
                return Err(Error::DuplicateColumn {
                    table: name,
                    column: c.name.clone(),
                });
            }
        }

        let find = |col: &str| columns.iter().find(|c| c.name == col);
        for pk in &primary_keys {
            if find(pk).is_none() {
                return Err(Error::InvalidPrimaryKey {
                    table: name,
                    column: pk.clone(),
                });
            }
        }

        let generated_keys: Vec<String> = primary_keys
            .iter()
            .filter(|pk| find(pk).is_some_and(ColumnSchema::is_generated))
            .cloned()
            .collect();

        let identity = match identity {
            Some(col) if find(&col).is_none() => {
                return Err(Error::InvalidIdentity {
                    table: name,
                    column: col,
                });
            }
            Some(col) => col,
            None if generated_keys.len() == 1 => generated_keys[0].clone(),
            None => primary_keys[0].clone(),
        };

        Ok(Self {
            name,
            columns,
            primary_keys,
            generated_keys,
            identity,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Primary keys the database fills in on a plain insert.
    pub fn generated_keys(&self) -> &[String] {
        &self.generated_keys
    }

    /// Column returned by inserts.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_keys.iter().any(|pk| pk == name)
    }

    pub fn is_generated_key(&self, name: &str) -> bool {
        self.generated_keys.iter().any(|k| k == name)
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if self.is_primary_key(&c.name) {
                    format!("{}: {} <PK>", c.name, c.sql_type)
                } else {
                    format!("{}: {}", c.name, c.sql_type)
                }
            })
            .collect();
        write!(f, "{} -> ({})", self.name, cols.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_columns() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::new("id", "SERIAL"),
            ColumnSchema::new("name", "TEXT"),
            ColumnSchema::new("age", "INT"),
        ]
    }

    #[test]
    fn test_generated_keys_and_identity() {
        let schema = TableSchema::new("users", users_columns(), vec!["id".into()], None).unwrap();
        assert_eq!(schema.generated_keys(), ["id".to_string()]);
        assert_eq!(schema.identity(), "id");
        assert!(schema.is_generated_key("id"));
        assert!(!schema.is_generated_key("name"));
    }

    #[test]
    fn test_serial_marker_is_case_insensitive() {
        assert!(ColumnSchema::new("id", "bigserial").is_generated());
        assert!(ColumnSchema::new("id", "BIGSERIAL NOT NULL").is_generated());
        assert!(!ColumnSchema::new("id", "INTEGER").is_generated());
    }

    #[test]
    fn test_nullable_columns() {
        assert!(ColumnSchema::new("nickname", "TEXT").is_nullable());
        assert!(!ColumnSchema::new("name", "text not null").is_nullable());
        assert!(!ColumnSchema::new("code", "TEXT PRIMARY KEY").is_nullable());
    }

    #[test]
    fn test_generated_non_key_column_is_not_a_generated_key() {
        let cols = vec![
            ColumnSchema::new("code", "TEXT"),
            ColumnSchema::new("seq", "SERIAL"),
        ];
        let schema = TableSchema::new("items", cols, vec!["code".into()], None).unwrap();
        assert!(schema.generated_keys().is_empty());
        assert_eq!(schema.identity(), "code");
    }

    #[test]
    fn test_missing_parameters() {
        let err = TableSchema::new("", users_columns(), vec!["id".into()], None).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { .. }));

        let err = TableSchema::new("users", users_columns(), vec![], None).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { .. }));

        let err = TableSchema::new("users", vec![], vec!["id".into()], None).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { .. }));
    }

    #[test]
    fn test_primary_key_must_be_a_column() {
        let err =
            TableSchema::new("users", users_columns(), vec!["uid".into()], None).unwrap_err();
        match err {
            Error::InvalidPrimaryKey { table, column } => {
                assert_eq!(table, "users");
                assert_eq!(column, "uid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut cols = users_columns();
        cols.push(ColumnSchema::new("name", "VARCHAR(10)"));
        let err = TableSchema::new("users", cols, vec!["id".into()], None).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { column, .. } if column == "name"));
    }

    #[test]
    fn test_explicit_identity() {
        let schema = TableSchema::new(
            "users",
            users_columns(),
            vec!["id".into()],
            Some("name".into()),
        )
        .unwrap();
        assert_eq!(schema.identity(), "name");

        let err = TableSchema::new(
            "users",
            users_columns(),
            vec!["id".into()],
            Some("uuid".into()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidIdentity { .. }));
    }

    #[test]
    fn test_display() {
        let schema = TableSchema::new("users", users_columns(), vec!["id".into()], None).unwrap();
        assert_eq!(
            schema.to_string(),
            "users -> (id: SERIAL <PK>, name: TEXT, age: INT)"
        );
    }
}
