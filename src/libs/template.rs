//! Template documents: connection settings plus table definitions.
//!
//! ```json
//! {
//!   "database": { "name": "shop", "host": "localhost", "port": 5432,
//!                 "username": "ENV", "password": "ENV" },
//!   "tables": [
//!     { "name": "users", "primary_keys": ["id"],
//!       "columns": { "id": "SERIAL", "name": "TEXT", "age": "INT" } }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::postgres::PgConnectOptions;

use crate::libs::error::{Error, Result};
use crate::libs::schema::{ColumnSchema, TableSchema};

/// Value in the `database` section meaning "ask the resolver".
pub const ENV_SENTINEL: &str = "ENV";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub database: Map<String, Value>,
    #[serde(default, alias = "models")]
    pub tables: Vec<TableDefinition>,
}

impl Template {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// One entry of `tables`, as written in the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDefinition {
    #[serde(default)]
    pub name: String,
    /// Kept loose so a non-list is reported as a missing parameter.
    #[serde(default)]
    pub primary_keys: Value,
    #[serde(default)]
    pub columns: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl TableDefinition {
    pub fn to_schema(&self) -> Result<TableSchema> {
        let primary_keys = match &self.primary_keys {
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::missing("primary_keys. Must provide a list of at least one primary key")
        })?;

        let columns = self
            .columns
            .iter()
            .map(|(name, ty)| match ty.as_str() {
                Some(ty) => Ok(ColumnSchema::new(name.as_str(), ty)),
                None => Err(Error::InvalidTemplate {
                    message: format!(
                        "type of column '{}' in table '{}' must be a string",
                        name, self.name
                    ),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        TableSchema::new(
            self.name.as_str(),
            columns,
            primary_keys,
            self.identity.clone(),
        )
    }
}

/// Reads the process environment: the key as written, then upper-cased.
pub fn env_resolver(key: &str) -> Option<String> {
    std::env::var(key)
        .or_else(|_| std::env::var(key.to_ascii_uppercase()))
        .ok()
}

/// Resolved `database` section.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    password: Option<String>,
}

impl ConnectionSettings {
    /// Substitute every `"ENV"` entry through `resolver` and read the fields.
    ///
    /// `resolver` is asked for the entry's own key (`"password"`, ...) and
    /// returns `None` when that variable is not set.
    pub fn resolve(
        database: &Map<String, Value>,
        resolver: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let lookup = |key: &str| -> Result<Option<Value>> {
            match database.get(key) {
                Some(Value::String(s)) if s == ENV_SENTINEL => resolver(key)
                    .map(|v| Some(Value::String(v)))
                    .ok_or_else(|| Error::UnresolvedVariable {
                        key: key.to_string(),
                    }),
                Some(Value::Null) | None => Ok(None),
                Some(v) => Ok(Some(v.clone())),
            }
        };
        let text = |key: &str| -> Result<Option<String>> {
            match lookup(key)? {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s)),
                Some(other) => Err(Error::InvalidTemplate {
                    message: format!("database.{key} must be a string, got {other}"),
                }),
            }
        };

        let port = match lookup("port")? {
            None => DEFAULT_PORT,
            Some(v) => v
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| Error::InvalidTemplate {
                    message: format!("database.port is not a valid port: {v}"),
                })?,
        };

        Ok(Self {
            name: text("name")?.ok_or_else(|| Error::missing("database.name"))?,
            host: text("host")?.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            username: text("username")?.ok_or_else(|| Error::missing("database.username"))?,
            password: text("password")?,
        })
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.name);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
