//! Error type shared by every part of the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Schema errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("a required parameter is missing: {parameter}")]
    MissingParameter { parameter: String },

    #[error("primary key '{column}' of table '{table}' must be defined in columns")]
    InvalidPrimaryKey { table: String, column: String },

    #[error("column '{column}' is declared twice in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("identity column '{column}' of table '{table}' must be defined in columns")]
    InvalidIdentity { table: String, column: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Statement errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("missing value for column '{column}' of table '{table}'")]
    MissingColumnValue { table: String, column: String },

    #[error("table '{table}' has {expected} primary key(s), got {actual} value(s)")]
    PrimaryKeyArityMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Registry / template errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("database is not initialized, connect or attach a connection first")]
    NotInitialized,

    #[error("no model named '{name}'")]
    UnknownModel { name: String },

    #[error("duplicate table name: {name}")]
    DuplicateTable { name: String },

    #[error("template variable '{key}' could not be resolved")]
    UnresolvedVariable { key: String },

    #[error("invalid template: {message}")]
    InvalidTemplate { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // IO / driver errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn missing(parameter: impl Into<String>) -> Self {
        Error::MissingParameter {
            parameter: parameter.into(),
        }
    }

    /// True for errors detected before any statement reached the database.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::Json(_) | Error::Database(_))
    }
}
