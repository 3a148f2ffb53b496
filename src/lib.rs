//! schemorm: load a JSON table template, then create, drop, insert, upsert,
//! delete and select through safely quoted, parameterized SQL.

pub mod libs;

pub use libs::*;
