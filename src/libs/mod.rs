pub mod connection;
pub mod database;
pub mod error;
pub mod model;
pub mod query_builder;
pub mod schema;
pub mod template;

// Re-export them for easier access from the crate root
pub use connection::*;
pub use database::*;
pub use error::*;
pub use model::*;
pub use query_builder::*;
pub use schema::*;
pub use template::*;
