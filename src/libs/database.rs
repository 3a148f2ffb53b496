use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::libs::connection::{Connection, PgConnection};
use crate::libs::error::{Error, Result};
use crate::libs::model::Model;
use crate::libs::schema::TableSchema;
use crate::libs::template::{ConnectionSettings, Template};

/// Every table of a template, plus the connection they share once attached.
pub struct Database {
    pub settings: ConnectionSettings,
    schemas: Vec<TableSchema>,
    conn: Option<Arc<dyn Connection>>,
    models: Vec<Model>,
}

impl Database {
    /// Resolve connection settings and validate every table definition.
    /// Nothing is opened yet.
    pub fn from_template(
        template: &Template,
        resolver: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let settings = ConnectionSettings::resolve(&template.database, resolver)?;

        let mut schemas: Vec<TableSchema> = Vec::with_capacity(template.tables.len());
        for def in &template.tables {
            let schema = def.to_schema()?;
            if schemas.iter().any(|s| s.name() == schema.name()) {
                return Err(Error::DuplicateTable {
                    name: schema.name().to_string(),
                });
            }
            schemas.push(schema);
        }

        Ok(Self {
            settings,
            schemas,
            conn: None,
            models: Vec::new(),
        })
    }

    pub fn load(
        path: impl AsRef<Path>,
        resolver: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        Self::from_template(&Template::from_file(path)?, resolver)
    }

    /// Open a PostgreSQL pool from the settings and build the models on it.
    pub async fn connect(&mut self) -> Result<()> {
        let conn = PgConnection::new(self.settings.connect_options());
        conn.connect().await?;
        self.attach(Arc::new(conn));
        Ok(())
    }

    /// Build the models on an existing connection, replacing any previous one.
    pub fn attach(&mut self, conn: Arc<dyn Connection>) {
        self.models = self
            .schemas
            .iter()
            .map(|s| Model::new(s.clone(), conn.clone()))
            .collect();
        self.conn = Some(conn);
        info!(
            database = %self.settings.name,
            models = self.models.len(),
            "models ready"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    pub fn schemas(&self) -> &[TableSchema] {
        &self.schemas
    }

    pub fn models(&self) -> Result<&[Model]> {
        if self.conn.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(&self.models)
    }

    pub fn model(&self, name: &str) -> Result<&Model> {
        self.models()?
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| Error::UnknownModel {
                name: name.to_string(),
            })
    }

    // -------- Bulk DDL --------
    // Each table runs on its own; the first failure stops the loop and
    // leaves earlier tables as they are.
    pub async fn create_models(&self) -> Result<()> {
        for model in self.models()? {
            model.create_table().await?;
            info!(table = model.name(), "table created");
        }
        Ok(())
    }

    pub async fn drop_models(&self) -> Result<()> {
        for model in self.models()? {
            model.drop_table().await?;
            info!(table = model.name(), "table dropped");
        }
        Ok(())
    }

    pub async fn reset_models(&self) -> Result<()> {
        for model in self.models()? {
            model.drop_table().await?;
            model.create_table().await?;
            info!(table = model.name(), "table reset");
        }
        Ok(())
    }

    pub async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
        self.models.clear();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("settings", &self.settings)
            .field("schemas", &self.schemas)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
