//! File-based configuration.
//!
//! Every field is optional so a config file only needs to mention what it
//! changes. The binary lets command-line flags override file values.
//!
//! ```json
//! {
//!     "database_url": "sqlite:app.db",
//!     "dialect": "sqlite",
//!     "schema": "schema.json",
//!     "naming": {
//!         "strategy": "snake",
//!         "tables": { "Person": "people" }
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{ReconcileError, Result};
use crate::schema::Schema;
use crate::translate::{
    Identity, Lower, NamingStrategy, Overrides, Prefix, Rails, Snake, Translator,
};

/// Naming convention settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Base strategy.
    pub strategy: NamingStrategy,
    /// Table prefix for [`NamingStrategy::Prefix`].
    pub table_prefix: String,
    /// Column prefix for [`NamingStrategy::Prefix`].
    pub column_prefix: String,
    /// Logical table name to physical name.
    pub tables: HashMap<String, String>,
    /// Logical table name to (logical column name to physical name).
    pub columns: HashMap<String, HashMap<String, String>>,
}

impl NamingConfig {
    /// Builds the translator described by this configuration.
    #[must_use]
    pub fn translator(&self) -> Arc<dyn Translator> {
        let base: Arc<dyn Translator> = match self.strategy {
            NamingStrategy::Identity => Arc::new(Identity),
            NamingStrategy::Lower => Arc::new(Lower),
            NamingStrategy::Snake => Arc::new(Snake),
            NamingStrategy::Rails => Arc::new(Rails),
            NamingStrategy::Prefix => {
                Arc::new(Prefix::new(&self.table_prefix, &self.column_prefix))
            }
        };

        if self.tables.is_empty() && self.columns.is_empty() {
            return base;
        }

        let mut overrides = Overrides::new().fallback(base);
        for (logical, physical) in &self.tables {
            overrides = overrides.table(logical, physical);
        }
        for (table, columns) in &self.columns {
            for (logical, physical) in columns {
                overrides = overrides.column(table, logical, physical);
            }
        }
        Arc::new(overrides)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Connection URL.
    pub database_url: Option<String>,
    /// Dialect; inferred from the URL when absent.
    pub dialect: Option<Dialect>,
    /// Path of the JSON schema file.
    pub schema: Option<PathBuf>,
    /// Naming convention.
    pub naming: NamingConfig,
}

impl ReconcileConfig {
    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The dialect to use: the configured one, else inferred from the URL,
    /// else [`Dialect::Generic`].
    #[must_use]
    pub fn resolved_dialect(&self) -> Dialect {
        self.dialect
            .or_else(|| self.database_url.as_deref().and_then(Dialect::from_url))
            .unwrap_or_default()
    }

    /// Builds the translator.
    #[must_use]
    pub fn translator(&self) -> Arc<dyn Translator> {
        self.naming.translator()
    }

    /// Loads the schema file named by this configuration.
    pub fn load_schema(&self) -> Result<Schema> {
        let path = self
            .schema
            .as_ref()
            .ok_or_else(|| ReconcileError::Config("no schema file configured".to_string()))?;
        let text = read(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ReconcileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
