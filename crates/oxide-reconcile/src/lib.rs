//! Declarative schema reconciliation for SQL databases.
//!
//! `oxide-reconcile` takes a description of the tables an application needs
//! and brings a live database in line with it:
//! - Missing tables are created, parents before children
//! - Missing columns are added to existing tables
//! - Missing indexes are created, matched by columns rather than by name
//!
//! Nothing is ever dropped or altered implicitly, and there is no migration
//! history: each run asks the database catalog what exists, so running it
//! twice is harmless.
//!
//! # Architecture
//!
//! - **Schema** - Tables, columns, indexes and foreign-key relationships
//! - **Translator** - Maps logical names to physical identifiers
//! - **Dialect** - Catalog introspection and DDL for SQLite, PostgreSQL, MySQL
//! - **Database** - The driver deciding what to create and in which order
//! - **Decision log** - Every check and statement, as `tracing` events
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oxide_reconcile::prelude::*;
//!
//! let schema = Schema::new()
//!     .table(
//!         Table::new("User")
//!             .column(Column::new("ID", ColumnType::Integer))
//!             .column(Column::new("Name", ColumnType::Varchar).length(255)),
//!     )
//!     .table(
//!         Table::new("Post")
//!             .column(Column::new("ID", ColumnType::Integer))
//!             .column(Column::new("UserID", ColumnType::Integer))
//!             .child_of("User", "UserID"),
//!     );
//!
//! let pool = connect("sqlite:app.db").await?;
//! let mut db = Database::new(pool, schema, Dialect::Sqlite, Arc::new(Snake));
//! db.migrate().await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Report what is missing
//! oxide-reconcile --database sqlite:app.db --schema schema.json check
//!
//! # Create what is missing
//! oxide-reconcile --database sqlite:app.db --schema schema.json --naming snake migrate
//! ```

pub mod config;
pub mod database;
pub mod dialect;
pub mod error;
pub mod log;
pub mod schema;
pub mod translate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{NamingConfig, ReconcileConfig};
    pub use crate::database::{Database, connect};
    pub use crate::dialect::{
        Alterer, Dialect, DialectProfile, GenericAlterer, MySqlAlterer, PostgresAlterer,
        SqliteAlterer,
    };
    pub use crate::error::{ReconcileError, Result};
    pub use crate::log::{Decision, DecisionLog, DecisionSink, Discard, MemorySink};
    pub use crate::schema::{Column, ColumnType, Index, Relationship, Schema, Table};
    pub use crate::translate::{
        Identity, Lower, NamingStrategy, Overrides, Prefix, Rails, Snake, Translator,
    };
}
