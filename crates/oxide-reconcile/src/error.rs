//! Error types for the reconciliation engine.

use std::path::PathBuf;

/// Errors that can occur while reconciling a schema against a database.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The dialect cannot answer an introspection question.
    ///
    /// This is not the same as "the object does not exist": the generic
    /// dialect has no catalog to look at.
    #[error("Dialect '{dialect}' does not support {operation}; use a database-specific dialect")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// The capability that was requested.
        operation: &'static str,
    },

    /// Could not open a connection to the database.
    #[error("Failed to connect to '{url}': {source}")]
    Connection {
        /// Connection URL.
        url: String,
        /// The driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A catalog query failed.
    #[error("Introspection failed: {0}")]
    Introspection(#[from] sqlx::Error),

    /// The database rejected a generated DDL statement.
    #[error("Failed to execute `{sql}`: {source}")]
    Ddl {
        /// The statement that was sent.
        sql: String,
        /// The driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A relationship or index references a table missing from the schema.
    #[error("Table '{table}' referenced by '{referenced_by}' is not declared in the schema")]
    MissingTable {
        /// The table that could not be found.
        table: String,
        /// The table holding the reference.
        referenced_by: String,
    },

    /// A relationship or index references a column missing from its table.
    #[error("Column '{table}.{column}' is not declared in the schema")]
    MissingColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A table was declared without any column, so it has no primary key.
    #[error("Table '{0}' declares no columns")]
    EmptyTable(String),

    /// Two tables share one name.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// A relationship is declared on a table that is not its foreign-key side
    /// (`child_of`, `belongs_to`) or its referenced side (`has_many`, `has_one`).
    #[error("Relationship '{parent}' -> '{child}' declared on '{table}' does not involve it")]
    MisplacedRelationship {
        /// The table declaring the relationship.
        table: String,
        /// Referenced table.
        parent: String,
        /// Table holding the foreign key column.
        child: String,
    },

    /// New tables reference each other through foreign keys.
    #[error("Circular foreign key dependency between tables: {}", .tables.join(", "))]
    CircularDependency {
        /// Tables that could not be ordered.
        tables: Vec<String>,
    },

    /// The run was cancelled between two steps.
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (reading schema or configuration files).
    #[error("IO error on '{path}': {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Returns the SQL text attached to this error, if any.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Ddl { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Returns whether this is a schema integrity failure.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTable { .. }
                | Self::MissingColumn { .. }
                | Self::EmptyTable(_)
                | Self::DuplicateTable(_)
                | Self::MisplacedRelationship { .. }
        )
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
