//! Generic dialect.
//!
//! Writes ANSI-style DDL but has no catalog to read. Every existence check
//! fails with [`ReconcileError::Unsupported`] instead of guessing, so a run
//! against an unknown database never assumes a table is missing.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::AnyPool;

use crate::error::{ReconcileError, Result};
use crate::log::DecisionLog;
use crate::schema::{Column, Index, Schema, Table};
use crate::translate::Translator;

use super::{Alterer, Dialect, DialectProfile};

/// Fallback alterer.
pub struct GenericAlterer {
    pool: AnyPool,
    naming: Arc<dyn Translator>,
    profile: DialectProfile,
    log: DecisionLog,
}

impl GenericAlterer {
    /// Creates an alterer with the generic profile.
    #[must_use]
    pub fn new(pool: AnyPool, naming: Arc<dyn Translator>, log: DecisionLog) -> Self {
        Self::with_profile(pool, naming, log, DialectProfile::generic())
    }

    /// Creates an alterer with a custom profile.
    #[must_use]
    pub fn with_profile(
        pool: AnyPool,
        naming: Arc<dyn Translator>,
        log: DecisionLog,
        profile: DialectProfile,
    ) -> Self {
        Self {
            pool,
            naming,
            profile,
            log,
        }
    }

    fn unsupported(operation: &'static str) -> ReconcileError {
        ReconcileError::Unsupported {
            dialect: Dialect::Generic.name(),
            operation,
        }
    }
}

#[async_trait]
impl Alterer for GenericAlterer {
    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    fn profile(&self) -> &DialectProfile {
        &self.profile
    }

    fn naming(&self) -> &dyn Translator {
        self.naming.as_ref()
    }

    fn log(&self) -> &DecisionLog {
        &self.log
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        super::execute_ddl(&self.pool, sql).await
    }

    async fn has_table(&self, _table: &Table) -> Result<bool> {
        Err(Self::unsupported("has_table"))
    }

    async fn create_table(&self, schema: &Schema, table: &Table) -> Result<()> {
        super::create_table_with_indexes(self, schema, table).await
    }

    async fn remove_table(&self, table: &Table) -> Result<()> {
        super::remove_table(self, table).await
    }

    async fn rename_table(&self, table: &Table, old_name: &str) -> Result<()> {
        super::rename_table(self, table, old_name).await
    }

    async fn has_column(&self, _table: &Table, _column: &Column) -> Result<bool> {
        Err(Self::unsupported("has_column"))
    }

    async fn create_column(&self, table: &Table, column: &Column) -> Result<()> {
        super::add_column(self, table, column).await
    }

    async fn rename_column(&self, _table: &Table, _column: &Column) -> Result<()> {
        Ok(())
    }

    async fn remove_column(&self, _table: &Table, _column: &Column) -> Result<()> {
        Ok(())
    }

    async fn modify_column(&self, _table: &Table, _column: &Column) -> Result<()> {
        Ok(())
    }

    async fn index_name(&self, _table: &Table, _index: &Index) -> Result<Option<String>> {
        Err(Self::unsupported("index_name"))
    }

    async fn has_index(&self, _table: &Table, _index: &Index) -> Result<bool> {
        Err(Self::unsupported("has_index"))
    }

    async fn create_index(&self, table: &Table, index: &Index) -> Result<()> {
        super::add_index(self, table, index).await
    }

    async fn update_table(&self, table: &Table) -> Result<()> {
        super::reconcile_table(self, table).await
    }
}
