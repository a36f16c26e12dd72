//! MySQL dialect.
//!
//! Everything is read from `information_schema` for the connection's
//! default database. Catalog columns are cast to plain character or integer
//! types so they decode the same way on MySQL and MariaDB.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::AnyPool;

use crate::error::Result;
use crate::log::DecisionLog;
use crate::schema::{Column, Index, Schema, Table};
use crate::translate::Translator;

use super::{Alterer, Dialect, DialectProfile, IndexColumnRow};

const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = ?";

const COLUMN_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.columns \
     WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?";

const INDEX_COLUMNS: &str = "SELECT CAST(index_name AS CHAR), CAST(non_unique AS SIGNED), \
     CAST(column_name AS CHAR) \
     FROM information_schema.statistics \
     WHERE table_schema = DATABASE() AND table_name = ? \
     ORDER BY index_name, seq_in_index";

/// MySQL alterer.
pub struct MySqlAlterer {
    pool: AnyPool,
    naming: Arc<dyn Translator>,
    profile: DialectProfile,
    log: DecisionLog,
}

impl MySqlAlterer {
    /// Creates an alterer with the default MySQL profile.
    #[must_use]
    pub fn new(pool: AnyPool, naming: Arc<dyn Translator>, log: DecisionLog) -> Self {
        Self::with_profile(pool, naming, log, DialectProfile::mysql())
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
}

#[async_trait]
impl Alterer for MySqlAlterer {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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

    async fn has_table(&self, table: &Table) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(TABLE_EXISTS)
            .bind(self.naming.sql_table(&table.name))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
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

    async fn has_column(&self, table: &Table, column: &Column) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(COLUMN_EXISTS)
            .bind(self.naming.sql_table(&table.name))
            .bind(self.naming.sql_column(&table.name, &column.name))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
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

    async fn index_name(&self, table: &Table, index: &Index) -> Result<Option<String>> {
        let rows: Vec<(String, i64, Option<String>)> = sqlx::query_as(INDEX_COLUMNS)
            .bind(self.naming.sql_table(&table.name))
            .fetch_all(&self.pool)
            .await?;

        let rows = rows.into_iter().map(index_row);
        let columns = super::index_columns(self.naming.as_ref(), table, index);
        Ok(super::find_matching_index(rows, &columns, index.unique))
    }

    async fn has_index(&self, table: &Table, index: &Index) -> Result<bool> {
        super::check_index(self, table, index).await
    }

    async fn create_index(&self, table: &Table, index: &Index) -> Result<()> {
        super::add_index(self, table, index).await
    }

    async fn update_table(&self, table: &Table) -> Result<()> {
        super::reconcile_table(self, table).await
    }
}

/// Maps an `information_schema.statistics` row of (index, non_unique, column).
fn index_row((index, non_unique, column): (String, i64, Option<String>)) -> IndexColumnRow {
    // `non_unique` is inverted.
    IndexColumnRow {
        index,
        unique: non_unique == 0,
        column,
    }
}
