//! SQLite dialect.
//!
//! The catalog is read through `sqlite_master` and the `pragma_*`
//! table-valued functions, which accept bound parameters.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::AnyPool;

use crate::error::Result;
use crate::log::DecisionLog;
use crate::schema::{Column, Index, Schema, Table};
use crate::translate::Translator;

use super::{Alterer, Dialect, DialectProfile, IndexColumnRow};

const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?";

const COLUMN_EXISTS: &str = "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?";

const INDEX_COLUMNS: &str = "SELECT il.name, il.\"unique\", ii.name \
     FROM pragma_index_list(?) AS il, pragma_index_info(il.name) AS ii \
     ORDER BY il.name, ii.seqno";

/// SQLite alterer.
pub struct SqliteAlterer {
    pool: AnyPool,
    naming: Arc<dyn Translator>,
    profile: DialectProfile,
    log: DecisionLog,
}

impl SqliteAlterer {
    /// Creates an alterer with the default SQLite profile.
    #[must_use]
    pub fn new(pool: AnyPool, naming: Arc<dyn Translator>, log: DecisionLog) -> Self {
        Self::with_profile(pool, naming, log, DialectProfile::sqlite())
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
impl Alterer for SqliteAlterer {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
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

/// Maps a `pragma_index_list`/`pragma_index_info` row of (index, unique, column).
fn index_row((index, unique, column): (String, i64, Option<String>)) -> IndexColumnRow {
    IndexColumnRow {
        index,
        unique: unique != 0,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_row() {
        let row = index_row(("Post_Title".to_string(), 1, Some("Title".to_string())));
        assert!(row.unique);
        let row = index_row(("Post_Title".to_string(), 0, None));
        assert!(!row.unique);
        assert_eq!(row.column, None);
    }
}
