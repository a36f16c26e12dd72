//! PostgreSQL dialect.
//!
//! Tables and columns come from `information_schema`, indexes from
//! `pg_index`. Every lookup is restricted to the current schema.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::AnyPool;

use crate::error::Result;
use crate::log::DecisionLog;
use crate::schema::{Column, Index, Schema, Table};
use crate::translate::Translator;

use super::{Alterer, Dialect, DialectProfile, IndexColumnRow};

const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name::text = $1";

const COLUMN_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name::text = $1 AND column_name::text = $2";

const INDEX_COLUMNS: &str = "SELECT i.relname::text, ix.indisunique, a.attname::text \
     FROM pg_index ix \
     JOIN pg_class t ON t.oid = ix.indrelid \
     JOIN pg_class i ON i.oid = ix.indexrelid \
     JOIN pg_namespace n ON n.oid = t.relnamespace \
     JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) ON TRUE \
     LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
     WHERE t.relname::text = $1 AND n.nspname = current_schema() \
     ORDER BY i.relname, k.ord";

/// PostgreSQL alterer.
pub struct PostgresAlterer {
    pool: AnyPool,
    naming: Arc<dyn Translator>,
    profile: DialectProfile,
    log: DecisionLog,
}

impl PostgresAlterer {
    /// Creates an alterer with the default PostgreSQL profile.
    #[must_use]
    pub fn new(pool: AnyPool, naming: Arc<dyn Translator>, log: DecisionLog) -> Self {
        Self::with_profile(pool, naming, log, DialectProfile::postgres())
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
impl Alterer for PostgresAlterer {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
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
        let rows: Vec<(String, bool, Option<String>)> = sqlx::query_as(INDEX_COLUMNS)
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

/// Maps a `pg_index` row of (index, unique, column).
fn index_row((index, unique, column): (String, bool, Option<String>)) -> IndexColumnRow {
    IndexColumnRow {
        index,
        unique,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::find_matching_index;

    #[test]
    fn test_index_row() {
        let row = index_row(("Post_UserID_Title".to_string(), true, Some("UserID".to_string())));
        assert_eq!(
            row,
            IndexColumnRow {
                index: "Post_UserID_Title".to_string(),
                unique: true,
                column: Some("UserID".to_string()),
            }
        );

        let row = index_row(("Post_lower_title".to_string(), false, None));
        assert!(!row.unique);
        assert_eq!(row.column, None);
    }

    #[test]
    fn test_index_rows_match() {
        let rows = vec![
            ("Post_pkey".to_string(), true, Some("ID".to_string())),
            ("Post_UserID_Title".to_string(), true, Some("UserID".to_string())),
            ("Post_UserID_Title".to_string(), true, Some("Title".to_string())),
        ];
        let columns = vec!["UserID".to_string(), "Title".to_string()];
        assert_eq!(
            find_matching_index(rows.into_iter().map(index_row), &columns, true),
            Some("Post_UserID_Title".to_string())
        );
    }
}
