//! Reconciliation driver.
//!
//! [`Database`] compares a [`Schema`] with what the connected database
//! actually contains and issues the DDL needed to close the gap. Nothing is
//! recorded between runs: every run starts by asking the catalog.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dialect::{Alterer, Dialect};
use crate::error::{ReconcileError, Result};
use crate::log::{Decision, DecisionLog, DecisionSink};
use crate::schema::{Schema, Table};
use crate::translate::Translator;

/// Opens a pool for `url` with every compiled-in driver installed.
///
/// The pool holds a single connection: reconciliation is sequential, and
/// `sqlite::memory:` databases are private to their connection.
pub async fn connect(url: &str) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .map_err(|source| ReconcileError::Connection {
            url: url.to_string(),
            source,
        })
}

/// Drives reconciliation of one schema against one database.
pub struct Database {
    schema: Schema,
    pool: Option<AnyPool>,
    dialect: Dialect,
    naming: Arc<dyn Translator>,
    alterer: Option<Box<dyn Alterer>>,
    log: DecisionLog,
    cancel: Option<CancellationToken>,
    new_tables: Vec<String>,
    modified_tables: Vec<String>,
}

impl Database {
    /// Creates a driver; the alterer is built from `dialect` on first use.
    #[must_use]
    pub fn new(
        pool: AnyPool,
        schema: Schema,
        dialect: Dialect,
        naming: Arc<dyn Translator>,
    ) -> Self {
        Self {
            schema,
            pool: Some(pool),
            dialect,
            naming,
            alterer: None,
            log: DecisionLog::default(),
            cancel: None,
            new_tables: Vec::new(),
            modified_tables: Vec::new(),
        }
    }

    /// Creates a driver around an existing alterer, without a pool.
    #[must_use]
    pub fn from_alterer(schema: Schema, alterer: Box<dyn Alterer>) -> Self {
        let log = alterer.log().clone();
        Self {
            schema,
            pool: None,
            dialect: alterer.dialect(),
            naming: Arc::new(crate::translate::Identity),
            alterer: Some(alterer),
            log,
            cancel: None,
            new_tables: Vec::new(),
            modified_tables: Vec::new(),
        }
    }

    /// Uses `alterer` instead of the dialect's default one.
    #[must_use]
    pub fn with_alterer(mut self, alterer: Box<dyn Alterer>) -> Self {
        self.dialect = alterer.dialect();
        self.alterer = Some(alterer);
        self
    }

    /// Records decisions through `log`.
    ///
    /// An alterer passed to [`Database::with_alterer`] keeps its own log.
    #[must_use]
    pub fn with_log(mut self, log: DecisionLog) -> Self {
        self.log = log;
        self
    }

    /// Records decisions into `sink`.
    #[must_use]
    pub fn with_sink(self, sink: Arc<dyn DecisionSink>) -> Self {
        self.with_log(DecisionLog::new(sink))
    }

    /// Stops the run at the next table boundary once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The declared schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The dialect in use.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The decision log.
    #[must_use]
    pub fn log(&self) -> &DecisionLog {
        &self.log
    }

    /// Tables found missing by the last check, in declaration order.
    #[must_use]
    pub fn new_tables(&self) -> &[String] {
        &self.new_tables
    }

    /// Tables found lacking a column by the last check.
    #[must_use]
    pub fn modified_tables(&self) -> &[String] {
        &self.modified_tables
    }

    /// Compares the schema with the database.
    ///
    /// Returns `true` when every table and column exists. Fills
    /// [`Database::new_tables`] and [`Database::modified_tables`].
    pub async fn up_to_date(&mut self) -> Result<bool> {
        let alterer = self.take_alterer()?;
        let result = self.check(alterer.as_ref()).await;
        self.alterer = Some(alterer);
        result
    }

    /// Creates missing tables and adds missing columns and indexes.
    ///
    /// The first error ends the run. Nothing is rolled back; running again
    /// picks up where the failed run stopped.
    pub async fn migrate(&mut self) -> Result<()> {
        let alterer = self.take_alterer()?;
        let result = self.run(alterer.as_ref()).await;
        self.alterer = Some(alterer);
        result
    }

    fn take_alterer(&mut self) -> Result<Box<dyn Alterer>> {
        if let Some(alterer) = self.alterer.take() {
            return Ok(alterer);
        }
        let pool = self.pool.clone().ok_or_else(|| {
            ReconcileError::Config("no connection pool or alterer configured".to_string())
        })?;
        Ok(self
            .dialect
            .alterer(pool, Arc::clone(&self.naming), self.log.clone()))
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ReconcileError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn check(&mut self, alterer: &dyn Alterer) -> Result<bool> {
        self.new_tables.clear();
        self.modified_tables.clear();

        for table in &self.schema.tables {
            let exists = alterer.has_table(table).await?;
            self.log.record(Decision::TableChecked {
                table: table.name.clone(),
                exists,
            });
            if !exists {
                self.log.record(Decision::TableNew {
                    table: table.name.clone(),
                });
                self.new_tables.push(table.name.clone());
                continue;
            }

            let mut missing = None;
            for column in &table.columns {
                let exists = alterer.has_column(table, column).await?;
                self.log.record(Decision::ColumnChecked {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    exists,
                });
                if !exists {
                    missing = Some(column.name.clone());
                    break;
                }
            }

            match missing {
                Some(column) => {
                    self.log.record(Decision::TableModified {
                        table: table.name.clone(),
                        column,
                    });
                    self.modified_tables.push(table.name.clone());
                }
                None => self.log.record(Decision::TableCurrent {
                    table: table.name.clone(),
                }),
            }
        }

        Ok(self.new_tables.is_empty() && self.modified_tables.is_empty())
    }

    async fn run(&mut self, alterer: &dyn Alterer) -> Result<()> {
        self.schema.validate()?;

        if self.check(alterer).await? {
            info!(dialect = %self.dialect, "Database is up to date");
            return Ok(());
        }
        info!(
            new = self.new_tables.len(),
            modified = self.modified_tables.len(),
            "Reconciling database"
        );

        self.create_new_tables(alterer).await?;

        for name in &self.modified_tables {
            self.check_cancelled()?;
            let table = self.declared(name)?;
            alterer.update_table(table).await?;
        }

        info!("Reconciliation complete");
        Ok(())
    }

    fn declared(&self, name: &str) -> Result<&Table> {
        self.schema
            .get_table(name)
            .ok_or_else(|| ReconcileError::MissingTable {
                table: name.to_string(),
                referenced_by: name.to_string(),
            })
    }

    /// Parents of `table` that are still waiting to be created.
    fn pending_parents(&self, table: &Table, created: &HashSet<String>) -> Vec<String> {
        table
            .parents()
            .filter(|parent| {
                *parent != table.name
                    && self.new_tables.iter().any(|t| t == parent)
                    && !created.contains(*parent)
            })
            .map(str::to_string)
            .collect()
    }

    async fn create_new_tables(&self, alterer: &dyn Alterer) -> Result<()> {
        let mut created = HashSet::new();
        let mut waiting = VecDeque::new();

        for name in &self.new_tables {
            self.check_cancelled()?;
            let table = self.declared(name)?;
            let pending = self.pending_parents(table, &created);
            if pending.is_empty() {
                alterer.create_table(&self.schema, table).await?;
                created.insert(table.name.clone());
            } else {
                self.log.record(Decision::TableDeferred {
                    table: table.name.clone(),
                    waiting_on: pending,
                });
                waiting.push_back(table);
            }
        }

        // Rotate the queue until it drains; a full pass without creating
        // anything means the remaining tables reference each other.
        let mut stalled = 0;
        while let Some(table) = waiting.pop_front() {
            self.check_cancelled()?;
            if self.pending_parents(table, &created).is_empty() {
                alterer.create_table(&self.schema, table).await?;
                created.insert(table.name.clone());
                stalled = 0;
                continue;
            }

            waiting.push_back(table);
            stalled += 1;
            if stalled >= waiting.len() {
                let tables: Vec<String> = waiting.iter().map(|t| t.name.clone()).collect();
                debug!(?tables, "No table in the wait queue can be created");
                return Err(ReconcileError::CircularDependency { tables });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::dialect::{self, DialectProfile};
    use crate::log::MemorySink;
    use crate::schema::{Column, ColumnType, Index};
    use crate::translate::Identity;

    /// In-memory catalog standing in for a real database.
    #[derive(Default)]
    struct Catalog {
        tables: HashMap<String, Vec<String>>,
        indexes: Vec<(String, Vec<String>, bool)>,
        executed: Vec<String>,
    }

    struct FakeAlterer {
        catalog: Arc<Mutex<Catalog>>,
        profile: DialectProfile,
        log: DecisionLog,
        cancel_after_create: Option<CancellationToken>,
        unsupported: bool,
    }

    impl FakeAlterer {
        fn new(catalog: Arc<Mutex<Catalog>>, log: DecisionLog) -> Self {
            Self {
                catalog,
                profile: DialectProfile::sqlite(),
                log,
                cancel_after_create: None,
                unsupported: false,
            }
        }
    }

    #[async_trait]
    impl Alterer for FakeAlterer {
        fn dialect(&self) -> Dialect {
            if self.unsupported {
                Dialect::Generic
            } else {
                Dialect::Sqlite
            }
        }

        fn profile(&self) -> &DialectProfile {
            &self.profile
        }

        fn naming(&self) -> &dyn Translator {
            &Identity
        }

        fn log(&self) -> &DecisionLog {
            &self.log
        }

        async fn execute(&self, sql: &str) -> Result<()> {
            self.catalog.lock().unwrap().executed.push(sql.to_string());
            Ok(())
        }

        async fn has_table(&self, table: &Table) -> Result<bool> {
            if self.unsupported {
                return Err(ReconcileError::Unsupported {
                    dialect: "generic",
                    operation: "has_table",
                });
            }
            Ok(self.catalog.lock().unwrap().tables.contains_key(&table.name))
        }

        async fn create_table(&self, schema: &Schema, table: &Table) -> Result<()> {
            dialect::create_table_with_indexes(self, schema, table).await?;
            let columns = table.columns.iter().map(|c| c.name.clone()).collect();
            self.catalog
                .lock()
                .unwrap()
                .tables
                .insert(table.name.clone(), columns);
            if let Some(token) = &self.cancel_after_create {
                token.cancel();
            }
            Ok(())
        }

        async fn remove_table(&self, table: &Table) -> Result<()> {
            dialect::remove_table(self, table).await
        }

        async fn rename_table(&self, table: &Table, old_name: &str) -> Result<()> {
            dialect::rename_table(self, table, old_name).await
        }

        async fn has_column(&self, table: &Table, column: &Column) -> Result<bool> {
            Ok(self
                .catalog
                .lock()
                .unwrap()
                .tables
                .get(&table.name)
                .is_some_and(|cols| cols.contains(&column.name)))
        }

        async fn create_column(&self, table: &Table, column: &Column) -> Result<()> {
            dialect::add_column(self, table, column).await?;
            if let Some(cols) = self.catalog.lock().unwrap().tables.get_mut(&table.name) {
                cols.push(column.name.clone());
            }
            Ok(())
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
            let catalog = self.catalog.lock().unwrap();
            Ok(catalog
                .indexes
                .iter()
                .find(|(t, cols, unique)| {
                    *t == table.name && *cols == index.columns && *unique == index.unique
                })
                .map(|_| dialect::index_name_for(&Identity, table, index)))
        }

        async fn has_index(&self, table: &Table, index: &Index) -> Result<bool> {
            dialect::check_index(self, table, index).await
        }

        async fn create_index(&self, table: &Table, index: &Index) -> Result<()> {
            dialect::add_index(self, table, index).await?;
            self.catalog.lock().unwrap().indexes.push((
                table.name.clone(),
                index.columns.clone(),
                index.unique,
            ));
            Ok(())
        }

        async fn update_table(&self, table: &Table) -> Result<()> {
            dialect::reconcile_table(self, table).await
        }
    }

    fn table(name: &str) -> Table {
        Table::new(name).column(Column::new("ID", ColumnType::Integer))
    }

    fn driver(schema: Schema) -> (Database, Arc<Mutex<Catalog>>, Arc<MemorySink>) {
        let catalog = Arc::new(Mutex::new(Catalog::default()));
        let sink = Arc::new(MemorySink::new());
        let log = DecisionLog::new(sink.clone());
        let alterer = FakeAlterer::new(catalog.clone(), log);
        (
            Database::from_alterer(schema, Box::new(alterer)),
            catalog,
            sink,
        )
    }

    fn created_tables(sink: &MemorySink) -> Vec<String> {
        sink.decisions()
            .into_iter()
            .filter_map(|d| match d {
                Decision::TableCreated { table, .. } => Some(table),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_database_is_not_up_to_date() {
        let schema = Schema::new().table(table("A")).table(table("B"));
        let (mut db, _, _) = driver(schema);

        assert!(!db.up_to_date().await.unwrap());
        assert_eq!(db.new_tables(), ["A", "B"]);
        assert!(db.modified_tables().is_empty());
    }

    #[tokio::test]
    async fn test_parent_created_before_child() {
        let schema = Schema::new()
            .table(
                table("B")
                    .column(Column::new("AID", ColumnType::Integer))
                    .child_of("A", "AID"),
            )
            .table(table("A"));
        let (mut db, _, sink) = driver(schema);

        db.migrate().await.unwrap();

        assert_eq!(created_tables(&sink), vec!["A", "B"]);
        assert!(sink.decisions().iter().any(|d| matches!(
            d,
            Decision::TableDeferred { table, waiting_on } if table == "B" && waiting_on == &["A"]
        )));
    }

    #[tokio::test]
    async fn test_existing_parent_is_ready() {
        let schema = Schema::new()
            .table(
                table("B")
                    .column(Column::new("AID", ColumnType::Integer))
                    .child_of("A", "AID"),
            )
            .table(table("A"));
        let (mut db, catalog, sink) = driver(schema);
        catalog
            .lock()
            .unwrap()
            .tables
            .insert("A".to_string(), vec!["ID".to_string()]);

        db.migrate().await.unwrap();

        assert_eq!(created_tables(&sink), vec!["B"]);
        assert!(!sink
            .decisions()
            .iter()
            .any(|d| matches!(d, Decision::TableDeferred { .. })));
    }

    #[tokio::test]
    async fn test_self_reference_is_ready() {
        let schema = Schema::new().table(
            table("Node")
                .column(Column::new("ParentID", ColumnType::Integer))
                .child_of("Node", "ParentID"),
        );
        let (mut db, _, sink) = driver(schema);

        db.migrate().await.unwrap();
        assert_eq!(created_tables(&sink), vec!["Node"]);
    }

    #[tokio::test]
    async fn test_chain_in_reverse_order() {
        let schema = Schema::new()
            .table(
                table("C")
                    .column(Column::new("BID", ColumnType::Integer))
                    .child_of("B", "BID"),
            )
            .table(
                table("B")
                    .column(Column::new("AID", ColumnType::Integer))
                    .belongs_to("A", "AID"),
            )
            .table(table("A"));
        let (mut db, _, sink) = driver(schema);

        db.migrate().await.unwrap();
        assert_eq!(created_tables(&sink), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_cycle_fails_fast() {
        let schema = Schema::new()
            .table(
                table("A")
                    .column(Column::new("BID", ColumnType::Integer))
                    .child_of("B", "BID"),
            )
            .table(
                table("B")
                    .column(Column::new("AID", ColumnType::Integer))
                    .child_of("A", "AID"),
            )
            .table(table("C"));
        let (mut db, catalog, _) = driver(schema);

        let err = db.migrate().await.unwrap_err();
        match err {
            ReconcileError::CircularDependency { tables } => {
                assert_eq!(tables, vec!["A", "B"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Tables outside the cycle were still created.
        assert!(catalog.lock().unwrap().tables.contains_key("C"));
    }

    #[tokio::test]
    async fn test_modified_table_gets_missing_column_and_index() {
        let schema = Schema::new().table(
            table("User")
                .column(Column::new("Name", ColumnType::Varchar).length(80))
                .column(Column::new("EMail", ColumnType::Varchar).length(120))
                .index(Index::unique(["EMail"])),
        );
        let (mut db, catalog, sink) = driver(schema);
        catalog
            .lock()
            .unwrap()
            .tables
            .insert("User".to_string(), vec!["ID".to_string(), "Name".to_string()]);

        assert!(!db.up_to_date().await.unwrap());
        assert_eq!(db.modified_tables(), ["User"]);

        db.migrate().await.unwrap();
        assert_eq!(
            sink.statements(),
            vec![
                "ALTER TABLE \"User\" ADD COLUMN \"EMail\" VARCHAR(120)",
                "CREATE UNIQUE INDEX \"idx_User_EMail\" ON \"User\" (\"EMail\")",
            ]
        );
        assert!(db.up_to_date().await.unwrap());
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let schema = Schema::new()
            .table(table("A").index(Index::new(["ID"])))
            .table(
                table("B")
                    .column(Column::new("AID", ColumnType::Integer))
                    .child_of("A", "AID"),
            );
        let (mut db, catalog, sink) = driver(schema);

        db.migrate().await.unwrap();
        let executed = catalog.lock().unwrap().executed.len();
        assert_eq!(executed, 3);

        sink.clear();
        db.migrate().await.unwrap();
        assert!(sink.statements().is_empty());
        assert_eq!(catalog.lock().unwrap().executed.len(), executed);
    }

    #[tokio::test]
    async fn test_schema_errors_before_ddl() {
        let schema = Schema::new().table(
            table("Post")
                .column(Column::new("UserID", ColumnType::Integer))
                .child_of("User", "UserID"),
        );
        let (mut db, catalog, _) = driver(schema);

        let err = db.migrate().await.unwrap_err();
        assert!(err.is_schema_error());
        assert!(catalog.lock().unwrap().executed.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_between_tables() {
        let catalog = Arc::new(Mutex::new(Catalog::default()));
        let token = CancellationToken::new();
        let mut alterer = FakeAlterer::new(catalog.clone(), DecisionLog::default());
        alterer.cancel_after_create = Some(token.clone());

        let schema = Schema::new().table(table("A")).table(table("B"));
        let mut db = Database::from_alterer(schema, Box::new(alterer)).with_cancellation(token);

        let err = db.migrate().await.unwrap_err();
        assert!(matches!(err, ReconcileError::Cancelled));

        let catalog = catalog.lock().unwrap();
        assert!(catalog.tables.contains_key("A"));
        assert!(!catalog.tables.contains_key("B"));
    }

    #[tokio::test]
    async fn test_unsupported_dialect_surfaces() {
        let catalog = Arc::new(Mutex::new(Catalog::default()));
        let mut alterer = FakeAlterer::new(catalog, DecisionLog::default());
        alterer.unsupported = true;

        let mut db = Database::from_alterer(Schema::new().table(table("A")), Box::new(alterer));
        assert_eq!(db.dialect(), Dialect::Generic);

        let err = db.up_to_date().await.unwrap_err();
        assert!(matches!(err, ReconcileError::Unsupported { .. }));
    }
}
