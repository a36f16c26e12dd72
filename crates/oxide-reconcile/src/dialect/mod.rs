//! Database dialect implementations.
//!
//! Each dialect implements the [`Alterer`] capability set: catalog
//! introspection ("does this table/column/index exist?") and DDL execution.
//! Statement text is built by the free functions in this module from a
//! per-dialect [`DialectProfile`], so the dialects only differ where the
//! databases actually differ.

mod generic;
mod mysql;
mod postgres;
mod sqlite;

pub use generic::GenericAlterer;
pub use mysql::MySqlAlterer;
pub use postgres::PostgresAlterer;
pub use sqlite::SqliteAlterer;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use tracing::info;

use crate::error::{ReconcileError, Result};
use crate::log::{Decision, DecisionLog};
use crate::schema::{Column, ColumnType, Index, Schema, Table};
use crate::translate::Translator;

/// Supported database systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Fallback: can write DDL but cannot introspect.
    #[default]
    Generic,
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    #[serde(alias = "postgresql")]
    Postgres,
    /// MySQL / MariaDB.
    MySql,
}

impl Dialect {
    /// Returns the dialect name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        }
    }

    /// Guesses the dialect from a connection URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres") {
            Some(Self::Postgres)
        } else if url.starts_with("mysql") || url.starts_with("mariadb") {
            Some(Self::MySql)
        } else if url.starts_with("sqlite") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }

    /// Returns the default DDL profile of this dialect.
    #[must_use]
    pub fn profile(&self) -> DialectProfile {
        match self {
            Self::Generic => DialectProfile::generic(),
            Self::Sqlite => DialectProfile::sqlite(),
            Self::Postgres => DialectProfile::postgres(),
            Self::MySql => DialectProfile::mysql(),
        }
    }

    /// Builds the alterer for this dialect.
    #[must_use]
    pub fn alterer(
        &self,
        pool: AnyPool,
        naming: Arc<dyn Translator>,
        log: DecisionLog,
    ) -> Box<dyn Alterer> {
        match self {
            Self::Generic => Box::new(GenericAlterer::new(pool, naming, log)),
            Self::Sqlite => Box::new(SqliteAlterer::new(pool, naming, log)),
            Self::Postgres => Box::new(PostgresAlterer::new(pool, naming, log)),
            Self::MySql => Box::new(MySqlAlterer::new(pool, naming, log)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(ReconcileError::Config(format!("unknown dialect '{other}'"))),
        }
    }
}

/// How a dialect spells DDL.
///
/// Profiles are plain values built when the driver is set up; nothing about
/// a dialect lives in global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectProfile {
    /// Dialect name, for messages.
    pub name: &'static str,
    /// Definition of an integer primary key; `{column}` is replaced by the
    /// quoted column name.
    pub primary_key_clause: String,
    /// Types that accept a `(length)` suffix.
    pub lengthable: Vec<ColumnType>,
    /// Lengths used when a lengthable type is declared without one.
    pub default_lengths: HashMap<ColumnType, u32>,
    /// SQL spelling of each type.
    pub type_names: HashMap<ColumnType, String>,
    /// Opening and closing identifier quotes.
    pub quotes: (char, char),
}

impl DialectProfile {
    fn base(name: &'static str, primary_key_clause: &str) -> Self {
        let type_names = [
            (ColumnType::Integer, "INTEGER"),
            (ColumnType::Varchar, "VARCHAR"),
            (ColumnType::Text, "TEXT"),
            (ColumnType::Timestamp, "TIMESTAMP"),
            (ColumnType::Real, "REAL"),
            (ColumnType::Double, "DOUBLE PRECISION"),
            (ColumnType::Boolean, "BOOLEAN"),
            (ColumnType::Blob, "BLOB"),
        ]
        .into_iter()
        .map(|(t, n)| (t, n.to_string()))
        .collect();

        Self {
            name,
            primary_key_clause: primary_key_clause.to_string(),
            lengthable: vec![ColumnType::Varchar],
            default_lengths: HashMap::new(),
            type_names,
            quotes: ('"', '"'),
        }
    }

    /// ANSI-ish DDL with no auto-increment.
    #[must_use]
    pub fn generic() -> Self {
        Self::base("generic", "{column} INTEGER PRIMARY KEY")
    }

    /// SQLite DDL.
    #[must_use]
    pub fn sqlite() -> Self {
        Self::base("sqlite", "{column} INTEGER PRIMARY KEY AUTOINCREMENT")
            .with_type_name(ColumnType::Double, "DOUBLE")
    }

    /// PostgreSQL DDL.
    #[must_use]
    pub fn postgres() -> Self {
        Self::base("postgres", "{column} SERIAL PRIMARY KEY")
            .with_type_name(ColumnType::Blob, "BYTEA")
    }

    /// MySQL DDL. `VARCHAR` needs a length, integers take a display width.
    #[must_use]
    pub fn mysql() -> Self {
        let mut profile = Self::base("mysql", "{column} INTEGER PRIMARY KEY AUTO_INCREMENT")
            .with_type_name(ColumnType::Real, "FLOAT")
            .with_type_name(ColumnType::Double, "DOUBLE")
            .with_lengthable(ColumnType::Integer);
        profile.default_lengths.insert(ColumnType::Varchar, 255);
        profile.quotes = ('`', '`');
        profile
    }

    /// Overrides the primary key template.
    #[must_use]
    pub fn with_primary_key_clause(mut self, clause: impl Into<String>) -> Self {
        self.primary_key_clause = clause.into();
        self
    }

    /// Allows a `(length)` suffix on `column_type`.
    #[must_use]
    pub fn with_lengthable(mut self, column_type: ColumnType) -> Self {
        if !self.lengthable.contains(&column_type) {
            self.lengthable.push(column_type);
        }
        self
    }

    /// Overrides the SQL spelling of a type.
    #[must_use]
    pub fn with_type_name(mut self, column_type: ColumnType, name: impl Into<String>) -> Self {
        self.type_names.insert(column_type, name.into());
        self
    }

    /// Whether `column_type` accepts a length suffix.
    #[must_use]
    pub fn is_lengthable(&self, column_type: ColumnType) -> bool {
        self.lengthable.contains(&column_type)
    }

    /// SQL spelling of a type, without length.
    #[must_use]
    pub fn type_name(&self, column_type: ColumnType) -> String {
        self.type_names
            .get(&column_type)
            .cloned()
            .unwrap_or_else(|| column_type.as_str().to_uppercase())
    }

    /// SQL type of a column, with a length suffix where allowed.
    #[must_use]
    pub fn column_type_sql(&self, column: &Column) -> String {
        let name = self.type_name(column.column_type);
        if !self.is_lengthable(column.column_type) {
            return name;
        }
        let length = column
            .length
            .filter(|len| *len > 0)
            .or_else(|| self.default_lengths.get(&column.column_type).copied());
        match length {
            Some(len) => format!("{name}({len})"),
            None => name,
        }
    }

    /// Quotes an identifier, doubling embedded closing quotes.
    #[must_use]
    pub fn quote(&self, ident: &str) -> String {
        let (open, close) = self.quotes;
        let escaped = ident.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Definition of an integer primary key column.
    #[must_use]
    pub fn primary_key_definition(&self, column: &str) -> String {
        self.primary_key_clause.replace("{column}", &self.quote(column))
    }
}

/// One row of an index catalog: an index, its uniqueness and one of its
/// columns. Rows of the same index must come in column position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnRow {
    /// Physical index name.
    pub index: String,
    /// Whether the index is unique.
    pub unique: bool,
    /// Physical column name, `None` for expression columns.
    pub column: Option<String>,
}

/// The capability set every dialect provides.
///
/// `rename_column`, `remove_column` and `modify_column` are reserved: the
/// reference dialects implement them as no-ops, so nothing destructive ever
/// happens implicitly.
#[async_trait]
pub trait Alterer: Send + Sync {
    /// Which dialect this is.
    fn dialect(&self) -> Dialect;

    /// DDL profile used to build statements.
    fn profile(&self) -> &DialectProfile;

    /// Naming convention.
    fn naming(&self) -> &dyn Translator;

    /// Where decisions are recorded.
    fn log(&self) -> &DecisionLog;

    /// Executes one DDL statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Whether the table exists.
    async fn has_table(&self, table: &Table) -> Result<bool>;

    /// Creates the table, its foreign keys and its indexes.
    async fn create_table(&self, schema: &Schema, table: &Table) -> Result<()>;

    /// Drops the table.
    async fn remove_table(&self, table: &Table) -> Result<()>;

    /// Renames `old_name` to the table's physical name.
    async fn rename_table(&self, table: &Table, old_name: &str) -> Result<()>;

    /// Whether the column exists.
    async fn has_column(&self, table: &Table, column: &Column) -> Result<bool>;

    /// Adds the column to an existing table.
    async fn create_column(&self, table: &Table, column: &Column) -> Result<()>;

    /// Reserved.
    async fn rename_column(&self, table: &Table, column: &Column) -> Result<()>;

    /// Reserved.
    async fn remove_column(&self, table: &Table, column: &Column) -> Result<()>;

    /// Reserved.
    async fn modify_column(&self, table: &Table, column: &Column) -> Result<()>;

    /// Name of an existing index with the same columns and uniqueness.
    async fn index_name(&self, table: &Table, index: &Index) -> Result<Option<String>>;

    /// Whether an equivalent index exists.
    async fn has_index(&self, table: &Table, index: &Index) -> Result<bool>;

    /// Creates the index under its deterministic name.
    async fn create_index(&self, table: &Table, index: &Index) -> Result<()>;

    /// Adds missing columns, then missing indexes.
    async fn update_table(&self, table: &Table) -> Result<()>;
}

/// Column definition: quoted name and type.
#[must_use]
pub fn column_definition(
    profile: &DialectProfile,
    naming: &dyn Translator,
    table: &Table,
    column: &Column,
) -> String {
    format!(
        "{} {}",
        profile.quote(&naming.sql_column(&table.name, &column.name)),
        profile.column_type_sql(column)
    )
}

/// `CREATE TABLE` statement with primary key and foreign keys.
pub fn create_table_sql(
    profile: &DialectProfile,
    naming: &dyn Translator,
    schema: &Schema,
    table: &Table,
) -> Result<String> {
    let mut defs = Vec::with_capacity(table.columns.len());
    for (i, column) in table.columns.iter().enumerate() {
        if i == 0 && column.column_type == ColumnType::Integer {
            defs.push(profile.primary_key_definition(&naming.sql_column(&table.name, &column.name)));
        } else {
            defs.push(column_definition(profile, naming, table, column));
        }
    }

    for rel in table.foreign_keys() {
        let (parent, pk) = schema.referenced_key(rel)?;
        defs.push(format!(
            "FOREIGN KEY({}) REFERENCES {}({})",
            profile.quote(&naming.sql_column(&table.name, &rel.child_column)),
            profile.quote(&naming.sql_table(&parent.name)),
            profile.quote(&naming.sql_column(&parent.name, &pk.name)),
        ));
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        profile.quote(&naming.sql_table(&table.name)),
        defs.join(", ")
    ))
}

/// `ALTER TABLE ... ADD COLUMN` statement.
#[must_use]
pub fn add_column_sql(
    profile: &DialectProfile,
    naming: &dyn Translator,
    table: &Table,
    column: &Column,
) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        profile.quote(&naming.sql_table(&table.name)),
        column_definition(profile, naming, table, column)
    )
}

/// `ALTER TABLE ... RENAME TO` statement.
#[must_use]
pub fn rename_table_sql(
    profile: &DialectProfile,
    naming: &dyn Translator,
    table: &Table,
    old_name: &str,
) -> String {
    format!(
        "ALTER TABLE {} RENAME TO {}",
        profile.quote(old_name),
        profile.quote(&naming.sql_table(&table.name))
    )
}

/// `DROP TABLE` statement.
#[must_use]
pub fn drop_table_sql(profile: &DialectProfile, naming: &dyn Translator, table: &Table) -> String {
    format!("DROP TABLE {}", profile.quote(&naming.sql_table(&table.name)))
}

/// Physical column names of an index, in order.
#[must_use]
pub fn index_columns(naming: &dyn Translator, table: &Table, index: &Index) -> Vec<String> {
    index
        .columns
        .iter()
        .map(|c| naming.sql_column(&table.name, c))
        .collect()
}

/// Deterministic index name: `idx_<table>_<column>...`.
#[must_use]
pub fn index_name_for(naming: &dyn Translator, table: &Table, index: &Index) -> String {
    let mut parts = vec!["idx".to_string(), naming.sql_table(&table.name)];
    parts.extend(index_columns(naming, table, index));
    parts.join("_")
}

/// `CREATE [UNIQUE] INDEX` statement.
#[must_use]
pub fn create_index_sql(
    profile: &DialectProfile,
    naming: &dyn Translator,
    table: &Table,
    index: &Index,
) -> String {
    let columns: Vec<String> = index_columns(naming, table, index)
        .iter()
        .map(|c| profile.quote(c))
        .collect();
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        profile.quote(&index_name_for(naming, table, index)),
        profile.quote(&naming.sql_table(&table.name)),
        columns.join(", ")
    )
}

/// Finds the index whose ordered columns and uniqueness match.
///
/// Names are ignored: they are generated by whoever created the index and
/// differ between databases.
#[must_use]
pub fn find_matching_index<I>(rows: I, columns: &[String], unique: bool) -> Option<String>
where
    I: IntoIterator<Item = IndexColumnRow>,
{
    let mut indexes: Vec<(String, bool, Vec<Option<String>>)> = Vec::new();
    for row in rows {
        match indexes.iter_mut().find(|(name, _, _)| *name == row.index) {
            Some((_, _, cols)) => cols.push(row.column),
            None => indexes.push((row.index, row.unique, vec![row.column])),
        }
    }

    indexes
        .into_iter()
        .find(|(_, is_unique, cols)| {
            *is_unique == unique
                && cols.len() == columns.len()
                && cols
                    .iter()
                    .zip(columns)
                    .all(|(have, want)| have.as_deref() == Some(want.as_str()))
        })
        .map(|(name, _, _)| name)
}

/// Runs a DDL statement, attaching the SQL text to any failure.
pub async fn execute_ddl(pool: &AnyPool, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(pool)
        .await
        .map_err(|source| ReconcileError::Ddl {
            sql: sql.to_string(),
            source,
        })?;
    Ok(())
}

/// Creates a table, then every declared index.
///
/// The table did not exist a moment ago, so its indexes are created without
/// asking the catalog first. `specific` is the dialect doing the work.
pub async fn create_table_with_indexes(
    specific: &dyn Alterer,
    schema: &Schema,
    table: &Table,
) -> Result<()> {
    let sql = create_table_sql(specific.profile(), specific.naming(), schema, table)?;
    specific.execute(&sql).await?;
    specific.log().record(Decision::TableCreated {
        table: table.name.clone(),
        sql,
    });

    for index in &table.indexes {
        specific.create_index(table, index).await?;
    }
    Ok(())
}

/// Adds a column to an existing table.
pub async fn add_column(specific: &dyn Alterer, table: &Table, column: &Column) -> Result<()> {
    let sql = add_column_sql(specific.profile(), specific.naming(), table, column);
    specific.execute(&sql).await?;
    specific.log().record(Decision::ColumnAdded {
        table: table.name.clone(),
        column: column.name.clone(),
        sql,
    });
    Ok(())
}

/// Creates an index under its deterministic name.
pub async fn add_index(specific: &dyn Alterer, table: &Table, index: &Index) -> Result<()> {
    let sql = create_index_sql(specific.profile(), specific.naming(), table, index);
    specific.execute(&sql).await?;
    specific.log().record(Decision::IndexCreated {
        table: table.name.clone(),
        index: index_name_for(specific.naming(), table, index),
        sql,
    });
    Ok(())
}

/// Renames a table from `old_name`.
pub async fn rename_table(specific: &dyn Alterer, table: &Table, old_name: &str) -> Result<()> {
    let sql = rename_table_sql(specific.profile(), specific.naming(), table, old_name);
    specific.execute(&sql).await?;
    info!(table = %table.name, old_name, "Renamed table");
    Ok(())
}

/// Drops a table.
pub async fn remove_table(specific: &dyn Alterer, table: &Table) -> Result<()> {
    let sql = drop_table_sql(specific.profile(), specific.naming(), table);
    specific.execute(&sql).await?;
    info!(table = %table.name, "Dropped table");
    Ok(())
}

/// Checks the index catalog and records the answer.
pub async fn check_index(specific: &dyn Alterer, table: &Table, index: &Index) -> Result<bool> {
    let found = specific.index_name(table, index).await?;
    let exists = found.is_some();
    specific.log().record(Decision::IndexChecked {
        table: table.name.clone(),
        columns: index.columns.clone(),
        found,
    });
    Ok(exists)
}

/// Brings an existing table up to date: every missing column is added,
/// then every missing index. Stops at the first error.
pub async fn reconcile_table(specific: &dyn Alterer, table: &Table) -> Result<()> {
    for column in &table.columns {
        let exists = specific.has_column(table, column).await?;
        specific.log().record(Decision::ColumnChecked {
            table: table.name.clone(),
            column: column.name.clone(),
            exists,
        });
        if !exists {
            specific.create_column(table, column).await?;
        }
    }

    for index in &table.indexes {
        if !specific.has_index(table, index).await? {
            specific.create_index(table, index).await?;
        }
    }

    specific.log().record(Decision::TableUpdated {
        table: table.name.clone(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{Identity, Snake};

    fn blog() -> Schema {
        Schema::new()
            .table(
                Table::new("User")
                    .column(Column::new("ID", ColumnType::Integer).length(11))
                    .column(Column::new("Name", ColumnType::Varchar).length(255)),
            )
            .table(
                Table::new("Post")
                    .column(Column::new("ID", ColumnType::Integer))
                    .column(Column::new("UserID", ColumnType::Integer))
                    .column(Column::new("Title", ColumnType::Varchar).length(255))
                    .child_of("User", "UserID")
                    .index(Index::unique(["UserID", "Title"])),
            )
    }

    #[test]
    fn test_create_table_scenario() {
        let schema = blog();
        let profile = DialectProfile::sqlite();

        let user = create_table_sql(&profile, &Snake, &schema, schema.get_table("User").unwrap())
            .unwrap();
        assert_eq!(
            user,
            "CREATE TABLE \"user\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"name\" VARCHAR(255))"
        );

        let post = create_table_sql(&profile, &Snake, &schema, schema.get_table("Post").unwrap())
            .unwrap();
        assert_eq!(
            post,
            "CREATE TABLE \"post\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"user_id\" INTEGER, \
             \"title\" VARCHAR(255), FOREIGN KEY(\"user_id\") REFERENCES \"user\"(\"id\"))"
        );
    }

    #[test]
    fn test_length_suffix_policy() {
        let varchar = Column::new("Name", ColumnType::Varchar).length(255);
        let integer = Column::new("Count", ColumnType::Integer).length(11);
        let text = Column::new("Body", ColumnType::Text).length(1000);

        assert_eq!(DialectProfile::postgres().column_type_sql(&varchar), "VARCHAR(255)");
        assert_eq!(DialectProfile::postgres().column_type_sql(&integer), "INTEGER");
        assert_eq!(DialectProfile::mysql().column_type_sql(&integer), "INTEGER(11)");
        assert_eq!(DialectProfile::sqlite().column_type_sql(&text), "TEXT");

        let no_varchar = DialectProfile {
            lengthable: Vec::new(),
            ..DialectProfile::generic()
        };
        assert_eq!(no_varchar.column_type_sql(&varchar), "VARCHAR");
    }

    #[test]
    fn test_integer_primary_key_never_gets_length() {
        let schema = blog();
        let sql = create_table_sql(
            &DialectProfile::mysql(),
            &Identity,
            &schema,
            schema.get_table("User").unwrap(),
        )
        .unwrap();
        assert!(sql.starts_with("CREATE TABLE `User` (`ID` INTEGER PRIMARY KEY AUTO_INCREMENT, "));
        assert!(!sql.contains("INTEGER(11) PRIMARY"));
    }

    #[test]
    fn test_non_integer_first_column_is_plain() {
        let table = Table::new("Setting")
            .column(Column::new("Key", ColumnType::Varchar).length(64))
            .column(Column::new("Value", ColumnType::Text));
        let schema = Schema::new().table(table.clone());

        let sql = create_table_sql(&DialectProfile::postgres(), &Identity, &schema, &table).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"Setting\" (\"Key\" VARCHAR(64), \"Value\" TEXT)"
        );
    }

    #[test]
    fn test_mysql_default_varchar_length() {
        let column = Column::new("Name", ColumnType::Varchar);
        assert_eq!(DialectProfile::mysql().column_type_sql(&column), "VARCHAR(255)");
        assert_eq!(DialectProfile::postgres().column_type_sql(&column), "VARCHAR");
    }

    #[test]
    fn test_postgres_primary_key_and_types() {
        let profile = DialectProfile::postgres();
        assert_eq!(profile.primary_key_definition("id"), "\"id\" SERIAL PRIMARY KEY");
        assert_eq!(profile.type_name(ColumnType::Blob), "BYTEA");
        assert_eq!(profile.type_name(ColumnType::Double), "DOUBLE PRECISION");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(DialectProfile::sqlite().quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(DialectProfile::mysql().quote("order"), "`order`");
    }

    #[test]
    fn test_index_sql() {
        let schema = blog();
        let post = schema.get_table("Post").unwrap();
        let index = &post.indexes[0];

        assert_eq!(index_name_for(&Snake, post, index), "idx_post_user_id_title");
        assert_eq!(
            create_index_sql(&DialectProfile::sqlite(), &Snake, post, index),
            "CREATE UNIQUE INDEX \"idx_post_user_id_title\" ON \"post\" (\"user_id\", \"title\")"
        );

        let plain = Index::new(["Title"]);
        assert_eq!(
            create_index_sql(&DialectProfile::mysql(), &Snake, post, &plain),
            "CREATE INDEX `idx_post_title` ON `post` (`title`)"
        );
    }

    #[test]
    fn test_alter_statements() {
        let schema = blog();
        let user = schema.get_table("User").unwrap();
        let profile = DialectProfile::postgres();

        assert_eq!(
            add_column_sql(&profile, &Snake, user, &Column::new("EMail", ColumnType::Text)),
            format!("ALTER TABLE \"user\" ADD COLUMN \"{}\" TEXT", Snake.sql_column("User", "EMail"))
        );
        assert_eq!(
            rename_table_sql(&profile, &Snake, user, "users"),
            "ALTER TABLE \"users\" RENAME TO \"user\""
        );
        assert_eq!(drop_table_sql(&profile, &Snake, user), "DROP TABLE \"user\"");
    }

    fn row(index: &str, unique: bool, column: &str) -> IndexColumnRow {
        IndexColumnRow {
            index: index.to_string(),
            unique,
            column: Some(column.to_string()),
        }
    }

    #[test]
    fn test_find_matching_index_by_columns() {
        let rows = vec![
            row("pk", true, "id"),
            row("some_name", true, "user_id"),
            row("some_name", true, "title"),
            row("other", false, "title"),
        ];
        let wanted = vec!["user_id".to_string(), "title".to_string()];

        assert_eq!(
            find_matching_index(rows.clone(), &wanted, true),
            Some("some_name".to_string())
        );
        assert_eq!(find_matching_index(rows.clone(), &wanted, false), None);

        let reversed = vec!["title".to_string(), "user_id".to_string()];
        assert_eq!(find_matching_index(rows.clone(), &reversed, true), None);

        let prefix = vec!["user_id".to_string()];
        assert_eq!(find_matching_index(rows, &prefix, true), None);
    }

    #[test]
    fn test_find_matching_index_skips_expressions() {
        let rows = vec![IndexColumnRow {
            index: "expr".to_string(),
            unique: false,
            column: None,
        }];
        assert_eq!(find_matching_index(rows, &["title".to_string()], false), None);
    }

    #[test]
    fn test_dialect_parse() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("sqlite3".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert!("oracle".parse::<Dialect>().is_err());
        assert_eq!(Dialect::from_url("postgres://localhost/app"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("mysql://root@localhost/app"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("odbc://dsn"), None);
        assert_eq!(Dialect::MySql.profile().name, "mysql");
    }
}
