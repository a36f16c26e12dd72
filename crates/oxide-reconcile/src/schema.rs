//! Schema representation types.
//!
//! A [`Schema`] describes what the database should look like. It is built
//! once (usually by generated code or loaded from JSON) and only read by the
//! reconciliation engine.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};

/// Semantic column types understood by every dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Integer.
    Integer,
    /// Variable-length character string.
    Varchar,
    /// Unbounded text.
    Text,
    /// Date and time.
    Timestamp,
    /// Single precision floating point.
    Real,
    /// Double precision floating point.
    #[serde(rename = "double-precision")]
    Double,
    /// Boolean.
    Boolean,
    /// Binary large object.
    Blob,
}

impl ColumnType {
    /// All column types, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Integer,
        Self::Varchar,
        Self::Text,
        Self::Timestamp,
        Self::Real,
        Self::Double,
        Self::Boolean,
        Self::Blob,
    ];

    /// Returns the schema-level name of this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Real => "real",
            Self::Double => "double-precision",
            Self::Boolean => "boolean",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .or(match lowered.as_str() {
                "int" => Some(Self::Integer),
                "double" => Some(Self::Double),
                "bool" => Some(Self::Boolean),
                _ => None,
            })
            .ok_or_else(|| ReconcileError::Config(format!("unknown column type '{s}'")))
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Logical column name.
    pub name: String,
    /// Semantic type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Length or precision, honoured only where the dialect allows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Previous name of the column. Reserved for rename detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previously: Option<String>,
    /// Name of the embedded structure this column was flattened from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_name: Option<String>,
}

impl Column {
    /// Creates a new column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            previously: None,
            include_name: None,
        }
    }

    /// Sets the length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Records the previous name of this column.
    #[must_use]
    pub fn previously(mut self, name: impl Into<String>) -> Self {
        self.previously = Some(name.into());
        self
    }

    /// Marks the column as flattened from an embedded structure.
    #[must_use]
    pub fn included_from(mut self, name: impl Into<String>) -> Self {
        self.include_name = Some(name.into());
        self
    }
}

/// Schema definition for an index.
///
/// Column order is significant: `(a, b)` and `(b, a)` are different indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Logical column names.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    /// Creates a non-unique index over the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Creates a unique index over the given columns.
    #[must_use]
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique: true,
            ..Self::new(columns)
        }
    }
}

/// A foreign-key relationship between two tables.
///
/// The child table holds `child_column`, which references the parent's
/// primary key. Tables are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Referenced table.
    pub parent: String,
    /// Table holding the foreign key.
    pub child: String,
    /// Foreign key column on the child table.
    pub child_column: String,
}

impl Relationship {
    /// Creates a relationship.
    #[must_use]
    pub fn new(
        parent: impl Into<String>,
        child: impl Into<String>,
        child_column: impl Into<String>,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            child_column: child_column.into(),
        }
    }
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Logical table name.
    pub name: String,
    /// Columns. The first one is the primary key.
    pub columns: Vec<Column>,
    /// Indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Rows of another table point at rows of this one.
    #[serde(default)]
    pub has_many: Vec<Relationship>,
    /// This table holds a foreign key to a parent with many children.
    #[serde(default)]
    pub child_of: Vec<Relationship>,
    /// A single row of another table points at a row of this one.
    #[serde(default)]
    pub has_one: Vec<Relationship>,
    /// This table holds a foreign key to a parent with one child.
    #[serde(default)]
    pub belongs_to: Vec<Relationship>,
}

impl Table {
    /// Creates a new table with no columns.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            has_many: Vec::new(),
            child_of: Vec::new(),
            has_one: Vec::new(),
            belongs_to: Vec::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Declares that `column` on this table references `parent`, which has
    /// many rows of this table.
    #[must_use]
    pub fn child_of(mut self, parent: impl Into<String>, column: impl Into<String>) -> Self {
        let rel = Relationship::new(parent, self.name.clone(), column);
        self.child_of.push(rel);
        self
    }

    /// Declares that `column` on this table references `parent`, which has
    /// one row of this table.
    #[must_use]
    pub fn belongs_to(mut self, parent: impl Into<String>, column: impl Into<String>) -> Self {
        let rel = Relationship::new(parent, self.name.clone(), column);
        self.belongs_to.push(rel);
        self
    }

    /// Declares that `child.column` references this table (many rows).
    #[must_use]
    pub fn has_many(mut self, child: impl Into<String>, column: impl Into<String>) -> Self {
        let rel = Relationship::new(self.name.clone(), child, column);
        self.has_many.push(rel);
        self
    }

    /// Declares that `child.column` references this table (one row).
    #[must_use]
    pub fn has_one(mut self, child: impl Into<String>, column: impl Into<String>) -> Self {
        let rel = Relationship::new(self.name.clone(), child, column);
        self.has_one.push(rel);
        self
    }

    /// Gets a column by logical name.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key column, which is always the first column.
    #[must_use]
    pub fn primary_key_column(&self) -> Option<&Column> {
        self.columns.first()
    }

    /// Relationships where this table holds the foreign key.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &Relationship> {
        self.child_of.iter().chain(self.belongs_to.iter())
    }

    /// Names of the tables this table references through foreign keys.
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys().map(|rel| rel.parent.as_str())
    }
}

/// The complete declared schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// All tables, in declaration order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Resolves the table referenced by a relationship along with its
    /// primary key column.
    pub fn referenced_key(&self, rel: &Relationship) -> Result<(&Table, &Column)> {
        let parent = self
            .get_table(&rel.parent)
            .ok_or_else(|| ReconcileError::MissingTable {
                table: rel.parent.clone(),
                referenced_by: rel.child.clone(),
            })?;
        let pk = parent
            .primary_key_column()
            .ok_or_else(|| ReconcileError::EmptyTable(parent.name.clone()))?;
        Ok((parent, pk))
    }

    /// Checks that table names are unique and that every reference in the
    /// schema can be resolved.
    ///
    /// `child_of` and `belongs_to` must be declared on the table holding the
    /// foreign key column; `has_many` and `has_one` on the referenced table.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(ReconcileError::DuplicateTable(table.name.clone()));
            }
        }

        for table in &self.tables {
            if table.columns.is_empty() {
                return Err(ReconcileError::EmptyTable(table.name.clone()));
            }

            for index in &table.indexes {
                for column in &index.columns {
                    if table.find_column(column).is_none() {
                        return Err(ReconcileError::MissingColumn {
                            table: table.name.clone(),
                            column: column.clone(),
                        });
                    }
                }
            }

            for rel in table.foreign_keys() {
                if rel.child != table.name {
                    return Err(misplaced(table, rel));
                }
                self.referenced_key(rel)?;
                if table.find_column(&rel.child_column).is_none() {
                    return Err(ReconcileError::MissingColumn {
                        table: table.name.clone(),
                        column: rel.child_column.clone(),
                    });
                }
            }

            for rel in table.has_many.iter().chain(&table.has_one) {
                if rel.parent != table.name {
                    return Err(misplaced(table, rel));
                }
                self.referenced_key(rel)?;
                let child = self
                    .get_table(&rel.child)
                    .ok_or_else(|| ReconcileError::MissingTable {
                        table: rel.child.clone(),
                        referenced_by: table.name.clone(),
                    })?;
                if child.find_column(&rel.child_column).is_none() {
                    return Err(ReconcileError::MissingColumn {
                        table: child.name.clone(),
                        column: rel.child_column.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn misplaced(table: &Table, rel: &Relationship) -> ReconcileError {
    ReconcileError::MisplacedRelationship {
        table: table.name.clone(),
        parent: rel.parent.clone(),
        child: rel.child.clone(),
    }
}
