//! Core types for topology discovery
//!
//! A [`Topology`] is the database → table → file tree that discovery hands to
//! the load scheduler. Every database and table is owned by exactly one
//! ordered container; lookups go through the accessors below.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identities
// ============================================================================

/// A (schema, table) identity. An empty `name` denotes the schema itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Identity of a schema-level declaration.
    pub fn schema_only(schema: impl Into<String>) -> Self {
        Self::new(schema, String::new())
    }

    pub fn is_schema_level(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_schema_level() {
            write!(f, "`{}`", self.schema)
        } else {
            write!(f, "`{}`.`{}`", self.schema, self.name)
        }
    }
}

// ============================================================================
// File Classification
// ============================================================================

/// Encoding of a table-data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Sql,
    Csv,
    Parquet,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Declared kind of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    /// `CREATE DATABASE` declaration
    DatabaseSchema,
    /// `CREATE TABLE` declaration
    TableSchema,
    /// Rows of one table
    Data(DataFormat),
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseSchema => "database schema",
            Self::TableSchema => "table schema",
            Self::Data(format) => format.as_str(),
        }
    }

    /// Parse a routing-rule type name. `ignore` is handled by the router.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "schema-schema" => Some(Self::DatabaseSchema),
            "table-schema" => Some(Self::TableSchema),
            "sql" => Some(Self::Data(DataFormat::Sql)),
            "csv" => Some(Self::Data(DataFormat::Csv)),
            "parquet" => Some(Self::Data(DataFormat::Parquet)),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression codec of a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
    Snappy,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
            Self::Snappy => "snappy",
        }
    }

    /// Parse a codec name as captured from a file extension.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "snappy" => Some(Self::Snappy),
            _ => None,
        }
    }
}

/// A classified file in the source store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the store root, `/`-separated
    pub path: String,
    /// Size in bytes
    pub size: u64,
    pub kind: FileKind,
    pub compression: Compression,
    /// Orders the data files of one table
    pub sort_key: String,
}

// ============================================================================
// Topology
// ============================================================================

/// A table and the files that load it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Owning database name
    pub db: String,
    pub name: String,
    /// `None` when the table was created from data files only
    pub schema_file: Option<SourceFile>,
    pub data_files: Vec<SourceFile>,
    /// Sum of data file sizes in bytes
    pub total_size: u64,
}

impl TableMeta {
    pub(crate) fn new(identity: &TableName) -> Self {
        Self {
            db: identity.schema.clone(),
            name: identity.name.clone(),
            schema_file: None,
            data_files: Vec::new(),
            total_size: 0,
        }
    }
}

/// A database and its tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMeta {
    pub name: String,
    /// Declaration file; `None` when created from table or data evidence
    pub schema_file: Option<SourceFile>,
    pub tables: Vec<TableMeta>,
}

impl DatabaseMeta {
    pub fn schema_path(&self) -> Option<&str> {
        self.schema_file.as_ref().map(|file| file.path.as_str())
    }

    pub fn table(&self, name: &str) -> Option<&TableMeta> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn total_size(&self) -> u64 {
        self.tables.iter().map(|table| table.total_size).sum()
    }
}

/// The ordered database → table → file tree produced by discovery.
///
/// Immutable once built; share it freely between readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    databases: Vec<DatabaseMeta>,
}

impl Topology {
    pub(crate) fn from_databases(databases: Vec<DatabaseMeta>) -> Self {
        Self { databases }
    }

    pub fn databases(&self) -> &[DatabaseMeta] {
        &self.databases
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseMeta> {
        self.databases.iter().find(|db| db.name == name)
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&TableMeta> {
        self.database(schema).and_then(|db| db.table(table))
    }

    /// Iterate all tables in load order.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.databases.iter().flat_map(|db| db.tables.iter())
    }

    pub fn table_count(&self) -> usize {
        self.databases.iter().map(|db| db.tables.len()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.databases.iter().map(DatabaseMeta::total_size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
