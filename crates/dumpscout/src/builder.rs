//! Topology builder: assemble the database → table → file tree
//!
//! Databases and tables live in exactly one ordered container each. The
//! index maps only hold handles (positions) into those containers, which
//! stay valid because entries are only ever appended during a build.

use crate::classifier::Buckets;
use crate::error::{DiscoveryError, Result};
use crate::types::{DatabaseMeta, SourceFile, TableMeta, TableName};
use std::collections::HashMap;

/// How strictly declarations are enforced while building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildPolicy {
    /// Require database and table declarations before data is accepted
    pub schema_mode: bool,
    /// Accept repeated declarations of one identity (a table router may
    /// legitimately fold several declarations into one)
    pub tolerate_duplicates: bool,
}

/// Result of [`TopologyBuilder::insert_table`]
pub struct TableSlot<'a> {
    pub table: &'a mut TableMeta,
    pub db_existed: bool,
    pub table_existed: bool,
}

#[derive(Debug, Default)]
pub struct TopologyBuilder {
    databases: Vec<DatabaseMeta>,
    db_index: HashMap<String, usize>,
    table_index: HashMap<TableName, (usize, usize)>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a database. The first caller's declaration is kept.
    ///
    /// Returns the entry and whether it already existed.
    pub fn insert_database(
        &mut self,
        name: &str,
        declaration: Option<SourceFile>,
    ) -> (&mut DatabaseMeta, bool) {
        let (idx, existed) = self.database_handle(name, declaration);
        (&mut self.databases[idx], existed)
    }

    fn database_handle(&mut self, name: &str, declaration: Option<SourceFile>) -> (usize, bool) {
        if let Some(&idx) = self.db_index.get(name) {
            return (idx, true);
        }
        let idx = self.databases.len();
        self.databases.push(DatabaseMeta {
            name: name.to_string(),
            schema_file: declaration,
            tables: Vec::new(),
        });
        self.db_index.insert(name.to_string(), idx);
        (idx, false)
    }

    /// Get or create a table, creating its database without a declaration
    /// if needed.
    pub fn insert_table(&mut self, identity: &TableName) -> TableSlot<'_> {
        let (db_idx, db_existed) = self.database_handle(&identity.schema, None);
        if let Some(&(d, t)) = self.table_index.get(identity) {
            return TableSlot {
                table: &mut self.databases[d].tables[t],
                db_existed,
                table_existed: true,
            };
        }

        let tables = &mut self.databases[db_idx].tables;
        let table_idx = tables.len();
        tables.push(TableMeta::new(identity));
        self.table_index.insert(identity.clone(), (db_idx, table_idx));
        TableSlot {
            table: &mut tables[table_idx],
            db_existed,
            table_existed: false,
        }
    }

    /// Assemble buckets in declaration order: database schemas, table
    /// schemas, then data files.
    pub fn build(mut self, buckets: Buckets, policy: BuildPolicy) -> Result<Vec<DatabaseMeta>> {
        if policy.schema_mode {
            if buckets.database_schemas.is_empty() {
                return Err(DiscoveryError::MissingDeclaration(
                    "no database schema file found, expected {schema}-schema-create.sql"
                        .to_string(),
                ));
            }
            for decl in buckets.database_schemas {
                let path = decl.path().to_string();
                let (_, existed) = self.insert_database(&decl.schema, decl.file);
                if existed && !policy.tolerate_duplicates {
                    return Err(DiscoveryError::DuplicateDeclaration {
                        kind: "database schema",
                        identity: decl.schema,
                        path,
                    });
                }
            }

            for record in buckets.table_schemas {
                let slot = self.insert_table(&record.name);
                if !slot.db_existed {
                    return Err(DiscoveryError::MissingDeclaration(format!(
                        "invalid table schema file, cannot find db '{}' - {}",
                        record.name.schema, record.file.path
                    )));
                }
                if slot.table_existed {
                    if !policy.tolerate_duplicates {
                        return Err(DiscoveryError::DuplicateDeclaration {
                            kind: "table schema",
                            identity: record.name.to_string(),
                            path: record.file.path,
                        });
                    }
                } else {
                    slot.table.schema_file = Some(record.file);
                }
            }
        }

        for record in buckets.table_data {
            let slot = self.insert_table(&record.name);
            if policy.schema_mode {
                if !slot.db_existed {
                    return Err(DiscoveryError::MissingDeclaration(format!(
                        "invalid data file, miss host db '{}' - {}",
                        record.name.schema, record.file.path
                    )));
                }
                if !slot.table_existed {
                    return Err(DiscoveryError::MissingDeclaration(format!(
                        "invalid data file, miss host table '{}' - {}",
                        record.name.name, record.file.path
                    )));
                }
            }
            slot.table.total_size += record.file.size;
            slot.table.data_files.push(record.file);
        }

        Ok(self.databases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifiedFile, SchemaDeclaration};
    use crate::types::{Compression, DataFormat, FileKind};

    const STRICT: BuildPolicy = BuildPolicy {
        schema_mode: true,
        tolerate_duplicates: false,
    };

    fn file(path: &str, size: u64, kind: FileKind) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            size,
            kind,
            compression: Compression::None,
            sort_key: String::new(),
        }
    }

    fn decl(schema: &str) -> SchemaDeclaration {
        SchemaDeclaration {
            schema: schema.to_string(),
            file: Some(file(&format!("{schema}-schema-create.sql"), 0, FileKind::DatabaseSchema)),
        }
    }

    fn record(schema: &str, table: &str, path: &str, size: u64, kind: FileKind) -> ClassifiedFile {
        ClassifiedFile {
            name: TableName::new(schema, table),
            file: file(path, size, kind),
        }
    }

    fn data(schema: &str, table: &str, path: &str, size: u64) -> ClassifiedFile {
        record(schema, table, path, size, FileKind::Data(DataFormat::Sql))
    }

    #[test]
    fn test_insert_is_idempotent_and_first_writer_wins() {
        let mut builder = TopologyBuilder::new();
        let (_, existed) = builder.insert_database("db", decl("db").file);
        assert!(!existed);
        let (db, existed) = builder.insert_database("db", None);
        assert!(existed);
        assert_eq!(db.schema_path(), Some("db-schema-create.sql"));

        let slot = builder.insert_table(&TableName::new("db", "t"));
        assert!(slot.db_existed && !slot.table_existed);
        slot.table.total_size = 5;
        let slot = builder.insert_table(&TableName::new("db", "t"));
        assert!(slot.table_existed);
        assert_eq!(slot.table.total_size, 5);
    }

    #[test]
    fn test_build_accumulates_data_in_first_seen_order() {
        let buckets = Buckets {
            database_schemas: vec![decl("db")],
            table_schemas: vec![
                record("db", "b", "db.b-schema.sql", 0, FileKind::TableSchema),
                record("db", "a", "db.a-schema.sql", 0, FileKind::TableSchema),
            ],
            table_data: vec![
                data("db", "a", "db.a.1.sql", 7),
                data("db", "a", "db.a.2.sql", 3),
                data("db", "b", "db.b.sql", 1),
            ],
        };
        let dbs = TopologyBuilder::new().build(buckets, STRICT).unwrap();

        assert_eq!(dbs.len(), 1);
        let names: Vec<_> = dbs[0].tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(dbs[0].tables[1].total_size, 10);
        assert_eq!(dbs[0].tables[1].data_files.len(), 2);
        assert_eq!(
            dbs[0].tables[0].schema_file.as_ref().map(|f| f.path.as_str()),
            Some("db.b-schema.sql")
        );
    }

    #[test]
    fn test_duplicate_database_declaration() {
        let buckets = Buckets {
            database_schemas: vec![decl("db"), decl("db")],
            ..Default::default()
        };
        let err = TopologyBuilder::new().build(buckets.clone(), STRICT).unwrap_err();
        assert!(matches!(err, DiscoveryError::DuplicateDeclaration { kind: "database schema", .. }));

        let tolerant = BuildPolicy {
            tolerate_duplicates: true,
            ..STRICT
        };
        let dbs = TopologyBuilder::new().build(buckets, tolerant).unwrap();
        assert_eq!(dbs.len(), 1);
    }

    #[test]
    fn test_duplicate_table_declaration() {
        let buckets = Buckets {
            database_schemas: vec![decl("db")],
            table_schemas: vec![
                record("db", "t", "a/db.t-schema.sql", 0, FileKind::TableSchema),
                record("db", "t", "b/db.t-schema.sql", 0, FileKind::TableSchema),
            ],
            ..Default::default()
        };
        let err = TopologyBuilder::new().build(buckets, STRICT).unwrap_err();
        match err {
            DiscoveryError::DuplicateDeclaration { path, .. } => assert_eq!(path, "b/db.t-schema.sql"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_declarations() {
        let err = TopologyBuilder::new()
            .build(Buckets::default(), STRICT)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingDeclaration(_)));

        let buckets = Buckets {
            database_schemas: vec![decl("db")],
            table_schemas: vec![record("other", "t", "other.t-schema.sql", 0, FileKind::TableSchema)],
            ..Default::default()
        };
        let err = TopologyBuilder::new().build(buckets, STRICT).unwrap_err();
        assert!(err.to_string().contains("cannot find db 'other'"));

        let buckets = Buckets {
            database_schemas: vec![decl("db")],
            table_data: vec![data("db", "t", "db.t.sql", 1)],
            ..Default::default()
        };
        let err = TopologyBuilder::new().build(buckets, STRICT).unwrap_err();
        assert!(err.to_string().contains("miss host table 't'"));

        let buckets = Buckets {
            database_schemas: vec![decl("db")],
            table_data: vec![data("nodb", "t", "nodb.t.sql", 1)],
            ..Default::default()
        };
        let err = TopologyBuilder::new().build(buckets, STRICT).unwrap_err();
        assert!(err.to_string().contains("miss host db 'nodb'"));
    }

    #[test]
    fn test_schema_less_build_uses_data_only() {
        let buckets = Buckets {
            database_schemas: vec![decl("ignored")],
            table_schemas: vec![],
            table_data: vec![data("db", "t", "db.t.sql", 4), data("db2", "u", "db2.u.sql", 2)],
        };
        let policy = BuildPolicy {
            schema_mode: false,
            tolerate_duplicates: false,
        };
        let dbs = TopologyBuilder::new().build(buckets, policy).unwrap();
        let names: Vec<_> = dbs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["db", "db2"]);
        assert!(dbs[0].schema_file.is_none());
        assert!(dbs[0].tables[0].schema_file.is_none());
    }
}
