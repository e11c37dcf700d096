//! Classifier: route and filter the enumerated files into ordered buckets
//!
//! Buckets preserve enumeration order, so classifying an immutable source
//! twice yields identical buckets. Everything downstream relies on that.

use crate::error::{DiscoveryError, Result};
use crate::file_router::PathRouter;
use crate::filter::NameFilter;
use crate::store::{CancelToken, ExternalStore};
use crate::types::{FileKind, SourceFile, TableName};
use tracing::{debug, info};

/// A table-schema or data file with its (possibly renamed) owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub name: TableName,
    pub file: SourceFile,
}

/// A database declaration. `file` is `None` for a synthesized declaration
/// whose origin had no declaration file either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDeclaration {
    pub schema: String,
    pub file: Option<SourceFile>,
}

impl SchemaDeclaration {
    pub fn path(&self) -> &str {
        self.file.as_ref().map(|f| f.path.as_str()).unwrap_or("")
    }
}

/// Accepted files, bucketed by kind, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub database_schemas: Vec<SchemaDeclaration>,
    pub table_schemas: Vec<ClassifiedFile>,
    pub table_data: Vec<ClassifiedFile>,
}

/// Runs enumeration through the path router and the name filter.
pub struct Classifier<'a> {
    router: &'a dyn PathRouter,
    filter: &'a dyn NameFilter,
}

impl<'a> Classifier<'a> {
    pub fn new(router: &'a dyn PathRouter, filter: &'a dyn NameFilter) -> Self {
        Self { router, filter }
    }

    /// Walk `store` and bucket every routed, filter-accepted file.
    pub fn classify(&self, store: &dyn ExternalStore, cancel: &CancelToken) -> Result<Buckets> {
        let mut buckets = Buckets::default();
        store.walk(cancel, &mut |path, size| self.accept(&mut buckets, path, size))?;
        debug!(
            database_schemas = buckets.database_schemas.len(),
            table_schemas = buckets.table_schemas.len(),
            table_data = buckets.table_data.len(),
            "Classified source files"
        );
        Ok(buckets)
    }

    fn accept(&self, buckets: &mut Buckets, path: &str, size: u64) -> Result<()> {
        let routed = self
            .router
            .route(path)
            .map_err(|source| DiscoveryError::PathRouting {
                path: path.to_string(),
                source,
            })?;
        let Some(res) = routed else {
            info!(path, "file is filtered by file router");
            return Ok(());
        };

        if self.should_skip(&res.name) {
            debug!(path, "ignoring table file");
            return Ok(());
        }

        info!(
            path,
            schema = %res.name.schema,
            table = %res.name.name,
            kind = %res.kind,
            "file route result"
        );

        let file = SourceFile {
            path: path.to_string(),
            size,
            kind: res.kind,
            compression: res.compression,
            sort_key: res.sort_key,
        };
        match res.kind {
            FileKind::DatabaseSchema => buckets.database_schemas.push(SchemaDeclaration {
                schema: res.name.schema,
                file: Some(file),
            }),
            FileKind::TableSchema => buckets.table_schemas.push(ClassifiedFile {
                name: res.name,
                file,
            }),
            FileKind::Data(_) => buckets.table_data.push(ClassifiedFile {
                name: res.name,
                file,
            }),
        }
        Ok(())
    }

    fn should_skip(&self, name: &TableName) -> bool {
        if name.is_schema_level() {
            !self.filter.match_schema(&name.schema)
        } else {
            !self.filter.match_table(&name.schema, &name.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_router::FileRouter;
    use crate::filter::TableFilter;
    use crate::store::MemoryStore;

    fn classify(store: &MemoryStore, filter: &[&str]) -> Buckets {
        let router = FileRouter::mydumper().unwrap();
        let filter = TableFilter::parse(filter).unwrap();
        Classifier::new(&router, &filter)
            .classify(store, &CancelToken::new())
            .unwrap()
    }

    #[test]
    fn test_buckets_by_kind_in_path_order() {
        let store = MemoryStore::new()
            .with_sized("db1.t2.sql", 10)
            .with_sized("db1-schema-create.sql", 1)
            .with_sized("db1.t1-schema.sql", 2)
            .with_sized("db1.t1.1.sql", 100)
            .with_sized("README.md", 7);
        let buckets = classify(&store, &["*.*"]);

        assert_eq!(buckets.database_schemas.len(), 1);
        assert_eq!(buckets.database_schemas[0].schema, "db1");
        assert_eq!(buckets.database_schemas[0].path(), "db1-schema-create.sql");
        assert_eq!(buckets.table_schemas.len(), 1);
        let data: Vec<_> = buckets.table_data.iter().map(|f| f.file.path.as_str()).collect();
        assert_eq!(data, vec!["db1.t1.1.sql", "db1.t2.sql"]);
        assert_eq!(buckets.table_data[0].file.size, 100);
    }

    #[test]
    fn test_filter_applies_schema_and_table_rules() {
        let store = MemoryStore::new()
            .with_sized("db1-schema-create.sql", 1)
            .with_sized("db1.keep.sql", 1)
            .with_sized("db1.drop.sql", 1)
            .with_sized("db2-schema-create.sql", 1)
            .with_sized("db2.t.sql", 1);
        let buckets = classify(&store, &["db1.*", "!db1.drop"]);

        assert_eq!(buckets.database_schemas.len(), 1);
        assert_eq!(buckets.table_data.len(), 1);
        assert_eq!(buckets.table_data[0].name, TableName::new("db1", "keep"));
    }

    #[test]
    fn test_router_error_carries_path() {
        let store = MemoryStore::new().with_sized("db1.t1.sql.lzo", 1);
        let router = FileRouter::mydumper().unwrap();
        let filter = TableFilter::parse(&["*.*"]).unwrap();
        let err = Classifier::new(&router, &filter)
            .classify(&store, &CancelToken::new())
            .unwrap_err();
        match err {
            DiscoveryError::PathRouting { path, .. } => assert_eq!(path, "db1.t1.sql.lzo"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
