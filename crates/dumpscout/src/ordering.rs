//! Load-order pass over a built topology.

use crate::types::DatabaseMeta;

/// Order tables and files for loading. Both sorts are stable.
///
/// Small tables go first so they finish and release the shared index
/// workers early instead of queueing behind the largest table. Data files
/// follow their sort key, so multi-part dumps load in part order.
pub fn sort_for_load(databases: &mut [DatabaseMeta]) {
    for db in databases {
        db.tables.sort_by_key(|table| table.total_size);
        for table in &mut db.tables {
            table.data_files.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Compression, DataFormat, FileKind, SourceFile, TableMeta, TableName};

    fn table(name: &str, files: &[(&str, &str, u64)]) -> TableMeta {
        let mut meta = TableMeta::new(&TableName::new("db", name));
        for (path, key, size) in files {
            meta.data_files.push(SourceFile {
                path: path.to_string(),
                size: *size,
                kind: FileKind::Data(DataFormat::Sql),
                compression: Compression::None,
                sort_key: key.to_string(),
            });
            meta.total_size += size;
        }
        meta
    }

    fn sample() -> Vec<DatabaseMeta> {
        vec![DatabaseMeta {
            name: "db".to_string(),
            schema_file: None,
            tables: vec![
                table("big", &[("big.3", "3", 50), ("big.1", "1", 50), ("big.2", "2", 50)]),
                table("tie_a", &[("tie_a.b", "", 10), ("tie_a.a", "", 10)]),
                table("small", &[("small", "", 5)]),
                table("tie_b", &[("tie_b", "", 20)]),
            ],
        }]
    }

    #[test]
    fn test_tables_by_size_ties_keep_insertion_order() {
        let mut dbs = sample();
        sort_for_load(&mut dbs);
        let names: Vec<_> = dbs[0].tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["small", "tie_a", "tie_b", "big"]);
        assert!(dbs[0]
            .tables
            .windows(2)
            .all(|w| w[0].total_size <= w[1].total_size));
    }

    #[test]
    fn test_files_by_key_ties_keep_insertion_order() {
        let mut dbs = sample();
        sort_for_load(&mut dbs);
        let big: Vec<_> = dbs[0].tables[3].data_files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(big, vec!["big.1", "big.2", "big.3"]);
        let tie: Vec<_> = dbs[0].tables[1].data_files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(tie, vec!["tie_a.b", "tie_a.a"]);
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let mut once = sample();
        sort_for_load(&mut once);
        let mut twice = once.clone();
        sort_for_load(&mut twice);
        assert_eq!(once, twice);
    }
}
