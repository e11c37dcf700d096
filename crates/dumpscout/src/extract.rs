//! On-demand schema text extraction
//!
//! Reads a declaration file, keeps its complete `;`-terminated statements and
//! drops version-comment statements such as `/*!40101 SET NAMES binary*/;`.

use crate::config::CharacterSet;
use crate::error::Result;
use crate::store::ExternalStore;
use crate::types::{Compression, SourceFile};
use std::io::{self, BufRead, BufReader, Read};

/// Extract the statements of a declaration file as text.
pub fn export_statement(
    store: &dyn ExternalStore,
    file: &SourceFile,
    charset: CharacterSet,
) -> Result<String> {
    let raw = store.open(&file.path)?;
    let reader: Box<dyn Read + '_> = match file.compression {
        Compression::None => raw,
        Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(raw)),
        Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(raw)?),
        Compression::Snappy => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot extract snappy-compressed schema '{}'", file.path),
            )
            .into())
        }
    };

    let data = collect_statements(BufReader::new(reader))?;
    Ok(decode_character_set(data, charset)?)
}

fn collect_statements<R: BufRead>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut buffer = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let line = trim_bytes(&line);
        if line.is_empty() {
            continue;
        }
        buffer.extend_from_slice(line);
        if buffer.last() == Some(&b';') {
            if !(buffer.starts_with(b"/*") && buffer.ends_with(b"*/;")) {
                data.append(&mut buffer);
            }
            buffer.clear();
        } else {
            buffer.push(b'\n');
        }
    }
    Ok(data)
}

fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn decode_character_set(data: Vec<u8>, charset: CharacterSet) -> io::Result<String> {
    match charset {
        CharacterSet::Utf8mb4 => {
            String::from_utf8(data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
        CharacterSet::Latin1 => Ok(latin1(&data)),
        CharacterSet::Binary => Ok(String::from_utf8_lossy(&data).into_owned()),
        CharacterSet::Auto => Ok(match String::from_utf8(data) {
            Ok(text) => text,
            Err(e) => latin1(e.as_bytes()),
        }),
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::FileKind;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn schema_file(path: &str, compression: Compression) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            size: 0,
            kind: FileKind::TableSchema,
            compression,
            sort_key: String::new(),
        }
    }

    const SCHEMA: &str = "/*!40101 SET NAMES binary*/;\n\
        /*!40014 SET FOREIGN_KEY_CHECKS=0*/;\n\
        \n\
        CREATE TABLE `t` (\n  `id` int\n) ENGINE=InnoDB;\n";

    #[test]
    fn test_drops_comment_statements() {
        let store = MemoryStore::new().with_file("db.t-schema.sql", SCHEMA);
        let text = export_statement(
            &store,
            &schema_file("db.t-schema.sql", Compression::None),
            CharacterSet::Auto,
        )
        .unwrap();
        assert_eq!(text, "CREATE TABLE `t` (\n`id` int\n) ENGINE=InnoDB;");
    }

    #[test]
    fn test_gzip_schema() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(SCHEMA.as_bytes()).unwrap();
        let store = MemoryStore::new().with_file("db.t-schema.sql.gz", encoder.finish().unwrap());
        let text = export_statement(
            &store,
            &schema_file("db.t-schema.sql.gz", Compression::Gzip),
            CharacterSet::Utf8mb4,
        )
        .unwrap();
        assert!(text.starts_with("CREATE TABLE"));
    }

    #[test]
    fn test_character_sets() {
        let bytes = b"CREATE TABLE `caf\xe9` (a int);".to_vec();
        assert!(decode_character_set(bytes.clone(), CharacterSet::Utf8mb4).is_err());
        assert_eq!(
            decode_character_set(bytes.clone(), CharacterSet::Latin1).unwrap(),
            "CREATE TABLE `café` (a int);"
        );
        assert_eq!(
            decode_character_set(bytes.clone(), CharacterSet::Auto).unwrap(),
            "CREATE TABLE `café` (a int);"
        );
        assert!(decode_character_set(bytes, CharacterSet::Binary)
            .unwrap()
            .contains('\u{FFFD}'));
    }

    #[test]
    fn test_auto_decodes_gb18030_as_latin1() {
        let bytes = vec![0xD6, 0xD0];
        assert_eq!(
            decode_character_set(bytes, CharacterSet::Auto).unwrap(),
            "\u{D6}\u{D0}"
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        let store = MemoryStore::new();
        assert!(export_statement(
            &store,
            &schema_file("nope.sql", Compression::None),
            CharacterSet::Auto
        )
        .is_err());
    }
}
