//! Source stores: enumeration and reading of dump files
//!
//! Discovery only needs `(path, size)` pairs in a deterministic order; file
//! contents are read later, on demand, for schema extraction.

use crate::error::{DiscoveryError, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Cooperative cancellation flag shared between a caller and a walk.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`DiscoveryError::Cancelled`] once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DiscoveryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Visitor invoked once per file during a walk.
pub type WalkVisitor<'a> = dyn FnMut(&str, u64) -> Result<()> + 'a;

/// A storage backend holding a dump.
pub trait ExternalStore: Send + Sync {
    /// Human-readable location, used in error context.
    fn location(&self) -> String;

    /// Visit every file as `(relative_path, size)` in lexicographic path
    /// order. Paths use `/` separators. Errors returned by `visit` abort the
    /// walk and are propagated unchanged.
    fn walk(&self, cancel: &CancelToken, visit: &mut WalkVisitor<'_>) -> Result<()>;

    /// Open a file by the relative path reported from [`ExternalStore::walk`].
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>>;
}

/// Normalize a relative path to use forward slashes on every platform.
fn normalize_path_to_forward_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Local filesystem
// ============================================================================

/// A dump stored in a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, which must be a readable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let location = root.display().to_string();
        if !root.exists() {
            return Err(DiscoveryError::enumeration(location, "path not found"));
        }
        if !root.is_dir() {
            return Err(DiscoveryError::enumeration(location, "not a directory"));
        }
        std::fs::read_dir(&root).map_err(|e| DiscoveryError::enumeration(&location, e))?;
        Ok(Self { root })
    }
}

impl ExternalStore for LocalStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn walk(&self, cancel: &CancelToken, visit: &mut WalkVisitor<'_>) -> Result<()> {
        let walker = WalkDir::new(&self.root).follow_links(false);

        // Visited in full relative path order: `db.a.sql` precedes `db/zz.t.sql`.
        let mut files = Vec::new();
        for entry in walker {
            cancel.check()?;
            let entry = entry.map_err(|e| DiscoveryError::enumeration(self.location(), e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry
                .metadata()
                .map_err(|e| DiscoveryError::enumeration(self.location(), e))?
                .len();
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| DiscoveryError::enumeration(self.location(), e))?;
            files.push((normalize_path_to_forward_slashes(rel), size));
        }
        files.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        for (path, size) in &files {
            cancel.check()?;
            visit(path, *size)?;
        }
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
        let file = File::open(self.root.join(path))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    size: u64,
    content: Arc<[u8]>,
}

/// An in-memory dump. Paths iterate in byte-lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, MemoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file whose reported size is its content length.
    pub fn with_file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add an empty file that reports `size` bytes.
    pub fn with_sized(mut self, path: &str, size: u64) -> Self {
        self.files.insert(
            path.to_string(),
            MemoryEntry {
                size,
                content: Arc::from(Vec::new()),
            },
        );
        self
    }

    pub fn insert(&mut self, path: &str, content: impl AsRef<[u8]>) {
        let content: Arc<[u8]> = Arc::from(content.as_ref());
        self.files.insert(
            path.to_string(),
            MemoryEntry {
                size: content.len() as u64,
                content,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ExternalStore for MemoryStore {
    fn location(&self) -> String {
        "memory://".to_string()
    }

    fn walk(&self, cancel: &CancelToken, visit: &mut WalkVisitor<'_>) -> Result<()> {
        for (path, entry) in &self.files {
            cancel.check()?;
            visit(path, entry.size)?;
        }
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
        let entry = self.files.get(path).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("{path} not found"))
        })?;
        Ok(Box::new(Cursor::new(entry.content.clone())))
    }
}
