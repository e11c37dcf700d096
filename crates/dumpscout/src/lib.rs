//! Dumpscout - Dump Source Topology Discovery & Routing
//!
//! Dumpscout walks a logical database dump (mydumper/dumpling layout or any
//! custom naming scheme), classifies every file, applies table filters and
//! renaming rules, and produces the database → table → file topology an
//! import scheduler consumes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌───────────┐
//! │    Store    │     │ Classifier  │     │   Rename    │     │  Topology   │     │  Ordering │
//! │ (local/mem) │────▶│ (route +    │────▶│  Resolver   │────▶│  Builder    │────▶│ (size,    │
//! │             │     │   filter)   │     │ (refcounts) │     │ (conflicts) │     │  key)     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └───────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **PathRouter**: relative path → (identity, file kind, compression, sort key)
//! - **NameFilter**: which schemas and tables are in scope
//! - **TableRouter**: (schema, table) → (schema', table') renaming
//! - **Topology**: ordered databases, each with ordered tables and data files

pub mod builder;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod file_router;
pub mod filter;
pub mod loader;
pub mod ordering;
pub mod patterns;
pub mod rename;
pub mod store;
pub mod table_router;
pub mod types;

// Re-exports for convenience
pub use config::{CharacterSet, DiscoveryConfig, FileRouteRule, SourceConfig, TableRouteRule};
pub use error::{DiscoveryError, Result, RuleError};
pub use file_router::{FileRouter, PathRouter, RouteResult};
pub use filter::{CaseInsensitive, NameFilter, ReplicationFilter, TableFilter};
pub use loader::{Discovery, DumpLoader};
pub use store::{CancelToken, ExternalStore, LocalStore, MemoryStore};
pub use table_router::{RuleTableRouter, TableRouter};
pub use types::{
    Compression, DataFormat, DatabaseMeta, FileKind, SourceFile, TableMeta, TableName, Topology,
};
