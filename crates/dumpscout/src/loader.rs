//! Discovery pipeline and the loader facade handed to the import scheduler
//!
//! ```text
//! walk ──▶ Classifier ──▶ RenameResolver ──▶ TopologyBuilder ──▶ sort_for_load ──▶ Topology
//!          (route+filter)  (table router)     (conflicts)         (size, key)
//! ```
//!
//! The pass is a single sequential fold. Tables and databases come out in a
//! consistent order, so discovering an immutable source twice yields the same
//! topology, even across process restarts. This is what lets a resumed load
//! line its progress up with a previous run.

use crate::builder::{BuildPolicy, TopologyBuilder};
use crate::classifier::Classifier;
use crate::config::{CharacterSet, DiscoveryConfig};
use crate::error::{DiscoveryError, Result};
use crate::extract::export_statement;
use crate::file_router::{FileRouter, PathRouter};
use crate::filter::{CaseInsensitive, NameFilter, ReplicationFilter, TableFilter};
use crate::ordering::sort_for_load;
use crate::rename::RenameResolver;
use crate::store::{CancelToken, ExternalStore, LocalStore};
use crate::table_router::{RuleTableRouter, TableRouter};
use crate::types::{DatabaseMeta, SourceFile, TableMeta, Topology};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// One discovery pass over a store with a fixed set of collaborators.
pub struct Discovery<'a> {
    router: &'a dyn PathRouter,
    filter: &'a dyn NameFilter,
    table_router: Option<&'a dyn TableRouter>,
    schema_mode: bool,
}

impl<'a> Discovery<'a> {
    /// Schema mode on, no table router.
    pub fn new(router: &'a dyn PathRouter, filter: &'a dyn NameFilter) -> Self {
        Self {
            router,
            filter,
            table_router: None,
            schema_mode: true,
        }
    }

    pub fn with_table_router(mut self, table_router: Option<&'a dyn TableRouter>) -> Self {
        self.table_router = table_router;
        self
    }

    pub fn with_schema_mode(mut self, schema_mode: bool) -> Self {
        self.schema_mode = schema_mode;
        self
    }

    /// Discover the topology in load order.
    pub fn discover(&self, store: &dyn ExternalStore, cancel: &CancelToken) -> Result<Topology> {
        let mut databases = self.discover_unordered(store, cancel)?;
        sort_for_load(&mut databases);
        Ok(Topology::from_databases(databases))
    }

    /// Discover the topology in first-seen order, before [`sort_for_load`].
    pub fn discover_unordered(
        &self,
        store: &dyn ExternalStore,
        cancel: &CancelToken,
    ) -> Result<Vec<DatabaseMeta>> {
        let start = Instant::now();
        info!(location = %store.location(), schema_mode = self.schema_mode, "Starting topology discovery");

        let buckets = Classifier::new(self.router, self.filter).classify(store, cancel)?;
        let buckets = match self.table_router {
            Some(router) => RenameResolver::new(router).resolve(buckets)?,
            None => buckets,
        };
        let policy = BuildPolicy {
            schema_mode: self.schema_mode,
            tolerate_duplicates: self.table_router.is_some(),
        };
        let databases = TopologyBuilder::new().build(buckets, policy)?;

        info!(
            databases = databases.len(),
            tables = databases.iter().map(|db| db.tables.len()).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Topology discovery complete"
        );
        Ok(databases)
    }
}

/// Collaborators built from configuration
struct Collaborators {
    router: FileRouter,
    filter: Box<dyn NameFilter>,
    table_router: Option<RuleTableRouter>,
}

impl Collaborators {
    fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        config.validate()?;
        let invalid = |what: &str, e: crate::error::RuleError| {
            DiscoveryError::Config(format!("invalid {what}: {e}"))
        };
        let case_sensitive = config.source.case_sensitive;

        let table_router = if config.routes.is_empty() {
            None
        } else {
            Some(
                RuleTableRouter::new(&config.routes, case_sensitive)
                    .map_err(|e| invalid("route rule", e))?,
            )
        };

        let filter: Box<dyn NameFilter> = if config.has_legacy_black_white_list() {
            let filter = ReplicationFilter::new(&config.black_white_list)
                .map_err(|e| invalid("black-white list", e))?;
            if case_sensitive {
                Box::new(filter)
            } else {
                Box::new(CaseInsensitive::new(filter).map_err(|e| invalid("black-white list", e))?)
            }
        } else {
            let filter = TableFilter::parse(&config.source.filter_rules())
                .map_err(|e| invalid("table filter", e))?;
            if case_sensitive {
                Box::new(filter)
            } else {
                Box::new(CaseInsensitive::new(filter).map_err(|e| invalid("table filter", e))?)
            }
        };

        let router = FileRouter::new(&config.source.files, config.source.uses_default_file_rules())
            .map_err(|e| invalid("file route rule", e))?;

        Ok(Self {
            router,
            filter,
            table_router,
        })
    }
}

/// The discovered topology together with the store it came from.
pub struct DumpLoader {
    store: Arc<dyn ExternalStore>,
    topology: Topology,
    charset: CharacterSet,
}

impl fmt::Debug for DumpLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpLoader")
            .field("location", &self.store.location())
            .field("databases", &self.topology.databases().len())
            .field("charset", &self.charset)
            .finish()
    }
}

impl DumpLoader {
    /// Discover the local directory named by `config.source.dir`.
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        if config.source.dir.is_empty() {
            return Err(DiscoveryError::Config("source.dir is not set".to_string()));
        }
        let store = LocalStore::new(&config.source.dir)?;
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: &DiscoveryConfig, store: Arc<dyn ExternalStore>) -> Result<Self> {
        Self::with_store_cancellable(config, store, &CancelToken::new())
    }

    /// Discover `store`, aborting with [`DiscoveryError::Cancelled`] once
    /// `cancel` fires.
    pub fn with_store_cancellable(
        config: &DiscoveryConfig,
        store: Arc<dyn ExternalStore>,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let charset = config.character_set()?;
        let collaborators = Collaborators::from_config(config)?;
        let topology = Discovery::new(&collaborators.router, &*collaborators.filter)
            .with_table_router(
                collaborators
                    .table_router
                    .as_ref()
                    .map(|r| r as &dyn TableRouter),
            )
            .with_schema_mode(!config.source.no_schema)
            .discover(store.as_ref(), cancel)?;

        Ok(Self {
            store,
            topology,
            charset,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn databases(&self) -> &[DatabaseMeta] {
        self.topology.databases()
    }

    pub fn store(&self) -> &Arc<dyn ExternalStore> {
        &self.store
    }

    pub fn into_topology(self) -> Topology {
        self.topology
    }

    /// `CREATE TABLE` text of a table, or `""` if it cannot be extracted.
    pub fn table_schema(&self, table: &TableMeta) -> String {
        self.extract(table.schema_file.as_ref())
    }

    /// `CREATE DATABASE` text of a database, or `""` if it cannot be extracted.
    pub fn database_schema(&self, db: &DatabaseMeta) -> String {
        self.extract(db.schema_file.as_ref())
    }

    fn extract(&self, file: Option<&SourceFile>) -> String {
        let Some(file) = file else {
            return String::new();
        };
        match export_statement(self.store.as_ref(), file, self.charset) {
            Ok(text) => text,
            Err(e) => {
                error!(path = %file.path, error = %e, "failed to extract schema statement");
                String::new()
            }
        }
    }
}
