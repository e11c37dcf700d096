//! Rename resolver: apply the table router and keep schema ownership consistent
//!
//! Each schema carries a reference count: one for its own declaration file,
//! plus one per table-schema file attributed to it. Every record moved out of
//! a schema releases a reference there and takes one in the target. Targets
//! with no declaration get one synthesized from the origin's declaration;
//! schemas left with no references are dropped afterwards.

use crate::classifier::{Buckets, ClassifiedFile, SchemaDeclaration};
use crate::error::{DiscoveryError, Result};
use crate::table_router::TableRouter;
use crate::types::{SourceFile, TableName};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct SchemaRefs {
    /// First-seen declaration of this schema
    declaration: Option<SourceFile>,
    count: i64,
    /// A database-schema record exists (authored or synthesized)
    has_record: bool,
}

/// Applies a [`TableRouter`] to classified buckets.
pub struct RenameResolver<'a> {
    router: &'a dyn TableRouter,
    known: HashMap<String, SchemaRefs>,
    synthesized: Vec<SchemaDeclaration>,
}

impl<'a> RenameResolver<'a> {
    pub fn new(router: &'a dyn TableRouter) -> Self {
        Self {
            router,
            known: HashMap::new(),
            synthesized: Vec::new(),
        }
    }

    /// Rename table-schema then table-data records, synthesizing and dropping
    /// database declarations as ownership moves.
    pub fn resolve(mut self, buckets: Buckets) -> Result<Buckets> {
        let Buckets {
            database_schemas,
            mut table_schemas,
            mut table_data,
        } = buckets;

        for decl in &database_schemas {
            let refs = self.known.entry(decl.schema.clone()).or_default();
            if !refs.has_record {
                refs.declaration = decl.file.clone();
                refs.has_record = true;
                refs.count = 1;
            }
        }
        for file in &table_schemas {
            self.known.entry(file.name.schema.clone()).or_default().count += 1;
        }

        self.run(&mut table_schemas)?;
        self.run(&mut table_data)?;

        let known = &self.known;
        let database_schemas = database_schemas
            .into_iter()
            .chain(self.synthesized)
            .filter(|decl| {
                let keep = known.get(&decl.schema).is_some_and(|refs| refs.count > 0);
                if !keep {
                    debug!(schema = %decl.schema, "schema routed away entirely");
                }
                keep
            })
            .collect();

        Ok(Buckets {
            database_schemas,
            table_schemas,
            table_data,
        })
    }

    fn run(&mut self, records: &mut [ClassifiedFile]) -> Result<()> {
        for record in records.iter_mut() {
            let (schema, table) = self
                .router
                .route(&record.name.schema, &record.name.name)
                .map_err(|source| DiscoveryError::TableRouting {
                    schema: record.name.schema.clone(),
                    table: record.name.name.clone(),
                    source,
                })?;

            if schema != record.name.schema {
                self.transfer(&record.name.schema, &schema);
            }
            record.name = TableName::new(schema, table);
        }
        Ok(())
    }

    fn transfer(&mut self, from: &str, to: &str) {
        let origin = self.known.entry(from.to_string()).or_default();
        origin.count -= 1;
        let inherited = origin.declaration.clone();

        let target = self.known.entry(to.to_string()).or_default();
        let unclaimed = target.count <= 0 && !target.has_record;
        target.count += 1;

        if unclaimed {
            // No authored declaration exists for the new name; borrow the origin's.
            target.declaration = inherited.clone();
            target.has_record = true;
            info!(
                schema = to,
                origin = from,
                declaration = inherited.as_ref().map(|f| f.path.as_str()).unwrap_or(""),
                "synthesized database declaration for routed schema"
            );
            self.synthesized.push(SchemaDeclaration {
                schema: to.to_string(),
                file: inherited,
            });
        }
    }
}
