//! Dumpscout CLI
//!
//! - `discover`: print the topology of a dump directory
//! - `schema`: print the extracted CREATE statement of a database or table
//! - `check`: validate a configuration file without touching the source

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use dumpscout::{DiscoveryConfig, DumpLoader, Topology};
use dumpscout_logging::LogConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "dumpscout", about = "Discover the topology of a logical database dump")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Also write logs to ~/.dumpscout/logs
    #[arg(long, global = true)]
    log_file: bool,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true, env = "DUMPSCOUT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file
#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Dump directory (overrides source.dir)
    #[arg(short = 'd', long)]
    source_dir: Option<PathBuf>,

    /// Accept data files without schema declarations
    #[arg(long)]
    no_schema: bool,

    /// Match table filters and routes case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Table filter rule, e.g. "db.*" or "!db.tmp_*". Repeatable.
    #[arg(short = 'f', long = "filter")]
    filters: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover databases, tables and data files
    Discover {
        #[command(flatten)]
        source: SourceArgs,

        /// List every data file under its table
        #[arg(long)]
        files: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the CREATE statement of a database, or of a table when given
    Schema {
        #[command(flatten)]
        source: SourceArgs,

        database: String,

        table: Option<String>,
    },

    /// Validate configuration
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = dumpscout_logging::init_logging(LogConfig {
        app_name: "dumpscout",
        verbose: cli.verbose,
        log_to_file: cli.log_file,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Discover {
            source,
            files,
            json,
        } => {
            let loader = open_loader(config, source)?;
            if json {
                println!("{}", serde_json::to_string_pretty(loader.topology())?);
            } else {
                print_topology(loader.topology(), files);
            }
            Ok(())
        }
        Commands::Schema {
            source,
            database,
            table,
        } => {
            let loader = open_loader(config, source)?;
            let text = match table.as_deref() {
                Some(table) => {
                    let meta = loader
                        .topology()
                        .table(&database, table)
                        .with_context(|| format!("table `{}`.`{}` not found", database, table))?;
                    loader.table_schema(meta)
                }
                None => {
                    let db = loader
                        .topology()
                        .database(&database)
                        .with_context(|| format!("database `{}` not found", database))?;
                    loader.database_schema(db)
                }
            };
            if text.is_empty() {
                bail!("no schema statement available");
            }
            println!("{}", text);
            Ok(())
        }
        Commands::Check => {
            config.validate()?;
            config.character_set()?;
            println!("Configuration OK");
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<DiscoveryConfig> {
    match path {
        Some(path) => DiscoveryConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(DiscoveryConfig::default()),
    }
}

fn open_loader(mut config: DiscoveryConfig, args: SourceArgs) -> Result<DumpLoader> {
    if let Some(dir) = args.source_dir {
        config.source.dir = dir.to_string_lossy().into_owned();
    }
    config.source.no_schema |= args.no_schema;
    config.source.case_sensitive |= args.case_sensitive;
    if !args.filters.is_empty() {
        config.source.filter = Some(args.filters);
    }
    debug!(dir = %config.source.dir, no_schema = config.source.no_schema, "resolved source");

    DumpLoader::new(&config).with_context(|| format!("Failed to discover '{}'", config.source.dir))
}

fn print_topology(topology: &Topology, show_files: bool) {
    if topology.is_empty() {
        println!("No tables found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["DATABASE", "TABLE", "FILES", "SIZE", "SCHEMA FILE"]);

    for db in topology.databases() {
        for meta in &db.tables {
            table.add_row(vec![
                Cell::new(&db.name),
                Cell::new(&meta.name),
                Cell::new(meta.data_files.len()),
                Cell::new(format_size(meta.total_size)),
                Cell::new(meta.schema_file.as_ref().map_or("-", |f| f.path.as_str())),
            ]);
            if show_files {
                for file in &meta.data_files {
                    table.add_row(vec![
                        Cell::new(""),
                        Cell::new(format!("  {}", file.path)),
                        Cell::new(file.kind.as_str()),
                        Cell::new(format_size(file.size)),
                        Cell::new(file.compression.as_str()),
                    ]);
                }
            }
        }
    }
    println!("{table}");
    println!(
        "{} database(s), {} table(s), {}",
        topology.databases().len(),
        topology.table_count(),
        format_size(topology.total_size())
    );
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
