//! dbgen - schema compiler
//!
//! This is the main entry point for the dbgen CLI.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dbgen_code::{Renderer, Rustfmt, Verbatim};
use dbgen_core::config::{ConfigLoader, GenConfig};
use dbgen_core::ir::{Ir, ModelId};
use dbgen_sql::{Dialect, DialectError, DialectRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// dbgen - compile a schema into SQL and data-access code
#[derive(Parser)]
#[command(name = "dbgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate data-access code for a schema
    Generate {
        /// Path to the schema file
        schema: PathBuf,

        /// Configuration file (defaults to dbgen.toml / dbgen.json next to the schema)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dialects to render, overriding the configuration
        #[arg(short, long = "dialect")]
        dialects: Vec<String>,

        /// Module name used in the generated header
        #[arg(short, long)]
        module: Option<String>,

        /// Output file (stdout when unset)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip rustfmt
        #[arg(long)]
        no_format: bool,
    },

    /// Check a schema without generating anything
    Check {
        /// Path to the schema file
        schema: PathBuf,
    },

    /// Print the SQL for every query of a schema
    Sql {
        /// Path to the schema file
        schema: PathBuf,

        #[arg(short, long, default_value = "postgres")]
        dialect: String,

        /// Only print the CREATE TABLE statements
        #[arg(long)]
        schema_only: bool,
    },

    /// Print the resolved IR as JSON
    Ir {
        /// Path to the schema file
        schema: PathBuf,

        #[arg(long)]
        pretty: bool,
    },

    /// List the available dialects
    Dialects {
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let registry = DialectRegistry::builtin();

    match cli.command {
        Commands::Generate {
            schema,
            config,
            dialects,
            module,
            output,
            no_format,
        } => {
            let mut config = load_config(&schema, config.as_deref())?;
            if !dialects.is_empty() {
                config.dialects = dialects;
            }
            if let Some(module) = module {
                config.module = module;
            }
            if output.is_some() {
                config.output = output;
            }
            if no_format {
                config.format = false;
            }
            tracing::debug!(?config, "effective configuration");

            let ir = compile(&schema)?;
            let dialects = registry.resolve_all(config.dialects.as_slice())?;
            generate(&ir, &dialects, &config)?;
        }

        Commands::Check { schema } => {
            let ir = compile(&schema)?;
            let queries = ir.inserts.len()
                + ir.selects.len()
                + ir.updates.len()
                + ir.deletes.len()
                + ir.counts.len();
            println!(
                "✅ Schema '{}' is valid ({} models, {} queries)",
                schema.display(),
                ir.models.len(),
                queries
            );
        }

        Commands::Sql {
            schema,
            dialect,
            schema_only,
        } => {
            let ir = compile(&schema)?;
            let dialect = registry.resolve(&dialect)?;
            print!("{}", dialect.render_schema(&ir));
            if !schema_only {
                print!("{}", query_listing(&ir, dialect.as_ref())?);
            }
        }

        Commands::Ir { schema, pretty } => {
            let ir = compile(&schema)?;
            let json = if pretty {
                serde_json::to_string_pretty(&ir)?
            } else {
                serde_json::to_string(&ir)?
            };
            println!("{}", json);
        }

        Commands::Dialects { json } => {
            let list = registry.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for info in list {
                    println!(
                        "{:<10} returning={:<5} last_insert_id={:<5} {}",
                        info.name,
                        info.features.returning,
                        info.features.last_insert_id,
                        info.description
                    );
                }
            }
        }

        Commands::Version => {
            println!("dbgen v{}", dbgen_core::VERSION);
        }
    }

    Ok(())
}

/// Explicit config file, else one discovered next to the schema, else defaults
fn load_config(schema: &Path, explicit: Option<&Path>) -> anyhow::Result<GenConfig> {
    if let Some(path) = explicit {
        tracing::info!("Loading configuration from {}", path.display());
        return Ok(ConfigLoader::load(path)?);
    }
    let dir = schema
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(ConfigLoader::discover(dir)?.unwrap_or_default())
}

/// Compile a schema file, printing diagnostics on failure
fn compile(path: &Path) -> anyhow::Result<Ir> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;

    match dbgen_syntax::compile(&source) {
        Ok(ir) => Ok(ir),
        Err(e) => {
            let name = path.display().to_string();
            for diagnostic in e.diagnostics() {
                eprint!("{}", diagnostic.render_report(&name, &source));
            }
            bail!("Schema '{}' failed to compile", name)
        }
    }
}

fn generate(ir: &Ir, dialects: &[Arc<dyn Dialect>], config: &GenConfig) -> anyhow::Result<()> {
    let renderer = Renderer::new(config.module.clone());
    let renderer = if config.format {
        renderer.with_formatter(Rustfmt::new(config.edition.as_str()))
    } else {
        renderer.with_formatter(Verbatim)
    };
    let rendered = renderer.render(ir, dialects)?;
    if config.format && !rendered.formatted {
        tracing::warn!("Generated code was left unformatted");
    }

    match &config.output {
        Some(path) => {
            std::fs::write(path, &rendered.source)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "✅ Wrote {} ({} exported methods)",
                path.display(),
                rendered.signatures.len()
            );
        }
        None => print!("{}", rendered.source),
    }
    Ok(())
}

/// Every query of the schema as it renders in one dialect
fn query_listing(ir: &Ir, dialect: &dyn Dialect) -> Result<String, DialectError> {
    let model = |id: ModelId| ir.model(id).name.as_str();
    let mut out = String::new();

    for insert in &ir.inserts {
        out.push_str(&format!("\n-- insert {}\n{};\n", model(insert.model), dialect.render_insert(ir, insert)));
    }
    for select in &ir.selects {
        out.push_str(&format!("\n-- select {}\n{};\n", model(select.model), dialect.render_select(ir, select)));
        if let Some(page) = dialect.render_select_page(ir, select) {
            out.push_str(&format!("\n-- select {} (paged)\n{};\n", model(select.model), page));
        }
    }
    for count in &ir.counts {
        out.push_str(&format!("\n-- count {}\n{};\n", model(count.model), dialect.render_count(ir, count)));
        out.push_str(&format!("\n-- has {}\n{};\n", model(count.model), dialect.render_has(ir, count)));
    }
    for update in &ir.updates {
        out.push_str(&format!("\n-- update {}\n{};\n", model(update.model), dialect.render_update(ir, update)));
    }
    for delete in &ir.deletes {
        out.push_str(&format!("\n-- delete {}\n{};\n", model(delete.model), dialect.render_delete(ir, delete)));
    }
    if !dialect.features().returning {
        for &target in &ir.returning_targets {
            let statement = dialect.render_get_last(ir, target)?;
            out.push_str(&format!("\n-- get last {}\n{};\n", model(target), statement));
        }
    }
    Ok(out)
}
