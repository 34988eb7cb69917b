//! pkg-core-migrate CLI - managed package to core schema migration.

mod prompt;

use clap::{Parser, Subcommand};
use pkg_core_migrate::store::load_snapshot_dir;
use pkg_core_migrate::{
    ComponentType, Config, MemoryRecordStore, MigrateError, Orchestrator, SourceRewriter,
    ToolContext,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "pkg-core-migrate")]
#[command(about = "Migrate managed-package components to the core schema")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Directory of JSON snapshot files backing the record store
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report migration readiness without changing anything
    Assess {
        /// Restrict to one component type
        #[arg(long)]
        component: Option<String>,
    },

    /// Run the migration lifecycle end to end
    Migrate {
        /// Restrict to one component type
        #[arg(long)]
        component: Option<String>,

        /// Skip the interactive consent prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Print the old-name to new-name mapping table
    Mappings {
        /// Restrict to one component type
        #[arg(long)]
        component: Option<String>,
    },

    /// Rewrite extension source files off the legacy interfaces
    Rewrite {
        /// Directory of source files (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Write the changes; the default is a dry run printing diffs
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = if cli.config.exists() {
        let config = Config::load(&cli.config)?;
        info!("Loaded configuration from {:?}", cli.config);
        config
    } else {
        info!("No configuration file at {:?}; using defaults", cli.config);
        Config::default()
    };

    let store = build_store(cli.snapshot_dir.as_deref())?;
    let ctx = ToolContext::new(store.clone(), store, &config.namespace);

    match cli.command {
        Commands::Assess { component } => {
            let subset = component_subset(component.as_deref(), &config)?;
            let mut orchestrator = Orchestrator::with_components(ctx, &subset);
            let findings = orchestrator.assess().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&findings)?);
            } else if findings.is_empty() {
                println!("Nothing to migrate.");
            } else {
                println!("Assessment ({} components):", findings.len());
                for finding in &findings {
                    let marker = if finding.eligible { "ok" } else { "!!" };
                    println!(
                        "  [{marker}] {} '{}' -> '{}'",
                        finding.component_type, finding.name, finding.new_name
                    );
                    for warning in &finding.warnings {
                        println!("       - {warning}");
                    }
                }
            }
        }

        Commands::Migrate { component, yes } => {
            let subset = component_subset(component.as_deref(), &config)?;
            if !yes {
                prompt::confirm_migration(
                    &prompt::StdinPrompter,
                    config.migration.prompt_attempts,
                    config.migration.prompt_timeout(),
                )
                .await?;
            }

            let mut orchestrator = Orchestrator::with_components(ctx, &subset);
            let report = orchestrator.run().await?;

            if let Some(ref path) = config.migration.report_path {
                std::fs::write(path, report.to_json()?)?;
                info!("Wrote run report to {:?}", path);
            }

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("\nMigration {}!", report.status);
                println!("  Run ID: {}", report.run_id);
                println!("  Duration: {:.2}s", report.duration_seconds);
                println!(
                    "  Components: {}/{}",
                    report.components_clean, report.components_total
                );
                println!(
                    "  Records: {}/{}",
                    report.records_migrated, report.records_total
                );
                if !report.action_items.is_empty() {
                    println!("  Action items:");
                    for item in &report.action_items {
                        println!("    - {item}");
                    }
                }
            }

            // Exit status is the contract for scripted callers; a report
            // that says failed must not exit 0.
            if report.status != "completed" {
                return Err(MigrateError::Validation(format!(
                    "migration run {}: {} action item(s)",
                    report.status,
                    report.action_items.len()
                )));
            }
        }

        Commands::Mappings { component } => {
            let subset = component_subset(component.as_deref(), &config)?;
            let mut orchestrator = Orchestrator::with_components(ctx, &subset);
            let registry = orchestrator.build_registry().await?;

            let filter = component
                .as_deref()
                .map(ComponentType::from_str)
                .transpose()?;
            let mappings: Vec<_> = registry
                .all_mappings()?
                .into_iter()
                .filter(|m| filter.map_or(true, |f| m.component_type == f))
                .collect();

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&mappings)?);
            } else if mappings.is_empty() {
                println!("No name mappings.");
            } else {
                for mapping in &mappings {
                    let suffix = if mapping.collision { "  [collision]" } else { "" };
                    println!(
                        "  {} '{}' -> '{}'{}",
                        mapping.component_type, mapping.old_name, mapping.new_name, suffix
                    );
                }
            }
        }

        Commands::Rewrite { dir, apply } => {
            let source_dir = dir
                .or_else(|| config.rewrite.source_dir.clone())
                .ok_or_else(|| {
                    MigrateError::UserInput(
                        "--dir or rewrite.source_dir is required for rewrite".to_string(),
                    )
                })?;

            let mut orchestrator = Orchestrator::new(ctx, None);
            let registry = orchestrator.build_registry().await?;

            let dry_run = !apply || config.rewrite.dry_run;
            let mut rewriter = SourceRewriter::new(&config.namespace, &registry, dry_run)?;
            let outcomes = rewriter.rewrite_dir(&source_dir)?;

            let mut failed = 0usize;
            for outcome in &outcomes {
                println!(
                    "  {:?}: {} ({} edits)",
                    outcome.status,
                    outcome.file.display(),
                    outcome.edits_applied
                );
                for warning in &outcome.warnings {
                    println!("     - {warning}");
                }
                if let Some(ref error) = outcome.error {
                    println!("     ! {error}");
                    failed += 1;
                }
                if dry_run && !outcome.diff.is_empty() {
                    println!("{}", outcome.diff);
                }
            }

            if failed > 0 {
                return Err(MigrateError::Rewrite(format!(
                    "{failed} of {} files failed; none of the failed files were modified",
                    outcomes.len()
                )));
            }
        }
    }

    Ok(())
}

/// The component subset for this invocation: the command-line flag wins,
/// then the config list, then everything.
fn component_subset(flag: Option<&str>, config: &Config) -> Result<Vec<ComponentType>, MigrateError> {
    if let Some(name) = flag {
        return Ok(vec![ComponentType::from_str(name)?]);
    }
    config
        .migration
        .components
        .iter()
        .map(|name| ComponentType::from_str(name))
        .collect()
}

/// Offline store, loaded from a snapshot directory when given.
fn build_store(snapshot_dir: Option<&std::path::Path>) -> Result<Arc<MemoryRecordStore>, MigrateError> {
    match snapshot_dir {
        Some(dir) => {
            let store = load_snapshot_dir(dir)?;
            info!("Loaded snapshot data from {:?}", dir);
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryRecordStore::new())),
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
