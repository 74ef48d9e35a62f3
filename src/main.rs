//! Verdictboard - AI vs reviewer verdict comparison board
//!
//! A CLI shell around the widget engine: load a table snapshot, select the
//! category and verdict columns, and print the per-category comparison
//! series the dashboard widget would chart.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad snapshot, config parse failure, accessor error)
//!   2 - Configuration incomplete (one of the three columns is unselected)

use anyhow::{Context, Result};
use verdictboard::cli::{Args, OutputFormat};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;
use verdictboard::config::Config;
use verdictboard::engine::WidgetEngine;
use verdictboard::host::{
    MemoryConfigStore, MemoryTable, RenderSignal, SchemaSource, TableSnapshot,
};
use verdictboard::models::{SeriesPoint, WidgetState};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Verdictboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_board(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .verdictboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".verdictboard.toml");

    if path.exists() {
        eprintln!("⚠️  .verdictboard.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .verdictboard.toml")?;

    println!("✅ Created .verdictboard.toml with default settings.");
    println!("   Edit it to set the behavior, AI, and reviewer column ids.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Render hook that logs when a run settles, standing in for the host's
/// snapshot-capture signal.
struct LogRenderSignal;

impl RenderSignal for LogRenderSignal {
    fn settled(&self, state: &WidgetState) {
        debug!("render settled: {}", state);
    }
}

/// Run the board workflow. Returns the exit code.
async fn run_board(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let format = resolve_format(&args, &config);

    // Step 1: Load the table snapshot
    let table_path = args
        .table
        .as_ref()
        .context("a table snapshot is required (--table)")?;
    let snapshot = TableSnapshot::load(table_path)?;
    info!(
        "Loaded snapshot: {} fields, {} records",
        snapshot.fields.len(),
        snapshot.records.len()
    );

    // Handle --list-fields: print the schema and exit
    if args.list_fields {
        return handle_list_fields(&snapshot).await;
    }

    // Warn about configured columns that don't resolve in this snapshot;
    // their cells will read as absent.
    for field_id in [
        &config.columns.behavior_field_id,
        &config.columns.ai_field_id,
        &config.columns.reviewer_field_id,
    ]
    .into_iter()
    .flatten()
    {
        if !field_id.is_empty() && !snapshot.has_field(field_id) {
            warn!("Configured column not present in snapshot: {}", field_id);
        }
    }

    // Step 2: Wire the in-memory host and the engine
    let table = Arc::new(MemoryTable::new(snapshot));
    let store = Arc::new(MemoryConfigStore::with_config(config.columns.clone()));
    let engine = WidgetEngine::new(table.clone(), store, config.labels.clone())
        .with_render_signal(Arc::new(LogRenderSignal));

    // Step 3: Run one aggregation pass
    println!("🔬 Aggregating verdicts across {} records...", table.record_count());
    let report = engine.refresh().await?;

    match report.state {
        WidgetState::ConfigIncomplete => {
            eprintln!("\n⚠️  Configuration incomplete: all three columns must be selected.");
            eprintln!("   Provide --behavior-field, --ai-field, and --reviewer-field,");
            eprintln!("   or set them in .verdictboard.toml. Use --list-fields to see columns.");
            Ok(2)
        }
        WidgetState::Ready(series) => {
            match format {
                OutputFormat::Json => print_json(&series, &report.metadata)?,
                OutputFormat::Table => print_table(&series, &config.labels),
            }

            if let Some(metadata) = report.metadata {
                println!(
                    "\n✅ {} records scanned, {} skipped (no category), {} categories, {:.2}s",
                    metadata.records_scanned,
                    metadata.records_skipped,
                    series.len(),
                    metadata.duration_seconds
                );
            }
            Ok(0)
        }
        // refresh() returns Err for failures and never publishes Loading
        // as a final state, but keep the match total.
        other => {
            eprintln!("\n❌ Unexpected final state: {}", other);
            Ok(1)
        }
    }
}

/// Handle --list-fields: print the snapshot schema and exit.
async fn handle_list_fields(snapshot: &TableSnapshot) -> Result<i32> {
    println!("\n🔍 Columns in snapshot:\n");

    let table = MemoryTable::new(snapshot.clone());
    let fields = table.list_fields().await?;

    if fields.is_empty() {
        println!("   (no fields)");
    } else {
        for field in &fields {
            println!("   📄 {}  {}", field.id, field.display_name);
        }
        println!("\n   Total: {} columns", fields.len());
    }

    Ok(0)
}

/// Print the series as JSON, including run metadata.
fn print_json(
    series: &[SeriesPoint],
    metadata: &Option<verdictboard::models::RunMetadata>,
) -> Result<()> {
    let payload = serde_json::json!({
        "series": series,
        "metadata": metadata,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Print the series as an aligned text table.
fn print_table(series: &[SeriesPoint], labels: &verdictboard::config::VerdictLabels) {
    if series.is_empty() {
        println!("\n   No data: the table held no records with a category.");
        return;
    }

    println!(
        "\n{:<20} {:>10} {:>10} {:>14} {:>14}",
        "Category",
        format!("AI {}", labels.normal),
        format!("AI {}", labels.violation),
        format!("Reviewer {}", labels.normal),
        format!("Reviewer {}", labels.violation),
    );

    for point in series {
        println!(
            "{:<20} {:>10} {:>10} {:>14} {:>14}",
            point.category,
            point.ai_normal,
            point.ai_violation,
            point.reviewer_normal,
            point.reviewer_violation,
        );
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .verdictboard.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Resolve the output format from CLI args, then config file, then default.
fn resolve_format(args: &Args, config: &Config) -> OutputFormat {
    if let Some(format) = args.format {
        return format;
    }
    match config.general.format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    }
}
