use clap::{Parser, ValueEnum};
use geoflow::prelude::*;
use std::fs;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Traces the lineage of a single output feature of a pipeline execution
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the process definition JSON file
    definition_path: String,
    /// Path to the process execution JSON file
    execution_path: String,
    /// Path to the geometry store / catalog fixture JSON file
    store_path: String,

    /// Key of the step output the feature belongs to
    #[arg(long)]
    output_key: String,

    /// URI of the feature to trace
    #[arg(long)]
    uri: String,

    /// Identifier of the feature, reported back unchanged
    #[arg(long, default_value = "")]
    id: String,

    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Remap step keys onto 0..N before resolving
    #[arg(long)]
    normalize: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geoflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        exit_with_error(&e.to_string());
    }
}

fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();

    let definition_json = read(&cli.definition_path)?;
    let execution_json = read(&cli.execution_path)?;
    let store_json = read(&cli.store_path)?;

    let mut definition = ProcessDefinition::from_json(&definition_json)?;
    let mut execution: ProcessExecutionRecord = serde_json::from_str(&execution_json)
        .map_err(|e| format!("Failed to parse execution JSON: {e}"))?;
    if cli.normalize {
        definition = definition.normalize();
        let rekeyed = execution.align_step_keys(&definition);
        tracing::debug!(rekeyed, "Aligned execution step keys with the normalized definition");
    }
    let (store, catalog) = StoreDocument::from_json(&store_json)?.into_parts();

    tracing::info!(
        definition = definition.name(),
        execution = execution.id,
        status = %execution.status,
        "Loaded pipeline"
    );

    let resolver = LineageResolver::builder(store, catalog).build();
    let provenance = resolver.resolve(&definition, &execution, &cli.output_key, &cli.id, &cli.uri)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&provenance)?),
        OutputFormat::Text => println!("{}", ProvenanceFormatter::format(&provenance)),
    }

    tracing::info!(elapsed = ?start.elapsed(), "Lineage resolved");
    Ok(())
}

fn read(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}").into())
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {message}");
    process::exit(1);
}
