use clickfeat::config::Config;
use clickfeat::features::pipeline::DerivedColumnPipeline;
use clickfeat::storage::loader;
use duckdb::Connection;
use std::path::Path;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clickfeat=info".into()),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(Path::new));

    let Some(input_path) = config.input_path.clone() else {
        tracing::error!("No input configured; set input_path or CLICKFEAT_INPUT");
        std::process::exit(1);
    };

    tracing::info!(
        input = %input_path.display(),
        output = %config.output_path.display(),
        gap_secs = config.session_gap_secs,
        "Starting clickfeat"
    );

    let conn = Connection::open_in_memory().expect("Failed to open DuckDB");
    let kind = config.input_kind.table_kind();
    let table = kind.table_name();

    let input = input_path.to_string_lossy();
    let loaded = match input_path.extension().and_then(|e| e.to_str()) {
        Some("csv") => loader::load_csv(&conn, &input, table, kind),
        Some("parquet") => loader::load_parquet(&conn, &input, table, kind),
        other => {
            tracing::error!(
                extension = other.unwrap_or(""),
                "Unsupported input format; expected .csv or .parquet"
            );
            std::process::exit(1);
        }
    };
    let rows = match loaded {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "Ingestion failed");
            std::process::exit(1);
        }
    };
    tracing::info!(rows, table, "Ingested click events");

    let pipeline = DerivedColumnPipeline::new(config.session_gap_secs);
    let report = match pipeline.run(&conn, table, "features", config.epoch_ms) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Pipeline failed");
            std::process::exit(1);
        }
    };

    let output = config.output_path.to_string_lossy();
    if let Err(e) = loader::export_parquet(&conn, "features", &output) {
        tracing::error!(error = %e, "Export failed");
        std::process::exit(1);
    }
    tracing::info!(path = %output, "Feature table written");

    // Machine-readable run summary (the evaluation run needs epoch_ms)
    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Could not serialize run report"),
    }
}
