//! es-export - parallel metadata export
//!
//! Runs a query against an index pattern with sliced scroll requests and
//! writes the selected fields of every hit to CSV.
//!
//! # Usage
//!
//! ```bash
//! es-export -l INFO --slices 10 query.json 'kg__message_*'
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use es_export::cli::CliInterface;
use es_export::connection::HttpTransport;
use es_export::dialect::EngineDialect;
use es_export::error::Result;
use es_export::export::{ExportCoordinator, ExportSettings};
use es_export::query::{CompileSettings, compile, load_query_document};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Detect the engine dialect
/// 4. Compile the query and run the export
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    let config = cli.config();
    info!("Query file: {}", cli.query_file().display());
    info!("Index pattern: {}", cli.index_pattern());

    let transport = Arc::new(HttpTransport::new(&config.server)?);
    let dialect = EngineDialect::detect(transport.as_ref()).await?;
    info!("Engine version: {}", dialect);

    let raw = load_query_document(cli.query_file())?;
    let plan = compile(
        raw,
        dialect,
        &CompileSettings {
            partitions: config.export.slices,
            batch_size: config.export.batch_size,
            doc_type: config.export.doc_type.clone(),
        },
    )?;

    // Ctrl+C stops every slice; the partial file is reported as unusable
    let cancel_token = CancellationToken::new();
    let cancel_on_signal = cancel_token.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, stopping export");
                cancel_on_signal.cancel();
            }
            Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    let settings = ExportSettings::from_config(config, cli.args().progress);
    let outcome = ExportCoordinator::new(transport, dialect, settings)
        .with_cancellation(cancel_token)
        .export(cli.index_pattern(), &plan)
        .await;
    ctrl_c_handle.abort();

    let result = outcome?;
    if !result.skipped {
        info!(
            "Saved {} messages to {} ({} bytes).",
            result.documents_exported,
            result.output_file.display(),
            result.file_size_bytes
        );
    }
    info!("Done.");
    Ok(())
}

/// Initialize logging from the effective configuration
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
