pub mod db;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod interpolation;
pub mod join;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod segmentation;
pub mod settings;
pub mod utils;

use anyhow::{Context, Result};

pub use db::Database;
pub use error::{PipelineError, PipelineResult};
pub use settings::Settings;

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("pupilfuse starting up...");

    let settings = Settings::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let report = runtime.block_on(pipeline::run_pipeline(&settings))?;
    log::info!(
        "report written to {} ({} joined records)",
        settings.report_path().display(),
        report.joined_records
    );
    Ok(())
}
