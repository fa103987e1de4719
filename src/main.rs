//! `prsync` CLI entrypoint: runs the pull request and review syncs.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use prsync::{
    IntakeError, PrsyncConfig, StderrJsonlTelemetrySink, SyncContext, migrate_database,
    run_pull_request_sync, run_review_sync,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<(), IntakeError> {
    let config = load_config()?;

    if config.migrate_db {
        return migrate(&config);
    }

    let pipeline = config.pipeline()?;
    let context = SyncContext::from_config(&config)?
        .with_telemetry(Arc::new(StderrJsonlTelemetrySink));

    if pipeline.includes_pull_requests() {
        let inserted = run_pull_request_sync(&context)?;
        write_line(&format!(
            "Inserted {inserted} PR rows into github_pull_requests"
        ))?;
    }
    if pipeline.includes_reviews() {
        let upserted = run_review_sync(&context)?;
        write_line(&format!(
            "Upserted {upserted} review rows into github_pull_request_reviews"
        ))?;
    }
    Ok(())
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PrsyncConfig, IntakeError> {
    PrsyncConfig::load().map_err(|error| IntakeError::Configuration {
        message: error.to_string(),
    })
}

fn migrate(config: &PrsyncConfig) -> Result<(), IntakeError> {
    let database_url = config.require_database_url()?;
    let schema_version = migrate_database(database_url, &StderrJsonlTelemetrySink).map_err(
        |error| IntakeError::Write {
            message: error.to_string(),
        },
    )?;
    write_line(&format!(
        "Database migrated to schema version {}",
        schema_version.as_str()
    ))
}

fn write_line(message: &str) -> Result<(), IntakeError> {
    writeln!(io::stdout().lock(), "{message}").map_err(|error| IntakeError::Io {
        message: error.to_string(),
    })
}
