use crate::{
    commands::{Commands, SettingsArgs, WatermarkCommand},
    conn::pinger_for,
    error::CliError,
};
use clap::Parser;
use connectors::{
    adapter::{SourceKind, connect_source, redact_url},
    document::mongo::MongoDocumentStore,
};
use engine_config::{
    env::EnvManager,
    job::JobFile,
    settings::{ImporterSettings, parse_rfc3339},
};
use engine_core::{
    importer::{Importer, ImporterOptions},
    watermark::WatermarkStore,
};
use std::{str::FromStr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "trickle",
    version = "0.1.0",
    about = "Incremental importer from relational databases into an analytics store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            only,
            json,
            settings,
        } => {
            run_job_file(&config, &only, json, &settings).await?;
        }
        Commands::Watermark { command } => match command {
            WatermarkCommand::Show {
                job,
                json,
                config,
                settings,
            } => {
                let watermarks = open_watermarks(config.as_deref(), &settings).await?;
                let at = watermarks.get(&job).await?;
                output::print_watermark(&job, at, json)?;
            }
            WatermarkCommand::Set {
                job,
                at,
                force,
                config,
                settings,
            } => {
                let at = parse_rfc3339("--at", &at)?;
                let watermarks = open_watermarks(config.as_deref(), &settings).await?;
                let previous = watermarks.set(&job, at, force).await?;
                info!(
                    "Watermark for '{}' moved from {} to {}",
                    job,
                    previous.map_or_else(|| "n/a".to_string(), |p| p.to_rfc3339()),
                    at.to_rfc3339()
                );
            }
        },
        Commands::TestConn { format, conn_str } => {
            let kind = SourceKind::from_str(&format)
                .map_err(|_| CliError::InvalidConnectionFormat(format))?;
            pinger_for(kind, conn_str).ping().await?;
        }
    }

    Ok(())
}

/// Environment, then the job file's `[settings]`, then command-line flags.
fn load_settings(
    file_settings: Option<&ImporterSettings>,
    args: &SettingsArgs,
) -> Result<ImporterSettings, CliError> {
    let mut env = EnvManager::from_process();
    if let Some(path) = &args.env_file {
        env.load_from_file(path)?;
    }
    let settings = ImporterSettings::from_env(&env)
        .merge(file_settings.cloned().unwrap_or_default())
        .merge(args.overrides());
    Ok(settings)
}

async fn run_job_file(
    path: &str,
    only: &[String],
    as_json: bool,
    args: &SettingsArgs,
) -> Result<(), CliError> {
    let job_file = JobFile::load(path)?;
    let settings = load_settings(Some(&job_file.settings), args)?.validate()?;

    for name in only {
        if !job_file.imports.iter().any(|r| &r.job_name() == name) {
            warn!("No import named '{}' in {}", name, path);
        }
    }

    info!(
        "Connecting to {} source {} (timezone {})",
        settings.source_kind,
        redact_url(&settings.source_uri),
        settings.timezone
    );
    let source = connect_source(&settings.source_uri).await?;
    let store = MongoDocumentStore::connect(&settings.sink_uri, &settings.sink_database).await?;

    let mut importer = Importer::new(
        source,
        Arc::new(store),
        ImporterOptions {
            timezone: settings.timezone,
            initial_watermark: settings.initial_watermark,
        },
    );

    let mut result = Ok(());
    for request in job_file.selected(only) {
        match importer.run(request).await {
            Ok(report) => output::print_report(&report, as_json)?,
            Err(err) => {
                result = Err(CliError::Import(err));
                break;
            }
        }
    }

    importer.close().await?;
    result
}

async fn open_watermarks(
    config: Option<&str>,
    args: &SettingsArgs,
) -> Result<WatermarkStore, CliError> {
    let job_file = config.map(JobFile::load).transpose()?;
    let settings = load_settings(job_file.as_ref().map(|f| &f.settings), args)?;
    let (sink_uri, sink_database) = settings.validate_sink()?;
    let store = MongoDocumentStore::connect(&sink_uri, &sink_database).await?;
    Ok(WatermarkStore::new(Arc::new(store), None))
}
