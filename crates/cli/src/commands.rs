use clap::{Args, Subcommand};
use engine_config::settings::ImporterSettings;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the imports of a job file in file order
    Run {
        #[arg(long, help = "Job file path (TOML)")]
        config: String,

        #[arg(
            long = "only",
            value_name = "JOB",
            help = "Only run these job names (repeatable)"
        )]
        only: Vec<String>,

        #[arg(long, help = "Print run reports as JSON instead of a table")]
        json: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Inspect or seed job watermarks
    Watermark {
        #[command(subcommand)]
        command: WatermarkCommand,
    },
    /// Test a connection string against a given format
    TestConn {
        /// Data format: "mysql", "pg", …
        #[arg(long)]
        format: String,

        /// Connection string
        #[arg(long)]
        conn_str: String,
    },
}

#[derive(Subcommand)]
pub enum WatermarkCommand {
    Show {
        #[arg(long, help = "Job name")]
        job: String,

        #[arg(long, help = "Print as JSON")]
        json: bool,

        #[arg(long, help = "Job file to take [settings] from")]
        config: Option<String>,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    Set {
        #[arg(long, help = "Job name")]
        job: String,

        #[arg(long, help = "New watermark (RFC 3339)")]
        at: String,

        #[arg(long, help = "Allow moving the watermark backwards")]
        force: bool,

        #[arg(long, help = "Job file to take [settings] from")]
        config: Option<String>,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Command-line overrides; they win over the job file and the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    #[arg(long, help = "Load environment variables from this .env file")]
    pub env_file: Option<String>,

    #[arg(long, help = "Relational source URI (mysql://, postgres://)")]
    pub source_uri: Option<String>,

    #[arg(long, help = "MongoDB URI of the analytics store")]
    pub sink_uri: Option<String>,

    #[arg(long, help = "Database name in the analytics store")]
    pub sink_db: Option<String>,

    #[arg(long, help = "IANA timezone of the source timestamps (default UTC)")]
    pub source_tz: Option<String>,

    #[arg(long, help = "Watermark for jobs that never ran (RFC 3339)")]
    pub initial_watermark: Option<String>,
}

impl SettingsArgs {
    pub fn overrides(&self) -> ImporterSettings {
        ImporterSettings {
            source_uri: self.source_uri.clone(),
            sink_uri: self.sink_uri.clone(),
            sink_database: self.sink_db.clone(),
            source_timezone: self.source_tz.clone(),
            initial_watermark: self.initial_watermark.clone(),
        }
    }
}
