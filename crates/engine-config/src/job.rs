use crate::settings::{ImporterSettings, error::SettingsError};
use model::execution::request::ImportRequest;
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};
use tracing::debug;

/// A TOML job file: optional `[settings]` plus one `[[import]]` table per run.
///
/// ```toml
/// [settings]
/// source_timezone = "America/Los_Angeles"
///
/// [[import]]
/// kind = "action"
/// name = "purchase"
/// query = "SELECT user_id, created_at, meta FROM purchases WHERE created_at >= '{start}' AND created_at < '{end}'"
/// unique = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub settings: ImporterSettings,

    #[serde(default, rename = "import")]
    pub imports: Vec<ImportRequest>,
}

impl JobFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let job_file = Self::parse(&content)?;
        debug!(
            "Loaded {} import(s) from {}",
            job_file.imports.len(),
            path.display()
        );
        Ok(job_file)
    }

    /// Parses and validates every import entry.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        let job_file: JobFile = toml::from_str(content)?;
        job_file.validate()?;
        Ok(job_file)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let mut seen = HashSet::new();
        for (index, request) in self.imports.iter().enumerate() {
            request
                .validate()
                .map_err(|source| SettingsError::InvalidImport { index, source })?;

            let job = request.job_name();
            if !seen.insert(job.clone()) {
                return Err(SettingsError::DuplicateJob(job));
            }
        }
        Ok(())
    }

    /// Imports in file order, restricted to `only` when it is non-empty.
    pub fn selected<'a>(&'a self, only: &'a [String]) -> impl Iterator<Item = &'a ImportRequest> {
        self.imports
            .iter()
            .filter(move |request| only.is_empty() || only.contains(&request.job_name()))
    }
}
