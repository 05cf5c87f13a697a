use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The record categories the importer knows how to replicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Profile,
    Action,
    #[serde(alias = "ab_test")]
    AbTest,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Profile => "profile",
            EntityKind::Action => "action",
            EntityKind::AbTest => "abtest",
        }
    }

    /// Whether imports of this kind carry a human-readable name (action name, test name).
    pub fn requires_name(&self) -> bool {
        matches!(self, EntityKind::Action | EntityKind::AbTest)
    }

    /// Job name used for checkpointing when the caller does not provide one.
    pub fn default_job_name(&self, name: Option<&str>) -> String {
        let prefix = match self {
            EntityKind::User => "users",
            EntityKind::Profile => "profiles",
            EntityKind::Action => "actions",
            EntityKind::AbTest => "abtests",
        };
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{prefix}.{name}"),
            None => prefix.to_string(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "profile" | "profiles" => Ok(EntityKind::Profile),
            "action" | "actions" => Ok(EntityKind::Action),
            "abtest" | "abtests" | "ab_test" => Ok(EntityKind::AbTest),
            other => Err(format!("Unknown entity kind: {other}")),
        }
    }
}
