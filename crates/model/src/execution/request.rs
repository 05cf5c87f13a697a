use crate::{entity::EntityKind, execution::errors::RequestError};
use serde::{Deserialize, Serialize};

/// Per-call configuration of one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub kind: EntityKind,

    /// Action name or A/B test name, injected into every written record.
    #[serde(default)]
    pub name: Option<String>,

    /// Checkpoint key; derived from `kind` and `name` when omitted.
    #[serde(default)]
    pub query_name: Option<String>,

    /// Query template with `{start}` and `{end}` tokens.
    pub query: String,

    /// Actions only: let the sink drop a second action of the same name per user.
    #[serde(default)]
    pub unique: bool,
}

impl ImportRequest {
    pub fn users(query: impl Into<String>) -> Self {
        Self::new(EntityKind::User, None, query)
    }

    pub fn profiles(query: impl Into<String>) -> Self {
        Self::new(EntityKind::Profile, None, query)
    }

    pub fn actions(action_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(EntityKind::Action, Some(action_name.into()), query)
    }

    pub fn abtests(abtest: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(EntityKind::AbTest, Some(abtest.into()), query)
    }

    fn new(kind: EntityKind, name: Option<String>, query: impl Into<String>) -> Self {
        Self {
            kind,
            name,
            query_name: None,
            query: query.into(),
            unique: false,
        }
    }

    pub fn with_query_name(mut self, query_name: impl Into<String>) -> Self {
        self.query_name = Some(query_name.into());
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// The checkpoint key this request reads and advances.
    pub fn job_name(&self) -> String {
        match self.query_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.kind.default_job_name(self.name.as_deref()),
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        let has_name = self.name.as_deref().is_some_and(|n| !n.trim().is_empty());
        if self.kind.requires_name() && !has_name {
            return Err(RequestError::MissingName(self.kind));
        }
        if self.kind == EntityKind::AbTest {
            if let Some(name) = self.name.as_deref().filter(|n| !is_field_name(n)) {
                return Err(RequestError::InvalidAbTestName(name.to_string()));
            }
        }
        if self.query.trim().is_empty() {
            return Err(RequestError::EmptyQuery(self.job_name()));
        }
        if self.unique && self.kind != EntityKind::Action {
            return Err(RequestError::UniqueNotSupported(self.kind));
        }
        Ok(())
    }
}

/// Whether `name` can be used as a single document field key.
pub fn is_field_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.') && !name.starts_with('$')
}
