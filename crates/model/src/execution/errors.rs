use crate::entity::EntityKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("{0} imports require a name")]
    MissingName(EntityKind),

    #[error("A/B test name '{0}' must not contain '.' or start with '$'")]
    InvalidAbTestName(String),

    #[error("Import '{0}' has an empty query template")]
    EmptyQuery(String),

    #[error("The unique flag only applies to action imports, not {0}")]
    UniqueNotSupported(EntityKind),
}
