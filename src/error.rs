//! Error taxonomy shared by the registry, generator, pipeline and workflows.

use crate::concert_store::ConcertId;
use crate::llm::LlmError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("No templates selected")]
    NoTemplatesSelected,

    #[error("No valid tracks (every track needs a title and a composer)")]
    NoValidTracks,

    #[error("Generation failed: {0}")]
    GenerationFailed(#[source] LlmError),

    #[error("Generation timed out")]
    GenerationTimeout,

    #[error("Store write failed: {0:#}")]
    StoreWriteFailed(#[source] anyhow::Error),

    #[error("Store read failed: {0:#}")]
    StoreReadFailed(#[source] anyhow::Error),

    #[error("Store operation timed out")]
    StoreTimeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Operation requires an admin session")]
    Forbidden,

    /// The concert row was written but its tracks were not.
    #[error("Concert {concert_id} was created but its tracks could not be saved: {source}")]
    TracksNotSaved {
        concert_id: ConcertId,
        #[source]
        source: Box<Error>,
    },

    /// Concert and tracks are persisted; descriptions must be regenerated later.
    #[error(
        "Concert {concert_id} and its {track_count} tracks were saved, \
         but descriptions could not be stored and must be regenerated: {source}"
    )]
    DescriptionsPending {
        concert_id: ConcertId,
        track_count: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether persisted data survived the failure and can be completed later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DescriptionsPending { .. } | Error::TracksNotSaved { .. }
        )
    }
}

impl From<LlmError> for Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => Error::GenerationTimeout,
            other => Error::GenerationFailed(other),
        }
    }
}
