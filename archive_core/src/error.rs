use crate::upload::UploadStage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    /// A construction parameter is out of range. Fatal at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No active upload session")]
    NoActiveSession,

    /// The session is not at the step the operation targets.
    #[error("Unexpected input: expected {expected:?}, session is at {actual:?}")]
    WrongStage {
        expected: UploadStage,
        actual: UploadStage,
    },

    /// User input could not be parsed. The message is safe to show to the user.
    #[error("{0}")]
    ParseFailure(String),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
