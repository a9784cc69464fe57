use thiserror::Error;
use tokenlens_core::AggregateError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tokenlens_core::ValidationError),

    #[error("strict mode failed: degraded={degraded_count}, missing={missing_count}")]
    StrictModeViolation {
        degraded_count: usize,
        missing_count: usize,
    },

    #[error("{}: {}", .0.code(), .0)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Computation(#[from] tokenlens_core::ComputationError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Aggregate(AggregateError::Validation(_)) => 2,
            Self::StrictModeViolation { .. } => 5,
            Self::Aggregate(_) => 7,
            Self::Computation(_) => 7,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
