use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] agrilink_core::ValidationError),

    #[error(transparent)]
    Config(#[from] agrilink_core::ConfigError),

    #[error(transparent)]
    Recommend(#[from] agrilink_core::RecommendError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 3,
            Self::Serialization(_) => 4,
            Self::Recommend(_) => 5,
            Self::Io(_) => 10,
        }
    }
}
