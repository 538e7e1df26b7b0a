use thiserror::Error;

/// Input validation errors exposed by `agrilink-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("latitude {value} is outside -90..=90")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is outside -180..=180")]
    LongitudeOutOfRange { value: f64 },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error(
        "invalid source '{value}', expected one of sustainability, farm_practice, market_price, weather"
    )]
    InvalidSource { value: String },
    #[error("unknown region '{value}'")]
    UnknownRegion { value: String },

    #[error("land name cannot be empty")]
    EmptyLandName,
    #[error("land boundary must contain at least three vertices, got {len}")]
    BoundaryTooShort { len: usize },
}

/// Deployment defects detected while loading configuration or wiring sources.
///
/// These are not recoverable by falling back and surface at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("missing credential for source '{source_name}': set {variable}")]
    MissingCredential {
        source_name: &'static str,
        variable: &'static str,
    },
    #[error("endpoint for source '{source_name}' must be an http(s) URL, got '{value}'")]
    InvalidEndpoint {
        source_name: &'static str,
        value: String,
    },
}

/// Reason a single upstream fetch did not produce a usable payload.
///
/// Every variant is absorbed by the degradation policy; none of them reaches
/// the caller of `Aggregator::aggregate`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("upstream did not answer within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("upstream returned status {status}")]
    Status { status: u16 },
    #[error("malformed response: {message}")]
    Malformed { message: String },
    #[error("request context is missing {field}")]
    MissingContext { field: &'static str },
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Whether the failure is the kind that may clear up on the next request.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Status { .. }
        )
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "fetch.transport",
            Self::Timeout { .. } => "fetch.timeout",
            Self::Status { .. } => "fetch.status",
            Self::Malformed { .. } => "fetch.malformed",
            Self::MissingContext { .. } => "fetch.missing_context",
            Self::Configuration { .. } => "fetch.configuration",
            Self::Internal { .. } => "fetch.internal",
        }
    }
}

/// Failure of the text-generation collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecommendError {
    #[error("text generation is not configured: set {variable}")]
    NotConfigured { variable: &'static str },
    #[error("text generation transport error: {message}")]
    Transport { message: String },
    #[error("text generation service returned status {status}")]
    Status { status: u16 },
    #[error("text generation response was unusable: {message}")]
    Malformed { message: String },
}

/// Failure of the land persistence collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("land {land_id} does not exist")]
    UnknownLand { land_id: uuid::Uuid },
    #[error("land store lock was poisoned")]
    Poisoned,
}
