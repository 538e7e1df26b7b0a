use std::fmt::{Display, Formatter};

use agrilink_core::SourceKind;
use serde::Serialize;
use uuid::Uuid;

/// Request identifier (UUID v4) for correlating output with logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Metadata block of every JSON envelope.
///
/// `degraded` lists the sources that answered with a fallback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub latency_ms: u64,
    pub degraded: Vec<SourceKind>,
}

impl Metadata {
    pub fn new(latency_ms: u64, degraded: Vec<SourceKind>) -> Self {
        Self {
            request_id: RequestId::new_v4(),
            latency_ms,
            degraded,
        }
    }
}

/// Command output: metadata plus the command's data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub meta: Metadata,
    pub data: serde_json::Value,
}
