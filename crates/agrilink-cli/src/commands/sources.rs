use serde::Serialize;

use agrilink_core::SourceDescriptor;

use crate::error::CliError;

use super::{CommandResult, Runtime};

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceDescriptor>,
    weather_credential_configured: bool,
}

pub fn run(runtime: &Runtime) -> Result<CommandResult, CliError> {
    let data = SourcesResponseData {
        sources: runtime.config.registry.describe(),
        weather_credential_configured: runtime.config.weather_api_key.is_some(),
    };
    Ok(CommandResult::ok(serde_json::to_value(data)?))
}
