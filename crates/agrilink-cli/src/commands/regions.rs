use serde::Serialize;

use agrilink_core::{Region, REGIONS};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct RegionsResponseData {
    regions: &'static [Region],
}

pub fn run() -> Result<CommandResult, CliError> {
    let data = serde_json::to_value(RegionsResponseData { regions: &REGIONS })?;
    Ok(CommandResult::ok(data))
}
