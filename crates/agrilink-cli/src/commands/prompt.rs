use serde::Serialize;

use agrilink_core::{build_prompt, Region, ResponseBundle, SourceKind};

use crate::cli::RegionArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

/// Sources the recommendation prompt reads.
pub(super) const PROMPT_SOURCES: [SourceKind; 3] = [
    SourceKind::Sustainability,
    SourceKind::MarketPrice,
    SourceKind::Weather,
];

/// A catalog region with its aggregated data and rendered prompt.
pub(super) struct PreparedPrompt {
    pub region: &'static Region,
    pub soil_type: String,
    pub bundle: ResponseBundle,
    pub prompt: String,
}

pub(super) async fn prepare(args: &RegionArgs, runtime: &Runtime) -> Result<PreparedPrompt, CliError> {
    let region = Region::find(&args.region)?;
    let soil_type = args
        .soil_type
        .clone()
        .unwrap_or_else(|| region.soil_type.to_owned());

    let aggregator = runtime.aggregator(&PROMPT_SOURCES)?;
    let bundle = aggregator
        .aggregate(&region.to_context()?, &PROMPT_SOURCES)
        .await;
    let prompt = build_prompt(region.name, &soil_type, &bundle);

    Ok(PreparedPrompt {
        region,
        soil_type,
        bundle,
        prompt,
    })
}

#[derive(Debug, Serialize)]
struct PromptResponseData<'a> {
    region: &'a str,
    soil_type: &'a str,
    prompt: &'a str,
}

pub async fn run(args: &RegionArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let prepared = prepare(args, runtime).await?;
    let data = serde_json::to_value(PromptResponseData {
        region: prepared.region.name,
        soil_type: &prepared.soil_type,
        prompt: &prepared.prompt,
    })?;
    Ok(CommandResult::ok(data).with_degraded(prepared.bundle.degraded_sources()))
}
