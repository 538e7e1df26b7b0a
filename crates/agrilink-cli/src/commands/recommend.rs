use serde::Serialize;
use tracing::info;

use agrilink_core::{parse_crop_yields, ChatCompletionsGenerator, CropYield, TextGenerator};

use crate::cli::RegionArgs;
use crate::error::CliError;

use super::prompt::prepare;
use super::{CommandResult, Runtime};

#[derive(Debug, Serialize)]
struct RecommendResponseData<'a> {
    region: &'static str,
    soil_type: &'a str,
    recommendation: &'a str,
    crop_yields: Vec<CropYield>,
}

pub async fn run(args: &RegionArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let generator = ChatCompletionsGenerator::from_config(
        runtime.http.clone(),
        &runtime.config.text_generation,
    )?;
    let prepared = prepare(args, runtime).await?;

    let text = generator.recommend(&prepared.prompt).await?;
    let crop_yields = parse_crop_yields(&text);
    info!(region = prepared.region.key, crops = crop_yields.len(), "recommendation generated");

    let data = serde_json::to_value(RecommendResponseData {
        region: prepared.region.name,
        soil_type: &prepared.soil_type,
        recommendation: &text,
        crop_yields,
    })?;
    Ok(CommandResult::ok(data).with_degraded(prepared.bundle.degraded_sources()))
}
