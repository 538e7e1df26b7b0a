use serde::Serialize;

use agrilink_core::{
    market_overview, ClimateReading, Coordinates, MarketRow, Region, RequestContext,
    ResponseBundle, SourceKind,
};

use crate::cli::AggregateArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

#[derive(Debug, Serialize)]
struct AggregateResponseData<'a> {
    context: &'a RequestContext,
    results: &'a ResponseBundle,
    market_overview: Vec<MarketRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    climate: Option<[ClimateReading; 3]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    practices: Vec<String>,
}

pub async fn run(args: &AggregateArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let ctx = request_context(args)?;
    let sources = match args.sources.as_deref() {
        Some(raw) => SourceKind::parse_list(raw)?,
        None => SourceKind::ALL.to_vec(),
    };

    let aggregator = runtime.aggregator(&sources)?;
    let bundle = aggregator.aggregate(&ctx, &sources).await;

    let data = AggregateResponseData {
        context: &ctx,
        results: &bundle,
        market_overview: bundle
            .market_prices()
            .map(|prices| market_overview(&prices))
            .unwrap_or_default(),
        climate: bundle
            .weather()
            .map(|report| report.main.climate_readings()),
        practices: bundle
            .farm_practices()
            .map(|practices| practices.practice_labels())
            .unwrap_or_default(),
    };

    Ok(CommandResult::ok(serde_json::to_value(data)?).with_degraded(bundle.degraded_sources()))
}

/// Explicit coordinates win; a catalog region fills in its centre otherwise.
fn request_context(args: &AggregateArgs) -> Result<RequestContext, CliError> {
    let mut ctx = match args.region.as_deref() {
        Some(name) => match Region::find(name) {
            Ok(region) => region.to_context()?,
            Err(_) => RequestContext::for_region(name),
        },
        None => RequestContext::new(),
    };

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        ctx = ctx.with_coordinates(Coordinates::new(lat, lon)?);
    }
    Ok(ctx)
}
