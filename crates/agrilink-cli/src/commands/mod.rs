mod aggregate;
mod prompt;
mod recommend;
mod regions;
mod sources;

use std::sync::Arc;
use std::time::{Duration, Instant};

use agrilink_core::{
    AgriConfig, Aggregator, HttpClient, OfflineHttpClient, ReqwestHttpClient, SourceKind,
};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata};

pub struct CommandResult {
    pub data: Value,
    pub degraded: Vec<SourceKind>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            degraded: Vec::new(),
        }
    }

    pub fn with_degraded(mut self, degraded: Vec<SourceKind>) -> Self {
        self.degraded = degraded;
        self
    }
}

/// Shared wiring for commands that talk to upstreams.
pub struct Runtime {
    pub config: AgriConfig,
    pub http: Arc<dyn HttpClient>,
    /// Every call is refused, so upstream credentials are not required.
    pub offline: bool,
}

impl Runtime {
    fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = AgriConfig::from_env()?;
        if let Some(timeout_ms) = cli.timeout_ms {
            config = config.with_request_timeout(Duration::from_millis(timeout_ms));
        }

        let http: Arc<dyn HttpClient> = if cli.offline {
            Arc::new(OfflineHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };

        Ok(Self {
            config,
            http,
            offline: cli.offline,
        })
    }

    /// Aggregator with exactly `sources` enabled.
    pub fn aggregator(&self, sources: &[SourceKind]) -> Result<Aggregator, CliError> {
        Aggregator::builder()
            .with_config(self.config.clone())
            .with_http_client(Arc::clone(&self.http))
            .with_sources(sources)
            .require_credentials(!self.offline)
            .build()
            .map_err(CliError::from)
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let started = Instant::now();
    let runtime = Runtime::from_cli(cli)?;

    let result = match &cli.command {
        Command::Sources => sources::run(&runtime)?,
        Command::Regions => regions::run()?,
        Command::Aggregate(args) => aggregate::run(args, &runtime).await?,
        Command::Prompt(args) => prompt::run(args, &runtime).await?,
        Command::Recommend(args) => recommend::run(args, &runtime).await?,
    };

    let latency_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
    Ok(Envelope {
        meta: Metadata::new(latency_ms, result.degraded),
        data: result.data,
    })
}
