mod analyze;
mod providers;
mod stats;

use rust_decimal::Decimal;
use serde_json::Value;
use tokenlens_core::{Envelope, ProviderId, SectionManifest, ValidationError};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
    /// Present for aggregation runs only.
    pub manifest: Option<SectionManifest>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            latency_ms: 0,
            source_chain,
            manifest: None,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_manifest(mut self, manifest: SectionManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let command_result = match &cli.command {
        Command::Analyze(args) => analyze::run(args).await?,
        Command::Providers => providers::run()?,
        Command::Stats(args) => stats::run(args)?,
    };

    let CommandResult {
        data,
        warnings,
        latency_ms,
        source_chain,
        manifest,
    } = command_result;

    let mut metadata = Metadata::new(source_chain, latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta();

    Ok(match manifest {
        Some(manifest) => Envelope::for_run(meta, data, &manifest),
        None => Envelope::new(meta, data),
    })
}

fn parse_threshold(raw: &str) -> Result<Decimal, CliError> {
    let value = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|_| ValidationError::InvalidThreshold {
            value: raw.to_owned(),
        })?;
    if value <= Decimal::ZERO || value >= Decimal::ONE {
        return Err(ValidationError::InvalidThreshold {
            value: raw.to_owned(),
        }
        .into());
    }
    Ok(value)
}
