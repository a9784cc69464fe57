use std::time::{Duration, Instant};

use tokenlens_core::{
    AggregationConfig, Aggregator, CalendarDate, FetchOrchestrator, ProviderCredentials,
    ProviderId, RetryPolicy, TokenIdentifier,
};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::providers::credential_env;
use super::{parse_threshold, CommandResult};

pub async fn run(args: &AnalyzeArgs) -> Result<CommandResult, CliError> {
    let mut token = TokenIdentifier::new(&args.chain, &args.address)?;
    if let Some(pair) = &args.pair {
        token = token.with_pair(pair)?;
    }

    let config = build_config(args)?;
    let credentials = ProviderCredentials {
        moralis_api_key: args.moralis_api_key.clone(),
        bitquery_oauth_token: args.bitquery_oauth_token.clone(),
    };

    let mut warnings = Vec::new();
    if !args.mock {
        for provider in &config.enabled {
            if !credentials.is_configured(*provider) {
                if let Some(variable) = credential_env(*provider) {
                    warnings.push(format!("{provider}: {variable} is not set"));
                }
            }
        }
    }

    let retry = match args.retries {
        0 => RetryPolicy::no_retry(),
        retries => RetryPolicy::exponential(retries),
    };
    let mut builder = FetchOrchestrator::builder()
        .with_credentials(credentials)
        .with_retry(retry);
    if args.mock {
        builder = builder.with_mock_mode();
    }

    let source_chain = config.enabled.iter().copied().collect::<Vec<ProviderId>>();
    let aggregator = Aggregator::new(builder.build(), config);

    let started = Instant::now();
    let record = aggregator.run(&token).await?;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let data = serde_json::to_value(&record)?;

    Ok(CommandResult::ok(data, source_chain)
        .with_warnings(warnings)
        .with_latency(latency_ms)
        .with_manifest(record.manifest))
}

fn build_config(args: &AnalyzeArgs) -> Result<AggregationConfig, CliError> {
    let mut config = if args.providers.is_empty() {
        AggregationConfig::default()
    } else {
        AggregationConfig::with_providers(args.providers.iter().copied())
    };

    config.provider_timeout = Duration::from_millis(args.timeout_ms);
    config.deadline = args.deadline_ms.map(Duration::from_millis);
    config.snapshot_date = args
        .snapshot_date
        .as_deref()
        .map(CalendarDate::parse)
        .transpose()?;
    config.lookback_days = args.lookback_days;
    config.holder_limit = args.holder_limit;
    config.trade_limit = args.trade_limit;
    config.nakamoto_threshold = parse_threshold(&args.threshold)?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use tokenlens_core::Completeness;

    use super::*;
    use crate::cli::{Cli, Command};

    fn analyze_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec![
            "tokenlens",
            "analyze",
            "0x4200000000000000000000000000000000000006",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("arguments should parse").command {
            Command::Analyze(args) => args,
            other => panic!("expected analyze, got {other:?}"),
        }
    }

    #[test]
    fn config_follows_flags() {
        let args = analyze_args(&[
            "--providers",
            "moralis,gmgn",
            "--timeout-ms",
            "2500",
            "--deadline-ms",
            "4000",
            "--snapshot-date",
            "2025-02-01",
            "--holder-limit",
            "50",
        ]);

        let config = build_config(&args).expect("valid config");

        assert_eq!(config.enabled.len(), 2);
        assert_eq!(config.provider_timeout, Duration::from_millis(2500));
        assert_eq!(config.deadline, Some(Duration::from_millis(4000)));
        assert_eq!(config.holder_limit, 50);
        assert_eq!(
            config.snapshot_date.map(CalendarDate::format_iso).as_deref(),
            Some("2025-02-01")
        );
    }

    #[test]
    fn zero_timeout_is_a_validation_error() {
        let args = analyze_args(&["--timeout-ms", "0"]);
        let error = build_config(&args).expect_err("must fail");
        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn mock_run_is_complete() {
        let args = analyze_args(&["--mock"]);

        let result = run(&args).await.expect("mock run succeeds");

        let manifest = result.manifest.expect("run manifest");
        assert_eq!(Completeness::of(&manifest).missing, 0);
        assert_eq!(result.source_chain.len(), ProviderId::ALL.len());
        assert!(result.warnings.is_empty());
        assert_eq!(result.data["price"]["status"], "present");
    }
}
