//! CLI argument definitions for tokenlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Run one aggregation over every enabled provider |
//! | `providers` | List providers, their sections and credentials |
//! | `stats` | Compute holder statistics over a local balance list |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--format` | `json` | Output format (json, table) |
//! | `--strict` | `false` | Fail unless every section is present |
//! | `-v` | warn | Raise log verbosity (repeatable) |
//!
//! # Examples
//!
//! ```bash
//! # Offline run against deterministic fixtures
//! tokenlens analyze 0x4200000000000000000000000000000000000006 --mock --pretty
//!
//! # Only price and holders, with a 5 second run deadline
//! tokenlens analyze 0xabc... --providers moralis,bitquery-holders --deadline-ms 5000
//!
//! # Statistics over a local file
//! tokenlens stats balances.json
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tokenlens_core::ProviderId;

/// Token analytics aggregator.
///
/// Fans out to Moralis, Bitquery and GMGN concurrently and folds the results
/// into one record with locally computed holder-concentration statistics.
#[derive(Debug, Parser)]
#[command(
    name = "tokenlens",
    author,
    version,
    about = "On-chain token analytics aggregator",
    long_about = "tokenlens fetches price, holder, trade, transfer and social data for one token \
from several providers at once and emits a single structured record. Features include:\n\
\n\
  • Concurrent provider fan-out with per-provider timeouts\n\
  • Gini, Nakamoto and Theil concentration statistics\n\
  • Per-section manifest of present, degraded and missing data\n\
  • Structured JSON output with metadata\n\
\n\
Use 'tokenlens <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Fail with exit code 5 unless every requested section is present.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Increase log verbosity on stderr (-v info, -vv debug).
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object output.
    Json,
    /// Human-readable summary for terminal display.
    Table,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate every enabled provider for one token.
    ///
    /// # Examples
    ///
    ///   tokenlens analyze 0x4200000000000000000000000000000000000006 --mock
    ///   tokenlens analyze 0xabc... --chain ethereum --pair 0xdef... --timeout-ms 5000
    Analyze(AnalyzeArgs),

    /// List known providers, the section each feeds and its credential.
    Providers,

    /// Compute holder statistics over a JSON list of {address, balance}.
    ///
    /// Reads from stdin when FILE is omitted.
    ///
    /// # Examples
    ///
    ///   tokenlens stats balances.json
    ///   cat balances.json | tokenlens stats --threshold 0.33
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Token contract address (0x-prefixed).
    pub address: String,

    /// Chain name.
    #[arg(long, default_value = "base")]
    pub chain: String,

    /// DEX pair address for the price section; the token address is used
    /// when omitted.
    #[arg(long)]
    pub pair: Option<String>,

    /// Providers to enable (comma separated). All providers when omitted.
    #[arg(long, value_delimiter = ',', value_parser = parse_provider)]
    pub providers: Vec<ProviderId>,

    /// Per-provider timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Overall run deadline in milliseconds.
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Holder snapshot date (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long)]
    pub snapshot_date: Option<String>,

    /// Trade and transfer lookback in days.
    #[arg(long, default_value_t = 7)]
    pub lookback_days: u32,

    /// Maximum number of holders fetched.
    #[arg(long, default_value_t = 100)]
    pub holder_limit: usize,

    /// Maximum number of trades and transfers fetched.
    #[arg(long, default_value_t = 500)]
    pub trade_limit: usize,

    /// Nakamoto share threshold in (0, 1).
    #[arg(long, default_value = "0.51")]
    pub threshold: String,

    /// Adapter-side retries for retryable failures (0 disables retry).
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Serve every provider from deterministic offline fixtures.
    #[arg(long, default_value_t = false)]
    pub mock: bool,

    /// Moralis API key.
    #[arg(long, env = "MORALIS_API_KEY", hide_env_values = true)]
    pub moralis_api_key: Option<String>,

    /// Bitquery OAuth token.
    #[arg(long, env = "BITQUERY_OAUTH_TOKEN", hide_env_values = true)]
    pub bitquery_oauth_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// JSON file with an array of {address, balance}; stdin when omitted.
    pub file: Option<PathBuf>,

    /// Nakamoto share threshold in (0, 1).
    #[arg(long, default_value = "0.51")]
    pub threshold: String,
}

fn parse_provider(value: &str) -> Result<ProviderId, String> {
    value.parse::<ProviderId>().map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_provider_list() {
        let cli = Cli::try_parse_from([
            "tokenlens",
            "analyze",
            "0x4200000000000000000000000000000000000006",
            "--providers",
            "moralis,bitquery-holders",
        ])
        .expect("arguments should parse");

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(
            args.providers,
            vec![ProviderId::Moralis, ProviderId::BitqueryHolders]
        );
        assert_eq!(args.chain, "base");
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = Cli::try_parse_from([
            "tokenlens",
            "analyze",
            "0x4200000000000000000000000000000000000006",
            "--providers",
            "coingecko",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["tokenlens", "-vv", "providers"]).expect("parses");
        assert_eq!(cli.verbose, 2);
    }
}
