use std::io::Read;

use rust_decimal::Decimal;
use tokenlens_core::{CalendarDate, DerivedStatistics, HolderRecord, HolderSnapshot};

use crate::cli::StatsArgs;
use crate::error::CliError;

use super::{parse_threshold, CommandResult};

pub fn run(args: &StatsArgs) -> Result<CommandResult, CliError> {
    let threshold = parse_threshold(&args.threshold)?;
    let input = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let statistics = compute(&input, threshold)?;
    tracing::debug!(holders = statistics.holder_count, "computed local statistics");

    let data = serde_json::to_value(&statistics)?;
    Ok(CommandResult::ok(data, Vec::new()))
}

fn compute(input: &str, threshold: Decimal) -> Result<DerivedStatistics, CliError> {
    let holders = serde_json::from_str::<Vec<HolderRecord>>(input)?;
    let snapshot = HolderSnapshot::new(CalendarDate::today(), holders);
    Ok(DerivedStatistics::from_snapshot(&snapshot, threshold)?)
}
