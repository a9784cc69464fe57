use serde_json::Value;
use tokenlens_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope)?),
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line(format!("request_id  : {}", envelope.meta.request_id));
    line(format!("trace_id    : {}", envelope.meta.trace_id));
    line(format!("schema      : {}", envelope.meta.schema_version));
    line(format!("generated_at: {}", envelope.meta.generated_at));
    line(format!(
        "sources     : {}",
        envelope
            .meta
            .source_chain
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    ));
    line(format!("latency_ms  : {}", envelope.meta.latency_ms));
    if let Some(completeness) = envelope.meta.completeness {
        line(format!(
            "sections    : {} requested, {} present, {} degraded, {} missing",
            completeness.requested,
            completeness.present,
            completeness.degraded,
            completeness.missing
        ));
    }

    if !envelope.meta.warnings.is_empty() {
        line(String::from("warnings:"));
        for warning in &envelope.meta.warnings {
            line(format!("  - {warning}"));
        }
    }

    if let Some(manifest) = envelope.data.get("manifest").and_then(Value::as_object) {
        line(String::from("sections:"));
        for (section, entry) in manifest {
            let status = entry
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let provider = entry
                .get("provider")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            line(format!("  {section:<10} {status:<9} ({provider})"));
        }
    }

    line(String::from("data:"));
    let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
    for data_line in pretty_data.lines() {
        line(format!("  {data_line}"));
    }

    if !envelope.errors.is_empty() {
        line(String::from("errors:"));
        for error in &envelope.errors {
            line(format!("  - {}: {}", error.code, error.message));
        }
    }

    Ok(out)
}
