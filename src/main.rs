use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use claude_wire::codec;
use claude_wire::{Content, ContentBlock, Decode, Encode, Message, Response, Tool};

#[derive(Parser)]
#[command(author, version, about = "Decode, summarize and re-encode message payload JSON", long_about = None)]
struct Cli {
    /// JSON file to read; stdin when omitted or "-"
    input: Option<PathBuf>,

    /// What the input holds (can also be set via CLAUDE_WIRE_KIND environment variable)
    #[arg(short, long, value_enum)]
    kind: Option<Kind>,

    /// How to print the decoded value
    #[arg(short, long, value_enum, default_value_t = Output::Summary)]
    output: Output,

    /// Fail unless re-encoding reproduces the input
    #[arg(long)]
    check: bool,

    /// Log filter directive (can also be set via CLAUDE_WIRE_LOG environment variable)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Response,
    Message,
    Content,
    Block,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Summary,
    Json,
    Pretty,
}

struct Report {
    summary: String,
    encoded: Value,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let kind = match cli.kind {
        Some(kind) => kind,
        None => env::var("CLAUDE_WIRE_KIND")
            .ok()
            .map(|raw| <Kind as ValueEnum>::from_str(&raw, true).map_err(|err| anyhow!(err)))
            .transpose()
            .context("CLAUDE_WIRE_KIND is not a valid kind")?
            .unwrap_or(Kind::Response),
    };

    let bytes = read_input(cli.input.as_deref())?;
    println!("{}", run(kind, &bytes, cli.output, cli.check)?);
    Ok(())
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_env("CLAUDE_WIRE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        _ => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn run(kind: Kind, bytes: &[u8], output: Output, check: bool) -> Result<String> {
    let report = inspect(kind, bytes)?;

    if check {
        let original: Value = serde_json::from_slice(bytes).context("input is not valid JSON")?;
        if !same_wire_value(&original, &report.encoded) {
            debug!(original = %original, encoded = %report.encoded, "round trip mismatch");
            bail!("re-encoded {:?} differs from the input", kind);
        }
        info!(?kind, "round trip check passed");
    }

    Ok(match output {
        Output::Summary => report.summary,
        Output::Json => serde_json::to_string(&report.encoded)?,
        Output::Pretty => serde_json::to_string_pretty(&report.encoded)?,
    })
}

fn inspect(kind: Kind, bytes: &[u8]) -> Result<Report> {
    match kind {
        Kind::Response => decode_as(bytes, |response: &Response| {
            format!(
                "response:{} model:{} stop:{} tokens:{}/{}\n{}",
                response.id,
                response.model,
                response
                    .stop_reason
                    .as_ref()
                    .map_or_else(|| "none".to_string(), ToString::to_string),
                response.usage.input_tokens,
                response.usage.output_tokens,
                response.content
            )
        }),
        Kind::Message => decode_as(bytes, Message::summary),
        Kind::Content => decode_as(bytes, |content: &Content| content.to_string()),
        Kind::Block => decode_as(bytes, |block: &ContentBlock| block.to_string()),
        Kind::Tool => decode_as(bytes, |tool: &Tool| {
            format!(
                "tool:{} properties:{}",
                tool.name(),
                tool.input_schema().properties.len()
            )
        }),
    }
}

fn decode_as<T, F>(bytes: &[u8], summarize: F) -> Result<Report>
where
    T: Decode + Encode,
    F: Fn(&T) -> String,
{
    let value: T = codec::from_slice(bytes).context("failed to decode input")?;
    let encoded = value.encode().context("failed to re-encode input")?;
    Ok(Report {
        summary: summarize(&value),
        encoded,
    })
}

/// Equality where a `null` member and a missing member count as the same thing, at any depth.
/// Decoding reads both as absent, so only the field's emission policy decides which comes back.
fn same_wire_value(original: &Value, encoded: &Value) -> bool {
    strip_nulls(original) == strip_nulls(encoded)
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, member)| !member.is_null())
                .map(|(key, member)| (key.clone(), strip_nulls(member)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}
