//! CLI entry point.
//!
//! # Responsibility
//! - Boot the process runtime from a TOML config file and/or a config
//!   argument (`MIZE_CONFIG_FILE`, `MIZE_CONFIG`).
//! - Print runtime status or single item values as JSON.
//!
//! # Invariants
//! - Option text from `--config` overrides keys read from `--config-file`.

use clap::{Parser, Subcommand};
use mize_core::{
    default_log_level, init_logging, init_runtime_value, parse_config, slot, FileModuleLoader,
    RuntimeSlot, DEFAULT_MODULE_DIR,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "mize", version, about = "Boot the mize runtime and inspect its items")]
struct Cli {
    /// JSON config object, or raw `path=value;...` option text.
    #[arg(long, global = true, env = "MIZE_CONFIG", default_value = "")]
    config: String,

    /// TOML file read before `--config`, which is merged over it.
    #[arg(long, global = true, env = "MIZE_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Base directory holding the compiled module when config names none.
    #[arg(long, global = true, env = "MIZE_MODULE_DIR", default_value = DEFAULT_MODULE_DIR)]
    module_dir: PathBuf,

    /// Absolute directory for rotating log files; logging is off without it.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Boot the runtime and print its status.
    Init,
    /// Boot the runtime and print the value at one `/`-separated key.
    Get { key: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(slot::global(), cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(slot: &RuntimeSlot, cli: Cli) -> Result<String, String> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let config = merged_config(cli.config_file.as_deref(), &cli.config)?;
    let loader = FileModuleLoader::new(cli.module_dir);
    let runtime = init_runtime_value(slot, &loader, config)
        .await
        .map_err(|err| err.to_string())?;
    log::info!(
        "event=cli_boot module=cli status=ok instance_id={}",
        runtime.id()
    );

    let output = match cli.command {
        Command::Init => serde_json::to_string_pretty(&runtime.status()),
        Command::Get { key } => serde_json::to_string_pretty(&runtime.get(&key)),
    };
    output.map_err(|err| format!("failed to render output: {err}"))
}

/// A JSON object or JSON string keeps its value; any other text is passed
/// through as a serialized config string.
fn config_argument(raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value @ (Value::Object(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

/// Reads `config_file` as TOML and merges the config argument over it.
/// Without a file the argument is returned as [`config_argument`] shapes it.
fn merged_config(config_file: Option<&Path>, raw: &str) -> Result<Value, String> {
    let Some(path) = config_file else {
        return Ok(config_argument(raw));
    };

    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config file `{}`: {err}", path.display()))?;
    let mut merged: Map<String, Value> = toml::from_str(&text)
        .map_err(|err| format!("failed to parse config file `{}`: {err}", path.display()))?;

    let overlay = match config_argument(raw) {
        Value::String(text) => parse_config(&text).map_err(|err| err.to_string())?,
        other => other,
    };
    if let Value::Object(overlay) = overlay {
        merge_into(&mut merged, overlay);
    }
    Ok(Value::Object(merged))
}

fn merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(Value::Object(existing)) if value.is_object() => {
                if let Value::Object(nested) = value {
                    merge_into(existing, nested);
                }
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}
