// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

use stacklab_config::{CopyMode, InputStream, Scenario};
use stacklab_core::{run_scenario, RunReport};

const EXIT_CLEAN: u8 = 0;
const EXIT_VIOLATION: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

fn parse_copy_mode(s: &str) -> Result<CopyMode, String> {
    CopyMode::from_str(s)
}

/// Parse a hex stimulus like "49 41 41" or "0x49,0x41".
fn parse_hex_stream(s: &str) -> Result<Vec<u8>, String> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            let tok = tok
                .strip_prefix("0x")
                .or_else(|| tok.strip_prefix("0X"))
                .unwrap_or(tok);
            u8::from_str_radix(tok, 16).map_err(|e| format!("Invalid hex byte '{}': {}", tok, e))
        })
        .collect()
}

#[derive(Parser, Debug)]
#[command(author, version, about = "StackLab Overflow Harness", long_about = None)]
struct Cli {
    /// Path to a scenario file (YAML)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Inline serial stimulus as text (first byte is the length byte)
    #[arg(short, long, conflicts_with = "scenario")]
    input: Option<String>,

    /// Inline serial stimulus as hex bytes, e.g. "49 41 41"
    #[arg(long, conflicts_with_all = ["scenario", "input"])]
    input_hex: Option<String>,

    /// Override the copy semantics: unchecked (default) or bounded
    #[arg(long, value_parser = parse_copy_mode)]
    copy_mode: Option<CopyMode>,

    /// Enable byte-level receive tracing
    #[arg(short, long)]
    trace: bool,

    /// Directory to write the result artifact (result.json)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the result JSON to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunResult {
    result_schema_version: String,
    status: String,
    scenario: String,
    copy_mode: String,
    declared_length: i64,
    bytes_consumed: usize,
    truncated: bool,
    return_address_clobbered: bool,
    violations: Vec<ViolationRecord>,
    input: Vec<u8>,
    destination: Vec<u8>,
    stimulus_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ViolationRecord {
    region: String,
    offset: usize,
    address: usize,
    value: u8,
    clobbers_return_address: bool,
}

fn build_result(scenario: &Scenario, stimulus: &[u8], report: &RunReport) -> RunResult {
    let mut hasher = Sha256::new();
    hasher.update(stimulus);

    RunResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: if report.violations.is_empty() {
            "clean".to_string()
        } else {
            "violation".to_string()
        },
        scenario: scenario.name.clone(),
        copy_mode: format!("{:?}", report.copy_mode).to_ascii_lowercase(),
        declared_length: report.declared_length,
        bytes_consumed: report.bytes_consumed,
        truncated: report.truncated,
        return_address_clobbered: report.return_address_clobbered,
        violations: report
            .violations
            .iter()
            .map(|v| ViolationRecord {
                region: format!("{:?}", v.region).to_ascii_lowercase(),
                offset: v.offset,
                address: v.address,
                value: v.value,
                clobbers_return_address: v.clobbers_return_address,
            })
            .collect(),
        input: report.input.clone(),
        destination: report.destination.clone(),
        stimulus_hash: format!("{:x}", hasher.finalize()),
    }
}

fn write_result(dir: &PathBuf, result: &RunResult) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("result.json");
    let f = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(f, result)?;
    info!("Result written to {:?}", path);
    Ok(())
}

fn load_scenario(cli: &Cli) -> anyhow::Result<Scenario> {
    if let Some(path) = &cli.scenario {
        return Scenario::from_file(path);
    }

    let mut scenario = Scenario::new("inline");
    if let Some(text) = &cli.input {
        scenario.input = InputStream::from_text(text.clone());
    } else if let Some(hex) = &cli.input_hex {
        let bytes = parse_hex_stream(hex).map_err(anyhow::Error::msg)?;
        scenario.input = InputStream::from_bytes(bytes);
    } else {
        anyhow::bail!("one of --scenario, --input or --input-hex is required");
    }
    Ok(scenario)
}

fn run(cli: Cli) -> ExitCode {
    let mut scenario = match load_scenario(&cli) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    if let Some(mode) = cli.copy_mode {
        scenario.copy_mode = mode;
    }

    let stimulus = match scenario.input.resolve() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(
        "Running scenario '{}' ({:?} copy, {} stimulus byte(s))",
        scenario.name,
        scenario.copy_mode,
        stimulus.len()
    );

    let report = match run_scenario(&scenario) {
        Ok(report) => report,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let result = build_result(&scenario, &stimulus, &report);

    for v in &result.violations {
        info!(
            "OOB write: {}[{}] = {:#04x}{}",
            v.region,
            v.offset,
            v.value,
            if v.clobbers_return_address {
                " (return address)"
            } else {
                ""
            }
        );
    }

    if let Some(dir) = &cli.output_dir {
        if let Err(e) = write_result(dir, &result) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }
    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    if result.violations.is_empty() {
        info!("Status: clean");
        ExitCode::from(EXIT_CLEAN)
    } else {
        info!(
            "Status: {} violation(s), return address clobbered: {}",
            result.violations.len(),
            result.return_address_clobbered
        );
        ExitCode::from(EXIT_VIOLATION)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    run(cli)
}
