// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Default schema version for YAML scenarios
fn default_schema_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario input must set exactly one of `text` or `bytes`")]
    AmbiguousInput,
    #[error("buffer capacity `{0}` must be non-zero")]
    ZeroCapacity(&'static str),
    #[error("copy capacity ({copy}) must not exceed input capacity ({input})")]
    CapacityOrder { copy: usize, input: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// UART line parameters. Defaults match the original board bring-up:
/// 38400 baud, 8 data bits, no parity, one stop bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UartSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for UartSettings {
    fn default() -> Self {
        Self {
            baud_rate: 38_400,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// OLED display bring-up parameters (opaque to the harness; recorded only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub refresh_interval: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            refresh_interval: 1_000_000,
        }
    }
}

/// Tracked capacities of the two stack buffers under study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferLayout {
    pub input_capacity: usize,
    pub copy_capacity: usize,
}

impl Default for BufferLayout {
    fn default() -> Self {
        Self {
            input_capacity: 50,
            copy_capacity: 20,
        }
    }
}

/// Copy-path semantics. `Unchecked` reproduces the vulnerability under
/// study; `Bounded` is the capacity-clamped variant with truncation
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyMode {
    #[default]
    Unchecked,
    Bounded,
}

impl FromStr for CopyMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "unchecked" | "vulnerable" | "raw" => Ok(Self::Unchecked),
            "bounded" | "checked" | "safe" => Ok(Self::Bounded),
            _ => Err(format!(
                "unsupported copy mode '{}'; supported: unchecked, bounded",
                value
            )),
        }
    }
}

/// Serial stimulus fed to the firmware, either as printable text or as
/// explicit byte values (needed for non-digit length bytes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputStream {
    pub text: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

impl InputStream {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            bytes: None,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            text: None,
            bytes: Some(bytes),
        }
    }

    /// Resolve to the raw byte stream the UART will serve.
    pub fn resolve(&self) -> Result<Vec<u8>, ScenarioError> {
        match (&self.text, &self.bytes) {
            (Some(t), None) => Ok(t.as_bytes().to_vec()),
            (None, Some(b)) => Ok(b.clone()),
            (None, None) => Ok(Vec::new()),
            (Some(_), Some(_)) => Err(ScenarioError::AmbiguousInput),
        }
    }
}

/// A complete run scenario: board bring-up parameters, buffer layout,
/// copy semantics and the serial stimulus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub uart: UartSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub buffers: BufferLayout,
    #[serde(default)]
    pub copy_mode: CopyMode,
    #[serde(default)]
    pub input: InputStream,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema_version: default_schema_version(),
            name: name.into(),
            uart: UartSettings::default(),
            display: DisplaySettings::default(),
            buffers: BufferLayout::default(),
            copy_mode: CopyMode::default(),
            input: InputStream::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {:?}", path))?;
        let scenario: Scenario =
            serde_yaml::from_str(&content).context("Failed to parse scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.buffers.input_capacity == 0 {
            return Err(ScenarioError::ZeroCapacity("input_capacity"));
        }
        if self.buffers.copy_capacity == 0 {
            return Err(ScenarioError::ZeroCapacity("copy_capacity"));
        }
        if self.buffers.copy_capacity > self.buffers.input_capacity {
            return Err(ScenarioError::CapacityOrder {
                copy: self.buffers.copy_capacity,
                input: self.buffers.input_capacity,
            });
        }
        if self.input.text.is_some() && self.input.bytes.is_some() {
            return Err(ScenarioError::AmbiguousInput);
        }
        if self.schema_version != "1.0" {
            tracing::warn!(
                "Scenario schema version '{}' is newer than this tool understands",
                self.schema_version
            );
        }
        Ok(())
    }
}
