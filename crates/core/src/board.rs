// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::{ClockConfig, Hal};
use crate::{HarnessError, HarnessResult};
use serde::Serialize;
use stacklab_config::{DisplaySettings, UartSettings};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapCall {
    ConfigureClock,
    InitDisplay,
    EnableUart,
}

/// Record of the one-shot bring-up sequence, observable by tests and
/// included in run artifacts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootstrapLog {
    pub order: Vec<BootstrapCall>,
    pub clock: Option<ClockConfig>,
    pub display: Option<DisplaySettings>,
    pub uart: Option<UartSettings>,
}

/// Simulated evaluation board.
///
/// Peripheral bring-up is recorded rather than modeled; the UART serves
/// a pre-scripted receive stream the way the Avatar rig drove the real
/// serial line.
#[derive(Debug, Default)]
pub struct EvalBoard {
    rx: VecDeque<u8>,
    consumed: usize,
    pub bootstrap: BootstrapLog,
}

impl EvalBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl Into<Vec<u8>>) -> Self {
        Self {
            rx: VecDeque::from(input.into()),
            consumed: 0,
            bootstrap: BootstrapLog::default(),
        }
    }

    /// Bytes the firmware has pulled off the line so far.
    pub fn bytes_consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes still queued on the simulated line.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Hal for EvalBoard {
    fn configure_clock(&mut self, config: ClockConfig) {
        tracing::info!(
            "Clock: {} Hz crystal, pll={}, sysdiv={}",
            config.crystal_hz,
            config.use_pll,
            config.sysdiv
        );
        self.bootstrap.order.push(BootstrapCall::ConfigureClock);
        self.bootstrap.clock = Some(config);
    }

    fn init_display(&mut self, settings: DisplaySettings) {
        tracing::info!("Display: refresh interval {}", settings.refresh_interval);
        self.bootstrap.order.push(BootstrapCall::InitDisplay);
        self.bootstrap.display = Some(settings);
    }

    fn enable_uart(&mut self, settings: UartSettings) {
        tracing::info!(
            "UART: {} baud, {}-{:?}-{:?}",
            settings.baud_rate,
            settings.data_bits,
            settings.parity,
            settings.stop_bits
        );
        self.bootstrap.order.push(BootstrapCall::EnableUart);
        self.bootstrap.uart = Some(settings);
    }

    fn read_byte(&mut self) -> HarnessResult<u8> {
        if self.bootstrap.uart.is_none() {
            return Err(HarnessError::UartNotEnabled);
        }
        match self.rx.pop_front() {
            Some(byte) => {
                self.consumed += 1;
                tracing::debug!("UART rx[{}] = {:#04x}", self.consumed - 1, byte);
                Ok(byte)
            }
            None => Err(HarnessError::InputExhausted(self.consumed)),
        }
    }
}
