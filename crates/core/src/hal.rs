// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::HarnessResult;
use serde::Serialize;
use stacklab_config::{DisplaySettings, UartSettings};

/// System clock bring-up parameters. Defaults match the original board:
/// 8 MHz main crystal through the PLL with a divide-by-10 system divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockConfig {
    pub crystal_hz: u32,
    pub use_pll: bool,
    pub sysdiv: u8,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            crystal_hz: 8_000_000,
            use_pll: true,
            sysdiv: 10,
        }
    }
}

/// Board abstraction the firmware logic runs against.
///
/// Bring-up calls are treated as infallible, matching the vendor driver
/// layer on the real board. Only the receive path can fail, and only in
/// simulation (a real UART busy-waits instead).
pub trait Hal {
    fn configure_clock(&mut self, config: ClockConfig);
    fn init_display(&mut self, settings: DisplaySettings);
    fn enable_uart(&mut self, settings: UartSettings);

    /// Blocking read of one byte from the serial line.
    fn read_byte(&mut self) -> HarnessResult<u8>;
}
