// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::board::{BootstrapLog, EvalBoard};
use crate::hal::{ClockConfig, Hal};
use crate::stack::{Region, ShadowStack, Violation};
use crate::HarnessResult;
use serde::Serialize;
use stacklab_config::{CopyMode, Scenario};

/// ASCII-digit bias applied to the raw length byte. Applied to whatever
/// byte arrives; non-digit bytes flow through unclamped.
const LENGTH_BIAS: i64 = 48;

/// Everything observable after one pass of the firmware, copied out of
/// the shadow stack into owned storage.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Biased length as the firmware computed it (may be negative or
    /// far beyond either buffer for non-digit input).
    pub declared_length: i64,
    pub bytes_consumed: usize,
    /// Tracked bytes of the 50-byte receive buffer.
    pub input: Vec<u8>,
    /// Tracked bytes of the 20-byte destination buffer.
    pub destination: Vec<u8>,
    pub copy_mode: CopyMode,
    /// Set only in bounded mode when the source did not fit.
    pub truncated: bool,
    pub violations: Vec<Violation>,
    pub return_address_clobbered: bool,
    pub bootstrap: BootstrapLog,
}

/// One-shot peripheral bring-up: clock, display, UART, in that order.
/// No return value and no failure path, as on the device.
pub fn bootstrap(hal: &mut dyn Hal, scenario: &Scenario) {
    hal.configure_clock(ClockConfig::default());
    hal.init_display(scenario.display);
    hal.enable_uart(scenario.uart);
}

/// The input-copy routine under study.
///
/// Reads a single length byte, biases it by `-48`, pulls that many
/// bytes into the receive buffer, terminates, and hands the string to
/// the copy primitive. No bound is ever checked against either buffer's
/// capacity on the unchecked path; the shadow stack records what that
/// costs.
pub fn read_and_copy(
    hal: &mut dyn Hal,
    stack: &mut ShadowStack,
    mode: CopyMode,
) -> HarnessResult<(i64, bool)> {
    let raw = hal.read_byte()?;
    let length = raw as i64 - LENGTH_BIAS;
    tracing::debug!("Declared length {} (raw byte {:#04x})", length, raw);

    let mut i: i64 = 0;
    while i < length {
        let byte = hal.read_byte()?;
        stack.write(Region::Input, i as usize, byte);
        i += 1;
    }
    stack.write(Region::Input, i as usize, 0);

    let truncated = match mode {
        CopyMode::Unchecked => {
            copy_unchecked(stack);
            false
        }
        CopyMode::Bounded => copy_bounded(stack),
    };
    Ok((length, truncated))
}

/// strcpy equivalent: walk the source until its terminator, storing
/// every byte (terminator included) into the destination buffer with no
/// capacity check.
fn copy_unchecked(stack: &mut ShadowStack) {
    let src_base = stack.base(Region::Input);
    let mut i = 0;
    loop {
        let byte = stack.read_raw(src_base + i);
        stack.write(Region::Dest, i, byte);
        if byte == 0 {
            break;
        }
        i += 1;
    }
}

/// Capacity-clamped variant: copies at most `capacity - 1` bytes,
/// always terminates, reports truncation. Never writes out of bounds.
fn copy_bounded(stack: &mut ShadowStack) -> bool {
    let src_base = stack.base(Region::Input);
    let capacity = stack.capacity(Region::Dest);
    let mut truncated = false;
    let mut i = 0;
    loop {
        let byte = stack.read_raw(src_base + i);
        if byte == 0 {
            break;
        }
        if i == capacity - 1 {
            truncated = true;
            break;
        }
        stack.write(Region::Dest, i, byte);
        i += 1;
    }
    stack.write(Region::Dest, i, 0);
    truncated
}

/// Full pass: bring the simulated board up, run the input-copy routine
/// once, and copy every observable out into an owned report.
pub fn run_scenario(scenario: &Scenario) -> anyhow::Result<RunReport> {
    let input = scenario.input.resolve()?;
    let mut board = EvalBoard::with_input(input);
    let mut stack = ShadowStack::with_layout(scenario.buffers);

    bootstrap(&mut board, scenario);
    let (declared_length, truncated) = read_and_copy(&mut board, &mut stack, scenario.copy_mode)?;

    let report = RunReport {
        declared_length,
        bytes_consumed: board.bytes_consumed(),
        input: stack.snapshot(Region::Input),
        destination: stack.snapshot(Region::Dest),
        copy_mode: scenario.copy_mode,
        truncated,
        violations: stack.violations().to_vec(),
        return_address_clobbered: stack.return_address_clobbered(),
        bootstrap: board.bootstrap.clone(),
    };

    if report.violations.is_empty() {
        tracing::info!("Run clean: {} byte(s) consumed", report.bytes_consumed);
    } else {
        tracing::info!(
            "Run recorded {} violation(s), return address clobbered: {}",
            report.violations.len(),
            report.return_address_clobbered
        );
    }
    Ok(report)
}
