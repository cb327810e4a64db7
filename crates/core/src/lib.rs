// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod board;
pub mod firmware;
pub mod hal;
pub mod stack;


pub use board::EvalBoard;
pub use firmware::{run_scenario, RunReport};
pub use stack::{Region, ShadowStack, Violation};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("UART receive stream exhausted after {0} byte(s); firmware would busy-wait forever")]
    InputExhausted(usize),
    #[error("UART not enabled before first receive")]
    UartNotEnabled,
}

pub type HarnessResult<T> = Result<T, HarnessError>;
