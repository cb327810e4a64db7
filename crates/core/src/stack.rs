// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;
use stacklab_config::BufferLayout;

/// Width of the saved return-address word (Cortex-M LR).
const RETURN_ADDRESS_BYTES: usize = 4;
/// Saved-register area per frame: return address plus one callee-saved
/// register, matching the frames the original compiler emitted.
const SAVED_FRAME_BYTES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// 50-byte receive buffer in the caller's frame.
    Input,
    /// 20-byte destination buffer in the copy routine's frame.
    Dest,
}

/// An out-of-bounds write observed by the shadow stack. The write still
/// lands in backing memory (the device has no such guard), so adjacent
/// state is corrupted exactly as on hardware; this record is the
/// instrumentation the exercise needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub region: Region,
    /// Offset within the named buffer (>= its tracked capacity).
    pub offset: usize,
    /// Absolute address in the modeled stack window.
    pub address: usize,
    pub value: u8,
    /// True when the write falls inside the copy frame's saved
    /// return-address word: the control-flow-hijack condition.
    pub clobbers_return_address: bool,
}

#[derive(Debug, Clone, Copy)]
struct TrackedBuffer {
    base: usize,
    capacity: usize,
}

/// Byte-level model of the stack window the two frames of interest
/// occupy. Layout, low address first (the stack grows down, so the
/// callee's frame sits below its caller's):
///
/// ```text
/// [ dest (copy frame) ][ ret addr | saved reg ][ input (main frame) ][ caller slack ]
/// ```
///
/// Writes inside a buffer's tracked capacity are ordinary writes.
/// Writes past it corrupt whatever is adjacent AND are recorded as
/// violations. Writes past the whole window are recorded and dropped.
#[derive(Debug)]
pub struct ShadowStack {
    mem: Vec<u8>,
    input: TrackedBuffer,
    dest: TrackedBuffer,
    ret_addr: (usize, usize),
    violations: Vec<Violation>,
}

impl ShadowStack {
    pub fn with_layout(layout: BufferLayout) -> Self {
        let dest = TrackedBuffer {
            base: 0,
            capacity: layout.copy_capacity,
        };
        let input = TrackedBuffer {
            base: layout.copy_capacity + SAVED_FRAME_BYTES,
            capacity: layout.input_capacity,
        };
        let ret_start = layout.copy_capacity;
        let size = input.base + layout.input_capacity + SAVED_FRAME_BYTES;
        Self {
            mem: vec![0; size],
            input,
            dest,
            ret_addr: (ret_start, ret_start + RETURN_ADDRESS_BYTES),
            violations: Vec::new(),
        }
    }

    fn buffer(&self, region: Region) -> TrackedBuffer {
        match region {
            Region::Input => self.input,
            Region::Dest => self.dest,
        }
    }

    pub fn base(&self, region: Region) -> usize {
        self.buffer(region).base
    }

    pub fn capacity(&self, region: Region) -> usize {
        self.buffer(region).capacity
    }

    /// Store one byte at `region[offset]` with the fidelity of a raw
    /// pointer write: no clamping, adjacency corruption included.
    pub fn write(&mut self, region: Region, offset: usize, value: u8) {
        let buf = self.buffer(region);
        let address = buf.base + offset;
        if offset >= buf.capacity {
            let clobbers = address >= self.ret_addr.0 && address < self.ret_addr.1;
            tracing::warn!(
                "OOB write: {:?}[{}] = {:#04x} (addr {}){}",
                region,
                offset,
                value,
                address,
                if clobbers { " RETURN ADDRESS" } else { "" }
            );
            self.violations.push(Violation {
                region,
                offset,
                address,
                value,
                clobbers_return_address: clobbers,
            });
        }
        if let Some(slot) = self.mem.get_mut(address) {
            *slot = value;
        }
    }

    /// Raw load from an absolute window address. Reads past the window
    /// return 0, the model's value for untouched memory.
    pub fn read_raw(&self, address: usize) -> u8 {
        self.mem.get(address).copied().unwrap_or(0)
    }

    pub fn read(&self, region: Region, offset: usize) -> Option<u8> {
        let buf = self.buffer(region);
        if offset < buf.capacity {
            Some(self.mem[buf.base + offset])
        } else {
            None
        }
    }

    /// Owned snapshot of a buffer's tracked bytes. This is how the
    /// destination leaves the copy frame: copied out while the frame is
    /// live, never by reference to frame storage.
    pub fn snapshot(&self, region: Region) -> Vec<u8> {
        let buf = self.buffer(region);
        self.mem[buf.base..buf.base + buf.capacity].to_vec()
    }

    /// The saved return-address word of the copy frame as currently in
    /// memory (all zeros unless clobbered).
    pub fn return_address_word(&self) -> [u8; RETURN_ADDRESS_BYTES] {
        let mut word = [0u8; RETURN_ADDRESS_BYTES];
        word.copy_from_slice(&self.mem[self.ret_addr.0..self.ret_addr.1]);
        word
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn return_address_clobbered(&self) -> bool {
        self.violations.iter().any(|v| v.clobbers_return_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_stack() -> ShadowStack {
        ShadowStack::with_layout(BufferLayout::default())
    }

    #[test]
    fn test_in_bounds_writes_are_silent() {
        let mut stack = default_stack();
        stack.write(Region::Input, 0, b'A');
        stack.write(Region::Input, 49, b'Z');
        stack.write(Region::Dest, 19, b'Q');

        assert!(stack.violations().is_empty());
        assert_eq!(stack.read(Region::Input, 0), Some(b'A'));
        assert_eq!(stack.read(Region::Input, 49), Some(b'Z'));
        assert_eq!(stack.read(Region::Dest, 19), Some(b'Q'));
    }

    #[test]
    fn test_dest_overflow_is_recorded_and_still_lands() {
        let mut stack = default_stack();
        stack.write(Region::Dest, 20, 0xAA);

        let v = &stack.violations()[0];
        assert_eq!(v.region, Region::Dest);
        assert_eq!(v.offset, 20);
        assert!(v.clobbers_return_address);
        // The byte really landed just above the destination buffer.
        assert_eq!(stack.read_raw(20), 0xAA);
        assert_eq!(stack.return_address_word()[0], 0xAA);
    }

    #[test]
    fn test_dest_overflow_past_saved_frame_corrupts_input_buffer() {
        let mut stack = default_stack();
        // Offset 28 in the dest buffer aliases input[0].
        stack.write(Region::Dest, 28, b'X');
        assert_eq!(stack.read(Region::Input, 0), Some(b'X'));
        assert!(!stack.violations()[0].clobbers_return_address);
    }

    #[test]
    fn test_input_overflow_is_a_distinct_violation() {
        let mut stack = default_stack();
        stack.write(Region::Input, 50, 0x41);

        let v = &stack.violations()[0];
        assert_eq!(v.region, Region::Input);
        assert_eq!(v.offset, 50);
        assert!(!v.clobbers_return_address);
    }

    #[test]
    fn test_write_past_window_is_recorded_but_dropped() {
        let mut stack = default_stack();
        let window = 20 + 8 + 50 + 8;
        stack.write(Region::Input, 200, 0x41);

        assert_eq!(stack.violations().len(), 1);
        assert!(stack.violations()[0].address >= window);
        assert_eq!(stack.read_raw(stack.violations()[0].address), 0);
    }

    #[test]
    fn test_snapshot_is_owned_copy() {
        let mut stack = default_stack();
        stack.write(Region::Dest, 0, b'H');
        let snap = stack.snapshot(Region::Dest);
        stack.write(Region::Dest, 0, b'X');
        assert_eq!(snap[0], b'H');
        assert_eq!(snap.len(), 20);
    }
}
