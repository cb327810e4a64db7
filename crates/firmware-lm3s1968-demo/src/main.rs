#![no_std]
// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_main]
#![allow(clippy::empty_loop)]

// On-target rendition of the vulnerable test program for the LM3S1968
// evaluation board: UART0 at 38400 8-N-1, one length-prefixed read into
// a 50-byte stack buffer, then an unchecked copy into a 20-byte one.
// The missing bounds checks are the point of the exercise; do not add
// them here.

use cortex_m_rt::entry;
use panic_halt as _;

// System control (clock gating). LM3S1968 datasheet, SYSCTL block.
const SYSCTL_BASE: u32 = 0x400F_E000;
const SYSCTL_RCGC1: *mut u32 = (SYSCTL_BASE + 0x104) as *mut u32;
const SYSCTL_RCGC2: *mut u32 = (SYSCTL_BASE + 0x108) as *mut u32;
const RCGC1_UART0: u32 = 1 << 0;
const RCGC2_GPIOA: u32 = 1 << 0;

// GPIO port A: PA0/PA1 are U0Rx/U0Tx.
const GPIOA_BASE: u32 = 0x4000_4000;
const GPIOA_AFSEL: *mut u32 = (GPIOA_BASE + 0x420) as *mut u32;
const GPIOA_DEN: *mut u32 = (GPIOA_BASE + 0x51C) as *mut u32;
const UART_PINS: u32 = (1 << 0) | (1 << 1);

// UART0 register block.
const UART0_BASE: u32 = 0x4000_C000;
const UART0_DR: *mut u32 = UART0_BASE as *mut u32;
const UART0_FR: *const u32 = (UART0_BASE + 0x018) as *const u32;
const UART0_IBRD: *mut u32 = (UART0_BASE + 0x024) as *mut u32;
const UART0_FBRD: *mut u32 = (UART0_BASE + 0x028) as *mut u32;
const UART0_LCRH: *mut u32 = (UART0_BASE + 0x02C) as *mut u32;
const UART0_CTL: *mut u32 = (UART0_BASE + 0x030) as *mut u32;

const FR_RXFE: u32 = 1 << 4;
// 8 data bits, FIFOs on, no parity, one stop bit.
const LCRH_8N1_FIFO: u32 = 0x70;
// UARTEN | TXE | RXE
const CTL_ENABLE: u32 = 0x301;

// Divisors for 38400 baud from the 20 MHz system clock (8 MHz crystal
// through the PLL with a divide-by-10 sysdiv): 20e6 / (16 * 38400).
const BAUD_IBRD: u32 = 32;
const BAUD_FBRD: u32 = 35;

fn uart_initialise() {
    unsafe {
        core::ptr::write_volatile(
            SYSCTL_RCGC2,
            core::ptr::read_volatile(SYSCTL_RCGC2) | RCGC2_GPIOA,
        );
        core::ptr::write_volatile(
            SYSCTL_RCGC1,
            core::ptr::read_volatile(SYSCTL_RCGC1) | RCGC1_UART0,
        );
        // A few cycles for the peripheral clocks to come up.
        for _ in 0..16 {
            cortex_m::asm::nop();
        }

        core::ptr::write_volatile(
            GPIOA_AFSEL,
            core::ptr::read_volatile(GPIOA_AFSEL) | UART_PINS,
        );
        core::ptr::write_volatile(GPIOA_DEN, core::ptr::read_volatile(GPIOA_DEN) | UART_PINS);

        core::ptr::write_volatile(UART0_CTL, 0);
        core::ptr::write_volatile(UART0_IBRD, BAUD_IBRD);
        core::ptr::write_volatile(UART0_FBRD, BAUD_FBRD);
        core::ptr::write_volatile(UART0_LCRH, LCRH_8N1_FIFO);
        core::ptr::write_volatile(UART0_CTL, CTL_ENABLE);
    }
}

/// Busy-wait for one byte on UART0.
fn uart_char_get() -> u8 {
    unsafe {
        while core::ptr::read_volatile(UART0_FR) & FR_RXFE != 0 {
            cortex_m::asm::nop();
        }
        (core::ptr::read_volatile(UART0_DR) & 0xFF) as u8
    }
}

/// Copies the terminated string at `input` into a 20-byte local buffer
/// with no length check. Writes past the buffer corrupt this frame's
/// saved registers and return address.
fn vulncpy(input: *const u8) {
    let mut buffer = [0u8; 20];
    unsafe {
        let mut src = input;
        let mut dst = buffer.as_mut_ptr();
        loop {
            let byte = core::ptr::read(src);
            core::ptr::write(dst, byte);
            if byte == 0 {
                break;
            }
            src = src.add(1);
            dst = dst.add(1);
        }
    }
    // Keep the buffer in the frame; nothing escapes it.
    core::hint::black_box(&buffer);
}

#[entry]
fn main() -> ! {
    // Clock bring-up and the OLED init go through the vendor driver
    // layer on the original board; the simulation records them and this
    // rendition assumes the 20 MHz configuration above.
    uart_initialise();

    let mut string = [0u8; 50];
    let base = string.as_mut_ptr();

    let length = uart_char_get() as i32 - 48;

    let mut i: i32 = 0;
    while i < length {
        unsafe {
            core::ptr::write(base.offset(i as isize), uart_char_get());
        }
        i += 1;
    }
    unsafe {
        core::ptr::write(base.offset(i as isize), 0);
    }

    vulncpy(string.as_ptr());

    loop {}
}
