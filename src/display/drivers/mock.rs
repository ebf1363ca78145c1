/*
 *  display/drivers/mock.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock expander bus and delay for testing without hardware
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_hal::delay::DelayNs;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::bus::BusTransport;
use crate::display::error::TransportError;
use crate::display::drivers::hd44780::{
    CMD_CLEAR, CMD_DISPLAY_CONTROL, CMD_ENTRY_MODE, CMD_FUNCTION_SET, CMD_HOME, CMD_SET_CGRAM,
    CMD_SET_DDRAM, ENABLE_BIT, ROW_OFFSETS, RS_BIT,
};
use crate::glyphs;

/// One recorded register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusWrite {
    pub address: u8,
    pub register: u8,
    pub value: u8,
}

/// What the controller latched, reconstructed from enable falling edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Single nibble latched while still in 8-bit mode (upper bits as sent)
    Nibble(u8),
    Command(u8),
    Data(u8),
}

/// Mock expander bus
///
/// Records every write and can simulate a NACK. Clones share the same state,
/// so a test keeps one handle while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockBusState>>,
}

/// Internal state for the mock bus (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Every successful write, in order
    pub writes: Vec<BusWrite>,

    /// NACK every write while set
    pub simulate_nack: bool,

    /// Successful writes remaining before NACKing starts
    pub fail_after: Option<usize>,

    /// Number of writes rejected
    pub rejected: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockBusState> {
        // a panicking test thread must not hide the recorded writes
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockBusState>> {
        Arc::clone(&self.state)
    }

    /// Reset recorded writes and failure switches
    pub fn reset(&self) {
        *self.lock() = MockBusState::default();
    }

    /// Forget recorded writes, keep failure switches
    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    pub fn set_nack(&self, nack: bool) {
        self.lock().simulate_nack = nack;
    }

    /// Accept `n` more writes, then NACK
    pub fn fail_after(&self, n: usize) {
        self.lock().fail_after = Some(n);
    }

    pub fn writes(&self) -> Vec<BusWrite> {
        self.lock().writes.clone()
    }

    /// Raw expander values in write order
    pub fn values(&self) -> Vec<u8> {
        self.lock().writes.iter().map(|w| w.value).collect()
    }

    /// Decode from a freshly powered controller (8-bit mode)
    pub fn transfers(&self) -> Vec<Transfer> {
        decode_transfers(&self.values(), false)
    }

    /// Decode as if the controller were already in 4-bit mode
    pub fn transfers_after_init(&self) -> Vec<Transfer> {
        decode_transfers(&self.values(), true)
    }

    /// Replay everything written so far into a simulated controller
    pub fn screen(&self) -> MockScreen {
        let mut screen = MockScreen::new();
        for transfer in self.transfers() {
            screen.apply(transfer);
        }
        screen
    }
}

impl BusTransport for MockBus {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), TransportError> {
        let mut state = self.lock();

        let exhausted = match state.fail_after.as_mut() {
            Some(0) => true,
            Some(n) => {
                *n -= 1;
                false
            }
            None => false,
        };

        if state.simulate_nack || exhausted {
            state.rejected += 1;
            return Err(TransportError::Nack { address });
        }

        state.writes.push(BusWrite { address, register, value });
        Ok(())
    }
}

/// Reconstruct latched transfers from raw expander values.
///
/// The controller latches D4-D7 on the enable falling edge. In 8-bit mode each
/// nibble is a whole instruction; a function-set nibble of 0x2 switches to
/// 4-bit mode where nibbles pair up high then low.
pub fn decode_transfers(values: &[u8], four_bit: bool) -> Vec<Transfer> {
    let mut out = Vec::new();
    let mut four_bit = four_bit;
    let mut pending: Option<u8> = None;
    let mut enable_was_high = false;

    for &value in values {
        let enable_high = value & ENABLE_BIT != 0;
        if enable_was_high && !enable_high {
            let nibble = value & 0xF0;
            let data = value & RS_BIT != 0;

            if !four_bit {
                out.push(Transfer::Nibble(nibble));
                if !data && nibble == CMD_FUNCTION_SET {
                    four_bit = true;
                }
            } else if let Some(high) = pending.take() {
                let byte = high | (nibble >> 4);
                out.push(if data { Transfer::Data(byte) } else { Transfer::Command(byte) });
            } else {
                pending = Some(nibble);
            }
        }
        enable_was_high = enable_high;
    }
    out
}

/// Minimal HD44780 model: DDRAM, CGRAM and the address counter
#[derive(Debug, Clone)]
pub struct MockScreen {
    ddram: [u8; 0x80],
    cgram: [u8; 64],
    address: u8,
    cgram_selected: bool,
    pub function_set: Option<u8>,
    pub display_control: Option<u8>,
    pub entry_mode: Option<u8>,
    pub clear_count: usize,
}

impl Default for MockScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScreen {
    pub fn new() -> Self {
        Self {
            ddram: [b' '; 0x80],
            cgram: [0; 64],
            address: 0,
            cgram_selected: false,
            function_set: None,
            display_control: None,
            entry_mode: None,
            clear_count: 0,
        }
    }

    pub fn apply(&mut self, transfer: Transfer) {
        match transfer {
            Transfer::Nibble(_) => {}
            Transfer::Command(cmd) => self.apply_command(cmd),
            Transfer::Data(byte) => {
                if self.cgram_selected {
                    self.cgram[usize::from(self.address & 0x3F)] = byte;
                    self.address = (self.address + 1) & 0x3F;
                } else {
                    self.ddram[usize::from(self.address & 0x7F)] = byte;
                    self.address = (self.address + 1) & 0x7F;
                }
            }
        }
    }

    fn apply_command(&mut self, cmd: u8) {
        if cmd & CMD_SET_DDRAM != 0 {
            self.address = cmd & 0x7F;
            self.cgram_selected = false;
        } else if cmd & CMD_SET_CGRAM != 0 {
            self.address = cmd & 0x3F;
            self.cgram_selected = true;
        } else if cmd & CMD_FUNCTION_SET != 0 {
            self.function_set = Some(cmd);
        } else if cmd & CMD_DISPLAY_CONTROL != 0 {
            self.display_control = Some(cmd);
        } else if cmd & CMD_ENTRY_MODE != 0 {
            self.entry_mode = Some(cmd);
        } else if cmd & CMD_HOME != 0 {
            self.address = 0;
            self.cgram_selected = false;
        } else if cmd == CMD_CLEAR {
            self.ddram = [b' '; 0x80];
            self.address = 0;
            self.cgram_selected = false;
            self.clear_count += 1;
        }
    }

    /// Raw DDRAM bytes of a visible row
    pub fn row_bytes(&self, row: u8, columns: u8) -> Vec<u8> {
        let base = usize::from(ROW_OFFSETS[usize::from(row) % ROW_OFFSETS.len()]);
        self.ddram[base..base + usize::from(columns)].to_vec()
    }

    /// Visible row as text, custom glyphs shown as `[LABEL]`, trailing blanks trimmed
    pub fn row_text(&self, row: u8) -> String {
        let mut text = String::new();
        for byte in self.row_bytes(row, 16) {
            if byte < 8 {
                match glyphs::label(byte) {
                    Some(name) => text.push_str(&format!("[{}]", name)),
                    None => text.push_str(&format!("[#{}]", byte)),
                }
            } else {
                text.push(char::from(byte));
            }
        }
        text.trim_end().to_string()
    }

    /// Bitmap currently held in a CGRAM slot
    pub fn glyph(&self, slot: u8) -> [u8; 8] {
        let start = usize::from(slot & 0x07) * 8;
        let mut bitmap = [0u8; 8];
        bitmap.copy_from_slice(&self.cgram[start..start + 8]);
        bitmap
    }
}

/// Delay that records instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    delays_ns: Arc<Mutex<Vec<u64>>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, ns: u64) {
        self.delays_ns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ns);
    }

    /// Recorded delays rounded down to whole milliseconds
    pub fn delays_ms(&self) -> Vec<u32> {
        self.delays_ns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|ns| (ns / 1_000_000) as u32)
            .collect()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_bus_records() {
        let mut bus = MockBus::new();
        bus.write_register(0x27, 0x00, 0x08).unwrap();
        assert_eq!(
            bus.writes(),
            vec![BusWrite { address: 0x27, register: 0x00, value: 0x08 }]
        );
    }

    #[test]
    fn test_mock_bus_fail_after() {
        let mut bus = MockBus::new();
        bus.fail_after(2);
        assert!(bus.write_register(0x27, 0, 1).is_ok());
        assert!(bus.write_register(0x27, 0, 2).is_ok());
        assert!(bus.write_register(0x27, 0, 3).is_err());
        assert_eq!(bus.values(), vec![1, 2]);
        assert_eq!(bus.state().lock().unwrap().rejected, 1);
    }

    #[test]
    fn test_decode_ignores_writes_without_strobe() {
        // backlight-only writes never latch
        assert!(decode_transfers(&[0x08, 0x00, 0x08], true).is_empty());
    }

    #[test]
    fn test_screen_writes_rows() {
        let mut screen = MockScreen::new();
        screen.apply(Transfer::Command(0x80));
        for b in b"Hi" {
            screen.apply(Transfer::Data(*b));
        }
        screen.apply(Transfer::Command(0xC0));
        screen.apply(Transfer::Data(b'!'));

        assert_eq!(screen.row_text(0), "Hi");
        assert_eq!(screen.row_text(1), "!");

        screen.apply(Transfer::Command(0x01));
        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.clear_count, 1);
    }

    #[test]
    fn test_mock_delay_records_ms() {
        let mut delay = MockDelay::new();
        delay.delay_ms(50);
        delay.delay_ms(2);
        assert_eq!(delay.delays_ms(), vec![50, 2]);
    }
}
