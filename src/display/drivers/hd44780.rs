/*
 *  display/drivers/hd44780.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  HD44780 4-bit nibble protocol driven through an I2C GPIO expander
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

//! Expander pin map (PCF8574 backpack):
//!
//! | bit | line      |
//! |-----|-----------|
//! | 0   | RS        |
//! | 1   | RW (tied) |
//! | 2   | E         |
//! | 3   | backlight |
//! | 4-7 | D4-D7     |

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::display::bus::BusTransport;
use crate::display::error::TransportError;
use crate::display::traits::{CharacterDisplay, DisplayCapabilities};

/// Register-select line
pub const RS_BIT: u8 = 0x01;
/// Enable strobe line
pub const ENABLE_BIT: u8 = 0x04;
/// Backlight line
pub const BACKLIGHT_BIT: u8 = 0x08;

/// Expander register addressed by every write
pub const EXPANDER_REGISTER: u8 = 0x00;

pub const CMD_CLEAR: u8 = 0x01;
pub const CMD_HOME: u8 = 0x02;
pub const CMD_ENTRY_MODE: u8 = 0x04;
pub const CMD_DISPLAY_CONTROL: u8 = 0x08;
pub const CMD_FUNCTION_SET: u8 = 0x20;
pub const CMD_SET_CGRAM: u8 = 0x40;
pub const CMD_SET_DDRAM: u8 = 0x80;

pub const ENTRY_INCREMENT: u8 = 0x02;
pub const DISPLAY_ON: u8 = 0x04;
pub const FUNCTION_TWO_LINES: u8 = 0x08;

/// DDRAM base address of each row
pub const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

const RESET_NIBBLE: u8 = 0x03;
const FOUR_BIT_NIBBLE: u8 = 0x02;
// power-up settle before the first reset nibble
const POWER_ON_DELAY_MS: u32 = 50;
// settling after each of the three reset nibbles
const RESET_DELAYS_MS: [u32; 3] = [50, 5, 5];
const CLEAR_DELAY_MS: u32 = 2;

/// Which controller register a byte is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Data,
}

impl Mode {
    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            Mode::Command => 0,
            Mode::Data => RS_BIT,
        }
    }
}

#[inline]
fn backlight_bits(on: bool) -> u8 {
    if on { BACKLIGHT_BIT } else { 0 }
}

/// The two expander values that clock one nibble: enable high, then enable low.
#[inline]
pub fn strobe(bits: u8) -> [u8; 2] {
    [bits | ENABLE_BIT, bits & !ENABLE_BIT]
}

/// Raw expander values for one byte transfer.
///
/// High nibble first, each nibble strobed, every value carrying the same
/// register-select and backlight bits.
pub fn nibble_writes(value: u8, mode: Mode, backlight: bool) -> [u8; 4] {
    let flags = mode.bits() | backlight_bits(backlight);
    let [hi_set, hi_clear] = strobe((value & 0xF0) | flags);
    let [lo_set, lo_clear] = strobe(((value << 4) & 0xF0) | flags);
    [hi_set, hi_clear, lo_set, lo_clear]
}

/// HD44780 driver session: one expander address, one backlight flag.
pub struct Hd44780<B, D> {
    bus: B,
    delay: D,
    address: u8,
    backlight: bool,
    capabilities: DisplayCapabilities,
}

impl<B: BusTransport, D: DelayNs + Send> Hd44780<B, D> {
    /// Create a new session. Nothing is sent until `init()`.
    ///
    /// # Arguments
    ///
    /// * `bus` - Transport to the expander
    /// * `delay` - Provider for the protocol settling delays
    /// * `address` - 7-bit expander address (typically 0x27 or 0x3F)
    pub fn new(bus: B, delay: D, address: u8) -> Self {
        Self {
            bus,
            delay,
            address,
            backlight: true,
            capabilities: DisplayCapabilities::LCD1602,
        }
    }

    /// Set the initial backlight state
    pub fn with_backlight(mut self, on: bool) -> Self {
        self.backlight = on;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    fn write_raw(&mut self, value: u8) -> Result<(), TransportError> {
        self.bus.write_register(self.address, EXPANDER_REGISTER, value)
    }

    /// One bare nibble cycle, only used while the controller may still be in 8-bit mode
    fn write_nibble(&mut self, nibble: u8) -> Result<(), TransportError> {
        let bits = ((nibble << 4) & 0xF0) | backlight_bits(self.backlight);
        for value in strobe(bits) {
            self.write_raw(value)?;
        }
        Ok(())
    }

    fn send(&mut self, value: u8, mode: Mode) -> Result<(), TransportError> {
        for raw in nibble_writes(value, mode, self.backlight) {
            self.write_raw(raw)?;
        }
        Ok(())
    }

    /// Return the cursor to (0, 0) without clearing
    pub fn home(&mut self) -> Result<(), TransportError> {
        self.send(CMD_HOME, Mode::Command)?;
        self.delay.delay_ms(CLEAR_DELAY_MS);
        Ok(())
    }
}

impl<B: BusTransport, D: DelayNs + Send> CharacterDisplay for Hd44780<B, D> {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), TransportError> {
        info!("Initializing HD44780 at address 0x{:02X}", self.address);

        self.delay.delay_ms(POWER_ON_DELAY_MS);

        // Three 0x3 nibbles force 8-bit mode from any prior state, 0x2 then commits 4-bit
        for settle_ms in RESET_DELAYS_MS {
            self.write_nibble(RESET_NIBBLE)?;
            self.delay.delay_ms(settle_ms);
        }
        self.write_nibble(FOUR_BIT_NIBBLE)?;

        self.command(CMD_FUNCTION_SET | FUNCTION_TWO_LINES)?; // 4-bit, 2 lines, 5x8
        self.command(CMD_DISPLAY_CONTROL | DISPLAY_ON)?;      // cursor and blink off
        self.command(CMD_ENTRY_MODE | ENTRY_INCREMENT)?;      // no display shift
        self.clear()?;

        debug!("HD44780 at 0x{:02X} in 4-bit mode", self.address);
        Ok(())
    }

    fn command(&mut self, value: u8) -> Result<(), TransportError> {
        self.send(value, Mode::Command)
    }

    fn write(&mut self, value: u8) -> Result<(), TransportError> {
        self.send(value, Mode::Data)
    }

    fn print(&mut self, text: &str) -> Result<(), TransportError> {
        for ch in text.chars() {
            let code = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.write(code)?;
        }
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), TransportError> {
        let offset = ROW_OFFSETS[usize::from(row) % ROW_OFFSETS.len()];
        self.command(CMD_SET_DDRAM | col.wrapping_add(offset))
    }

    fn clear(&mut self) -> Result<(), TransportError> {
        self.command(CMD_CLEAR)?;
        // clear runs far longer than other instructions
        self.delay.delay_ms(CLEAR_DELAY_MS);
        Ok(())
    }

    fn create_char(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), TransportError> {
        let slot = slot & 0x07;
        self.command(CMD_SET_CGRAM | (slot << 3))?;
        for &row in bitmap {
            self.write(row)?;
        }
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), TransportError> {
        self.backlight = on;
        let bits = backlight_bits(on);
        self.write_raw(bits)
    }
}
