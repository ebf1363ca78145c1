/*
 *  display/traits.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for character display abstraction
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

use crate::display::error::TransportError;

/// Display capabilities and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCapabilities {
    /// Visible characters per row
    pub columns: u8,

    /// Number of rows
    pub rows: u8,
}

impl DisplayCapabilities {
    /// The 16x2 HD44780 module, the only geometry supported
    pub const LCD1602: DisplayCapabilities = DisplayCapabilities {
        columns: 16,
        rows: 2,
    };
}

/// Character display operations used by the dashboard
///
/// Every call that touches the hardware can fail with a `TransportError`;
/// none of them retry.
pub trait CharacterDisplay: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display geometry as (columns, rows)
    fn dimensions(&self) -> (u8, u8) {
        let caps = self.capabilities();
        (caps.columns, caps.rows)
    }

    /// Reset the controller and bring it into a known 4-bit state
    fn init(&mut self) -> Result<(), TransportError>;

    /// Send an instruction byte (register select cleared)
    fn command(&mut self, value: u8) -> Result<(), TransportError>;

    /// Send a data byte (register select set)
    fn write(&mut self, value: u8) -> Result<(), TransportError>;

    /// Write text at the current cursor position, no wrapping or truncation
    fn print(&mut self, text: &str) -> Result<(), TransportError>;

    /// Move the DDRAM address to (col, row)
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), TransportError>;

    /// Clear the screen and wait for the controller to finish
    fn clear(&mut self) -> Result<(), TransportError>;

    /// Program a CGRAM slot with an 8-row bitmap
    fn create_char(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), TransportError>;

    /// Switch the backlight line on or off
    fn set_backlight(&mut self, on: bool) -> Result<(), TransportError>;
}

impl<T: CharacterDisplay + ?Sized> CharacterDisplay for &mut T {
    fn capabilities(&self) -> &DisplayCapabilities {
        (**self).capabilities()
    }
    fn init(&mut self) -> Result<(), TransportError> {
        (**self).init()
    }
    fn command(&mut self, value: u8) -> Result<(), TransportError> {
        (**self).command(value)
    }
    fn write(&mut self, value: u8) -> Result<(), TransportError> {
        (**self).write(value)
    }
    fn print(&mut self, text: &str) -> Result<(), TransportError> {
        (**self).print(text)
    }
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), TransportError> {
        (**self).set_cursor(col, row)
    }
    fn clear(&mut self) -> Result<(), TransportError> {
        (**self).clear()
    }
    fn create_char(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), TransportError> {
        (**self).create_char(slot, bitmap)
    }
    fn set_backlight(&mut self, on: bool) -> Result<(), TransportError> {
        (**self).set_backlight(on)
    }
}
