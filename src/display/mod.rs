/*
 *  display/mod.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - expander transport, HD44780 driver and test doubles
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

// Core trait definitions
pub mod traits;
pub mod error;

// Register-write transport to the expander
pub mod bus;

// Display drivers
pub mod drivers;

// Re-exports for convenience
pub use traits::{CharacterDisplay, DisplayCapabilities};
pub use error::{CycleError, SnapshotError, TransportError};
pub use bus::{BusTransport, I2cBus};
pub use drivers::hd44780::{Hd44780, Mode, nibble_writes};

/// The production session type: Linux I2C device plus thread-sleep delays
pub type LinuxLcd = Hd44780<I2cBus<linux_embedded_hal::I2cdev>, linux_embedded_hal::Delay>;
