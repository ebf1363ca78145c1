/*
 *  display/drivers/mod.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Character display driver implementations
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

// HD44780 behind a PCF8574 style expander
pub mod hd44780;

// Mock bus and delay for testing, public so integration tests can drive it
pub mod mock;
