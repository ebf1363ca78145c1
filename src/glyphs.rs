/*
 *  glyphs.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  5x8 custom glyphs for the HD44780 CGRAM
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

use log::debug;

use crate::display::error::TransportError;
use crate::display::traits::CharacterDisplay;

// one byte per row, low 5 bits are pixels
pub const GLYPH_CPU: [u8; 8] = [0x04, 0x0a, 0x0a, 0x0a, 0x1f, 0x11, 0x11, 0x00,];
pub const GLYPH_RAM: [u8; 8] = [0x0a, 0x0a, 0x1f, 0x0a, 0x0a, 0x1f, 0x0a, 0x0a,];
pub const GLYPH_DISK: [u8; 8] = [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x0e, 0x00,];
pub const GLYPH_CONTAINER: [u8; 8] = [0x00, 0x10, 0x18, 0x1c, 0x1e, 0x1c, 0x00, 0x00,];
pub const GLYPH_THERMOMETER: [u8; 8] = [0x04, 0x0a, 0x0a, 0x0a, 0x0a, 0x11, 0x1f, 0x0e,];

/// Dashboard icons. The discriminant is the CGRAM slot assigned at load time.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Cpu = 0,
    Memory = 1,
    Disk = 2,
    Container = 3,
    Thermometer = 4,
}

impl Icon {
    /// Load order, slot 0 first
    pub const ALL: [Icon; 5] = [
        Icon::Cpu,
        Icon::Memory,
        Icon::Disk,
        Icon::Container,
        Icon::Thermometer,
    ];

    #[inline]
    pub const fn slot(self) -> u8 {
        self as u8
    }

    pub const fn bitmap(self) -> &'static [u8; 8] {
        match self {
            Icon::Cpu => &GLYPH_CPU,
            Icon::Memory => &GLYPH_RAM,
            Icon::Disk => &GLYPH_DISK,
            Icon::Container => &GLYPH_CONTAINER,
            Icon::Thermometer => &GLYPH_THERMOMETER,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Icon::Cpu => "CPU",
            Icon::Memory => "RAM",
            Icon::Disk => "DISK",
            Icon::Container => "CONTAINER",
            Icon::Thermometer => "TEMP",
        }
    }
}

/// Name of the icon occupying a slot, if any
pub fn label(slot: u8) -> Option<&'static str> {
    Icon::ALL.iter().find(|icon| icon.slot() == slot).map(|icon| icon.label())
}

/// Programs the icon set into glyph memory
pub struct GlyphTable;

impl GlyphTable {
    /// Write every icon into its slot, in order. Call once after `init()`.
    pub fn load<D: CharacterDisplay + ?Sized>(display: &mut D) -> Result<(), TransportError> {
        for icon in Icon::ALL {
            display.create_char(icon.slot(), icon.bitmap())?;
        }
        debug!("Loaded {} glyphs into CGRAM", Icon::ALL.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{MockBus, MockDelay, Transfer};
    use crate::display::drivers::hd44780::Hd44780;

    #[test]
    fn test_slots_follow_load_order() {
        for (index, icon) in Icon::ALL.iter().enumerate() {
            assert_eq!(usize::from(icon.slot()), index);
        }
    }

    #[test]
    fn test_rows_are_five_pixels_wide() {
        for icon in Icon::ALL {
            assert_eq!(icon.bitmap().len(), 8);
            assert!(icon.bitmap().iter().all(|row| row & !0x1f == 0), "{:?}", icon);
        }
    }

    #[test]
    fn test_label_lookup() {
        assert_eq!(label(0), Some("CPU"));
        assert_eq!(label(4), Some("TEMP"));
        assert_eq!(label(5), None);
    }

    #[test]
    fn test_load_transmits_bitmaps_unchanged() {
        let bus = MockBus::new();
        let mut lcd = Hd44780::new(bus.clone(), MockDelay::new(), 0x27);
        GlyphTable::load(&mut lcd).unwrap();

        let transfers = bus.transfers_after_init();
        assert_eq!(transfers.len(), Icon::ALL.len() * 9);

        for (chunk, icon) in transfers.chunks(9).zip(Icon::ALL) {
            assert_eq!(chunk[0], Transfer::Command(0x40 | (icon.slot() << 3)));
            let sent: Vec<u8> = chunk[1..]
                .iter()
                .filter_map(|t| match t {
                    Transfer::Data(d) => Some(*d),
                    _ => None,
                })
                .collect();
            assert_eq!(sent.as_slice(), icon.bitmap());
        }
    }
}
