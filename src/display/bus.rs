/*
 *  display/bus.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Register-write transport to the PCF8574 style I2C expander
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

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use log::info;

use crate::display::error::TransportError;

/// Exclusive channel to the expander register.
///
/// Each call is one synchronous write. No batching and no retries, a failure
/// goes straight back to the caller.
pub trait BusTransport: Send {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), TransportError>;
}

/// `BusTransport` over any embedded-hal I2C implementation
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl I2cBus<I2cdev> {
    /// Open a Linux I2C character device (e.g. "/dev/i2c-1")
    pub fn open(path: &str) -> Result<Self, TransportError> {
        info!("Opening I2C bus {}", path);
        let i2c = I2cdev::new(path).map_err(|e| TransportError::Open {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(i2c))
    }
}

impl<I: I2c + Send> BusTransport for I2cBus<I> {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), TransportError> {
        // SMBus write-byte-data: command byte then value in one transaction
        self.i2c
            .write(address, &[register, value])
            .map_err(|e| TransportError::from_hal(address, e))
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), TransportError> {
        (**self).write_register(address, register, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    #[derive(Debug)]
    struct Nacked;

    impl embedded_hal::i2c::Error for Nacked {
        fn kind(&self) -> ErrorKind {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        }
    }

    #[derive(Default)]
    struct RecordingI2c {
        frames: Vec<(u8, Vec<u8>)>,
        nack: bool,
    }

    impl ErrorType for RecordingI2c {
        type Error = Nacked;
    }

    impl I2c for RecordingI2c {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Nacked> {
            if self.nack {
                return Err(Nacked);
            }
            for op in operations.iter() {
                if let Operation::Write(bytes) = op {
                    self.frames.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_write_register_is_one_frame() {
        let mut bus = I2cBus::new(RecordingI2c::default());
        bus.write_register(0x27, 0x00, 0x3C).unwrap();
        bus.write_register(0x27, 0x00, 0x38).unwrap();

        let i2c = bus.release();
        assert_eq!(i2c.frames, vec![(0x27, vec![0x00, 0x3C]), (0x27, vec![0x00, 0x38])]);
    }

    #[test]
    fn test_nack_surfaces_immediately() {
        let mut bus = I2cBus::new(RecordingI2c { nack: true, ..Default::default() });
        let err = bus.write_register(0x3F, 0x00, 0x08).unwrap_err();
        assert_eq!(err, TransportError::Nack { address: 0x3F });
    }
}
