/*
 *  display/error.rs
 *
 *  LcdMonS - host status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the character display, telemetry and dashboard cycle
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

use embedded_hal::i2c::{Error as I2cHalError, ErrorKind};
use thiserror::Error;

/// Failure talking to the I2C expander
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device did not acknowledge its address or data
    #[error("I2C device 0x{address:02X} did not acknowledge")]
    Nack { address: u8 },

    /// The bus itself is unavailable or reported a fault
    #[error("I2C bus error: {0}")]
    Bus(String),

    /// The bus device node could not be opened
    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },
}

impl TransportError {
    /// Map any embedded-hal I2C error onto the transport taxonomy
    pub fn from_hal<E: I2cHalError>(address: u8, err: E) -> Self {
        match err.kind() {
            ErrorKind::NoAcknowledge(_) => TransportError::Nack { address },
            other => TransportError::Bus(format!("{:?}", other)),
        }
    }
}

/// Failure obtaining a telemetry snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    /// Disk page needs at least one filesystem entry
    #[error("No filesystem entries in snapshot")]
    NoFilesystems,
}

/// Anything that can abort a single dashboard cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeHalError(ErrorKind);

    impl I2cHalError for FakeHalError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    #[test]
    fn test_nack_maps_to_nack() {
        let err = TransportError::from_hal(
            0x27,
            FakeHalError(ErrorKind::NoAcknowledge(embedded_hal::i2c::NoAcknowledgeSource::Address)),
        );
        assert_eq!(err, TransportError::Nack { address: 0x27 });
        assert_eq!(err.to_string(), "I2C device 0x27 did not acknowledge");
    }

    #[test]
    fn test_other_kinds_map_to_bus() {
        let err = TransportError::from_hal(0x3F, FakeHalError(ErrorKind::ArbitrationLoss));
        assert!(matches!(err, TransportError::Bus(_)));
    }

    #[test]
    fn test_cycle_error_wraps_both_kinds() {
        let cycle: CycleError = TransportError::Nack { address: 0x27 }.into();
        assert!(matches!(cycle, CycleError::Transport(_)));

        let cycle: CycleError = SnapshotError::NoFilesystems.into();
        assert_eq!(cycle.to_string(), "No filesystem entries in snapshot");
    }
}
