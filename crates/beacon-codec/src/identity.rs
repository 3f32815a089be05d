use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CodecError;

/// Fixed identity broadcast by a beacon.
///
/// All fields are fixed-width, so every value of this type encodes to a
/// manufacturer record of exactly the same length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeaconIdentity {
    /// Proximity UUID in network (most-significant byte first) order.
    pub uuid: [u8; 16],
    pub major: u16,
    pub minor: u16,
    /// Calibrated RSSI at 1 m, in dBm.
    pub measured_power: i8,
}

/// Identity of the deployed check-in beacon.
pub const DEFAULT_IDENTITY: BeaconIdentity = BeaconIdentity {
    uuid: [
        0x0F, 0xF5, 0xAA, 0xE2, 0xC3, 0xFE, 0x45, 0xB2, 0xB2, 0x47, 0xC0, 0x6B, 0xF2, 0xBC, 0x29,
        0x7C,
    ],
    major: 10033,
    minor: 10113,
    measured_power: -59,
};

impl Default for BeaconIdentity {
    fn default() -> Self {
        DEFAULT_IDENTITY
    }
}

impl BeaconIdentity {
    pub const fn new(uuid: [u8; 16], major: u16, minor: u16, measured_power: i8) -> Self {
        Self {
            uuid,
            major,
            minor,
            measured_power,
        }
    }

    /// Builds an identity from UUID text (hyphenated, simple, braced or URN form).
    pub fn from_uuid_str(
        uuid: &str,
        major: u16,
        minor: u16,
        measured_power: i8,
    ) -> Result<Self, CodecError> {
        let parsed = Uuid::parse_str(uuid.trim())
            .map_err(|e| CodecError::InvalidUuid(format!("{uuid}: {e}")))?;
        Ok(Self::new(*parsed.as_bytes(), major, minor, measured_power))
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::from_bytes(self.uuid)
    }
}

impl fmt::Display for BeaconIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} major={} minor={} power={}dBm",
            self.uuid().hyphenated(),
            self.major,
            self.minor,
            self.measured_power
        )
    }
}
