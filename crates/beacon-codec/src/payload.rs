//! iBeacon advertising payload builder.
//!
//! Layout with flags (30 of the 31 bytes available to legacy advertising):
//!
//! ```text
//! 02 01 06                 flags: LE general discoverable, BR/EDR not supported
//! 1A FF                    length 26, manufacturer specific data
//! 4C 00                    company identifier (little-endian)
//! 02 15                    iBeacon sub-type, remaining length 21
//! <16 bytes uuid>          most-significant byte first
//! <major u16 BE> <minor u16 BE> <measured power i8>
//! ```
//!
//! Which mode to use depends on the radio backend: some inject the flags
//! record themselves and must be handed the payload without it.

use crate::ad::{AdType, FLAG_BR_EDR_NOT_SUPPORTED, FLAG_LE_GENERAL_DISCOVERABLE};
use crate::identity::BeaconIdentity;

/// Bluetooth SIG company identifier carried in every iBeacon record.
pub const IBEACON_COMPANY_ID: u16 = 0x004C;
/// iBeacon sub-type byte following the company identifier.
pub const IBEACON_SUBTYPE: u8 = 0x02;
/// Bytes following the sub-type length byte: uuid + major + minor + power.
pub const IBEACON_SUBTYPE_LEN: u8 = 16 + 2 + 2 + 1;

/// Manufacturer data bytes (company id through measured power).
pub const MANUFACTURER_DATA_LEN: usize = 2 + 2 + IBEACON_SUBTYPE_LEN as usize;
/// Flags AD structure length including its length byte.
pub const FLAGS_RECORD_LEN: usize = 3;
/// Manufacturer AD structure length including its length and type bytes.
pub const MANUFACTURER_RECORD_LEN: usize = 2 + MANUFACTURER_DATA_LEN;

pub const PAYLOAD_LEN_WITHOUT_FLAGS: usize = MANUFACTURER_RECORD_LEN;
pub const PAYLOAD_LEN_WITH_FLAGS: usize = FLAGS_RECORD_LEN + MANUFACTURER_RECORD_LEN;

/// Encodes `identity` as advertising data.
///
/// With `include_flags` the flags record is emitted first; without it the
/// caller's transport is expected to prepend flags itself.
pub fn build(identity: &BeaconIdentity, include_flags: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(PAYLOAD_LEN_WITH_FLAGS);
    if include_flags {
        out.push(2);
        out.push(AdType::FLAGS.to_u8());
        out.push(FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED);
    }
    out.push((1 + MANUFACTURER_DATA_LEN) as u8);
    out.push(AdType::MANUFACTURER_SPECIFIC_DATA.to_u8());
    out.extend_from_slice(&manufacturer_data(identity));
    out
}

/// Manufacturer data body: company id, sub-type header and identity fields.
pub fn manufacturer_data(identity: &BeaconIdentity) -> [u8; MANUFACTURER_DATA_LEN] {
    let mut out = [0_u8; MANUFACTURER_DATA_LEN];
    out[0..2].copy_from_slice(&IBEACON_COMPANY_ID.to_le_bytes());
    out[2] = IBEACON_SUBTYPE;
    out[3] = IBEACON_SUBTYPE_LEN;
    out[4..20].copy_from_slice(&identity.uuid);
    out[20..22].copy_from_slice(&identity.major.to_be_bytes());
    out[22..24].copy_from_slice(&identity.minor.to_be_bytes());
    out[24] = identity.measured_power as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DEFAULT_IDENTITY;

    #[test]
    fn lengths_match_fixed_layout() {
        assert_eq!(MANUFACTURER_DATA_LEN, 25);
        assert_eq!(MANUFACTURER_RECORD_LEN, 27);
        assert_eq!(PAYLOAD_LEN_WITH_FLAGS, 30);
        assert_eq!(build(&DEFAULT_IDENTITY, true).len(), PAYLOAD_LEN_WITH_FLAGS);
        assert_eq!(build(&DEFAULT_IDENTITY, false).len(), PAYLOAD_LEN_WITHOUT_FLAGS);
    }

    #[test]
    fn flagless_payload_is_suffix_of_flagged_payload() {
        let with = build(&DEFAULT_IDENTITY, true);
        let without = build(&DEFAULT_IDENTITY, false);
        assert_eq!(&with[..3], &[0x02, 0x01, 0x06]);
        assert_eq!(&with[3..], without.as_slice());
    }

    #[test]
    fn major_minor_are_big_endian_and_power_is_twos_complement() {
        let body = manufacturer_data(&DEFAULT_IDENTITY);
        assert_eq!(&body[20..22], &[0x27, 0x31]);
        assert_eq!(&body[22..24], &[0x27, 0x81]);
        assert_eq!(body[24], 0xC5);
    }
}
