//! Hardware address override presented while advertising.
//!
//! Addresses are held in conventional human-readable order (`C8:FD:19:...`,
//! most-significant byte first). The radio control surface takes the
//! reverse order; see [`AddressOverride::to_radio_order`].

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::CodecError;

/// Length of a BLE device address in bytes.
pub const ADDRESS_LEN: usize = 6;

/// Two most-significant bits of a static random address.
const STATIC_RANDOM_TAG: u8 = 0b1100_0000;

/// Caller-chosen device address, in human-readable byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressOverride(pub [u8; ADDRESS_LEN]);

impl AddressOverride {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses `C8:FD:19:A4:A6:F7`, `C8-FD-19-A4-A6-F7` or `C8FD19A4A6F7`.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let digits: String = text
            .chars()
            .filter(|c| !matches!(c, ':' | '-') && !c.is_whitespace())
            .collect();
        let bytes =
            hex::decode(&digits).map_err(|_| CodecError::InvalidAddress("not a hex address"))?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidAddress("expected 6 bytes"))?;
        Ok(Self(bytes))
    }

    /// Address bytes in the order the radio firmware expects.
    ///
    /// The firmware stores addresses least-significant byte first, so the
    /// human-readable form is reversed. This is a platform quirk, not a
    /// general BLE addressing rule.
    pub fn to_radio_order(&self) -> [u8; ADDRESS_LEN] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Whether the address is a valid static random address.
    ///
    /// The two most-significant bits must be `11` and the remaining 46 bits
    /// must be neither all zeros nor all ones.
    pub fn is_static_random(&self) -> bool {
        if self.0[0] & STATIC_RANDOM_TAG != STATIC_RANDOM_TAG {
            return false;
        }
        let low_first = self.0[0] & !STATIC_RANDOM_TAG;
        let rest = &self.0[1..];
        let all_zero = low_first == 0 && rest.iter().all(|b| *b == 0);
        let all_ones = low_first == !STATIC_RANDOM_TAG && rest.iter().all(|b| *b == 0xFF);
        !all_zero && !all_ones
    }

    /// Draws a fresh static random address.
    pub fn random_static<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let mut bytes = [0_u8; ADDRESS_LEN];
            rng.fill(&mut bytes[..]);
            bytes[0] |= STATIC_RANDOM_TAG;
            let candidate = Self(bytes);
            if candidate.is_static_random() {
                return candidate;
            }
        }
    }
}

impl FromStr for AddressOverride {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}
