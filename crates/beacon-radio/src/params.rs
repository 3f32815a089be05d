use serde::{Deserialize, Serialize};

use beacon_codec::ADDRESS_LEN;

use crate::error::RadioError;

/// Lowest advertising interval accepted for legacy advertising.
pub const MIN_ADV_INTERVAL_MS: u32 = 20;
/// Highest advertising interval accepted for legacy advertising.
pub const MAX_ADV_INTERVAL_MS: u32 = 10_240;
pub const DEFAULT_ADV_INTERVAL_MS: u32 = 100;

/// Primary advertising channels to transmit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMap(u8);

impl ChannelMap {
    pub const CH37: ChannelMap = ChannelMap(0b001);
    pub const CH38: ChannelMap = ChannelMap(0b010);
    pub const CH39: ChannelMap = ChannelMap(0b100);
    pub const ALL: ChannelMap = ChannelMap(0b111);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds a map from channel numbers (`37`, `38`, `39`).
    pub fn from_channels(channels: &[u8]) -> Result<Self, RadioError> {
        let mut bits = 0_u8;
        for ch in channels {
            bits |= match *ch {
                37 => Self::CH37.0,
                38 => Self::CH38.0,
                39 => Self::CH39.0,
                _ => {
                    return Err(RadioError::InvalidParameters(
                        "advertising channel must be 37, 38 or 39",
                    ))
                }
            };
        }
        Ok(Self(bits))
    }

    pub fn contains(self, other: ChannelMap) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    pub fn channels(self) -> Vec<u8> {
        [(Self::CH37, 37), (Self::CH38, 38), (Self::CH39, 39)]
            .into_iter()
            .filter(|(map, _)| self.contains(*map))
            .map(|(_, ch)| ch)
            .collect()
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::ALL
    }
}

/// Transmit power class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerLevel {
    UltraLow,
    Low,
    #[default]
    Medium,
    High,
}

impl PowerLevel {
    /// Nominal output power for backends that take a dBm value.
    pub const fn dbm(self) -> i8 {
        match self {
            PowerLevel::UltraLow => -21,
            PowerLevel::Low => -15,
            PowerLevel::Medium => -6,
            PowerLevel::High => 0,
        }
    }
}

/// Kind of device address presented while advertising.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Factory public address, or a caller-supplied replacement for it.
    #[default]
    Public,
    /// Static random address.
    StaticRandom,
    /// Resolvable private address derived by the controller from its IRK.
    ResolvablePrivate,
    /// Controller picks the address.
    Auto,
}

impl AddressKind {
    /// Whether a caller-chosen address value is meaningful for this kind.
    pub const fn accepts_explicit_address(self) -> bool {
        matches!(self, AddressKind::Public | AddressKind::StaticRandom)
    }
}

/// Parameters applied to the radio before loading a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvertisingParameters {
    pub min_interval_ms: u32,
    pub max_interval_ms: u32,
    pub channel_map: ChannelMap,
    pub power_level: PowerLevel,
    pub address_kind: AddressKind,
    /// Address to present, already in radio byte order. `None` keeps the
    /// device default.
    pub address: Option<[u8; ADDRESS_LEN]>,
}

impl Default for AdvertisingParameters {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_ADV_INTERVAL_MS,
            max_interval_ms: DEFAULT_ADV_INTERVAL_MS,
            channel_map: ChannelMap::ALL,
            power_level: PowerLevel::default(),
            address_kind: AddressKind::default(),
            address: None,
        }
    }
}

impl AdvertisingParameters {
    /// Checks parameter shape. Performs no I/O.
    pub fn validate(&self) -> Result<(), RadioError> {
        if self.min_interval_ms < MIN_ADV_INTERVAL_MS {
            return Err(RadioError::InvalidParameters("min_interval_ms below 20 ms"));
        }
        if self.max_interval_ms > MAX_ADV_INTERVAL_MS {
            return Err(RadioError::InvalidParameters("max_interval_ms above 10240 ms"));
        }
        if self.min_interval_ms > self.max_interval_ms {
            return Err(RadioError::InvalidParameters("min_interval_ms > max_interval_ms"));
        }
        if self.channel_map.is_empty() {
            return Err(RadioError::InvalidParameters("channel map is empty"));
        }
        if self.address.is_some() && !self.address_kind.accepts_explicit_address() {
            return Err(RadioError::IncompatibleAddressMode);
        }
        Ok(())
    }
}
