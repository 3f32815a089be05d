//! Radio control surface for a transmit-only BLE advertiser.
//!
//! The beacon controller never touches hardware directly; it sequences the
//! calls on [`RadioAdapter`]. `InMemoryRadio` records those calls for tests
//! and dry runs. Enable the `bluez` feature for the BlueZ (Linux) backend.

use std::fmt;

#[cfg(feature = "bluez")]
pub mod bluez;
pub mod error;
pub mod memory;
pub mod params;

pub use error::RadioError;
pub use memory::{InMemoryRadio, RadioCall};
pub use params::{AddressKind, AdvertisingParameters, ChannelMap, PowerLevel};

/// Individual operation in a start/stop sequence, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioStep {
    /// Parameter and address checks performed before any hardware call.
    Validate,
    PowerOn,
    ApplyParameters,
    SetPayload,
    Begin,
    End,
}

impl RadioStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            RadioStep::Validate => "validate",
            RadioStep::PowerOn => "power_on",
            RadioStep::ApplyParameters => "apply_parameters",
            RadioStep::SetPayload => "set_payload",
            RadioStep::Begin => "begin",
            RadioStep::End => "end",
        }
    }
}

impl fmt::Display for RadioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advertiser-role radio control contract implemented by each platform.
pub trait RadioAdapter {
    /// Whether the payload handed to [`set_payload`](Self::set_payload) must
    /// include the flags record.
    ///
    /// Adapters whose stack injects flags on its own return `false`.
    fn expects_flags(&self) -> bool {
        true
    }

    /// Whether the adapter can present a caller-chosen device address.
    ///
    /// Checked before any hardware call; adapters returning `false` never see
    /// `AdvertisingParameters::address` set.
    fn supports_explicit_address(&self) -> bool {
        true
    }

    /// Whether the transmitter is powered.
    fn is_powered(&self) -> bool;
    /// Powers the transmitter up.
    fn power_on(&mut self) -> Result<(), RadioError>;
    /// Applies interval bounds, channel map, power level and address.
    fn apply_parameters(&mut self, params: &AdvertisingParameters) -> Result<(), RadioError>;
    /// Loads the advertising payload.
    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError>;
    /// Starts (or resumes) transmission of the loaded advertisement set.
    fn begin(&mut self) -> Result<(), RadioError>;
    /// Stops transmission and unloads the advertisement set.
    fn end(&mut self) -> Result<(), RadioError>;
}

impl<R: RadioAdapter + ?Sized> RadioAdapter for &mut R {
    fn expects_flags(&self) -> bool {
        (**self).expects_flags()
    }

    fn supports_explicit_address(&self) -> bool {
        (**self).supports_explicit_address()
    }

    fn is_powered(&self) -> bool {
        (**self).is_powered()
    }

    fn power_on(&mut self) -> Result<(), RadioError> {
        (**self).power_on()
    }

    fn apply_parameters(&mut self, params: &AdvertisingParameters) -> Result<(), RadioError> {
        (**self).apply_parameters(params)
    }

    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        (**self).set_payload(payload)
    }

    fn begin(&mut self) -> Result<(), RadioError> {
        (**self).begin()
    }

    fn end(&mut self) -> Result<(), RadioError> {
        (**self).end()
    }
}

impl<R: RadioAdapter + ?Sized> RadioAdapter for Box<R> {
    fn expects_flags(&self) -> bool {
        (**self).expects_flags()
    }

    fn supports_explicit_address(&self) -> bool {
        (**self).supports_explicit_address()
    }

    fn is_powered(&self) -> bool {
        (**self).is_powered()
    }

    fn power_on(&mut self) -> Result<(), RadioError> {
        (**self).power_on()
    }

    fn apply_parameters(&mut self, params: &AdvertisingParameters) -> Result<(), RadioError> {
        (**self).apply_parameters(params)
    }

    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        (**self).set_payload(payload)
    }

    fn begin(&mut self) -> Result<(), RadioError> {
        (**self).begin()
    }

    fn end(&mut self) -> Result<(), RadioError> {
        (**self).end()
    }
}
