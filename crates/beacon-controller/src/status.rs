use std::fmt;

use thiserror::Error;

use beacon_codec::{AddressOverride, BeaconIdentity};
use beacon_radio::{AdvertisingParameters, RadioError, RadioStep};

/// Advertising lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BeaconState {
    #[default]
    Idle,
    Advertising,
}

impl fmt::Display for BeaconState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeaconState::Idle => f.write_str("idle"),
            BeaconState::Advertising => f.write_str("advertising"),
        }
    }
}

/// A radio error together with the step that produced it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{step} failed: {error}")]
pub struct StepFailure {
    pub step: RadioStep,
    pub error: RadioError,
}

/// Read-only snapshot published after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeaconStatus {
    pub state: BeaconState,
    /// Identity being broadcast; `None` while idle.
    pub identity: Option<BeaconIdentity>,
    /// Parameters applied to the radio; `None` while idle.
    pub params: Option<AdvertisingParameters>,
    /// Address override presented, in human-readable order.
    pub address: Option<AddressOverride>,
    /// Most recent failure, cleared by the next successful start.
    pub last_failure: Option<StepFailure>,
}

impl BeaconStatus {
    pub fn is_advertising(&self) -> bool {
        self.state == BeaconState::Advertising
    }
}

impl fmt::Display for BeaconStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if let Some(identity) = &self.identity {
            write!(f, " {identity}")?;
        }
        match &self.address {
            Some(address) => write!(f, " address={address}")?,
            None if self.is_advertising() => f.write_str(" address=default")?,
            None => {}
        }
        if let Some(failure) = &self.last_failure {
            write!(f, " last_failure=\"{failure}\"")?;
        }
        Ok(())
    }
}
