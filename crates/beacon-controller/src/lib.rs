//! Advertising lifecycle for an iBeacon transmitter.
//!
//! [`BeaconController`] owns the Idle/Advertising state and sequences
//! [`beacon_radio::RadioAdapter`] calls so that starting, restarting and
//! stopping never leave the radio half-configured.

pub mod controller;
pub mod status;

pub use controller::BeaconController;
pub use status::{BeaconState, BeaconStatus, StepFailure};
