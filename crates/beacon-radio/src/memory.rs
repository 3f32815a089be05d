use std::collections::HashMap;

use tracing::debug;

use crate::error::RadioError;
use crate::params::AdvertisingParameters;
use crate::{RadioAdapter, RadioStep};

/// One call observed by [`InMemoryRadio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    PowerOn,
    ApplyParameters(AdvertisingParameters),
    SetPayload(Vec<u8>),
    Begin,
    End,
}

impl RadioCall {
    pub fn step(&self) -> RadioStep {
        match self {
            RadioCall::PowerOn => RadioStep::PowerOn,
            RadioCall::ApplyParameters(_) => RadioStep::ApplyParameters,
            RadioCall::SetPayload(_) => RadioStep::SetPayload,
            RadioCall::Begin => RadioStep::Begin,
            RadioCall::End => RadioStep::End,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    error: RadioError,
    sticky: bool,
}

/// In-memory radio for tests and dry runs.
///
/// Every call is recorded, including calls that fail. Failures can be
/// injected per step, either once or until cleared.
#[derive(Debug, Clone)]
pub struct InMemoryRadio {
    powered: bool,
    power_on_takes_effect: bool,
    expects_flags: bool,
    explicit_address: bool,
    transmitting: bool,
    params: Option<AdvertisingParameters>,
    payload: Option<Vec<u8>>,
    calls: Vec<RadioCall>,
    failures: HashMap<RadioStep, Failure>,
}

impl Default for InMemoryRadio {
    fn default() -> Self {
        Self {
            powered: false,
            power_on_takes_effect: true,
            expects_flags: true,
            explicit_address: true,
            transmitting: false,
            params: None,
            payload: None,
            calls: Vec::new(),
            failures: HashMap::new(),
        }
    }
}

impl InMemoryRadio {
    /// Creates a radio that is already powered (warm start).
    pub fn powered() -> Self {
        Self {
            powered: true,
            ..Self::default()
        }
    }

    /// Creates a powered radio that is already transmitting a stale set left
    /// behind by a previous owner.
    pub fn with_stale_advertisement(payload: Vec<u8>) -> Self {
        Self {
            powered: true,
            transmitting: true,
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// Sets whether this radio wants the flags record in its payload.
    pub fn set_expects_flags(&mut self, expects_flags: bool) {
        self.expects_flags = expects_flags;
    }

    /// Sets whether this radio accepts a caller-chosen device address.
    pub fn set_supports_explicit_address(&mut self, supported: bool) {
        self.explicit_address = supported;
    }

    /// If disabled, `power_on` reports success but the radio stays off.
    pub fn set_power_on_takes_effect(&mut self, takes_effect: bool) {
        self.power_on_takes_effect = takes_effect;
    }

    /// Fails the next call to `step` with `error`.
    pub fn fail_next(&mut self, step: RadioStep, error: RadioError) {
        self.failures.insert(step, Failure { error, sticky: false });
    }

    /// Fails every call to `step` with `error` until cleared.
    pub fn fail_always(&mut self, step: RadioStep, error: RadioError) {
        self.failures.insert(step, Failure { error, sticky: true });
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Calls observed so far, oldest first.
    pub fn calls(&self) -> &[RadioCall] {
        &self.calls
    }

    /// Drains and returns the calls observed so far.
    pub fn take_calls(&mut self) -> Vec<RadioCall> {
        std::mem::take(&mut self.calls)
    }

    /// Steps observed so far, oldest first.
    pub fn steps(&self) -> Vec<RadioStep> {
        self.calls.iter().map(RadioCall::step).collect()
    }

    pub fn count(&self, step: RadioStep) -> usize {
        self.calls.iter().filter(|c| c.step() == step).count()
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Parameters most recently accepted by `apply_parameters`.
    pub fn applied_parameters(&self) -> Option<&AdvertisingParameters> {
        self.params.as_ref()
    }

    /// Payload currently loaded.
    pub fn loaded_payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    fn record(&mut self, call: RadioCall) -> Result<(), RadioError> {
        let step = call.step();
        debug!(step = step.as_str(), "in-memory radio call");
        self.calls.push(call);
        match self.failures.get(&step).copied() {
            Some(failure) => {
                if !failure.sticky {
                    self.failures.remove(&step);
                }
                Err(failure.error)
            }
            None => Ok(()),
        }
    }
}

impl RadioAdapter for InMemoryRadio {
    fn expects_flags(&self) -> bool {
        self.expects_flags
    }

    fn supports_explicit_address(&self) -> bool {
        self.explicit_address
    }

    fn is_powered(&self) -> bool {
        self.powered
    }

    fn power_on(&mut self) -> Result<(), RadioError> {
        self.record(RadioCall::PowerOn)?;
        if self.power_on_takes_effect {
            self.powered = true;
        }
        Ok(())
    }

    fn apply_parameters(&mut self, params: &AdvertisingParameters) -> Result<(), RadioError> {
        self.record(RadioCall::ApplyParameters(*params))?;
        if !self.powered {
            return Err(RadioError::NotPowered);
        }
        if self.transmitting {
            return Err(RadioError::AlreadyBusy);
        }
        self.params = Some(*params);
        Ok(())
    }

    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.record(RadioCall::SetPayload(payload.to_vec()))?;
        if !self.powered {
            return Err(RadioError::NotPowered);
        }
        if self.transmitting {
            return Err(RadioError::AlreadyBusy);
        }
        self.payload = Some(payload.to_vec());
        Ok(())
    }

    fn begin(&mut self) -> Result<(), RadioError> {
        self.record(RadioCall::Begin)?;
        if !self.powered {
            return Err(RadioError::NotPowered);
        }
        if self.transmitting {
            return Err(RadioError::AlreadyBusy);
        }
        self.transmitting = true;
        Ok(())
    }

    fn end(&mut self) -> Result<(), RadioError> {
        self.record(RadioCall::End)?;
        self.transmitting = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_tracks_transmit_state() {
        let mut radio = InMemoryRadio::default();
        assert!(!radio.is_powered());
        radio.power_on().unwrap();
        radio.apply_parameters(&AdvertisingParameters::default()).unwrap();
        radio.set_payload(&[1, 2, 3]).unwrap();
        radio.begin().unwrap();
        assert!(radio.is_transmitting());
        assert_eq!(radio.loaded_payload(), Some(&[1_u8, 2, 3][..]));
        radio.end().unwrap();
        assert!(!radio.is_transmitting());
        assert_eq!(
            radio.steps(),
            vec![
                RadioStep::PowerOn,
                RadioStep::ApplyParameters,
                RadioStep::SetPayload,
                RadioStep::Begin,
                RadioStep::End,
            ]
        );
    }

    #[test]
    fn busy_radio_rejects_reconfiguration() {
        let mut radio = InMemoryRadio::with_stale_advertisement(vec![0xAA]);
        assert_eq!(
            radio.apply_parameters(&AdvertisingParameters::default()),
            Err(RadioError::AlreadyBusy)
        );
        assert_eq!(radio.begin(), Err(RadioError::AlreadyBusy));
        radio.end().unwrap();
        assert!(radio.begin().is_ok());
    }

    #[test]
    fn one_shot_failure_clears_after_firing() {
        let mut radio = InMemoryRadio::powered();
        radio.fail_next(RadioStep::Begin, RadioError::Timeout);
        assert_eq!(radio.begin(), Err(RadioError::Timeout));
        assert!(radio.begin().is_ok());
        assert_eq!(radio.count(RadioStep::Begin), 2);
    }

    #[test]
    fn sticky_failure_persists_until_cleared() {
        let mut radio = InMemoryRadio::powered();
        radio.fail_always(RadioStep::End, RadioError::HardwareRejected(0x0c));
        assert!(radio.end().is_err());
        assert!(radio.end().is_err());
        radio.clear_failures();
        assert!(radio.end().is_ok());
    }

    #[test]
    fn ineffective_power_on_leaves_radio_off() {
        let mut radio = InMemoryRadio::default();
        radio.set_power_on_takes_effect(false);
        assert!(radio.power_on().is_ok());
        assert!(!radio.is_powered());
        assert_eq!(radio.begin(), Err(RadioError::NotPowered));
    }
}
