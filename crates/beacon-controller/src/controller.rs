use std::fmt;

use tracing::{debug, info, warn};

use beacon_codec::{payload, AddressOverride, BeaconIdentity};
use beacon_radio::{AddressKind, AdvertisingParameters, RadioAdapter, RadioError, RadioStep};

use crate::status::{BeaconState, BeaconStatus, StepFailure};

type StatusObserver = Box<dyn FnMut(&BeaconStatus)>;

/// Owns the advertising lifecycle of one radio.
///
/// The controller takes its adapter by value (or a `&mut` borrow of it), so
/// only one controller can drive a given radio at a time. It performs no
/// internal locking: callers serialize `start`/`stop` themselves.
///
/// Dropping a controller that is still advertising stops the radio.
pub struct BeaconController<R: RadioAdapter> {
    radio: R,
    state: BeaconState,
    identity: Option<BeaconIdentity>,
    params: Option<AdvertisingParameters>,
    address: Option<AddressOverride>,
    last_failure: Option<StepFailure>,
    observer: Option<StatusObserver>,
}

impl<R: RadioAdapter> BeaconController<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            state: BeaconState::Idle,
            identity: None,
            params: None,
            address: None,
            last_failure: None,
            observer: None,
        }
    }

    /// Registers a callback invoked with a fresh snapshot after every state
    /// change, successful or not. Replaces any previous observer.
    pub fn set_status_observer(&mut self, observer: impl FnMut(&BeaconStatus) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn state(&self) -> BeaconState {
        self.state
    }

    pub fn status(&self) -> BeaconStatus {
        BeaconStatus {
            state: self.state,
            identity: self.identity,
            params: self.params,
            address: self.address,
            last_failure: self.last_failure,
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Direct access to the adapter. Calls made through it bypass the state
    /// machine.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Starts advertising `identity`, reconfiguring in place when already
    /// advertising.
    ///
    /// Parameter and address checks run before any radio call; if they fail
    /// nothing is touched and the state is unchanged. A failing radio step
    /// aborts the sequence, ends any advertisement still loaded and leaves
    /// the controller idle.
    pub fn start(
        &mut self,
        identity: BeaconIdentity,
        params: AdvertisingParameters,
        address: Option<AddressOverride>,
    ) -> Result<(), RadioError> {
        let address_supported = self.radio.supports_explicit_address();
        let params = match prepare_parameters(params, address, address_supported) {
            Ok(params) => params,
            Err(error) => {
                warn!(step = RadioStep::Validate.as_str(), "beacon start rejected: {error}");
                self.last_failure = Some(StepFailure {
                    step: RadioStep::Validate,
                    error,
                });
                self.publish();
                return Err(error);
            }
        };
        let include_flags = self.radio.expects_flags();
        let payload = payload::build(&identity, include_flags);

        if let Err(failure) = self.run_start_sequence(&params, &payload) {
            warn!(step = failure.step.as_str(), "beacon start failed: {}", failure.error);
            if failure.step != RadioStep::PowerOn {
                self.silence_after_failed_start();
            }
            self.clear_retained();
            self.last_failure = Some(failure);
            self.publish();
            return Err(failure.error);
        }

        let restarted = self.state == BeaconState::Advertising;
        self.state = BeaconState::Advertising;
        self.identity = Some(identity);
        self.params = Some(params);
        self.address = address;
        self.last_failure = None;
        info!(
            restarted,
            include_flags,
            address = %address.map_or_else(|| "default".to_string(), |a| a.to_string()),
            "advertising {identity}"
        );
        self.publish();
        Ok(())
    }

    /// Stops advertising.
    ///
    /// No-op when idle. Otherwise the controller is idle afterwards even if
    /// the radio reported an error; that error is still returned.
    pub fn stop(&mut self) -> Result<(), RadioError> {
        if self.state == BeaconState::Idle {
            debug!("beacon stop ignored: already idle");
            return Ok(());
        }
        let result = self.radio.end();
        self.clear_retained();
        match result {
            Ok(()) => info!("advertising stopped"),
            Err(error) => {
                warn!(step = RadioStep::End.as_str(), "radio stop reported: {error}");
                self.last_failure = Some(StepFailure {
                    step: RadioStep::End,
                    error,
                });
            }
        }
        self.publish();
        result
    }

    fn run_start_sequence(
        &mut self,
        params: &AdvertisingParameters,
        payload: &[u8],
    ) -> Result<(), StepFailure> {
        if self.radio.is_powered() {
            debug!("radio powered, clearing any previous advertisement set");
        } else {
            debug!("radio unpowered, cold start");
            self.step(RadioStep::PowerOn, |radio| radio.power_on())?;
            if !self.radio.is_powered() {
                return Err(StepFailure {
                    step: RadioStep::PowerOn,
                    error: RadioError::NotPowered,
                });
            }
        }
        // A stale set may survive from a previous owner even when idle.
        self.step(RadioStep::End, |radio| radio.end())?;
        self.step(RadioStep::ApplyParameters, |radio| radio.apply_parameters(params))?;
        self.step(RadioStep::SetPayload, |radio| radio.set_payload(payload))?;
        self.step(RadioStep::Begin, |radio| radio.begin())
    }

    fn step<F>(&mut self, step: RadioStep, op: F) -> Result<(), StepFailure>
    where
        F: FnOnce(&mut R) -> Result<(), RadioError>,
    {
        debug!(step = step.as_str(), "radio step");
        op(&mut self.radio).map_err(|error| StepFailure { step, error })
    }

    /// Best-effort `end()` so a half-configured or still-running set never
    /// outlives an Idle controller. The originating failure is what callers see.
    fn silence_after_failed_start(&mut self) {
        debug!(step = RadioStep::End.as_str(), "radio cleanup after failed start");
        if let Err(error) = self.radio.end() {
            warn!(
                step = RadioStep::End.as_str(),
                "radio cleanup after failed start reported: {error}"
            );
        }
    }

    fn clear_retained(&mut self) {
        self.state = BeaconState::Idle;
        self.identity = None;
        self.params = None;
        self.address = None;
    }

    fn publish(&mut self) {
        let status = self.status();
        if let Some(observer) = self.observer.as_mut() {
            observer(&status);
        }
    }
}

/// Writes the address override into `params` in radio order and validates
/// the result.
fn prepare_parameters(
    mut params: AdvertisingParameters,
    address: Option<AddressOverride>,
    address_supported: bool,
) -> Result<AdvertisingParameters, RadioError> {
    if let Some(address) = address {
        if !address_supported || !params.address_kind.accepts_explicit_address() {
            return Err(RadioError::IncompatibleAddressMode);
        }
        if params.address_kind == AddressKind::StaticRandom && !address.is_static_random() {
            return Err(RadioError::InvalidParameters(
                "static random address must have its two top bits set",
            ));
        }
    }
    params.address = address.map(|a| a.to_radio_order());
    params.validate()?;
    Ok(params)
}

impl<R: RadioAdapter> Drop for BeaconController<R> {
    fn drop(&mut self) {
        if self.state == BeaconState::Advertising {
            if let Err(error) = self.stop() {
                warn!("radio stop on teardown reported: {error}");
            }
        }
    }
}

impl<R: RadioAdapter> fmt::Debug for BeaconController<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeaconController")
            .field("state", &self.state)
            .field("identity", &self.identity)
            .field("params", &self.params)
            .field("address", &self.address)
            .field("last_failure", &self.last_failure)
            .finish_non_exhaustive()
    }
}
