//! BlueZ backend built on `bluer`.
//!
//! BlueZ composes the advertising PDU itself and always prepends the flags
//! record, so this adapter expects payloads built *without* flags and
//! re-splits them into the structured fields the D-Bus API takes. BlueZ does
//! not expose a per-advertisement device address, so
//! `supports_explicit_address` is `false` and the controller rejects an
//! explicit address with [`RadioError::IncompatibleAddressMode`] before any
//! D-Bus call.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use bluer::{Adapter, ErrorKind, Session};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use beacon_codec::ad;

use crate::error::RadioError;
use crate::params::{AdvertisingParameters, ChannelMap};
use crate::RadioAdapter;

/// Status codes reported in [`RadioError::HardwareRejected`] by this backend.
pub mod status {
    pub const FAILED: u16 = 0x0001;
    pub const NOT_SUPPORTED: u16 = 0x0002;
    pub const NOT_PERMITTED: u16 = 0x0003;
    pub const INVALID_ARGUMENTS: u16 = 0x0004;
    pub const NOT_FOUND: u16 = 0x0005;
    pub const NO_MANUFACTURER_RECORD: u16 = 0x0010;
    pub const RUNTIME_UNAVAILABLE: u16 = 0x00ff;
}

#[derive(Debug, Clone)]
pub struct BluezRadioConfig {
    /// Adapter name such as `hci0`; `None` selects the default adapter.
    pub adapter_name: Option<String>,
    /// Upper bound on each D-Bus round trip.
    pub call_timeout: Duration,
}

impl Default for BluezRadioConfig {
    fn default() -> Self {
        Self {
            adapter_name: None,
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Advertiser backed by a local BlueZ adapter.
///
/// Fields drop in declaration order; the runtime goes last so that a live
/// advertisement handle can still unregister itself.
pub struct BluezRadio {
    handle: Option<AdvertisementHandle>,
    params: Option<AdvertisingParameters>,
    manufacturer: Option<(u16, Vec<u8>)>,
    call_timeout: Duration,
    adapter: Adapter,
    _session: Session,
    runtime: Runtime,
}

impl BluezRadio {
    /// Connects to bluetoothd and binds the configured adapter.
    pub fn open(config: BluezRadioConfig) -> Result<Self, RadioError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|_| RadioError::HardwareRejected(status::RUNTIME_UNAVAILABLE))?;
        let call_timeout = config.call_timeout;

        let session = block_on_timeout(&runtime, call_timeout, Session::new())?;
        let adapter = match &config.adapter_name {
            Some(name) => session.adapter(name).map_err(map_bluer_error)?,
            None => block_on_timeout(&runtime, call_timeout, session.default_adapter())?,
        };
        info!("bluez: using adapter {}", adapter.name());

        Ok(Self {
            handle: None,
            params: None,
            manufacturer: None,
            call_timeout,
            adapter,
            _session: session,
            runtime,
        })
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T, RadioError>
    where
        F: Future<Output = bluer::Result<T>>,
    {
        block_on_timeout(&self.runtime, self.call_timeout, fut)
    }
}

fn block_on_timeout<F, T>(runtime: &Runtime, limit: Duration, fut: F) -> Result<T, RadioError>
where
    F: Future<Output = bluer::Result<T>>,
{
    runtime
        .block_on(async { tokio::time::timeout(limit, fut).await })
        .map_err(|_| RadioError::Timeout)?
        .map_err(map_bluer_error)
}

fn map_bluer_error(err: bluer::Error) -> RadioError {
    warn!("bluez: {err}");
    match err.kind {
        ErrorKind::NotReady => RadioError::NotPowered,
        ErrorKind::InProgress | ErrorKind::AlreadyExists => RadioError::AlreadyBusy,
        ErrorKind::NotSupported => RadioError::HardwareRejected(status::NOT_SUPPORTED),
        ErrorKind::NotPermitted | ErrorKind::NotAuthorized => {
            RadioError::HardwareRejected(status::NOT_PERMITTED)
        }
        ErrorKind::InvalidArguments | ErrorKind::InvalidLength => {
            RadioError::HardwareRejected(status::INVALID_ARGUMENTS)
        }
        ErrorKind::NotFound => RadioError::HardwareRejected(status::NOT_FOUND),
        _ => RadioError::HardwareRejected(status::FAILED),
    }
}

impl RadioAdapter for BluezRadio {
    fn expects_flags(&self) -> bool {
        false
    }

    fn supports_explicit_address(&self) -> bool {
        false
    }

    fn is_powered(&self) -> bool {
        match self.block_on(self.adapter.is_powered()) {
            Ok(powered) => powered,
            Err(err) => {
                warn!("bluez: power query failed: {err}");
                false
            }
        }
    }

    fn power_on(&mut self) -> Result<(), RadioError> {
        self.block_on(self.adapter.set_powered(true))
    }

    fn apply_parameters(&mut self, params: &AdvertisingParameters) -> Result<(), RadioError> {
        if params.address.is_some() {
            return Err(RadioError::IncompatibleAddressMode);
        }
        if params.channel_map != ChannelMap::ALL {
            debug!(
                "bluez: channel map {:?} not selectable, using all channels",
                params.channel_map.channels()
            );
        }
        self.params = Some(*params);
        Ok(())
    }

    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if ad::flags(payload).is_some() {
            debug!("bluez: payload carries a flags record; bluetoothd adds its own");
        }
        let (company, body) = ad::manufacturer_data(payload)
            .ok_or(RadioError::HardwareRejected(status::NO_MANUFACTURER_RECORD))?;
        self.manufacturer = Some((company, body.to_vec()));
        Ok(())
    }

    fn begin(&mut self) -> Result<(), RadioError> {
        if self.handle.is_some() {
            return Err(RadioError::AlreadyBusy);
        }
        let params = self.params.unwrap_or_default();
        let (company, body) = self
            .manufacturer
            .clone()
            .ok_or(RadioError::HardwareRejected(status::NO_MANUFACTURER_RECORD))?;

        let advertisement = Advertisement {
            advertisement_type: Type::Broadcast,
            manufacturer_data: BTreeMap::from([(company, body)]),
            min_interval: Some(Duration::from_millis(params.min_interval_ms.into())),
            max_interval: Some(Duration::from_millis(params.max_interval_ms.into())),
            tx_power: Some(params.power_level.dbm().into()),
            ..Default::default()
        };
        let handle = self.block_on(self.adapter.advertise(advertisement))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn end(&mut self) -> Result<(), RadioError> {
        // Dropping the handle unregisters the advertisement on the runtime.
        self.handle.take();
        Ok(())
    }
}
