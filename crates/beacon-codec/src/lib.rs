//! iBeacon wire codec primitives.
//!
//! Defines the beacon identity value types, the hardware-address override
//! and the advertising payload builder, plus a bounded reader for AD
//! structures used by backends that take structured advertisement fields.

pub mod ad;
pub mod address;
pub mod error;
pub mod identity;
pub mod payload;

pub use address::{AddressOverride, ADDRESS_LEN};
pub use error::CodecError;
pub use identity::{BeaconIdentity, DEFAULT_IDENTITY};
pub use payload::{build, IBEACON_COMPANY_ID, PAYLOAD_LEN_WITHOUT_FLAGS, PAYLOAD_LEN_WITH_FLAGS};
