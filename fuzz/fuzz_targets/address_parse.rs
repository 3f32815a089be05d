#![no_main]

use beacon_codec::{AddressOverride, BeaconIdentity};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(address) = AddressOverride::parse(text) {
        let reparsed = AddressOverride::parse(&address.to_string());
        assert_eq!(reparsed.ok(), Some(address));
    }
    let _ = BeaconIdentity::from_uuid_str(text, 0, 0, 0);
});
