#![no_main]

use beacon_codec::ad;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut consumed = 0usize;
    for record in ad::iter(data) {
        consumed += record.data.len() + 2;
        assert!(consumed <= data.len());
    }
    let _ = ad::flags(data);
    if let Some((_, body)) = ad::manufacturer_data(data) {
        assert!(body.len() < data.len());
    }
});
