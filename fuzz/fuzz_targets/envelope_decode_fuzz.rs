#![no_main]
use libfuzzer_sys::fuzz_target;
use zk_aa_core::codec;

fuzz_target!(|data: &[u8]| {
    // Whatever decodes must encode back to the exact same bytes.
    if let Ok(envelope) = codec::decode(data) {
        let encoded = codec::encode(&envelope);
        assert_eq!(encoded.as_ref(), data);
        assert_eq!(codec::decode(&encoded).as_ref(), Ok(&envelope));
    }
});
