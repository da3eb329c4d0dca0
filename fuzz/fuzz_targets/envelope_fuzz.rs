//! Fuzz test for envelope deserialization
//!
//! This fuzz target deserializes arbitrary byte sequences as message
//! envelopes to find:
//! - Panics or crashes in the untagged payload dispatch
//! - Envelopes that do not survive a re-serialize round-trip
//!
//! Run with: cargo +nightly fuzz run envelope_fuzz -- -max_total_time=60

#![no_main]

use accord_core::Envelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Deserialization never panics; malformed input is an Err.
        if let Ok(envelope) = serde_json::from_str::<Envelope>(input) {
            // The untagged payload must keep its kind across a round-trip:
            // structured moves stay moves, free text stays text.
            let json = serde_json::to_string(&envelope).expect("envelopes always serialize");
            let back: Envelope =
                serde_json::from_str(&json).expect("serialized envelopes always deserialize");
            assert_eq!(back, envelope, "envelope round-trip must be lossless");
        }
    }
});
