//! Payload fuzz target: each input byte is one payload bit (low bit).
//! A payload that decodes must encode again without panicking.
//! Build with: cargo fuzz run payload_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let bits: Vec<u8> = data.iter().map(|b| b & 1).collect();
    let codec = aisdsl::Codec::default();
    if let Ok(message) = codec.decode_packet(&bits) {
        let _ = codec.encode_packet(&message);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run payload_fuzz");
}
