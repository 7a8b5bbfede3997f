//! Stream fuzz target: arbitrary bytes through the incremental stream decoder.
//! Build with: cargo fuzz run stream_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
struct Ignore;

#[cfg(fuzzing)]
impl aisdsl::StreamHandler for Ignore {
    type Error = std::convert::Infallible;
}

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let mut decoder = aisdsl::StreamDecoder::new(aisdsl::StreamConfig::new().ignore_checksum(true), Ignore);
    let (a, b) = data.split_at(data.len() / 2);
    let _ = decoder.write(a);
    let _ = decoder.write(b);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run stream_fuzz");
}
