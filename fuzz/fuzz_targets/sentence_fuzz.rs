//! Sentence fuzz target: feed arbitrary lines to the sentence parser and reassembler.
//! Parsing must not panic; it returns a packet, `None` or an error.
//! Build with: cargo fuzz run sentence_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let mut nmea = aisdsl::NmeaCodec::default();
    for line in s.lines() {
        if let Ok(Some(packet)) = nmea.parse_sentence(line) {
            let _ = nmea.encode_sentence(&packet);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run sentence_fuzz");
}
