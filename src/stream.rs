//! Incremental decoder for a raw NMEA byte stream (serial port, TCP feed, log file).
//!
//! A byte-level state machine picks `\...\` TAG-blocks and `!`/`$` sentences out of the stream
//! without line framing, reassembles multi-sentence AIS messages and hands everything to a
//! [`StreamHandler`].

use crate::assembler::CLEANUP_INTERVAL;
use crate::channel::Channel;
use crate::codec::Codec;
use crate::config::StreamConfig;
use crate::message::Message;
use crate::sentence::char_to_value;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Buffers at or above this size force the tokenizer back to idle.
pub const MAX_BUFFER: usize = 8192;

/// Longest armored payload expanded, in bits.
const MAX_PAYLOAD_BITS: usize = 2048;

const MAX_FRAGMENTS: usize = 10;

/// A checksummed sentence with the TAG-block in front of it, both without delimiters
/// (the TAG-block keeps its `*CC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NmeaParsed<'a> {
    pub tag_block: Option<&'a [u8]>,
    pub sentence: &'a [u8],
}

#[derive(Debug, Clone, PartialEq)]
pub struct AisParsed<'a> {
    pub talker: &'a [u8],
    /// `None` when the channel field was empty.
    pub channel: Option<Channel>,
    pub message: Message,
}

/// Receives what the stream decoder recognizes. An error aborts the current `write`.
pub trait StreamHandler {
    type Error;

    /// Parametric `$` sentences.
    fn nmea(&mut self, _parsed: NmeaParsed<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Encapsulated `!` sentences, before any AIS decoding.
    fn encapsulated(&mut self, _parsed: NmeaParsed<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Decoded AIS messages. For multi-sentence messages `parsed` is the last sentence and
    /// the longest TAG-block of the group.
    fn ais(&mut self, _parsed: NmeaParsed<'_>, _ais: AisParsed<'_>) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    TagBlock,
    Data,
    Checksum0,
    Checksum1,
}

#[derive(Debug, Default)]
struct Recombine {
    total: usize,
    expiry: u64,
    tag_block: Vec<u8>,
    data: [Vec<u8>; MAX_FRAGMENTS],
}

impl Recombine {
    fn reset(&mut self) {
        self.total = 0;
        self.tag_block.clear();
        self.data.iter_mut().for_each(Vec::clear);
    }
}

#[derive(Debug)]
pub struct StreamDecoder<H> {
    pub config: StreamConfig,
    codec: Codec,
    handler: H,
    state: State,
    data: Vec<u8>,
    tag: Vec<u8>,
    tag_valid: Option<Vec<u8>>,
    recombine: HashMap<[u8; 8], Recombine>,
    /// Fragments seen; pending groups expire [`CLEANUP_INTERVAL`] fragments after they start.
    counter: u64,
    next_cleanup: u64,
}

impl<H: StreamHandler> StreamDecoder<H> {
    pub fn new(config: StreamConfig, handler: H) -> Self {
        StreamDecoder {
            codec: Codec::new(config.codec),
            config,
            handler,
            state: State::Idle,
            data: Vec::new(),
            tag: Vec::new(),
            tag_valid: None,
            recombine: HashMap::new(),
            counter: 0,
            next_cleanup: 0,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Multi-sentence groups still waiting for fragments.
    pub fn pending_groups(&self) -> usize {
        self.recombine.len()
    }

    /// Feed bytes; sentences may be split across calls arbitrarily.
    pub fn write(&mut self, input: &[u8]) -> Result<usize, H::Error> {
        if self.data.len() >= MAX_BUFFER || self.tag.len() >= MAX_BUFFER {
            self.state = State::Idle;
        }

        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            if b == b'!' || b == b'$' {
                self.data.clear();
                self.tag_valid = None;
                if self.state == State::TagBlock && self.tag.len() >= 2 && self.tag.ends_with(b"\\") {
                    self.tag_valid = Some(self.tag[..self.tag.len() - 1].to_vec());
                }
                self.state = State::Data;
                i = self.copy_data(i, input);
            } else {
                match self.state {
                    State::Idle => {
                        if b == b'\\' {
                            self.state = State::TagBlock;
                            self.tag.clear();
                        }
                    }
                    State::TagBlock => self.tag.push(b),
                    State::Data => i = self.copy_data(i, input),
                    State::Checksum0 => {
                        self.data.push(b);
                        self.state = State::Checksum1;
                    }
                    State::Checksum1 => {
                        self.data.push(b);
                        self.state = State::Idle;
                        self.handle_message()?;
                    }
                }
            }
            i += 1;
        }
        Ok(input.len())
    }

    /// Copy up to and including the next `*`; returns the index of the last byte consumed.
    fn copy_data(&mut self, i: usize, input: &[u8]) -> usize {
        match input[i..].iter().position(|&b| b == b'*') {
            Some(k) => {
                self.data.extend_from_slice(&input[i..=i + k]);
                self.state = State::Checksum0;
                i + k
            }
            None => {
                self.data.extend_from_slice(&input[i..]);
                input.len()
            }
        }
    }

    fn handle_message(&mut self) -> Result<(), H::Error> {
        let data = std::mem::take(&mut self.data);
        let tag = self.tag_valid.take();
        let result = self.dispatch(&data, tag.as_deref());
        self.data = data;
        self.tag_valid = tag;
        result
    }

    fn dispatch(&mut self, sentence: &[u8], tag_block: Option<&[u8]>) -> Result<(), H::Error> {
        if !self.config.ignore_checksum {
            if !checksum_valid(sentence, true) {
                debug!(sentence = %String::from_utf8_lossy(sentence), "sentence checksum invalid");
                return Ok(());
            }
            if let Some(tag) = tag_block {
                if !checksum_valid(tag, false) {
                    debug!(tag_block = %String::from_utf8_lossy(tag), "tag block checksum invalid");
                    return Ok(());
                }
            }
        }

        let parsed = NmeaParsed { tag_block, sentence };
        if sentence.first() == Some(&b'$') {
            return self.handler.nmea(parsed);
        }
        self.handler.encapsulated(parsed)?;
        self.decode_ais(parsed)
    }

    fn decode_ais(&mut self, parsed: NmeaParsed<'_>) -> Result<(), H::Error> {
        let sentence = parsed.sentence;
        if sentence.len() < 18 {
            return Ok(());
        }
        let msg = &sentence[1..sentence.len() - 3];
        if msg[5] != b',' || &msg[2..4] != b"VD" || (msg[4] != b'M' && msg[4] != b'O') {
            return Ok(());
        }
        let talker = &msg[..2];

        let total = match nibble(msg[6]) {
            Some(t) if t != 0 => t,
            _ => return Ok(()),
        };
        let index = match nibble(msg[8]) {
            Some(i) if i <= total => i,
            _ => return Ok(()),
        };

        // Many sources put something other than a digit here.
        let id = msg[10];
        let id_valid = id != b',';
        if !id_valid && total != 1 {
            return Ok(());
        }

        let mut rest = &msg[if id_valid { 12 } else { 11 }..];
        let channel = match rest.first() {
            Some(b',') => {
                rest = &rest[1..];
                None
            }
            Some(&c) => {
                rest = rest.get(2..).unwrap_or_default();
                Some(Channel::from_designator(c))
            }
            None => return Ok(()),
        };
        if rest.len() < 2 {
            return Ok(());
        }
        let armored = &rest[..rest.len() - 2];
        let padding = nibble(rest[rest.len() - 1]);

        let recombined;
        let (armored, tag_block) = if total > 1 {
            match self.recombine(id, usize::from(total), usize::from(index), parsed.tag_block, armored) {
                Some(r) => {
                    recombined = r;
                    (recombined.0.as_slice(), recombined.1.as_deref())
                }
                None => return Ok(()),
            }
        } else {
            (armored, parsed.tag_block)
        };

        let Some(padding) = padding else {
            return Ok(());
        };
        let Some(bits) = expand(armored, usize::from(padding)) else {
            return Ok(());
        };
        let message = match self.codec.decode_packet(&bits) {
            Ok(m) => m,
            Err(e) => {
                trace!(error = %e, bits = bits.len(), "stream payload not decoded");
                return Ok(());
            }
        };

        let parsed = NmeaParsed {
            tag_block,
            sentence: parsed.sentence,
        };
        self.handler.ais(
            parsed,
            AisParsed {
                talker,
                channel,
                message,
            },
        )
    }

    /// Store one fragment; returns the concatenated armor and TAG-block once all are in.
    fn recombine(
        &mut self,
        id: u8,
        total: usize,
        index: usize,
        tag_block: Option<&[u8]>,
        armored: &[u8],
    ) -> Option<(Vec<u8>, Option<Vec<u8>>)> {
        let mut key = [0u8; 8];
        key[0] = id;
        if !group_id(&mut key[1..6], tag_block.unwrap_or_default()) {
            key[7] = 1;
        }

        if total >= MAX_FRAGMENTS || index == 0 || index > total {
            return None;
        }

        self.counter += 1;
        if self.counter >= self.next_cleanup {
            self.next_cleanup = self.counter + CLEANUP_INTERVAL;
            self.cleanup();
        }

        let expiry = self.counter + CLEANUP_INTERVAL;
        let state = self.recombine.entry(key).or_default();
        if state.total != total {
            state.reset();
            state.total = total;
            state.expiry = expiry;
        }

        let tag_block = tag_block.unwrap_or_default();
        if tag_block.len() > state.tag_block.len() {
            state.tag_block.clear();
            state.tag_block.extend_from_slice(tag_block);
        }
        let slot = &mut state.data[index - 1];
        slot.clear();
        slot.extend_from_slice(armored);

        if state.data[..total].iter().any(Vec::is_empty) {
            return None;
        }
        let state = self.recombine.remove(&key)?;
        let out = state.data[..total].concat();
        let tag = (!state.tag_block.is_empty()).then_some(state.tag_block);
        trace!(total, bytes = out.len(), "stream fragments recombined");
        Some((out, tag))
    }

    fn cleanup(&mut self) {
        let counter = self.counter;
        let before = self.recombine.len();
        self.recombine.retain(|_, r| counter < r.expiry);
        let dropped = before - self.recombine.len();
        if dropped > 0 {
            debug!(dropped, tick = counter, "expired stream groups dropped");
        }
    }
}

impl<H> std::io::Write for StreamDecoder<H>
where
    H: StreamHandler,
    H::Error: Into<std::io::Error>,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        StreamDecoder::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn nibble(b: u8) -> Option<u8> {
    char::from(b).to_digit(16).map(|d| d as u8)
}

/// Verify a trailing `*CC`. Sentences skip their `!`/`$` start byte.
fn checksum_valid(data: &[u8], skip_first: bool) -> bool {
    if data.len() < 3 || (skip_first && data.len() < 4) {
        return false;
    }
    let n = data.len();
    let (Some(hi), Some(lo)) = (nibble(data[n - 2]), nibble(data[n - 1])) else {
        return false;
    };
    let start = usize::from(skip_first);
    let sum = data[start..n - 3].iter().fold(0u8, |acc, b| acc ^ b);
    sum == (hi << 4 | lo)
}

/// Copy the id after the last `-` of a `g:` TAG (up to `key.len()` bytes).
fn group_id(key: &mut [u8], tag_block: &[u8]) -> bool {
    for item in tag_block.split(|&b| b == b',') {
        if item.len() < 2 || (item[0] != b'g' && item[0] != b'G') || item[1] != b':' {
            continue;
        }
        let mut info = item;
        if info.len() >= 3 && info[info.len() - 3] == b'*' {
            info = &info[..info.len() - 3];
        }
        if info.is_empty() {
            continue;
        }
        if let Some(dash) = info.iter().rposition(|&b| b == b'-') {
            info = &info[dash + 1..];
        }
        let n = info.len().min(key.len());
        key[..n].copy_from_slice(&info[..n]);
        return true;
    }
    false
}

/// De-armor into bits; `None` on invalid characters, oversized or empty payloads.
fn expand(armored: &[u8], padding: usize) -> Option<Vec<u8>> {
    if armored.len() * 6 > MAX_PAYLOAD_BITS {
        return None;
    }
    let mut bits = Vec::with_capacity(armored.len() * 6);
    for &c in armored {
        let v = char_to_value(c)?;
        bits.extend((0..6).rev().map(|i| (v >> i) & 1));
    }
    if bits.len() <= padding {
        return None;
    }
    bits.truncate(bits.len() - padding);
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksums() {
        assert!(checksum_valid(b"!AIVDM,1,1,,B,10bb7q@P0lPGHlVMhbl0Qgw>2>`<,0*7F", true));
        assert!(checksum_valid(b"!AIVDM,1,1,,B,10bb7q@P0lPGHlVMhbl0Qgw>2>`<,0*7f", true));
        assert!(!checksum_valid(b"!AIVDM,1,1,,B,10bb7q@P0lPGHlVMhbl0Qgw>2>`<,0*7E", true));
        assert!(checksum_valid(b"c:1*68", false));
        assert!(!checksum_valid(b"*6", false));
    }

    #[test]
    fn group_ids() {
        let mut key = [0u8; 5];
        assert!(group_id(&mut key, b"s:r3669961,g:1-2-1234567,c:1*5E"));
        assert_eq!(&key, b"12345");
        let mut key = [0u8; 5];
        assert!(group_id(&mut key, b"g:2-2-42*10"));
        assert_eq!(&key, b"42\0\0\0");
        assert!(!group_id(&mut [0u8; 5], b"c:1*68"));
    }
}
