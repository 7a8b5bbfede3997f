//! NMEA 4.10 TAG-blocks: `\tag:value,...*CC\` metadata in front of a sentence.

use crate::sentence::{checksum, parse_hex_byte, NmeaError};

/// Decoded TAG-block fields. Empty strings and zero numbers mean "absent".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagBlock {
    /// `c`: UNIX time.
    pub time: i64,
    /// `r`: relative time.
    pub relative_time: i64,
    /// `d`: destination.
    pub destination: String,
    /// `g`: sentence grouping (`index-count-id`).
    pub grouping: String,
    /// `n`: line count.
    pub line_count: i64,
    /// `s`: source identifier.
    pub source: String,
    /// `t`: free text.
    pub text: String,
}

impl TagBlock {
    pub fn is_blank(&self) -> bool {
        *self == TagBlock::default()
    }

    /// Parse the content between the two backslashes, checksum included.
    pub fn parse(content: &str) -> Result<Self, NmeaError> {
        let (body, sum) = content
            .rsplit_once('*')
            .ok_or_else(|| NmeaError::TagBlock("missing checksum".to_string()))?;
        let expected = parse_hex_byte(sum).ok_or_else(|| NmeaError::TagBlock(format!("bad checksum {:?}", sum)))?;
        let computed = checksum(body.as_bytes());
        if computed != expected {
            return Err(NmeaError::ChecksumMismatch { computed, found: expected });
        }

        let mut block = TagBlock::default();
        for item in body.split(',') {
            let (key, value) = item
                .split_once(':')
                .ok_or_else(|| NmeaError::TagBlock(format!("field {:?} is not key:value", item)))?;
            let number = || {
                value
                    .parse::<i64>()
                    .map_err(|_| NmeaError::TagBlock(format!("{}: not a number: {:?}", key, value)))
            };
            match key {
                "c" => block.time = number()?,
                "r" => block.relative_time = number()?,
                "n" => block.line_count = number()?,
                "d" => block.destination = value.to_string(),
                "g" => block.grouping = value.to_string(),
                "s" => block.source = value.to_string(),
                "t" => block.text = value.to_string(),
                _ => {}
            }
        }
        Ok(block)
    }

    /// Encode for sentence `index` (1-based) of a `count`-sentence group numbered `seq`.
    ///
    /// Blank blocks encode as an empty string. Multi-sentence groups get a `g:` tag; only
    /// the first sentence carries the other tags (and `n:` when `add_line_count`).
    pub fn encode(&self, index: usize, count: usize, seq: u32, add_line_count: bool) -> String {
        if self.is_blank() {
            return String::new();
        }
        let mut tags = Vec::new();
        if count > 1 {
            tags.push(format!("g:{}-{}-{}", index, count, seq));
            if index > 1 {
                return wrap(&tags[0]);
            }
            if add_line_count {
                tags.push(format!("n:{}", count));
            }
        }
        if !self.source.is_empty() {
            tags.push(format!("s:{}", self.source));
        }
        if self.time != 0 {
            tags.push(format!("c:{}", self.time));
        }
        if self.relative_time != 0 {
            tags.push(format!("r:{}", self.relative_time));
        }
        if !self.destination.is_empty() {
            tags.push(format!("d:{}", self.destination));
        }
        if !self.text.is_empty() {
            tags.push(format!("t:{}", self.text));
        }
        wrap(&tags.join(","))
    }

    /// Fill fields still absent here from `other`. The grouping is never taken over.
    pub fn merge(&mut self, other: &TagBlock) {
        if self.time == 0 {
            self.time = other.time;
        }
        if self.text.is_empty() {
            self.text.clone_from(&other.text);
        }
        if self.destination.is_empty() {
            self.destination.clone_from(&other.destination);
        }
        if self.source.is_empty() {
            self.source.clone_from(&other.source);
        }
        if self.relative_time == 0 {
            self.relative_time = other.relative_time;
        }
        if self.line_count == 0 {
            self.line_count = other.line_count;
        }
    }
}

// Unlike sentences, the TAG-block checksum starts at byte 0.
fn wrap(body: &str) -> String {
    format!("\\{}*{:02X}\\", body, checksum(body.as_bytes()))
}
