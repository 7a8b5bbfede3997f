//! NMEA 0183 sentence framing: checksums, VDM/VDO field parsing and the 6-bit payload armor.

use crate::codec::CodecError;
use crate::tagblock::TagBlock;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NmeaError {
    #[error("sentence does not start with '!' or '$'")]
    NoStart,
    #[error("sentence has no '*' checksum")]
    MissingChecksum,
    #[error("checksum mismatch: computed {computed:02X}, found {found:02X}")]
    ChecksumMismatch { computed: u8, found: u8 },
    #[error("invalid tag block: {0}")]
    TagBlock(String),
    #[error("sentence was not of the VDM or VDO type: {0}")]
    NotVdmVdo(String),
    #[error("expected 7 fields, found {0}")]
    FieldCount(usize),
    #[error("{field}: invalid value {value:?}")]
    BadField { field: &'static str, value: String },
    #[error("invalid armor character {0:?}")]
    InvalidCharacter(char),
    #[error("nothing to encode")]
    NothingToEncode,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// One parsed VDM/VDO sentence. `payload` holds the de-armored bits, fill bits removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VdmSentence {
    pub tag_block: TagBlock,
    pub talker_id: String,
    /// `VDM` or `VDO`.
    pub message_type: String,
    pub fragment_count: i64,
    pub fragment_index: i64,
    /// Sequential message id; 0 when the field is empty.
    pub message_id: i64,
    /// Raw channel designator, `None` when the field is empty.
    pub channel: Option<u8>,
    pub payload: Vec<u8>,
}

impl VdmSentence {
    pub fn is_vdo(&self) -> bool {
        self.message_type == "VDO"
    }
}

/// XOR of all bytes.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Two hex digits, either case.
pub fn parse_hex_byte(s: &str) -> Option<u8> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(s, 16).ok()
}

/// Parse one line: optional TAG-block, `!`/`$` sentence, `*CC` checksum.
pub fn parse_sentence(line: &str) -> Result<VdmSentence, NmeaError> {
    let line = line.trim();
    let (tag_block, line) = match line.strip_prefix('\\') {
        Some(rest) => {
            let (content, rest) = rest
                .split_once('\\')
                .ok_or_else(|| NmeaError::TagBlock("unterminated".to_string()))?;
            (TagBlock::parse(content)?, rest)
        }
        None => (TagBlock::default(), line),
    };

    let body = line
        .strip_prefix('!')
        .or_else(|| line.strip_prefix('$'))
        .ok_or(NmeaError::NoStart)?;
    let (body, sum) = body.rsplit_once('*').ok_or(NmeaError::MissingChecksum)?;
    let found = parse_hex_byte(sum).ok_or(NmeaError::MissingChecksum)?;
    let computed = checksum(body.as_bytes());
    if computed != found {
        return Err(NmeaError::ChecksumMismatch { computed, found });
    }

    let fields: Vec<&str> = body.split(',').collect();
    let address = fields[0];
    let (talker_id, message_type) = match (address.get(..2), address.get(2..)) {
        (Some(t), Some(m)) if m == "VDM" || m == "VDO" => (t, m),
        _ => return Err(NmeaError::NotVdmVdo(address.to_string())),
    };
    if fields.len() != 7 {
        return Err(NmeaError::FieldCount(fields.len()));
    }

    let fill = integer_field("fill bits", fields[6])?;
    if !(0..=5).contains(&fill) {
        return Err(NmeaError::BadField {
            field: "fill bits",
            value: fields[6].to_string(),
        });
    }

    Ok(VdmSentence {
        tag_block,
        talker_id: talker_id.to_string(),
        message_type: message_type.to_string(),
        fragment_count: integer_field("fragment count", fields[1])?,
        fragment_index: integer_field("fragment number", fields[2])?,
        message_id: integer_field("message id", fields[3])?,
        channel: fields[4].bytes().next(),
        payload: dearmor(fields[5].as_bytes(), fill as usize)?,
    })
}

fn integer_field(field: &'static str, value: &str) -> Result<i64, NmeaError> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| NmeaError::BadField {
        field,
        value: value.to_string(),
    })
}

/// Armor character to its 6-bit value.
pub fn char_to_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'W' | b'`'..=b'w' => {
            let v = c - 48;
            Some(if v > 40 { v - 8 } else { v })
        }
        _ => None,
    }
}

/// 6-bit value to its armor character.
pub fn value_to_char(value: u8) -> u8 {
    let c = value + 48;
    if c >= 88 {
        c + 8
    } else {
        c
    }
}

/// Expand armored text into bits, dropping `fill` bits from the end.
pub fn dearmor(text: &[u8], fill: usize) -> Result<Vec<u8>, NmeaError> {
    let mut out = Vec::with_capacity(text.len() * 6);
    for &c in text {
        let v = char_to_value(c).ok_or(NmeaError::InvalidCharacter(char::from(c)))?;
        out.extend((0..6).rev().map(|i| (v >> i) & 1));
    }
    out.truncate(out.len().saturating_sub(fill));
    Ok(out)
}

/// Pack bits into armor characters; returns the text and the number of fill bits.
pub fn armor(bits: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(bits.len().div_ceil(6));
    for chunk in bits.chunks(6) {
        let mut v = chunk.iter().fold(0u8, |acc, b| (acc << 1) | (b & 1));
        v <<= 6 - chunk.len();
        text.push(char::from(value_to_char(v)));
    }
    let fill = (6 - bits.len() % 6) % 6;
    (text, fill)
}
