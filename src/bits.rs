//! Bit-level primitives over an AIS payload.
//!
//! A payload is a slice of bits stored one per byte (each byte 0 or 1), bit 0 first.
//! Numbers are MSB-first. Strings use the AIS 6-bit character set.

/// Primitive encode failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BitError {
    #[error("value {value} does not fit in {width} bits (signed: {signed})")]
    OutOfRange { value: i64, width: usize, signed: bool },
    #[error("character {0:?} is not in the 6-bit alphabet")]
    InvalidCharacter(char),
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    if bits == 0 || bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Read `width` bits at `*offset` and advance the offset.
///
/// Bits past the end of the payload read as zero.
pub fn extract_number(payload: &[u8], signed: bool, offset: &mut usize, width: usize) -> i64 {
    let mut result = 0u64;
    for i in *offset..*offset + width {
        result <<= 1;
        if let Some(&bit) = payload.get(i) {
            result |= u64::from(bit & 1);
        }
    }
    *offset += width;
    if signed {
        sign_extend(result, width)
    } else {
        result as i64
    }
}

/// Read `width / 6` characters at `*offset` and advance the offset.
///
/// Trailing `@` padding is removed; with `drop_space`, trailing spaces too.
pub fn extract_string(payload: &[u8], offset: &mut usize, width: usize, drop_space: bool) -> String {
    let mut out: Vec<u8> = (0..width / 6)
        .map(|_| {
            let c = extract_number(payload, false, offset, 6) as u8;
            if c < 32 {
                c + 64
            } else {
                c
            }
        })
        .collect();
    while let Some(&last) = out.last() {
        if last == b'@' || (drop_space && last == b' ') {
            out.pop();
        } else {
            break;
        }
    }
    out.into_iter().map(char::from).collect()
}

/// Append `value` as `width` bits after checking it fits.
pub fn encode_number(out: &mut Vec<u8>, signed: bool, width: usize, value: i64) -> Result<(), BitError> {
    let v = i128::from(value);
    let (min, max) = if signed {
        let half = 1i128 << width.saturating_sub(1);
        (-half, half - 1)
    } else {
        (0, (1i128 << width) - 1)
    };
    if width == 0 || v < min || v > max {
        return Err(BitError::OutOfRange { value, width, signed });
    }
    let raw = value as u64;
    out.extend((0..width).rev().map(|i| ((raw >> i) & 1) as u8));
    Ok(())
}

/// Map one character to its 6-bit code.
pub fn char_to_sixbit(c: char) -> Result<u8, BitError> {
    match c {
        '@'..='_' => Ok(c as u8 - 64),
        ' '..='?' => Ok(c as u8),
        _ => Err(BitError::InvalidCharacter(c)),
    }
}

/// Append `text` as 6-bit characters.
///
/// With `fixed_width` the text is truncated or padded with `@` to exactly `width / 6` characters.
pub fn encode_string(out: &mut Vec<u8>, width: usize, fixed_width: bool, text: &str) -> Result<(), BitError> {
    let max_chars = width / 6;
    let mut written = 0;
    for c in text.chars() {
        if fixed_width && written == max_chars {
            break;
        }
        let code = char_to_sixbit(c)?;
        encode_number(out, false, 6, i64::from(code))?;
        written += 1;
    }
    if fixed_width {
        out.resize(out.len() + (max_chars - written) * 6, 0);
    }
    Ok(())
}
