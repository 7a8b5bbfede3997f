//! Encode/decode AIS payloads by walking the schema.
//!
//! Handles dependency bits, minimum-length checks, constants (`= K`), scaled fields,
//! rest-of-payload fields, nested structs and arrays of tracked structs.

use crate::ast::{Field, Presence, ResolvedProtocol, TypeSpec, Width};
use crate::bits::{self, BitError};
use crate::config::CodecConfig;
use crate::message::Message;
use crate::schema::{schema, zero_record, zero_struct, MessageKind};
use crate::value::{Record, Value};
use std::borrow::Cow;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct Codec {
    pub config: CodecConfig,
    resolved: &'static ResolvedProtocol,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("payload of {0} bits is not byte aligned")]
    Misaligned(usize),
    #[error("payload of {0} bits has no message id")]
    NoMessageId(usize),
    #[error("unknown message id {0}")]
    UnknownMessage(u8),
    #[error("{name}: {available} bits left, {required} required")]
    Truncated {
        name: String,
        available: usize,
        required: usize,
    },
    #[error("{field}: dependency bit {bit} beyond payload of {len} bits")]
    DependencyOutOfRange { field: String, bit: usize, len: usize },
    #[error("{field}: expected {expected}, found {found}")]
    FixedValueMismatch { field: String, expected: i64, found: i64 },
    #[error("{0}: not valid")]
    NotValid(String),
    #[error("message id {id} is not a {kind}")]
    KindMismatch { kind: MessageKind, id: u8 },
    #[error("{field}: {source}")]
    Field {
        field: String,
        #[source]
        source: BitError,
    },
    #[error("{kind}: {len} bits exceed the maximum of {max}")]
    TooLong { kind: MessageKind, len: usize, max: usize },
    #[error("{field}: expected a {expected} value")]
    TypeMismatch { field: String, expected: &'static str },
    #[error("{0}: unsupported layout")]
    Unsupported(String),
}

/// Decode failure class: `Short` payloads let arrays stop early, `Fatal` aborts the message.
enum WalkError {
    Short(CodecError),
    Fatal(CodecError),
}

impl WalkError {
    fn into_inner(self) -> CodecError {
        match self {
            WalkError::Short(e) | WalkError::Fatal(e) => e,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(CodecConfig::default())
    }
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Codec {
            config,
            resolved: schema(),
        }
    }

    /// Decode a payload of bits (one per byte, 0 or 1) into a message.
    pub fn decode_packet(&self, payload: &[u8]) -> Result<Message, CodecError> {
        let result = self.decode_inner(payload);
        match &result {
            Ok(m) => trace!(kind = %m.kind, bits = payload.len(), "decoded packet"),
            Err(e) => debug!(error = %e, bits = payload.len(), "packet not decoded"),
        }
        result
    }

    fn decode_inner(&self, payload: &[u8]) -> Result<Message, CodecError> {
        if self.config.strict_byte_alignment && payload.len() % 8 != 0 {
            return Err(CodecError::Misaligned(payload.len()));
        }
        if payload.len() < 6 {
            return Err(CodecError::NoMessageId(payload.len()));
        }
        let mut offset = 0;
        let id = bits::extract_number(payload, false, &mut offset, 6) as u8;
        let kind = MessageKind::from_id(id).ok_or(CodecError::UnknownMessage(id))?;
        let layout = self
            .resolved
            .get_message(kind.name())
            .ok_or(CodecError::UnknownMessage(id))?;
        let walker = Decoder {
            config: &self.config,
            resolved: self.resolved,
            payload,
        };
        let mut offset = 0;
        let record = walker
            .decode_fields(&layout.name, &layout.fields, Presence::Always, &mut offset)
            .map_err(WalkError::into_inner)?;
        let mut message = Message { kind, record };
        interrogation_decode_shim(&mut message);
        Ok(message)
    }

    /// Encode a valid message into a payload of bits padded to a byte boundary.
    pub fn encode_packet(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let result = self.encode_inner(message);
        if let Err(e) = &result {
            debug!(error = %e, kind = %message.kind, "packet not encoded");
        }
        result
    }

    fn encode_inner(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let id = message.message_id();
        if MessageKind::from_id(id) != Some(message.kind) {
            return Err(CodecError::KindMismatch { kind: message.kind, id });
        }
        let layout = self
            .resolved
            .get_message(message.kind.name())
            .ok_or(CodecError::UnknownMessage(id))?;
        if !message.record.valid {
            return Err(CodecError::NotValid(layout.name.clone()));
        }
        let record = interrogation_encode_shim(message);
        let max = layout.max_bits.div_ceil(8) * 8;
        let mut out = Vec::with_capacity(max);
        let walker = Encoder {
            config: &self.config,
            resolved: self.resolved,
        };
        walker.encode_fields(&layout.name, &layout.fields, Presence::Always, &record, &mut out)?;
        if out.len() > max {
            return Err(CodecError::TooLong {
                kind: message.kind,
                len: out.len(),
                max,
            });
        }
        out.resize(out.len().div_ceil(8) * 8, 0);
        Ok(out)
    }
}

struct Decoder<'a> {
    config: &'a CodecConfig,
    resolved: &'a ResolvedProtocol,
    payload: &'a [u8],
}

impl Decoder<'_> {
    fn decode_fields(
        &self,
        name: &str,
        fields: &[Field],
        presence: Presence,
        offset: &mut usize,
    ) -> Result<Record, WalkError> {
        let mut record = zero_record(self.resolved, fields, presence);
        let len = self.payload.len();

        let mut present = Vec::with_capacity(fields.len());
        for f in fields {
            let p = match &f.dependency {
                Some(dep) => match self.payload.get(dep.bit) {
                    Some(&bit) => dep.holds(bit == 1),
                    None => {
                        return Err(WalkError::Short(CodecError::DependencyOutOfRange {
                            field: format!("{}.{}", name, f.name),
                            bit: dep.bit,
                            len,
                        }))
                    }
                },
                None => true,
            };
            present.push(p);
        }
        let min_length: usize = fields
            .iter()
            .zip(&present)
            .filter(|(_, p)| **p)
            .filter_map(|(f, _)| self.resolved.fixed_width(&f.type_spec))
            .sum();
        let required = self.config.min_length_override(name).unwrap_or(min_length);
        let available = len.saturating_sub(*offset);
        if available < required {
            if presence == Presence::Optional {
                return Ok(record);
            }
            return Err(WalkError::Short(CodecError::Truncated {
                name: name.to_string(),
                available,
                required,
            }));
        }

        for (f, _) in fields.iter().zip(&present).filter(|(_, p)| **p) {
            let width = match &f.type_spec {
                TypeSpec::Text(Width::Rest) | TypeSpec::Bits(Width::Rest) => len.saturating_sub(min_length),
                TypeSpec::Text(Width::Fixed(n)) | TypeSpec::Bits(Width::Fixed(n)) => *n,
                _ => 0,
            };
            let value = match &f.type_spec {
                TypeSpec::Uint(n) => Value::Uint(self.number(name, f, false, *n, offset)? as u64),
                TypeSpec::Int(n) => Value::Int(self.number(name, f, true, *n, offset)?),
                TypeSpec::Bool => Value::Bool(self.number(name, f, false, 1, offset)? == 1),
                TypeSpec::Scaled(n, scale) => {
                    let raw = bits::extract_number(self.payload, scale.is_signed(), offset, *n) as f64;
                    if self.config.float_without_conversion {
                        Value::Float(raw)
                    } else {
                        Value::Float(raw / scale.divisor())
                    }
                }
                TypeSpec::Text(_) => Value::Text(bits::extract_string(
                    self.payload,
                    offset,
                    width,
                    self.config.drop_space,
                )),
                TypeSpec::Bits(_) => {
                    let start = *offset;
                    *offset += width;
                    Value::Bits((start..*offset).map(|i| self.payload.get(i).copied().unwrap_or(0)).collect())
                }
                TypeSpec::StructRef(child) => {
                    let Some(s) = self.resolved.get_struct(child) else {
                        return Err(WalkError::Fatal(CodecError::Unsupported(child.clone())));
                    };
                    Value::Struct(self.decode_fields(&s.name, &s.fields, s.presence, offset)?)
                }
                TypeSpec::Array(child, count) => {
                    let Some(s) = self.resolved.get_struct(child) else {
                        return Err(WalkError::Fatal(CodecError::Unsupported(child.clone())));
                    };
                    let mut items = Vec::with_capacity(*count);
                    for k in 0..*count {
                        match self.decode_fields(&s.name, &s.fields, s.presence, offset) {
                            Ok(r) => items.push(Value::Struct(r)),
                            Err(WalkError::Short(e)) if k == 0 => return Err(WalkError::Fatal(e)),
                            Err(WalkError::Short(_)) => break,
                            Err(fatal) => return Err(fatal),
                        }
                    }
                    while items.len() < *count {
                        items.push(Value::Struct(zero_struct(self.resolved, child)));
                    }
                    Value::List(items)
                }
            };
            record.set(&f.name, value);
        }
        record.valid = true;
        Ok(record)
    }

    fn number(&self, owner: &str, f: &Field, signed: bool, width: usize, offset: &mut usize) -> Result<i64, WalkError> {
        let v = bits::extract_number(self.payload, signed, offset, width);
        if let Some(fixed) = f.fixed {
            if self.config.check_fixed_values && v != fixed.value {
                return Err(WalkError::Fatal(CodecError::FixedValueMismatch {
                    field: format!("{}.{}", owner, f.name),
                    expected: fixed.value,
                    found: v,
                }));
            }
        }
        Ok(v)
    }
}

struct Encoder<'a> {
    config: &'a CodecConfig,
    resolved: &'a ResolvedProtocol,
}

impl Encoder<'_> {
    fn encode_fields(
        &self,
        name: &str,
        fields: &[Field],
        presence: Presence,
        record: &Record,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        if presence.is_tracked() && !record.valid {
            return match presence {
                Presence::Optional => Ok(()),
                _ => Err(CodecError::NotValid(name.to_string())),
            };
        }

        for f in fields {
            if let Some(dep) = &f.dependency {
                if !dep.holds(record.flag(&dep.flag).unwrap_or(false)) {
                    continue;
                }
            }
            let at = || format!("{}.{}", name, f.name);
            let value = record.get(&f.name);
            let primitive = |signed: bool, width: usize, v: i64, out: &mut Vec<u8>| {
                bits::encode_number(out, signed, width, v).map_err(|source| CodecError::Field { field: at(), source })
            };
            match &f.type_spec {
                TypeSpec::Uint(_) | TypeSpec::Int(_) | TypeSpec::Bool => {
                    let (signed, width) = match f.type_spec {
                        TypeSpec::Int(n) => (true, n),
                        TypeSpec::Uint(n) => (false, n),
                        _ => (false, 1),
                    };
                    let v = match f.fixed {
                        Some(fixed) => fixed.value,
                        None => integer(value, &at)?,
                    };
                    primitive(signed, width, v, out)?;
                }
                TypeSpec::Scaled(n, scale) => {
                    let x = match value {
                        None => 0.0,
                        Some(v) => v.as_f64().ok_or_else(|| CodecError::TypeMismatch {
                            field: at(),
                            expected: "numeric",
                        })?,
                    };
                    let x = if self.config.float_without_conversion {
                        x.round()
                    } else {
                        (x * scale.divisor()).round()
                    };
                    if !x.is_finite() {
                        return Err(CodecError::TypeMismatch {
                            field: at(),
                            expected: "finite",
                        });
                    }
                    // `as` saturates, so huge values still fail the range check.
                    primitive(scale.is_signed(), *n, x as i64, out)?;
                }
                TypeSpec::Text(width) => {
                    let text = match value {
                        None => "",
                        Some(v) => v.as_str().ok_or_else(|| CodecError::TypeMismatch {
                            field: at(),
                            expected: "text",
                        })?,
                    };
                    let (n, fixed_width) = match width {
                        Width::Fixed(n) => (*n, true),
                        Width::Rest => (0, false),
                    };
                    bits::encode_string(out, n, fixed_width, text).map_err(|source| CodecError::Field {
                        field: at(),
                        source,
                    })?;
                }
                TypeSpec::Bits(Width::Rest) => {
                    let data = match value {
                        None => &[][..],
                        Some(v) => v.as_bits().ok_or_else(|| CodecError::TypeMismatch {
                            field: at(),
                            expected: "bits",
                        })?,
                    };
                    out.extend(data.iter().map(|b| b & 1));
                }
                TypeSpec::Bits(Width::Fixed(_)) => return Err(CodecError::Unsupported(at())),
                TypeSpec::StructRef(child) => {
                    let s = self
                        .resolved
                        .get_struct(child)
                        .ok_or_else(|| CodecError::Unsupported(at()))?;
                    let nested = nested_record(self.resolved, value, child, &at)?;
                    self.encode_fields(&s.name, &s.fields, s.presence, &nested, out)?;
                }
                TypeSpec::Array(child, count) => {
                    let s = self
                        .resolved
                        .get_struct(child)
                        .ok_or_else(|| CodecError::Unsupported(at()))?;
                    let items = match value {
                        None => &[][..],
                        Some(v) => v.as_list().ok_or_else(|| CodecError::TypeMismatch {
                            field: at(),
                            expected: "list",
                        })?,
                    };
                    for k in 0..*count {
                        let item = nested_record(self.resolved, items.get(k), child, &at)?;
                        match self.encode_fields(&s.name, &s.fields, s.presence, &item, out) {
                            Ok(()) => {}
                            Err(CodecError::NotValid(_)) if k > 0 => break,
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn integer(value: Option<&Value>, at: &dyn Fn() -> String) -> Result<i64, CodecError> {
    match value {
        None => Ok(0),
        Some(Value::Uint(x)) => i64::try_from(*x).map_err(|_| CodecError::Field {
            field: at(),
            source: BitError::OutOfRange {
                value: i64::MAX,
                width: 64,
                signed: false,
            },
        }),
        Some(v) => v.as_i64().ok_or_else(|| CodecError::TypeMismatch {
            field: at(),
            expected: "integer",
        }),
    }
}

/// Record of a nested struct; a missing one encodes as its zero value.
fn nested_record<'v>(
    resolved: &ResolvedProtocol,
    value: Option<&'v Value>,
    name: &str,
    at: &dyn Fn() -> String,
) -> Result<Cow<'v, Record>, CodecError> {
    match value {
        None => Ok(Cow::Owned(zero_struct(resolved, name))),
        Some(v) => v.as_record().map(Cow::Borrowed).ok_or_else(|| CodecError::TypeMismatch {
            field: at(),
            expected: "struct",
        }),
    }
}

// Interrogation compatibility shims. Some transmitters send station 1's second request as
// all zeros when only station 2 is interrogated; treat it as absent on decode and emit it
// zeroed on encode so that station 2 lands at the right offset.

fn interrogation_decode_shim(message: &mut Message) {
    if message.kind != MessageKind::Interrogation {
        return;
    }
    if !message.record.record("station2").is_some_and(|r| r.valid) {
        return;
    }
    if let Some(msg2) = message.record.record_mut("station1_msg2") {
        if msg2.uint("message_id") == Some(0) && msg2.uint("slot_offset") == Some(0) {
            msg2.valid = false;
        }
    }
}

fn interrogation_encode_shim(message: &Message) -> Cow<'_, Record> {
    let record = &message.record;
    let station2 = record.record("station2").is_some_and(|r| r.valid);
    let msg2 = record.record("station1_msg2").is_some_and(|r| r.valid);
    if message.kind != MessageKind::Interrogation || !station2 || msg2 {
        return Cow::Borrowed(record);
    }
    let mut patched = record.clone();
    let mut zeroed = zero_struct(schema(), "InterrogationStation1Message2");
    zeroed.valid = true;
    patched.set("station1_msg2", Value::Struct(zeroed));
    Cow::Owned(patched)
}
