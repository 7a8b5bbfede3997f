//! Format decoded messages for display, fields in schema order, scaled fields with units.

use crate::ast::{Field, ResolvedProtocol, Scale, TypeSpec};
use crate::message::Message;
use crate::schema::schema;
use crate::value::{Record, Value};

/// Unit printed after a converted scaled field.
pub fn scale_unit(scale: Scale) -> &'static str {
    match scale {
        Scale::Tenths => "",
        Scale::LatLonFine | Scale::LatLonCoarse => "°",
    }
}

/// Raw scalar string.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::Uint(x) => format!("{}", x),
        Value::Int(x) => format!("{}", x),
        Value::Bool(x) => format!("{}", x),
        Value::Float(x) => format!("{}", x),
        Value::Text(s) => format!("{:?}", s),
        _ => format!("{:?}", v),
    }
}

fn format_scaled(v: &Value, scale: Scale) -> String {
    let unit = scale_unit(scale);
    match v.as_f64() {
        Some(x) if unit.is_empty() => format!("{}", x),
        Some(x) => format!("{} {}", x, unit),
        None => format_scalar_raw(v),
    }
}

fn hex_string(bits: &[u8]) -> String {
    bits.chunks(8)
        .map(|c| {
            let byte = c.iter().fold(0u8, |acc, b| (acc << 1) | (b & 1)) << (8 - c.len());
            format!("{:02x}", byte)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line dump of one field value.
pub fn value_to_dump(resolved: &ResolvedProtocol, field: &Field, v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match (v, &field.type_spec) {
        (_, TypeSpec::Scaled(_, scale)) => format!("{}{}", pad, format_scaled(v, *scale)),
        (Value::Bits(b), _) => format!("{}hex({}) [{} bits]", pad, hex_string(b), b.len()),
        (Value::Struct(r), TypeSpec::StructRef(name)) => record_to_dump(resolved, name, r, indent),
        (Value::List(items), TypeSpec::Array(name, _)) => {
            if items.is_empty() {
                return format!("{}[]", pad);
            }
            let mut lines = vec![format!("{}[", pad)];
            for (i, item) in items.iter().enumerate() {
                let sub = match item {
                    Value::Struct(r) => record_to_dump(resolved, name, r, indent + 1),
                    other => format!("{}{}", "  ".repeat(indent + 1), format_scalar_raw(other)),
                };
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        _ => format!("{}{}", pad, format_scalar_raw(v)),
    }
}

fn record_to_dump(resolved: &ResolvedProtocol, name: &str, record: &Record, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    if !record.valid {
        return format!("{}<absent>", pad);
    }
    let Some(fields) = resolved.fields_of(name) else {
        return format!("{}{:?}", pad, record);
    };
    let mut lines = vec![format!("{}{{", pad)];
    for f in fields {
        if let Some(v) = record.get(&f.name) {
            let sub = value_to_dump(resolved, f, v, indent + 1);
            lines.push(format!("{}  {}: {}", pad, f.name, sub.trim_start()));
        }
    }
    lines.push(format!("{}}}", pad));
    lines.join("\n")
}

/// Full dump of a message: kind line, then one line (or block) per field.
pub fn message_to_dump(message: &Message) -> String {
    let resolved = schema();
    let mut out = format!("{} (id {})", message.kind, message.message_id());
    if let Some(layout) = resolved.get_message(message.kind.name()) {
        for f in &layout.fields {
            if let Some(v) = message.get(&f.name) {
                let sub = value_to_dump(resolved, f, v, 1);
                out.push_str(&format!("\n  {}: {}", f.name, sub.trim_start()));
            }
        }
    }
    out
}

/// One-line summary: kind, source MMSI and repeat indicator.
pub fn message_summary_line(message: &Message) -> String {
    let h = message.header();
    format!(
        "{} mmsi={} id={} repeat={}",
        message.kind, h.user_id, h.message_id, h.repeat_indicator
    )
}
