//! Decoded AIS message: its kind plus the field record walked from the schema.

use crate::ast::Presence;
use crate::schema::{schema, zero_record, MessageKind};
use crate::value::{Record, Value};

/// Header common to every message (bits 0-37).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub message_id: u8,
    pub repeat_indicator: u8,
    /// MMSI of the transmitting station.
    pub user_id: u32,
}

impl Header {
    pub fn new(message_id: u8, user_id: u32) -> Self {
        Header {
            message_id,
            repeat_indicator: 0,
            user_id,
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Header {
            message_id: record.uint("message_id").unwrap_or(0) as u8,
            repeat_indicator: record.uint("repeat_indicator").unwrap_or(0) as u8,
            user_id: record.uint("user_id").unwrap_or(0) as u32,
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new(true);
        record.set("message_id", Value::Uint(u64::from(self.message_id)));
        record.set("repeat_indicator", Value::Uint(u64::from(self.repeat_indicator)));
        record.set("user_id", Value::Uint(u64::from(self.user_id)));
        record
    }
}

/// One message of a given kind. `record.valid` is set once the message decoded completely.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub kind: MessageKind,
    pub record: Record,
}

impl Message {
    /// Zero-filled, valid message of `kind` carrying `header`, ready to populate and encode.
    pub fn new(kind: MessageKind, header: Header) -> Self {
        let resolved = schema();
        let mut record = match resolved.get_message(kind.name()) {
            Some(m) => zero_record(resolved, &m.fields, Presence::Always),
            None => Record::new(true),
        };
        record.set("header", Value::Struct(header.to_record()));
        Message { kind, record }
    }

    pub fn header(&self) -> Header {
        self.record.record("header").map(Header::from_record).unwrap_or_default()
    }

    pub fn set_header(&mut self, header: Header) {
        self.record.set("header", Value::Struct(header.to_record()));
    }

    pub fn message_id(&self) -> u8 {
        self.header().message_id
    }

    pub fn is_valid(&self) -> bool {
        self.record.valid
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.record.get_mut(name)
    }

    /// Set a top-level field; returns the previous value.
    pub fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        self.record.set(name, value)
    }
}
