//! Built-in AIS message layouts and the message kinds they describe.

use crate::ast::{Field, Presence, ResolvedProtocol, TypeSpec};
use crate::lint::{self, Severity};
use crate::parser;
use crate::value::{Record, Value};
use std::sync::OnceLock;

/// Source of the built-in layouts.
pub const SCHEMA_SOURCE: &str = include_str!("ais.dsl");

static SCHEMA: OnceLock<ResolvedProtocol> = OnceLock::new();

/// The resolved built-in schema, loaded on first use.
///
/// # Panics
///
/// If the built-in schema does not parse, resolve or lint cleanly.
pub fn schema() -> &'static ResolvedProtocol {
    SCHEMA.get_or_init(|| {
        let protocol = parser::parse(SCHEMA_SOURCE).unwrap_or_else(|e| panic!("built-in schema: {}", e));
        let resolved =
            ResolvedProtocol::resolve(protocol).unwrap_or_else(|e| panic!("built-in schema: {}", e));
        let findings = lint::lint_protocol(&resolved.protocol);
        if let Some(err) = findings.iter().find(|m| m.severity == Severity::Error) {
            panic!("built-in schema: {}", err.message);
        }
        resolved
    })
}

/// Every message layout of ITU-R M.1371-5, with the identifiers that select it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    PositionReport,
    BaseStationReport,
    ShipStaticData,
    AddressedBinaryMessage,
    BinaryAcknowledge,
    BinaryBroadcastMessage,
    StandardSearchAndRescueAircraftReport,
    CoordinatedUtcInquiry,
    AddressedSafetyMessage,
    SafetyBroadcastMessage,
    Interrogation,
    AssignedModeCommand,
    GnssBroadcastBinaryMessage,
    StandardClassBPositionReport,
    ExtendedClassBPositionReport,
    DataLinkManagementMessage,
    AidsToNavigationReport,
    ChannelManagement,
    GroupAssignmentCommand,
    StaticDataReport,
    SingleSlotBinaryMessage,
    MultiSlotBinaryMessage,
    LongRangeAisBroadcastMessage,
}

impl MessageKind {
    pub const ALL: [MessageKind; 23] = [
        MessageKind::PositionReport,
        MessageKind::BaseStationReport,
        MessageKind::ShipStaticData,
        MessageKind::AddressedBinaryMessage,
        MessageKind::BinaryAcknowledge,
        MessageKind::BinaryBroadcastMessage,
        MessageKind::StandardSearchAndRescueAircraftReport,
        MessageKind::CoordinatedUtcInquiry,
        MessageKind::AddressedSafetyMessage,
        MessageKind::SafetyBroadcastMessage,
        MessageKind::Interrogation,
        MessageKind::AssignedModeCommand,
        MessageKind::GnssBroadcastBinaryMessage,
        MessageKind::StandardClassBPositionReport,
        MessageKind::ExtendedClassBPositionReport,
        MessageKind::DataLinkManagementMessage,
        MessageKind::AidsToNavigationReport,
        MessageKind::ChannelManagement,
        MessageKind::GroupAssignmentCommand,
        MessageKind::StaticDataReport,
        MessageKind::SingleSlotBinaryMessage,
        MessageKind::MultiSlotBinaryMessage,
        MessageKind::LongRangeAisBroadcastMessage,
    ];

    /// Name of the layout in the schema.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::PositionReport => "PositionReport",
            MessageKind::BaseStationReport => "BaseStationReport",
            MessageKind::ShipStaticData => "ShipStaticData",
            MessageKind::AddressedBinaryMessage => "AddressedBinaryMessage",
            MessageKind::BinaryAcknowledge => "BinaryAcknowledge",
            MessageKind::BinaryBroadcastMessage => "BinaryBroadcastMessage",
            MessageKind::StandardSearchAndRescueAircraftReport => "StandardSearchAndRescueAircraftReport",
            MessageKind::CoordinatedUtcInquiry => "CoordinatedUtcInquiry",
            MessageKind::AddressedSafetyMessage => "AddressedSafetyMessage",
            MessageKind::SafetyBroadcastMessage => "SafetyBroadcastMessage",
            MessageKind::Interrogation => "Interrogation",
            MessageKind::AssignedModeCommand => "AssignedModeCommand",
            MessageKind::GnssBroadcastBinaryMessage => "GnssBroadcastBinaryMessage",
            MessageKind::StandardClassBPositionReport => "StandardClassBPositionReport",
            MessageKind::ExtendedClassBPositionReport => "ExtendedClassBPositionReport",
            MessageKind::DataLinkManagementMessage => "DataLinkManagementMessage",
            MessageKind::AidsToNavigationReport => "AidsToNavigationReport",
            MessageKind::ChannelManagement => "ChannelManagement",
            MessageKind::GroupAssignmentCommand => "GroupAssignmentCommand",
            MessageKind::StaticDataReport => "StaticDataReport",
            MessageKind::SingleSlotBinaryMessage => "SingleSlotBinaryMessage",
            MessageKind::MultiSlotBinaryMessage => "MultiSlotBinaryMessage",
            MessageKind::LongRangeAisBroadcastMessage => "LongRangeAisBroadcastMessage",
        }
    }

    /// Message identifiers carried by this kind.
    pub fn ids(self) -> &'static [u8] {
        match self {
            MessageKind::PositionReport => &[1, 2, 3],
            MessageKind::BaseStationReport => &[4, 11],
            MessageKind::ShipStaticData => &[5],
            MessageKind::AddressedBinaryMessage => &[6],
            MessageKind::BinaryAcknowledge => &[7, 13],
            MessageKind::BinaryBroadcastMessage => &[8],
            MessageKind::StandardSearchAndRescueAircraftReport => &[9],
            MessageKind::CoordinatedUtcInquiry => &[10],
            MessageKind::AddressedSafetyMessage => &[12],
            MessageKind::SafetyBroadcastMessage => &[14],
            MessageKind::Interrogation => &[15],
            MessageKind::AssignedModeCommand => &[16],
            MessageKind::GnssBroadcastBinaryMessage => &[17],
            MessageKind::StandardClassBPositionReport => &[18],
            MessageKind::ExtendedClassBPositionReport => &[19],
            MessageKind::DataLinkManagementMessage => &[20],
            MessageKind::AidsToNavigationReport => &[21],
            MessageKind::ChannelManagement => &[22],
            MessageKind::GroupAssignmentCommand => &[23],
            MessageKind::StaticDataReport => &[24],
            MessageKind::SingleSlotBinaryMessage => &[25],
            MessageKind::MultiSlotBinaryMessage => &[26],
            MessageKind::LongRangeAisBroadcastMessage => &[27],
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.ids().contains(&id))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Zero value of a field type, as produced for an absent field.
pub fn zero_value(resolved: &ResolvedProtocol, spec: &TypeSpec) -> Value {
    match spec {
        TypeSpec::Uint(_) => Value::Uint(0),
        TypeSpec::Int(_) => Value::Int(0),
        TypeSpec::Bool => Value::Bool(false),
        TypeSpec::Scaled(_, _) => Value::Float(0.0),
        TypeSpec::Text(_) => Value::Text(String::new()),
        TypeSpec::Bits(_) => Value::Bits(Vec::new()),
        TypeSpec::StructRef(name) => Value::Struct(zero_struct(resolved, name)),
        TypeSpec::Array(name, len) => {
            Value::List((0..*len).map(|_| Value::Struct(zero_struct(resolved, name))).collect())
        }
    }
}

/// Zero-filled struct; tracked structs start out not valid.
pub fn zero_struct(resolved: &ResolvedProtocol, name: &str) -> Record {
    match resolved.get_struct(name) {
        Some(s) => zero_record(resolved, &s.fields, s.presence),
        None => Record::new(false),
    }
}

/// Zero-filled record for a field list.
pub fn zero_record(resolved: &ResolvedProtocol, fields: &[Field], presence: Presence) -> Record {
    let mut record = Record::new(!presence.is_tracked());
    for f in fields {
        record.set(&f.name, zero_value(resolved, &f.type_spec));
    }
    record
}
