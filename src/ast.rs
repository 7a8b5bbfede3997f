//! Abstract Syntax Tree for the AIS layout DSL.

use std::collections::HashMap;

/// Root protocol definition: structs and messages.
#[derive(Debug, Clone, Default)]
pub struct Protocol {
    pub structs: Vec<StructSection>,
    pub messages: Vec<MessageSection>,
}

/// Whether a struct carries a `valid` flag and whether it may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    /// Always present; no `valid` tracking.
    #[default]
    Always,
    /// Carries a `valid` flag; must be complete to encode.
    Tracked,
    /// Carries a `valid` flag and may be absent (short payload on decode, not valid on encode).
    Optional,
}

impl Presence {
    pub fn is_tracked(self) -> bool {
        !matches!(self, Presence::Always)
    }
}

#[derive(Debug, Clone)]
pub struct StructSection {
    pub name: String,
    pub presence: Presence,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct MessageSection {
    pub name: String,
    /// Message identifiers (bits 0-5) decoded with this layout.
    pub ids: Vec<u8>,
    /// Maximum encoded length in bits, before byte padding.
    pub max_bits: usize,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub type_spec: TypeSpec,
    pub fixed: Option<FixedValue>,
    pub dependency: Option<Dependency>,
}

/// Field present only when a flag bit holds.
///
/// Decode looks at the absolute payload bit `bit`; encode looks at the sibling field `flag`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub flag: String,
    pub bit: usize,
    pub negated: bool,
}

impl Dependency {
    /// Presence of the dependent field given the flag value.
    pub fn holds(&self, flag: bool) -> bool {
        flag != self.negated
    }
}

/// Constant emitted on encode regardless of the record value.
///
/// Decode compares against it only when fixed-value checking is enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedValue {
    pub value: i64,
}

/// Bit width of strings and bit slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Fixed(usize),
    /// Everything left in the payload after the fixed fields.
    Rest,
}

/// Fixed-point conversion applied to `scaled` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Unsigned, 1/10 unit. The raw value is read unsigned, so all-ones 1023 in a 10-bit
    /// field is 102.3, where a signed reading would give -0.1.
    Tenths,
    /// Signed, 1/10000 minute of arc.
    LatLonFine,
    /// Signed, 1/10 minute of arc.
    LatLonCoarse,
}

impl Scale {
    pub fn divisor(self) -> f64 {
        match self {
            Scale::Tenths => 10.0,
            Scale::LatLonFine => 600_000.0,
            Scale::LatLonCoarse => 600.0,
        }
    }

    pub fn is_signed(self) -> bool {
        !matches!(self, Scale::Tenths)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Scale::Tenths => "tenths",
            Scale::LatLonFine => "fine",
            Scale::LatLonCoarse => "coarse",
        }
    }
}

/// Field type specification.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Uint(usize),
    Int(usize),
    Bool,
    Text(Width),
    Bits(Width),
    Scaled(usize, Scale),
    StructRef(String),
    Array(String, usize),
}

impl TypeSpec {
    pub fn is_rest(&self) -> bool {
        matches!(self, TypeSpec::Text(Width::Rest) | TypeSpec::Bits(Width::Rest))
    }

    /// Signedness of a numeric field, `None` for non-numeric types.
    pub fn numeric_signedness(&self) -> Option<bool> {
        match self {
            TypeSpec::Uint(_) | TypeSpec::Bool => Some(false),
            TypeSpec::Int(_) => Some(true),
            TypeSpec::Scaled(_, scale) => Some(scale.is_signed()),
            _ => None,
        }
    }
}

/// Resolved protocol: structs and messages by name and messages by identifier.
#[derive(Debug, Clone)]
pub struct ResolvedProtocol {
    pub protocol: Protocol,
    pub structs_by_name: HashMap<String, usize>,
    pub messages_by_name: HashMap<String, usize>,
    pub messages_by_id: HashMap<u8, usize>,
}

impl ResolvedProtocol {
    pub fn resolve(protocol: Protocol) -> Result<Self, String> {
        let mut structs_by_name = HashMap::new();
        let mut messages_by_name = HashMap::new();
        let mut messages_by_id = HashMap::new();
        for (i, s) in protocol.structs.iter().enumerate() {
            if structs_by_name.insert(s.name.clone(), i).is_some() {
                return Err(format!("Duplicate struct name: {}", s.name));
            }
        }
        for (i, m) in protocol.messages.iter().enumerate() {
            if messages_by_name.insert(m.name.clone(), i).is_some() {
                return Err(format!("Duplicate message name: {}", m.name));
            }
            for &id in &m.ids {
                if messages_by_id.insert(id, i).is_some() {
                    return Err(format!("Duplicate message id: {}", id));
                }
            }
        }
        let resolved = ResolvedProtocol {
            protocol,
            structs_by_name,
            messages_by_name,
            messages_by_id,
        };
        for s in &resolved.protocol.structs {
            resolved.check_refs(&s.name, &s.fields)?;
        }
        for m in &resolved.protocol.messages {
            resolved.check_refs(&m.name, &m.fields)?;
        }
        resolved.check_cycles()?;
        Ok(resolved)
    }

    fn check_refs(&self, owner: &str, fields: &[Field]) -> Result<(), String> {
        for f in fields {
            if let TypeSpec::StructRef(name) | TypeSpec::Array(name, _) = &f.type_spec {
                if !self.structs_by_name.contains_key(name) {
                    return Err(format!("{}.{}: unknown struct {}", owner, f.name, name));
                }
            }
        }
        Ok(())
    }

    fn check_cycles(&self) -> Result<(), String> {
        fn visit<'a>(
            resolved: &'a ResolvedProtocol,
            name: &'a str,
            stack: &mut Vec<&'a str>,
        ) -> Result<(), String> {
            if stack.contains(&name) {
                return Err(format!("Recursive struct: {}", name));
            }
            let Some(s) = resolved.get_struct(name) else {
                return Ok(());
            };
            stack.push(name);
            for f in &s.fields {
                if let TypeSpec::StructRef(child) | TypeSpec::Array(child, _) = &f.type_spec {
                    visit(resolved, child, stack)?;
                }
            }
            stack.pop();
            Ok(())
        }
        for s in &self.protocol.structs {
            visit(self, &s.name, &mut Vec::new())?;
        }
        Ok(())
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructSection> {
        self.structs_by_name
            .get(name)
            .map(|&i| &self.protocol.structs[i])
    }

    pub fn get_message(&self, name: &str) -> Option<&MessageSection> {
        self.messages_by_name
            .get(name)
            .map(|&i| &self.protocol.messages[i])
    }

    pub fn message_for_id(&self, id: u8) -> Option<&MessageSection> {
        self.messages_by_id
            .get(&id)
            .map(|&i| &self.protocol.messages[i])
    }

    /// Fields of a struct or message by name.
    pub fn fields_of(&self, name: &str) -> Option<&[Field]> {
        self.get_message(name)
            .map(|m| m.fields.as_slice())
            .or_else(|| self.get_struct(name).map(|s| s.fields.as_slice()))
    }

    /// Bits a field contributes to the minimum length of its container.
    ///
    /// `None` for rest-of-payload fields. Arrays and optional structs contribute nothing;
    /// a mandatory struct contributes the sum of its own fixed fields.
    pub fn fixed_width(&self, spec: &TypeSpec) -> Option<usize> {
        match spec {
            TypeSpec::Uint(n) | TypeSpec::Int(n) | TypeSpec::Scaled(n, _) => Some(*n),
            TypeSpec::Bool => Some(1),
            TypeSpec::Text(Width::Fixed(n)) | TypeSpec::Bits(Width::Fixed(n)) => Some(*n),
            TypeSpec::Text(Width::Rest) | TypeSpec::Bits(Width::Rest) => None,
            TypeSpec::Array(_, _) => Some(0),
            TypeSpec::StructRef(name) => match self.get_struct(name) {
                Some(s) if s.presence == Presence::Optional => Some(0),
                Some(s) => Some(self.struct_width(&s.fields)),
                None => Some(0),
            },
        }
    }

    /// Sum of the fixed widths of all fields, ignoring dependencies.
    pub fn struct_width(&self, fields: &[Field]) -> usize {
        fields
            .iter()
            .filter_map(|f| self.fixed_width(&f.type_spec))
            .sum()
    }
}
