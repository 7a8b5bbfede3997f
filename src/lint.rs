//! Linter for the layout DSL.
//!
//! Two passes:
//!
//! - **Source style** ([`lint`]): tab indentation by brace depth, one field per line, no trailing
//!   whitespace, closing brace alone on its line.
//! - **Layout checks** ([`lint_protocol`]): references, names, identifiers, widths, dependencies and
//!   maximum lengths of a parsed protocol. Findings carry line 0.
//!
//! Run both via the `lint_schema` binary: `cargo run --bin lint_schema -- file.dsl`.
//! Exit code 1 if any error-level findings.

use crate::ast::{Field, Presence, Protocol, TypeSpec, Width};
use std::collections::{HashMap, HashSet};

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Identifies which rule produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRule {
    /// Indentation must use tabs only (no spaces).
    IndentationTabsOnly,
    /// Indentation must be exactly N tabs at depth N.
    IndentationDepth,
    /// At most one field per line.
    OneFieldPerLine,
    /// Closing `}` should be the only non-whitespace on its line.
    ClosingBraceAlone,
    /// Trailing whitespace is not allowed.
    NoTrailingWhitespace,
    /// Struct, message or field name defined twice.
    DuplicateName,
    /// Reference to a struct that does not exist.
    UnknownStruct,
    /// Message identifier outside 1..=27, used twice, or never used.
    MessageId,
    /// Integer width of 0 or above 64 bits, or a string width not a multiple of 6.
    FieldWidth,
    /// `bits(n)` with a fixed width; only `bits(*)` is supported.
    FixedWidthBits,
    /// `*` width inside a struct, or more than one `*` field in a message.
    RestField,
    /// Dependency flag is not a `bool` sibling field.
    DependencyFlag,
    /// Constant on a non-numeric field, or not representable in the field width.
    FixedValue,
    /// `max` smaller than the fixed part of the message.
    MaxBits,
}

/// A single lint message with location.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub line: usize,
    pub column: usize,
    pub rule: LintRule,
    pub severity: Severity,
    pub message: String,
}

/// Run the source style rules. Returns messages in line order.
pub fn lint(source: &str) -> Vec<LintMessage> {
    let mut out = Vec::new();
    let mut depth: usize = 0;
    let mut push = |line, column, rule, severity, message: String| {
        out.push(LintMessage {
            line,
            column,
            rule,
            severity,
            message,
        })
    };

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let trimmed_end = line.trim_end();
        if trimmed_end.len() != line.len() {
            push(
                line_no,
                trimmed_end.len() + 1,
                LintRule::NoTrailingWhitespace,
                Severity::Warning,
                "trailing whitespace not allowed".to_string(),
            );
        }

        let content = trimmed_end.trim_start();
        let indent = &trimmed_end[..trimmed_end.len() - content.len()];
        if indent.contains(' ') {
            push(
                line_no,
                1,
                LintRule::IndentationTabsOnly,
                Severity::Error,
                "indentation must use tabs only (no spaces)".to_string(),
            );
        }

        let code = match content.find("//") {
            Some(i) => content[..i].trim_end(),
            None => content,
        };
        let closes_first = code.starts_with('}');
        let expected = if closes_first { depth.saturating_sub(1) } else { depth };
        let tabs = indent.chars().filter(|&c| c == '\t').count();
        if !content.is_empty() && !content.starts_with("//") && !content.starts_with("/*") && tabs != expected {
            push(
                line_no,
                1,
                LintRule::IndentationDepth,
                Severity::Error,
                format!("expected {} tab(s) (found {})", expected, tabs),
            );
        }

        let fields = code.matches(';').count();
        if fields > 1 {
            push(
                line_no,
                1,
                LintRule::OneFieldPerLine,
                Severity::Error,
                format!("one field per line (found {} fields)", fields),
            );
        }
        if code.contains('}') && fields > 0 {
            push(
                line_no,
                1,
                LintRule::ClosingBraceAlone,
                Severity::Warning,
                "closing `}` should be the only content on its line".to_string(),
            );
        }

        for c in code.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    out
}

/// Run the layout checks on a parsed protocol.
pub fn lint_protocol(protocol: &Protocol) -> Vec<LintMessage> {
    let mut out = Vec::new();
    let mut error = |rule, message: String| {
        out.push(LintMessage {
            line: 0,
            column: 0,
            rule,
            severity: Severity::Error,
            message,
        })
    };

    let mut structs = HashMap::new();
    for s in &protocol.structs {
        if structs.insert(s.name.as_str(), s).is_some() {
            error(LintRule::DuplicateName, format!("struct {} defined twice", s.name));
        }
    }
    let mut names = HashSet::new();
    let mut ids = HashMap::new();
    for m in &protocol.messages {
        if !names.insert(m.name.as_str()) || structs.contains_key(m.name.as_str()) {
            error(LintRule::DuplicateName, format!("message {} defined twice", m.name));
        }
        for &id in &m.ids {
            if !(1..=27).contains(&id) {
                error(LintRule::MessageId, format!("message {}: id {} outside 1..=27", m.name, id));
            }
            if let Some(other) = ids.insert(id, m.name.as_str()) {
                error(
                    LintRule::MessageId,
                    format!("message {}: id {} already used by {}", m.name, id, other),
                );
            }
        }
    }

    for s in &protocol.structs {
        for (rule, message) in check_fields(&s.name, &s.fields, &structs) {
            error(rule, message);
        }
        if let Some(f) = s.fields.iter().find(|f| f.type_spec.is_rest()) {
            error(LintRule::RestField, format!("{}.{}: `*` width inside a struct", s.name, f.name));
        }
    }
    for m in &protocol.messages {
        for (rule, message) in check_fields(&m.name, &m.fields, &structs) {
            error(rule, message);
        }
        let rest = m.fields.iter().filter(|f| f.type_spec.is_rest()).count();
        if rest > 1 {
            error(LintRule::RestField, format!("message {}: {} `*` fields", m.name, rest));
        }
        let min = min_width(&m.fields, &structs);
        if m.max_bits < min {
            error(
                LintRule::MaxBits,
                format!("message {}: max {} below fixed length {}", m.name, m.max_bits, min),
            );
        }
    }

    let missing: Vec<String> = (1..=27u8)
        .filter(|id| !ids.contains_key(id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        out.push(LintMessage {
            line: 0,
            column: 0,
            rule: LintRule::MessageId,
            severity: Severity::Warning,
            message: format!("no layout for message id(s) {}", missing.join(", ")),
        });
    }
    out
}

fn check_fields(
    owner: &str,
    fields: &[Field],
    structs: &HashMap<&str, &crate::ast::StructSection>,
) -> Vec<(LintRule, String)> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for f in fields {
        let at = format!("{}.{}", owner, f.name);
        if !seen.insert(f.name.as_str()) {
            out.push((LintRule::DuplicateName, format!("{}: field defined twice", at)));
        }
        match &f.type_spec {
            TypeSpec::Uint(n) | TypeSpec::Int(n) | TypeSpec::Scaled(n, _) if *n == 0 || *n > 64 => {
                out.push((LintRule::FieldWidth, format!("{}: width {} outside 1..=64", at, n)));
            }
            TypeSpec::Text(Width::Fixed(n)) if n % 6 != 0 => {
                out.push((LintRule::FieldWidth, format!("{}: string width {} not a multiple of 6", at, n)));
            }
            TypeSpec::Bits(Width::Fixed(n)) => {
                out.push((LintRule::FixedWidthBits, format!("{}: bits({}) is not supported", at, n)));
            }
            TypeSpec::StructRef(name) | TypeSpec::Array(name, _) if !structs.contains_key(name.as_str()) => {
                out.push((LintRule::UnknownStruct, format!("{}: unknown struct {}", at, name)));
            }
            _ => {}
        }
        if let Some(fixed) = &f.fixed {
            let fits = match f.type_spec {
                TypeSpec::Uint(n) => fixed.value >= 0 && (n >= 64 || fixed.value < 1i64 << n),
                TypeSpec::Bool => fixed.value == 0 || fixed.value == 1,
                TypeSpec::Int(n) if n > 0 => {
                    n >= 64 || (-(1i64 << (n - 1))..(1i64 << (n - 1))).contains(&fixed.value)
                }
                _ => false,
            };
            if !fits {
                out.push((LintRule::FixedValue, format!("{}: constant {} does not fit", at, fixed.value)));
            }
        }
        if let Some(dep) = &f.dependency {
            let flag = fields.iter().find(|g| g.name == dep.flag);
            if !matches!(flag, Some(g) if g.type_spec == TypeSpec::Bool) {
                out.push((LintRule::DependencyFlag, format!("{}: flag {} is not a bool field", at, dep.flag)));
            }
        }
    }
    out
}

fn min_width(fields: &[Field], structs: &HashMap<&str, &crate::ast::StructSection>) -> usize {
    fields
        .iter()
        .map(|f| match &f.type_spec {
            TypeSpec::Uint(n) | TypeSpec::Int(n) | TypeSpec::Scaled(n, _) => *n,
            TypeSpec::Bool => 1,
            TypeSpec::Text(Width::Fixed(n)) | TypeSpec::Bits(Width::Fixed(n)) => *n,
            TypeSpec::StructRef(name) => match structs.get(name.as_str()) {
                Some(s) if s.presence != Presence::Optional && f.dependency.is_none() => min_width(&s.fields, structs),
                _ => 0,
            },
            _ => 0,
        })
        .sum()
}
