//! Lint layout DSL files: source style first, then layout checks on the parsed schema.
//!
//! Usage:
//!   lint_schema [OPTIONS] [FILE.dsl ...]
//!
//! With no files the built-in AIS schema is linted.
//!
//! Options:
//!   --human, -H  Human-readable output
//!
//! Exit code 1 if any error-level findings.

use aisdsl::lint::{lint, lint_protocol, LintMessage, LintRule, Severity};
use aisdsl::parse;
use aisdsl::schema::SCHEMA_SOURCE;
use std::path::Path;

fn rule_id(rule: LintRule) -> &'static str {
    match rule {
        LintRule::IndentationTabsOnly => "indentation-tabs-only",
        LintRule::IndentationDepth => "indentation-depth",
        LintRule::OneFieldPerLine => "one-field-per-line",
        LintRule::ClosingBraceAlone => "closing-brace-alone",
        LintRule::NoTrailingWhitespace => "no-trailing-whitespace",
        LintRule::DuplicateName => "duplicate-name",
        LintRule::UnknownStruct => "unknown-struct",
        LintRule::MessageId => "message-id",
        LintRule::FieldWidth => "field-width",
        LintRule::FixedWidthBits => "fixed-width-bits",
        LintRule::RestField => "rest-field",
        LintRule::DependencyFlag => "dependency-flag",
        LintRule::FixedValue => "fixed-value",
        LintRule::MaxBits => "max-bits",
    }
}

fn print_message(path: &str, m: &LintMessage, style: OutputStyle) {
    let severity_str = match m.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    match style {
        OutputStyle::Compact => {
            println!(
                "{}:{}:{}: {}: {} [{}]",
                path,
                m.line,
                m.column,
                severity_str,
                m.message,
                rule_id(m.rule)
            );
        }
        OutputStyle::Human => {
            println!("  {} {}:{}: {}", path, m.line, m.column, m.message);
            println!("    rule: {} ({})", rule_id(m.rule), severity_str);
        }
    }
}

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

/// Style findings, plus layout findings when the source parses.
fn lint_source(src: &str) -> Result<Vec<LintMessage>, String> {
    let mut messages = lint(src);
    let protocol = parse(src)?;
    messages.extend(lint_protocol(&protocol));
    Ok(messages)
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut sources = Vec::new();
    if args.is_empty() {
        sources.push(("<built-in>".to_string(), SCHEMA_SOURCE.to_string()));
    }
    let mut has_error = false;
    for path in &args {
        let path = Path::new(path);
        match std::fs::read_to_string(path) {
            Ok(s) => sources.push((path.display().to_string(), s)),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                has_error = true;
            }
        }
    }

    let mut total_warnings = 0usize;
    let mut total_errors = 0usize;
    for (name, src) in &sources {
        let messages = match lint_source(src) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("{}: parse error: {}", name, e);
                has_error = true;
                continue;
            }
        };
        for m in &messages {
            match m.severity {
                Severity::Error => total_errors += 1,
                Severity::Warning => total_warnings += 1,
            }
            print_message(name, m, style);
        }
        if messages.iter().any(|m| m.severity == Severity::Error) {
            has_error = true;
        }
    }

    if total_errors > 0 || total_warnings > 0 {
        eprintln!("lint: {} error(s), {} warning(s)", total_errors, total_warnings);
    }
    if has_error {
        std::process::exit(1);
    }
    Ok(())
}
