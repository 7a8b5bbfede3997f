//! Parse DSL source into AST using PEST.

use crate::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::path::Path;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct LayoutParser;

/// Parse protocol source into AST.
pub fn parse(source: &str) -> Result<Protocol, String> {
    let pairs = LayoutParser::parse(Rule::protocol, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_protocol(pair)
}

/// Read and parse a DSL file.
pub fn parse_file(path: &Path) -> Result<Protocol, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    parse(&source)
}

fn build_protocol(pair: Pair<Rule>) -> Result<Protocol, String> {
    let mut protocol = Protocol::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::struct_section => protocol.structs.push(build_struct(inner)?),
            Rule::message_section => protocol.messages.push(build_message(inner)?),
            _ => {}
        }
    }
    Ok(protocol)
}

fn build_struct(pair: Pair<Rule>) -> Result<StructSection, String> {
    let mut name = String::new();
    let mut presence = Presence::Always;
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::presence => {
                presence = match inner.as_str() {
                    "tracked" => Presence::Tracked,
                    "optional" => Presence::Optional,
                    other => return Err(format!("struct {}: unknown presence {}", name, other)),
                }
            }
            Rule::field => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    if name.is_empty() {
        return Err("struct section: missing name".to_string());
    }
    Ok(StructSection { name, presence, fields })
}

fn build_message(pair: Pair<Rule>) -> Result<MessageSection, String> {
    let mut name = String::new();
    let mut ids = Vec::new();
    let mut max_bits = 0;
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::id_list => {
                for id in inner.into_inner() {
                    let v = parse_number(id.as_str())?;
                    let id = u8::try_from(v).map_err(|_| format!("message {}: id {} out of range", name, v))?;
                    ids.push(id);
                }
            }
            Rule::max_bits => {
                let n = inner.into_inner().next().ok_or("max: missing number")?;
                max_bits = parse_number(n.as_str())?;
            }
            Rule::field => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    if name.is_empty() {
        return Err("message section: missing name".to_string());
    }
    Ok(MessageSection { name, ids, max_bits, fields })
}

fn build_field(pair: Pair<Rule>) -> Result<Field, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("field: name")?.as_str().to_string();
    let type_pair = it.next().ok_or_else(|| format!("field {}: type", name))?;
    let type_spec = build_type_spec(type_pair).map_err(|e| format!("field {}: {}", name, e))?;
    let mut fixed = None;
    let mut dependency = None;
    for inner in it {
        match inner.as_rule() {
            Rule::fixed_value => fixed = Some(build_fixed_value(inner)?),
            Rule::dependency => dependency = Some(build_dependency(inner)?),
            _ => {}
        }
    }
    Ok(Field {
        name,
        type_spec,
        fixed,
        dependency,
    })
}

fn build_type_spec(pair: Pair<Rule>) -> Result<TypeSpec, String> {
    let inner = pair.into_inner().next().ok_or("empty type")?;
    let rule = inner.as_rule();
    if rule == Rule::bool_type {
        return Ok(TypeSpec::Bool);
    }
    let mut parts = inner.into_inner();
    let mut next = || parts.next().ok_or_else(|| format!("{:?}: missing argument", rule));
    match rule {
        Rule::uint_type => Ok(TypeSpec::Uint(parse_number(next()?.as_str())?)),
        Rule::int_type => Ok(TypeSpec::Int(parse_number(next()?.as_str())?)),
        Rule::string_type => Ok(TypeSpec::Text(build_width(next()?)?)),
        Rule::bits_type => Ok(TypeSpec::Bits(build_width(next()?)?)),
        Rule::scaled_type => {
            let bits = parse_number(next()?.as_str())?;
            let scale = match next()?.as_str() {
                "tenths" => Scale::Tenths,
                "fine" => Scale::LatLonFine,
                "coarse" => Scale::LatLonCoarse,
                other => return Err(format!("unknown scale {}", other)),
            };
            Ok(TypeSpec::Scaled(bits, scale))
        }
        Rule::array_type => {
            let elem = next()?.as_str().to_string();
            let len = parse_number(next()?.as_str())?;
            Ok(TypeSpec::Array(elem, len))
        }
        Rule::struct_ref => Ok(TypeSpec::StructRef(next()?.as_str().to_string())),
        other => Err(format!("unexpected type rule {:?}", other)),
    }
}

fn build_width(pair: Pair<Rule>) -> Result<Width, String> {
    let inner = pair.into_inner().next().ok_or("width: empty")?;
    match inner.as_rule() {
        Rule::rest => Ok(Width::Rest),
        _ => Ok(Width::Fixed(parse_number(inner.as_str())?)),
    }
}

fn build_fixed_value(pair: Pair<Rule>) -> Result<FixedValue, String> {
    let lit = pair.into_inner().next().ok_or("fixed value: literal")?;
    let value = lit
        .as_str()
        .parse::<i64>()
        .map_err(|e| format!("fixed value {}: {}", lit.as_str(), e))?;
    Ok(FixedValue { value })
}

fn build_dependency(pair: Pair<Rule>) -> Result<Dependency, String> {
    let mut negated = false;
    let mut flag = String::new();
    let mut bit = 0;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::negation => negated = true,
            Rule::ident => flag = inner.as_str().to_string(),
            Rule::number => bit = parse_number(inner.as_str())?,
            _ => {}
        }
    }
    Ok(Dependency { flag, bit, negated })
}

fn parse_number(s: &str) -> Result<usize, String> {
    s.parse::<usize>().map_err(|e| format!("invalid number {}: {}", s, e))
}
