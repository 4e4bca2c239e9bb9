//! ST-010: Built-in filter set.
//!
//! Ordinary single-argument values; hosts opt in by passing [`builtins`] as a
//! base context, where later contexts may override any of them.

use super::context::Context;
use super::value::Value;

fn text_filter(f: fn(&str) -> String) -> Value {
    Value::filter(move |v| match v {
        Value::Str(s) => Ok(Value::Str(f(&s))),
        other => Err(format!("expected str, got {}", other.type_name())),
    })
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn length(v: Value) -> Result<Value, String> {
    v.length()
        .map(Value::from)
        .ok_or_else(|| format!("{} has no length", v.type_name()))
}

fn first(v: Value) -> Result<Value, String> {
    match v.iterate() {
        Some(items) => Ok(items.into_iter().next().unwrap_or_default()),
        None => Err(format!("{} is not iterable", v.type_name())),
    }
}

fn last(v: Value) -> Result<Value, String> {
    match v.iterate() {
        Some(items) => Ok(items.into_iter().last().unwrap_or_default()),
        None => Err(format!("{} is not iterable", v.type_name())),
    }
}

fn reverse(v: Value) -> Result<Value, String> {
    match v {
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        Value::List(mut items) => {
            items.reverse();
            Ok(Value::List(items))
        }
        other => Err(format!("cannot reverse {}", other.type_name())),
    }
}

fn join(v: Value) -> Result<Value, String> {
    match v.iterate() {
        Some(items) => Ok(Value::Str(
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )),
        None => Err(format!("{} is not iterable", v.type_name())),
    }
}

/// The built-in filters as a context layer.
pub fn builtins() -> Context {
    Context::new()
        .with("upper", text_filter(|s| s.to_uppercase()))
        .with("lower", text_filter(|s| s.to_lowercase()))
        .with("title", text_filter(title_case))
        .with("capitalize", text_filter(capitalize))
        .with("trim", text_filter(|s| s.trim().to_string()))
        .with("length", Value::filter(length))
        .with("first", Value::filter(first))
        .with("last", Value::filter(last))
        .with("reverse", Value::filter(reverse))
        .with("join", Value::filter(join))
}
