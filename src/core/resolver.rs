//! ST-005: Runtime resolver.
//!
//! Executes a [`Program`] against a context. Free variables are bound once up
//! front; loop variables live on a local stack indexed by loop depth. Dotted
//! paths use one rule per segment: attribute, else keyed entry, then invoke
//! the result if it is a zero-argument method.

use super::context::Context;
use super::error::RenderError;
use super::expr::{AccessPlan, Binding, NameRef, Operand};
use super::program::{Instruction, Program};
use super::value::Value;
use std::borrow::Cow;
use std::fmt::Write;
use tracing::trace;

/// Per-render bindings. Owned by one `execute` call.
struct Frame<'c> {
    globals: Vec<&'c Value>,
    locals: Vec<Value>,
}

impl Frame<'_> {
    fn lookup(&self, name: &NameRef) -> &Value {
        match name.binding {
            Binding::Free(slot) => self.globals[slot],
            Binding::Local(depth) => &self.locals[depth],
        }
    }
}

/// Bind the program's free variables from `context`, then run it.
pub fn execute(program: &Program, context: &Context) -> Result<String, RenderError> {
    let globals = program
        .free_variables()
        .iter()
        .map(|name| {
            context
                .get(name)
                .ok_or_else(|| RenderError::UnboundName(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut frame = Frame {
        globals,
        locals: Vec::new(),
    };
    let mut out = String::with_capacity(program.literal_len());
    run(program.instructions(), &mut frame, &mut out)?;
    trace!(bytes = out.len(), "rendered template");
    Ok(out)
}

fn run(instructions: &[Instruction], frame: &mut Frame<'_>, out: &mut String) -> Result<(), RenderError> {
    for instruction in instructions {
        match instruction {
            Instruction::EmitLiteral(text) => out.push_str(text),
            Instruction::EmitExpr(plan) => match evaluate(plan, frame)? {
                Value::Str(s) => out.push_str(&s),
                // only a host Display impl can fail here
                other => write!(out, "{}", other).map_err(|_| RenderError::Display {
                    name: plan.base().name.clone(),
                    type_name: other.type_name().to_string(),
                })?,
            },
            Instruction::If { condition, body } => {
                if evaluate(condition, frame)?.is_truthy() {
                    run(body, frame, out)?;
                }
            }
            Instruction::For {
                collection, body, ..
            } => {
                for item in into_items(evaluate(collection, frame)?)? {
                    frame.locals.push(item);
                    let result = run(body, frame, out);
                    frame.locals.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn into_items(value: Value) -> Result<Vec<Value>, RenderError> {
    match value {
        Value::List(items) => Ok(items),
        other => other
            .iterate()
            .ok_or_else(|| RenderError::NotIterable(other.type_name().to_string())),
    }
}

fn evaluate(plan: &AccessPlan, frame: &Frame<'_>) -> Result<Value, RenderError> {
    let mut value = match &plan.operand {
        Operand::Variable(name) => frame.lookup(name).clone(),
        Operand::DottedPath(name, path) => resolve(frame.lookup(name), path)?,
    };
    for filter in &plan.filters {
        value = apply_filter(frame.lookup(filter), &filter.name, value)?;
    }
    Ok(value)
}

/// Walk `path` from `value`, one dot-resolution step per segment.
pub fn resolve(value: &Value, path: &[String]) -> Result<Value, RenderError> {
    let mut current = Cow::Borrowed(value);
    for segment in path {
        let found = current
            .attr(segment)
            .or_else(|| current.item(segment))
            .ok_or_else(|| RenderError::Resolution {
                segment: segment.clone(),
                receiver: current.type_name().to_string(),
            })?;
        current = Cow::Owned(invoke_method(found, segment)?);
    }
    Ok(current.into_owned())
}

fn invoke_method(value: Value, name: &str) -> Result<Value, RenderError> {
    match value {
        Value::Method(method) => method.call().map_err(|message| RenderError::Call {
            name: name.to_string(),
            message,
        }),
        other => Ok(other),
    }
}

fn apply_filter(filter: &Value, name: &str, input: Value) -> Result<Value, RenderError> {
    match filter {
        Value::Filter(f) => f.call(input).map_err(|message| RenderError::Call {
            name: name.to_string(),
            message,
        }),
        other => Err(RenderError::NotCallable {
            name: name.to_string(),
            found: other.type_name().to_string(),
        }),
    }
}
