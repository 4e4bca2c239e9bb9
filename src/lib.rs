//! Stencil — compile-once, render-many text templates.
//!
//! Literal text interleaved with `{{ var.path|filter }}` expressions,
//! `{% if %}` / `{% for %}` blocks, and `{# comments #}`. Templates compile to
//! an immutable instruction program that renders against any number of
//! contexts without re-parsing.
//!
//! ```
//! use stencil::{compile, Context, Value};
//!
//! let double = Value::filter(|v| match v {
//!     Value::Int(n) => Ok(Value::Int(n * 2)),
//!     other => Err(format!("cannot double {}", other.type_name())),
//! });
//! let t = compile("{{n|double}}", [Context::new().with("double", double)]).unwrap();
//! assert_eq!(t.render_with(&Context::new().with("n", 21)).unwrap(), "42");
//! ```

pub mod cli;
pub mod core;

pub use crate::core::context::Context;
pub use crate::core::error::{CompileError, CompileErrorKind, Error, RenderError};
pub use crate::core::filters::builtins;
pub use crate::core::program::{Instruction, Program};
pub use crate::core::template::{compile, Template};
pub use crate::core::value::{Filter, Method, Object, Record, Value};

/// Compile `source` and render it once against `context`.
pub fn render(source: &str, context: &Context) -> Result<String, Error> {
    Ok(Template::new(source)?.render_with(context)?)
}
