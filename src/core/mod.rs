//! Core template logic — tokenizing, compiling, and rendering.

pub mod compiler;
pub mod context;
pub mod error;
pub mod expr;
pub mod filters;
pub mod lexer;
pub mod program;
pub mod resolver;
pub mod template;
pub mod value;
