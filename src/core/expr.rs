//! ST-004: Expression compiler.
//!
//! Turns `name.seg.seg|filter|filter` into an [`AccessPlan`]. Every base name
//! and filter name is bound either to a loop variable in scope or to a slot in
//! the program's free-variable set.

use super::error::CompileErrorKind;
use indexmap::IndexSet;
use regex::Regex;
use rustc_hash::FxBuildHasher;
use std::sync::LazyLock;

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern is valid"));

/// True if `word` is a valid variable or filter name.
pub fn is_name(word: &str) -> bool {
    NAME.is_match(word)
}

fn check_name(word: &str) -> Result<(), CompileErrorKind> {
    if is_name(word) {
        Ok(())
    } else {
        Err(CompileErrorKind::InvalidName(word.to_string()))
    }
}

/// Where a name's value comes from at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Index into the free-variable set, bound once from the context.
    Free(usize),
    /// Loop nesting depth of the `for` that binds it.
    Local(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub name: String,
    pub binding: Binding,
}

/// Base step of an access plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Variable(NameRef),
    DottedPath(NameRef, Vec<String>),
}

/// Compiled `{{ }}` expression: a base step plus filters in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPlan {
    pub operand: Operand,
    pub filters: Vec<NameRef>,
}

impl AccessPlan {
    pub fn base(&self) -> &NameRef {
        match &self.operand {
            Operand::Variable(name) | Operand::DottedPath(name, _) => name,
        }
    }
}

/// Compile-time naming state: active loop variables and the free-variable set.
#[derive(Debug, Default)]
pub struct Scope {
    free: IndexSet<String, FxBuildHasher>,
    locals: Vec<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name`, registering it as free unless a loop binds it.
    pub fn bind(&mut self, name: &str) -> NameRef {
        let binding = match self.locals.iter().rposition(|local| local == name) {
            Some(depth) => Binding::Local(depth),
            None => Binding::Free(self.free.insert_full(name.to_string()).0),
        };
        NameRef {
            name: name.to_string(),
            binding,
        }
    }

    pub fn push_local(&mut self, name: &str) {
        self.locals.push(name.to_string());
    }

    pub fn pop_local(&mut self) -> Option<String> {
        self.locals.pop()
    }

    pub fn free_variables(&self) -> impl Iterator<Item = &str> {
        self.free.iter().map(String::as_str)
    }

    /// Free names in slot order.
    pub fn into_free(self) -> Vec<String> {
        self.free.into_iter().collect()
    }
}

/// Compile one expression against the current scope.
pub fn compile_expr(text: &str, scope: &mut Scope) -> Result<AccessPlan, CompileErrorKind> {
    let mut pipes = text.split('|').map(str::trim);
    let base = pipes.next().unwrap_or_default();

    let operand = if base.contains('.') {
        let mut parts = base.split('.');
        let head = parts.next().unwrap_or_default();
        check_name(head)?;
        let path = parts.map(str::to_string).collect();
        Operand::DottedPath(scope.bind(head), path)
    } else {
        check_name(base)?;
        Operand::Variable(scope.bind(base))
    };

    let filters = pipes
        .map(|filter| {
            check_name(filter)?;
            Ok(scope.bind(filter))
        })
        .collect::<Result<Vec<_>, CompileErrorKind>>()?;

    Ok(AccessPlan { operand, filters })
}
