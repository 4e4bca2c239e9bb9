//! ST-006: Instruction program — the compiled, immutable form of a template.

use super::context::Context;
use super::error::RenderError;
use super::expr::AccessPlan;
use super::resolver;

/// One operation. Blocks own their bodies, so a program is a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    EmitLiteral(String),
    EmitExpr(AccessPlan),
    If {
        condition: AccessPlan,
        body: Vec<Instruction>,
    },
    For {
        variable: String,
        collection: AccessPlan,
        body: Vec<Instruction>,
    },
}

/// Compiled template: instructions plus the names to bind from the context.
///
/// Never mutated after compilation; `execute` keeps all render state on its
/// own stack, so one program can be executed from many threads at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    free_variables: Vec<String>,
    literal_len: usize,
}

impl Program {
    pub(crate) fn new(instructions: Vec<Instruction>, free_variables: Vec<String>) -> Self {
        let literal_len = literal_len(&instructions);
        Self {
            instructions,
            free_variables,
            literal_len,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Names the context must supply, in binding-slot order.
    pub fn free_variables(&self) -> &[String] {
        &self.free_variables
    }

    /// Total bytes of top-level and nested literal text; an output size hint.
    pub fn literal_len(&self) -> usize {
        self.literal_len
    }

    /// Render against `context`.
    pub fn execute(&self, context: &Context) -> Result<String, RenderError> {
        resolver::execute(self, context)
    }
}

fn literal_len(instructions: &[Instruction]) -> usize {
    instructions
        .iter()
        .map(|instruction| match instruction {
            Instruction::EmitLiteral(text) => text.len(),
            Instruction::EmitExpr(_) => 0,
            Instruction::If { body, .. } | Instruction::For { body, .. } => literal_len(body),
        })
        .sum()
}
