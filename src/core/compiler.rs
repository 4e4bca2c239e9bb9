//! ST-008: Block compiler.
//!
//! Consumes the token stream and builds the instruction tree. Open `if`/`for`
//! tags push a block frame; end tags pop and validate it and append the
//! finished block to the parent buffer. The frame stack must be empty at the
//! end of input.

use super::error::{CompileError, CompileErrorKind};
use super::expr::{compile_expr, is_name, AccessPlan, Scope};
use super::lexer::{tokenize, Token, TokenKind};
use super::program::{Instruction, Program};
use tracing::debug;

const OPENERS: [&str; 3] = ["{{", "{%", "{#"];

enum Header {
    If(AccessPlan),
    For {
        variable: String,
        collection: AccessPlan,
    },
}

impl Header {
    fn keyword(&self) -> &'static str {
        match self {
            Header::If(_) => "if",
            Header::For { .. } => "for",
        }
    }
}

/// An open block awaiting its end tag.
struct Block {
    header: Header,
    body: Vec<Instruction>,
    line: usize,
    raw: String,
}

/// Structural state machine over one token stream.
#[derive(Default)]
pub struct Compiler {
    scope: Scope,
    blocks: Vec<Block>,
    top: Vec<Instruction>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&mut self) -> &mut Vec<Instruction> {
        match self.blocks.last_mut() {
            Some(block) => &mut block.body,
            None => &mut self.top,
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        let buffer = self.buffer();
        if let Instruction::EmitLiteral(text) = &instruction {
            if let Some(Instruction::EmitLiteral(prev)) = buffer.last_mut() {
                prev.push_str(text);
                return;
            }
        }
        buffer.push(instruction);
    }

    /// Process one token.
    pub fn feed(&mut self, token: Token<'_>) -> Result<(), CompileError> {
        let at = |kind| CompileError::new(token.line, kind);
        match token.kind {
            TokenKind::Comment => Ok(()),
            TokenKind::Literal(text) => {
                check_terminated(text, token.line)?;
                if !text.is_empty() {
                    self.emit(Instruction::EmitLiteral(text.to_string()));
                }
                Ok(())
            }
            TokenKind::Expression(expr) => {
                let plan = compile_expr(expr, &mut self.scope).map_err(at)?;
                self.emit(Instruction::EmitExpr(plan));
                Ok(())
            }
            TokenKind::Tag(tag) => self.tag(tag, token.raw, token.line).map_err(at),
        }
    }

    fn tag(&mut self, tag: &str, raw: &str, line: usize) -> Result<(), CompileErrorKind> {
        let words: Vec<&str> = tag.split_whitespace().collect();
        let malformed = |keyword: &str| CompileErrorKind::MalformedTag {
            keyword: keyword.to_string(),
            tag: raw.to_string(),
        };

        match words.first().copied() {
            Some("if") => {
                if words.len() != 2 {
                    return Err(malformed("if"));
                }
                let condition = compile_expr(words[1], &mut self.scope)?;
                self.open(Header::If(condition), line, raw);
                Ok(())
            }
            Some("for") => {
                if words.len() != 4 || words[2] != "in" {
                    return Err(malformed("for"));
                }
                let variable = words[1];
                if !is_name(variable) {
                    return Err(CompileErrorKind::InvalidName(variable.to_string()));
                }
                let collection = compile_expr(words[3], &mut self.scope)?;
                self.scope.push_local(variable);
                self.open(
                    Header::For {
                        variable: variable.to_string(),
                        collection,
                    },
                    line,
                    raw,
                );
                Ok(())
            }
            Some(end @ ("endif" | "endfor")) => {
                if words.len() != 1 {
                    return Err(malformed(end));
                }
                self.close(end)
            }
            Some(other) => Err(CompileErrorKind::UnknownTag(other.to_string())),
            None => Err(CompileErrorKind::UnknownTag(String::new())),
        }
    }

    fn open(&mut self, header: Header, line: usize, raw: &str) {
        self.blocks.push(Block {
            header,
            body: Vec::new(),
            line,
            raw: raw.to_string(),
        });
    }

    fn close(&mut self, end: &str) -> Result<(), CompileErrorKind> {
        let block = self
            .blocks
            .pop()
            .ok_or_else(|| CompileErrorKind::TooManyEnds(end.to_string()))?;
        let expected = block.header.keyword();
        if end.strip_prefix("end") != Some(expected) {
            return Err(CompileErrorKind::MismatchedEnd {
                expected: expected.to_string(),
                found: end.to_string(),
            });
        }

        let instruction = match block.header {
            Header::If(condition) => Instruction::If {
                condition,
                body: block.body,
            },
            Header::For {
                variable,
                collection,
            } => {
                self.scope.pop_local();
                Instruction::For {
                    variable,
                    collection,
                    body: block.body,
                }
            }
        };
        self.buffer().push(instruction);
        Ok(())
    }

    /// Validate that every block was closed and produce the program.
    pub fn finish(self) -> Result<Program, CompileError> {
        if let Some(block) = self.blocks.last() {
            return Err(CompileError::new(
                block.line,
                CompileErrorKind::UnclosedBlock(block.raw.clone()),
            ));
        }
        Ok(Program::new(self.top, self.scope.into_free()))
    }
}

/// A literal only holds an opener when no closer follows it anywhere.
fn check_terminated(text: &str, line: usize) -> Result<(), CompileError> {
    let first = OPENERS
        .iter()
        .filter_map(|opener| text.find(opener).map(|at| (at, *opener)))
        .min();
    match first {
        Some((at, opener)) => Err(CompileError::new(
            line + text[..at].matches('\n').count(),
            CompileErrorKind::Unterminated(opener),
        )),
        None => Ok(()),
    }
}

/// Tokenize and compile `source` into a program.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let mut compiler = Compiler::new();
    for token in tokenize(source) {
        compiler.feed(token)?;
    }
    let program = compiler.finish()?;
    debug!(
        instructions = program.instructions().len(),
        free_variables = program.free_variables().len(),
        "compiled template"
    );
    Ok(program)
}
