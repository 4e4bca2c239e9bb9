//! ST-007: Compile-time and render-time error kinds.
//!
//! Compile errors are raised only while building a program; render errors only
//! while executing one. Neither is recovered internally.

use thiserror::Error;

/// What went wrong while compiling a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    #[error("not a valid name: {0:?}")]
    InvalidName(String),

    #[error("don't understand {keyword}: {tag:?}")]
    MalformedTag { keyword: String, tag: String },

    #[error("don't understand tag: {0:?}")]
    UnknownTag(String),

    #[error("too many ends: {0:?}")]
    TooManyEnds(String),

    #[error("mismatched end tag: expected end{expected}, found {found:?}")]
    MismatchedEnd { expected: String, found: String },

    #[error("unmatched action tag: {0:?}")]
    UnclosedBlock(String),

    #[error("unterminated {0:?} delimiter")]
    Unterminated(&'static str),
}

/// A compile failure, located by 1-based template line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct CompileError {
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(line: usize, kind: CompileErrorKind) -> Self {
        Self { line, kind }
    }
}

/// What went wrong while rendering a compiled template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("unbound name: {0:?}")]
    UnboundName(String),

    #[error("cannot resolve {segment:?} on {receiver}")]
    Resolution { segment: String, receiver: String },

    #[error("{name:?} is not a filter (found {found})")]
    NotCallable { name: String, found: String },

    #[error("cannot iterate over {0}")]
    NotIterable(String),

    #[error("{name:?} failed: {message}")]
    Call { name: String, message: String },

    #[error("cannot render {name:?} ({type_name}) as text")]
    Display { name: String, type_name: String },
}

/// Either phase's failure, for callers that compile and render in one step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_st007_compile_error_message_has_line() {
        let err = CompileError::new(3, CompileErrorKind::UnknownTag("while".to_string()));
        assert_eq!(err.to_string(), "line 3: don't understand tag: \"while\"");
    }

    #[test]
    fn test_st007_mismatched_end_message() {
        let kind = CompileErrorKind::MismatchedEnd {
            expected: "if".to_string(),
            found: "endfor".to_string(),
        };
        assert_eq!(
            kind.to_string(),
            "mismatched end tag: expected endif, found \"endfor\""
        );
    }

    #[test]
    fn test_st007_display_failure_message() {
        let err = RenderError::Display {
            name: "user".to_string(),
            type_name: "User".to_string(),
        };
        assert_eq!(err.to_string(), "cannot render \"user\" (User) as text");
    }

    #[test]
    fn test_st007_error_wraps_both_phases() {
        let err: Error = RenderError::UnboundName("x".to_string()).into();
        assert!(matches!(err, Error::Render(RenderError::UnboundName(_))));
        assert!(err.to_string().starts_with("render error"));
    }
}
