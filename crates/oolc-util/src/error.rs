//! The compile-error type.
//!
//! There is exactly one error kind — a compile error with a source position.
//! The subcategories (lexical, syntax, context, internal) appear only as
//! message prefixes; the driver prints the `Display` form as a single line
//! on stdout and exits with code 1.

use thiserror::Error;

use crate::Pos;

/// Result alias used by every compiler phase.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// A fatal compile error. The first one aborts the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Malformed input at the character level (unterminated comment,
    /// unknown character, bad character literal, oversized number).
    #[error("Error at {pos}: lexical error: {message}")]
    Lexical { pos: Pos, message: String },

    /// The token stream does not match the grammar.
    #[error("Error at {pos}: syntax error: {message}")]
    Syntax { pos: Pos, message: String },

    /// Name resolution, typing, access or return-coverage violation.
    #[error("Error at {pos}: context error: {message}")]
    Context { pos: Pos, message: String },

    /// A broken compiler invariant. Seeing this is a bug in oolc.
    #[error("Error at {pos}: internal error: {message}")]
    Internal { pos: Pos, message: String },
}

impl CompileError {
    pub fn lexical(pos: Pos, message: impl Into<String>) -> Self {
        Self::Lexical {
            pos,
            message: message.into(),
        }
    }

    pub fn syntax(pos: Pos, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub fn context(pos: Pos, message: impl Into<String>) -> Self {
        Self::Context {
            pos,
            message: message.into(),
        }
    }

    pub fn internal(pos: Pos, message: impl Into<String>) -> Self {
        Self::Internal {
            pos,
            message: message.into(),
        }
    }

    /// The source position the error points at.
    pub fn pos(&self) -> Pos {
        match self {
            Self::Lexical { pos, .. }
            | Self::Syntax { pos, .. }
            | Self::Context { pos, .. }
            | Self::Internal { pos, .. } => *pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_display() {
        let err = CompileError::lexical(Pos::new(4, 2), "unterminated comment");
        assert_eq!(
            err.to_string(),
            "Error at line 4, col 2: lexical error: unterminated comment"
        );
    }

    #[test]
    fn test_context_prefix() {
        let err = CompileError::context(Pos::new(1, 5), "undeclared identifier X");
        assert_eq!(
            err.to_string(),
            "Error at line 1, col 5: context error: undeclared identifier X"
        );
    }

    #[test]
    fn test_pos_accessor() {
        let pos = Pos::new(9, 30);
        assert_eq!(CompileError::syntax(pos, "expected ';'").pos(), pos);
    }
}
