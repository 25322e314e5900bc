//! oolc-lex - Lexical analysis for Oolong.
//!
//! The lexer turns UTF-8 source text into a stream of [`Token`]s with
//! source positions. It is a hand-written scanner with one character of
//! lookahead; the two-word keywords `AND THEN` and `OR ELSE` are recognized
//! with a bounded look-ahead implemented as a cursor snapshot that is
//! restored when the second word does not follow.
//!
//! Errors (unterminated comment, unknown character, malformed character
//! literal, oversized integer literal) abort scanning; there is no recovery.

pub mod cursor;
mod lexer;
mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
