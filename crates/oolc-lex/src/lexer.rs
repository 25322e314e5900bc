//! The scanner.

use oolc_util::{CompileError, CompileResult, Pos};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Lexer for Oolong source text.
///
/// Produces one token per [`next_token`] call; the stream ends with a
/// single [`TokenKind::Eof`]. All errors are lexical compile errors and
/// abort scanning.
///
/// [`next_token`]: Lexer::next_token
pub struct Lexer<'a> {
    cursor: Cursor<'a>,

    /// Position of the first character of the token being scanned.
    token_pos: Pos,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_pos: Pos::new(1, 1),
        }
    }

    /// Scans the entire source, returning all tokens including the final
    /// `Eof`.
    pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> CompileResult<Token> {
        self.skip_whitespace_and_comments()?;

        self.token_pos = self.cursor.pos();

        if self.cursor.is_at_end() {
            return Ok(self.token(TokenKind::Eof));
        }

        let c = self.cursor.current_char();
        let kind = match c {
            ';' => self.single(TokenKind::Semicolon),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Period),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '=' => self.single(TokenKind::Eq),
            '#' => self.single(TokenKind::Neq),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            ':' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '\'' => self.lex_char_literal()?,
            c if c.is_ascii_alphabetic() => self.lex_identifier(),
            c if c.is_ascii_digit() => self.lex_number()?,
            c => {
                return Err(CompileError::lexical(
                    self.token_pos,
                    format!("unknown character '{}'", c),
                ));
            }
        };

        Ok(self.token(kind))
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.token_pos)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    /// Skips whitespace, brace comments `{ ... }` and line comments
    /// `| ...` up to the next token. A brace comment that is still open at
    /// the end of input is a lexical error at its opening brace.
    fn skip_whitespace_and_comments(&mut self) -> CompileResult<()> {
        loop {
            match self.cursor.current_char() {
                c if c.is_whitespace() => self.cursor.advance(),
                '{' => {
                    let open = self.cursor.pos();
                    self.cursor.advance();
                    while self.cursor.current_char() != '}' {
                        if self.cursor.is_at_end() {
                            return Err(CompileError::lexical(open, "unterminated comment"));
                        }
                        self.cursor.advance();
                    }
                    self.cursor.advance();
                }
                '|' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Lexes an identifier or keyword: a letter followed by letters and
    /// digits. `AND` and `OR` trigger the two-word look-ahead.
    fn lex_identifier(&mut self) -> TokenKind {
        let mut name = String::new();
        while self.cursor.current_char().is_ascii_alphanumeric() {
            name.push(self.cursor.current_char());
            self.cursor.advance();
        }

        match keyword_from_ident(&name) {
            Some(TokenKind::And) if self.second_word_follows("THEN") => TokenKind::AndThen,
            Some(TokenKind::Or) if self.second_word_follows("ELSE") => TokenKind::OrElse,
            Some(kw) => kw,
            None => TokenKind::Ident(name),
        }
    }

    /// Peeks past whitespace for exactly the word `expected`. On a match
    /// the cursor is left after the word; otherwise it is restored to
    /// where it was.
    fn second_word_follows(&mut self, expected: &str) -> bool {
        let snap = self.cursor.snapshot();

        while self.cursor.current_char().is_whitespace() {
            self.cursor.advance();
        }

        let mut word = String::new();
        while self.cursor.current_char().is_ascii_alphanumeric() {
            word.push(self.cursor.current_char());
            self.cursor.advance();
        }

        if word == expected {
            true
        } else {
            self.cursor.restore(snap);
            false
        }
    }

    /// Lexes a base-10 integer literal. The value must fit a 32-bit VM
    /// word.
    fn lex_number(&mut self) -> CompileResult<TokenKind> {
        let mut value: i32 = 0;
        while self.cursor.current_char().is_ascii_digit() {
            let digit = self.cursor.current_char() as i32 - '0' as i32;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    CompileError::lexical(self.token_pos, "integer literal too large")
                })?;
            self.cursor.advance();
        }
        Ok(TokenKind::Number(value))
    }

    /// Lexes a character literal: `'c'` or one of the escapes `'\n'`,
    /// `'\t'`, `'\\'`. The token value is the code point.
    fn lex_char_literal(&mut self) -> CompileResult<TokenKind> {
        self.cursor.advance(); // opening quote

        let c = self.cursor.current_char();
        let value = match c {
            '\0' | '\n' | '\'' => {
                return Err(self.malformed_char());
            }
            '\\' => {
                self.cursor.advance();
                match self.cursor.current_char() {
                    'n' => '\n',
                    't' => '\t',
                    '\\' => '\\',
                    _ => return Err(self.malformed_char()),
                }
            }
            c => c,
        };
        self.cursor.advance();

        if !self.cursor.match_char('\'') {
            return Err(self.malformed_char());
        }

        Ok(TokenKind::Number(value as i32))
    }

    fn malformed_char(&self) -> CompileError {
        CompileError::lexical(self.token_pos, "malformed character literal")
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn ident_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9]{0,11}"
    }

    proptest! {
        #[test]
        fn lowercase_words_lex_as_single_identifier(name in ident_strategy()) {
            let tokens = Lexer::tokenize(&name).unwrap();
            prop_assert_eq!(tokens.len(), 2);
            prop_assert_eq!(&tokens[0].kind, &TokenKind::Ident(name));
        }

        #[test]
        fn numbers_round_trip(value in 0..=i32::MAX) {
            let tokens = Lexer::tokenize(&value.to_string()).unwrap();
            prop_assert_eq!(&tokens[0].kind, &TokenKind::Number(value));
        }

        #[test]
        fn whitespace_is_insignificant(
            words in proptest::collection::vec(ident_strategy(), 1..8),
            seps in proptest::collection::vec(" |\t|\n", 0..8),
        ) {
            let tight = words.join(" ");
            let mut loose = String::new();
            for (i, w) in words.iter().enumerate() {
                loose.push_str(w);
                loose.push(' ');
                if let Some(s) = seps.get(i) {
                    loose.push_str(s);
                }
            }
            let a: Vec<_> = Lexer::tokenize(&tight).unwrap().into_iter().map(|t| t.kind).collect();
            let b: Vec<_> = Lexer::tokenize(&loose).unwrap().into_iter().map(|t| t.kind).collect();
            prop_assert_eq!(a, b);
        }
    }
}
