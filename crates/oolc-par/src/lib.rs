//! oolc-par - Recursive-descent parser for Oolong.
//!
//! The grammar, in EBNF:
//!
//! ```ebnf
//! program       = { classdecl } ;
//! classdecl     = CLASS ident [ EXTENDS ident ] IS { memberdecl } END CLASS ;
//! memberdecl    = [ PRIVATE | PROTECTED | PUBLIC ]
//!                 ( vardecl ";"
//!                 | METHOD ident [ "(" vardecl { ";" vardecl } ")" ]
//!                   [ ":" ident ] IS methodbody ) ;
//! vardecl       = ident { "," ident } ":" ident ;
//! methodbody    = { vardecl ";" } BEGIN statements END METHOD ;
//! statement     = READ memberaccess ";"
//!               | WRITE expression ";"
//!               | IF pred THEN stmts { ELSEIF pred THEN stmts }
//!                 [ ELSE stmts ] END IF
//!               | WHILE pred DO stmts END WHILE
//!               | RETURN [ pred ] ";"
//!               | memberaccess [ ":=" pred ] ";" ;
//! pred          = conjsc { OR ELSE conjsc } ;
//! conjsc        = predbool { AND THEN predbool } ;
//! predbool      = conj { OR conj } ;
//! conj          = relation { AND relation } ;
//! relation      = expression [ ( "=" | "#" | "<" | ">" | "<=" | ">=" ) expression ] ;
//! expression    = term { ( "+" | "-" ) term } ;
//! term          = factor { ( "*" | "/" | MOD ) factor } ;
//! factor        = "-" factor | NOT factor | memberaccess ;
//! memberaccess  = literal { "." varorcall } ;
//! literal       = number | character | NULL | SELF | BASE | NEW ident
//!               | "(" pred ")" | TRUE | FALSE | varorcall ;
//! varorcall     = ident [ "(" pred { "," pred } ")" ] ;
//! ```
//!
//! Each nonterminal maps to one parser method. The token stream is fully
//! materialized before parsing starts; one token of lookahead suffices.
//! The first syntax error aborts.

pub mod ast;
mod expr;
mod stmt;

use oolc_lex::{Token, TokenKind};
use oolc_util::{CompileError, CompileResult, Pos};

use ast::{AccessRight, ClassDecl, Ident, MethodDecl, Program, VarDecl};

/// Parses a complete token stream (ending in `Eof`) into a [`Program`].
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
    Parser::new(tokens).parse_program()
}

/// The recursive-descent parser.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            position: 0,
        }
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    pub(crate) fn peek(&self) -> &TokenKind {
        &self.tokens[self.position].kind
    }

    pub(crate) fn peek_pos(&self) -> Pos {
        self.tokens[self.position].pos
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    /// Consumes the current token if it matches `kind`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes a token of exactly `kind` or fails with a syntax error
    /// naming what was expected.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expected {}", kind.describe())))
        }
    }

    /// Consumes an identifier token.
    pub(crate) fn expect_ident(&mut self, what: &str) -> CompileResult<Ident> {
        match self.peek() {
            TokenKind::Ident(_) => {
                let token = self.advance();
                let TokenKind::Ident(name) = token.kind else {
                    unreachable!();
                };
                Ok(Ident::new(name, token.pos))
            }
            _ => Err(self.unexpected(&format!("expected {}", what))),
        }
    }

    pub(crate) fn unexpected(&self, message: &str) -> CompileError {
        CompileError::syntax(
            self.peek_pos(),
            format!("{}, found {}", message, self.peek().describe()),
        )
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_program(&mut self) -> CompileResult<Program> {
        let mut classes = Vec::new();
        while !self.check(&TokenKind::Eof) {
            classes.push(self.parse_class()?);
        }
        Ok(Program { classes })
    }

    /// `CLASS ident [EXTENDS ident] IS { memberdecl } END CLASS`
    fn parse_class(&mut self) -> CompileResult<ClassDecl> {
        self.expect(TokenKind::Class)?;
        let name = self.expect_ident("class name")?;

        let base = if self.eat(&TokenKind::Extends) {
            Some(self.expect_ident("base class name")?)
        } else {
            None
        };

        self.expect(TokenKind::Is)?;

        let mut attributes = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::End) {
            self.parse_member(&mut attributes, &mut methods)?;
        }

        self.expect(TokenKind::End)?;
        self.expect(TokenKind::Class)?;

        Ok(ClassDecl {
            name,
            base,
            attributes,
            methods,
        })
    }

    /// One member declaration: an optional access modifier followed by
    /// either an attribute group or a method.
    fn parse_member(
        &mut self,
        attributes: &mut Vec<VarDecl>,
        methods: &mut Vec<MethodDecl>,
    ) -> CompileResult<()> {
        let access = self.parse_access_modifier();

        if self.eat(&TokenKind::Method) {
            methods.push(self.parse_method(access)?);
        } else {
            self.parse_var_group(access, attributes)?;
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(())
    }

    fn parse_access_modifier(&mut self) -> AccessRight {
        if self.eat(&TokenKind::Private) {
            AccessRight::Private
        } else if self.eat(&TokenKind::Protected) {
            AccessRight::Protected
        } else {
            self.eat(&TokenKind::Public);
            AccessRight::Public
        }
    }

    /// `ident { ',' ident } ':' ident` — one declared variable per name.
    fn parse_var_group(
        &mut self,
        access: AccessRight,
        out: &mut Vec<VarDecl>,
    ) -> CompileResult<()> {
        let mut names = vec![self.expect_ident("variable name")?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident("variable name")?);
        }
        self.expect(TokenKind::Colon)?;
        let ty = self.expect_ident("type name")?;

        for name in names {
            out.push(VarDecl {
                name,
                ty: ty.clone(),
                access,
            });
        }
        Ok(())
    }

    /// Method header and body; the `METHOD` keyword is already consumed.
    fn parse_method(&mut self, access: AccessRight) -> CompileResult<MethodDecl> {
        let name = self.expect_ident("method name")?;

        let mut params = Vec::new();
        if self.eat(&TokenKind::LParen) {
            self.parse_var_group(AccessRight::Public, &mut params)?;
            while self.eat(&TokenKind::Semicolon) {
                self.parse_var_group(AccessRight::Public, &mut params)?;
            }
            self.expect(TokenKind::RParen)?;
        }

        let ret = if self.eat(&TokenKind::Colon) {
            Some(self.expect_ident("return type name")?)
        } else {
            None
        };

        self.expect(TokenKind::Is)?;

        // Local declarations up to BEGIN.
        let mut locals = Vec::new();
        while !self.check(&TokenKind::Begin) {
            self.parse_var_group(AccessRight::Public, &mut locals)?;
            self.expect(TokenKind::Semicolon)?;
        }

        self.expect(TokenKind::Begin)?;
        let body = self.parse_statements()?;
        let end_pos = self.expect(TokenKind::End)?.pos;
        self.expect(TokenKind::Method)?;

        Ok(MethodDecl {
            name,
            params,
            ret,
            locals,
            body,
            access,
            end_pos,
        })
    }
}
