//! Statement parsing.

use oolc_lex::TokenKind;
use oolc_util::CompileResult;

use crate::ast::Stmt;
use crate::Parser;

impl Parser {
    /// Parses statements until one of the block terminators (`END`,
    /// `ELSE`, `ELSEIF`) is seen. The terminator is left unconsumed.
    pub(crate) fn parse_statements(&mut self) -> CompileResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokenKind::End | TokenKind::Else | TokenKind::Elseif | TokenKind::Eof => {
                    return Ok(stmts);
                }
                _ => stmts.push(self.parse_statement()?),
            }
        }
    }

    fn parse_statement(&mut self) -> CompileResult<Stmt> {
        match self.peek() {
            TokenKind::Read => {
                let pos = self.advance().pos;
                let target = self.parse_member_access()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Read { target, pos })
            }
            TokenKind::Write => {
                let pos = self.advance().pos;
                let value = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Write { value, pos })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                let pos = self.advance().pos;
                let cond = self.parse_predicate()?;
                self.expect(TokenKind::Do)?;
                let body = self.parse_statements()?;
                self.expect(TokenKind::End)?;
                self.expect(TokenKind::While)?;
                Ok(Stmt::While { cond, body, pos })
            }
            TokenKind::Return => {
                let pos = self.advance().pos;
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_predicate()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return { value, pos })
            }
            _ => {
                // memberaccess [ ':=' pred ] ';'
                let target = self.parse_member_access()?;
                if self.check(&TokenKind::Assign) {
                    let pos = self.advance().pos;
                    let value = self.parse_predicate()?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Stmt::Assign { target, value, pos })
                } else {
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Stmt::Call { expr: target })
                }
            }
        }
    }

    /// `IF pred THEN stmts { ELSEIF pred THEN stmts } [ELSE stmts] END IF`
    ///
    /// An `ELSEIF` arm becomes a nested `IF` in the else branch of the
    /// preceding one. Only the outermost `IF` consumes the single
    /// `END IF`.
    fn parse_if(&mut self) -> CompileResult<Stmt> {
        let pos = self.expect(TokenKind::If)?.pos;
        let cond = self.parse_predicate()?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.parse_statements()?;
        let else_branch = self.parse_else_tail()?;
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            pos,
        })
    }

    /// The continuation of an `IF`: an `ELSEIF` chain link, a final
    /// `ELSE`, or the closing `END IF`.
    fn parse_else_tail(&mut self) -> CompileResult<Vec<Stmt>> {
        if self.check(&TokenKind::Elseif) {
            let pos = self.advance().pos;
            let cond = self.parse_predicate()?;
            self.expect(TokenKind::Then)?;
            let then_branch = self.parse_statements()?;
            let else_branch = self.parse_else_tail()?;
            Ok(vec![Stmt::If {
                cond,
                then_branch,
                else_branch,
                pos,
            }])
        } else if self.eat(&TokenKind::Else) {
            let stmts = self.parse_statements()?;
            self.expect(TokenKind::End)?;
            self.expect(TokenKind::If)?;
            Ok(stmts)
        } else {
            self.expect(TokenKind::End)?;
            self.expect(TokenKind::If)?;
            Ok(Vec::new())
        }
    }
}
