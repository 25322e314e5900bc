//! Expression parsing.
//!
//! The grammar is already stratified into a fixed precedence ladder
//! (short-circuit or < short-circuit and < or < and < relation < additive
//! < multiplicative < unary < member access), so each level is one method
//! with a left-associative loop. Relations do not associate: `a < b < c`
//! is a syntax error at the second `<`.

use oolc_lex::TokenKind;
use oolc_util::CompileResult;

use crate::ast::{BinOp, Expr, UnOp};
use crate::Parser;

impl Parser {
    /// `pred = conjsc { OR ELSE conjsc }` — the full expression grammar.
    pub(crate) fn parse_predicate(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_short_circuit_and()?;
        while self.check(&TokenKind::OrElse) {
            let pos = self.advance().pos;
            let rhs = self.parse_short_circuit_and()?;
            lhs = Expr::Binary {
                op: BinOp::OrElse,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    /// `conjsc = predbool { AND THEN predbool }`
    fn parse_short_circuit_and(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_strict_or()?;
        while self.check(&TokenKind::AndThen) {
            let pos = self.advance().pos;
            let rhs = self.parse_strict_or()?;
            lhs = Expr::Binary {
                op: BinOp::AndThen,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    /// `predbool = conj { OR conj }`
    fn parse_strict_or(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_strict_and()?;
        while self.check(&TokenKind::Or) {
            let pos = self.advance().pos;
            let rhs = self.parse_strict_and()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    /// `conj = relation { AND relation }`
    fn parse_strict_and(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_relation()?;
        while self.check(&TokenKind::And) {
            let pos = self.advance().pos;
            let rhs = self.parse_relation()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    /// `relation = expression [ relop expression ]`
    fn parse_relation(&mut self) -> CompileResult<Expr> {
        let lhs = self.parse_expression()?;
        let op = match self.peek() {
            TokenKind::Eq => BinOp::Eq,
            TokenKind::Neq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::LtEq => BinOp::LtEq,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::GtEq => BinOp::GtEq,
            _ => return Ok(lhs),
        };
        let pos = self.advance().pos;
        let rhs = self.parse_expression()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            pos,
        })
    }

    /// `expression = term { (+|-) term }`
    pub(crate) fn parse_expression(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            let pos = self.advance().pos;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
    }

    /// `term = factor { (*|/|MOD) factor }`
    fn parse_term(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Mod => BinOp::Mod,
                _ => return Ok(lhs),
            };
            let pos = self.advance().pos;
            let rhs = self.parse_factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
    }

    /// `factor = '-' factor | NOT factor | memberaccess`
    fn parse_factor(&mut self) -> CompileResult<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Not => UnOp::Not,
            _ => return self.parse_member_access(),
        };
        let pos = self.advance().pos;
        let operand = self.parse_factor()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            pos,
        })
    }

    /// `memberaccess = literal { '.' varorcall }`
    pub(crate) fn parse_member_access(&mut self) -> CompileResult<Expr> {
        let mut object = self.parse_literal()?;
        while self.check(&TokenKind::Period) {
            let pos = self.advance().pos;
            let member = self.parse_var_or_call()?;
            object = Expr::Access {
                object: Box::new(object),
                member: Box::new(member),
                pos,
            };
        }
        Ok(object)
    }

    /// `literal = number | NULL | SELF | BASE | NEW ident | '(' pred ')'
    ///          | TRUE | FALSE | varorcall`
    fn parse_literal(&mut self) -> CompileResult<Expr> {
        match self.peek() {
            TokenKind::Number(value) => {
                let value = *value;
                let pos = self.advance().pos;
                Ok(Expr::IntLit { value, pos })
            }
            TokenKind::True => Ok(Expr::BoolLit {
                value: true,
                pos: self.advance().pos,
            }),
            TokenKind::False => Ok(Expr::BoolLit {
                value: false,
                pos: self.advance().pos,
            }),
            TokenKind::Null => Ok(Expr::NullLit {
                pos: self.advance().pos,
            }),
            TokenKind::SelfKw => Ok(Expr::SelfRef {
                pos: self.advance().pos,
            }),
            TokenKind::Base => Ok(Expr::BaseRef {
                pos: self.advance().pos,
            }),
            TokenKind::New => {
                let pos = self.advance().pos;
                let class = self.expect_ident("class name after NEW")?;
                Ok(Expr::New { class, pos })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_predicate()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(_) => self.parse_var_or_call(),
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    /// `varorcall = ident [ '(' pred { ',' pred } ')' ]`
    fn parse_var_or_call(&mut self) -> CompileResult<Expr> {
        let name = self.expect_ident("member name")?;
        let args = if self.eat(&TokenKind::LParen) {
            let mut args = vec![self.parse_predicate()?];
            while self.eat(&TokenKind::Comma) {
                args.push(self.parse_predicate()?);
            }
            self.expect(TokenKind::RParen)?;
            Some(args)
        } else {
            None
        };
        Ok(Expr::VarOrCall { name, args })
    }
}
