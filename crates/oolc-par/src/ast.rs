//! AST node definitions.
//!
//! The tree is purely syntactic: identifier references are bare names with
//! positions, resolved later by semantic analysis. All nodes compare by
//! value so tests can assert on whole subtrees.

use oolc_util::Pos;

/// A parsed source file: an ordered list of class declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

/// Member visibility. Declarations without a modifier are `Public`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessRight {
    #[default]
    Public,
    Protected,
    Private,
}

impl AccessRight {
    /// Spelling used in diagnostics.
    pub fn keyword(self) -> &'static str {
        match self {
            AccessRight::Public => "PUBLIC",
            AccessRight::Protected => "PROTECTED",
            AccessRight::Private => "PRIVATE",
        }
    }
}

/// A name occurrence with its source position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// `CLASS name [EXTENDS base] IS ... END CLASS`
///
/// A missing `EXTENDS` clause means the class extends `Object`; that
/// default is applied during semantic analysis, not here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: Ident,
    pub base: Option<Ident>,
    pub attributes: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
}

/// A variable declaration: attribute, parameter or method local.
///
/// The surface form `a, b: T` is expanded into one `VarDecl` per name by
/// the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: Ident,
    pub access: AccessRight,
}

/// `METHOD name [(params)] [: ret] IS locals BEGIN body END METHOD`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: Ident,
    pub params: Vec<VarDecl>,
    pub ret: Option<Ident>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub access: AccessRight,
    /// Position of the closing `END METHOD`, used by return-coverage
    /// diagnostics.
    pub end_pos: Pos,
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetic negation `-`.
    Neg,
    /// Boolean negation `NOT`.
    Not,
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Strict boolean `AND`.
    And,
    /// Strict boolean `OR`.
    Or,
    /// Short-circuit `AND THEN`.
    AndThen,
    /// Short-circuit `OR ELSE`.
    OrElse,
}

impl BinOp {
    /// Spelling used in diagnostics.
    pub fn spelling(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "MOD",
            BinOp::Eq => "=",
            BinOp::Neq => "#",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::AndThen => "AND THEN",
            BinOp::OrElse => "OR ELSE",
        }
    }
}

/// An expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// Integer or character literal.
    IntLit { value: i32, pos: Pos },
    /// `TRUE` or `FALSE`.
    BoolLit { value: bool, pos: Pos },
    /// `NULL`.
    NullLit { pos: Pos },
    /// `SELF`.
    SelfRef { pos: Pos },
    /// `BASE`.
    BaseRef { pos: Pos },
    /// `NEW T`.
    New { class: Ident, pos: Pos },
    /// A bare name, optionally with an argument list. Whether it is a
    /// variable or a (possibly parameterless) method call is decided by
    /// resolution.
    VarOrCall { name: Ident, args: Option<Vec<Expr>> },
    /// The object access operator `object.member`; `member` is always a
    /// `VarOrCall`.
    Access {
        object: Box<Expr>,
        member: Box<Expr>,
        pos: Pos,
    },
    /// `-x` or `NOT x`.
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        pos: Pos,
    },
    /// A binary operation; `pos` is the operator's position.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Pos,
    },
}

impl Expr {
    /// The position the expression is reported at.
    pub fn pos(&self) -> Pos {
        match self {
            Expr::IntLit { pos, .. }
            | Expr::BoolLit { pos, .. }
            | Expr::NullLit { pos }
            | Expr::SelfRef { pos }
            | Expr::BaseRef { pos }
            | Expr::New { pos, .. }
            | Expr::Access { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Binary { pos, .. } => *pos,
            Expr::VarOrCall { name, .. } => name.pos,
        }
    }
}

/// A statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `target := value ;`
    Assign {
        target: Expr,
        value: Expr,
        pos: Pos,
    },
    /// An expression in statement position, usually a call.
    Call { expr: Expr },
    /// `READ target ;`
    Read { target: Expr, pos: Pos },
    /// `WRITE value ;`
    Write { value: Expr, pos: Pos },
    /// `IF ... THEN ... [ELSE ...] END IF` (ELSEIF chains are desugared
    /// into the else branch by the parser).
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
        pos: Pos,
    },
    /// `WHILE ... DO ... END WHILE`
    While {
        cond: Expr,
        body: Vec<Stmt>,
        pos: Pos,
    },
    /// `RETURN [value] ;`
    Return { value: Option<Expr>, pos: Pos },
}
