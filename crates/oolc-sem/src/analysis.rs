//! Semantic analysis: lowering method bodies to the typed HIR.

use oolc_par::ast;
use oolc_util::{CompileError, CompileResult, FxHashMap, Pos};
use tracing::debug;

use crate::builtins::{self, BOOL, INT, INTEGER, VOID};
use crate::decls::{ClassId, Decls, Member, MethodId, VarId, VarSym};
use crate::hir::{self, Dispatch, ExprKind};
use crate::prepare;
use crate::scopes::{DeclId, Scopes};

/// The result of a successful analysis: the fully populated declaration
/// world plus, when requested, the identifier-resolution map.
#[derive(Debug)]
pub struct Analysis {
    pub decls: Decls,
    /// `Main.main`, the program entry point.
    pub main_method: MethodId,
    /// Recorded identifier resolutions (empty unless requested).
    pub resolutions: Vec<Resolution>,
}

/// One resolved identifier occurrence, for the `-i` dump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub pos: Pos,
    pub name: String,
    pub target: String,
}

/// Runs declaration, preparation and body analysis over a parsed program.
///
/// With `record_resolutions` set, every identifier use is logged into
/// [`Analysis::resolutions`].
pub fn analyze(program: &ast::Program, record_resolutions: bool) -> CompileResult<Analysis> {
    let mut decls = builtins::seed();

    let declared = prepare::declare(&mut decls, program)?;
    let asts: FxHashMap<_, _> = declared.iter().copied().collect();
    for &(id, _) in &declared {
        prepare::prepare_class(&mut decls, id, &asts)?;
    }

    let mut resolutions = record_resolutions.then(Vec::new);
    for &(class_id, class_ast) in &declared {
        for (index, method_ast) in class_ast.methods.iter().enumerate() {
            let method_id = decls.class(class_id).methods[index];
            let (locals, body) = BodyAnalyzer {
                decls: &mut decls,
                scopes: Scopes::new(),
                class: class_id,
                method: method_id,
                resolutions: &mut resolutions,
            }
            .analyze(method_ast)?;

            let method = decls.method_mut(method_id);
            method.locals = locals;
            method.body = body;
        }
        debug!(class = %decls.class(class_id).name, "analyzed class");
    }

    let main_method = find_main(&decls)?;

    Ok(Analysis {
        decls,
        main_method,
        resolutions: resolutions.unwrap_or_default(),
    })
}

/// The program must declare a class `Main` with a parameterless method
/// `main` and no return type.
fn find_main(decls: &Decls) -> CompileResult<MethodId> {
    let main_class = decls
        .lookup_class("Main")
        .filter(|&id| !decls.class(id).pos.is_dummy())
        .ok_or_else(|| {
            CompileError::context(Pos::new(1, 1), "program has no class 'Main'".to_string())
        })?;

    let class = decls.class(main_class);
    class
        .methods
        .iter()
        .copied()
        .find(|&m| decls.method(m).name == "main")
        .filter(|&m| {
            let method = decls.method(m);
            method.params.is_empty() && method.ret.is_none()
        })
        .ok_or_else(|| {
            CompileError::context(
                class.pos,
                "class 'Main' needs a method 'main' without parameters and without a return type"
                    .to_string(),
            )
        })
}

/// Analyzes one method body.
struct BodyAnalyzer<'a> {
    decls: &'a mut Decls,
    scopes: Scopes,
    class: ClassId,
    method: MethodId,
    resolutions: &'a mut Option<Vec<Resolution>>,
}

impl BodyAnalyzer<'_> {
    /// Builds the scope stack, declares the locals, and lowers the body.
    fn analyze(mut self, method_ast: &ast::MethodDecl) -> CompileResult<(Vec<VarId>, Vec<hir::Stmt>)> {
        // Global scope: every class by name.
        self.scopes.enter();
        for (name, &id) in &self.decls.classes_by_name.clone() {
            self.scopes.add(name, DeclId::Class(id), Pos::DUMMY)?;
        }

        // One scope per class of the inheritance chain, root first, so
        // derived members shadow base members.
        for chain_class in self.decls.chain(self.class) {
            self.scopes.enter();
            let class = self.decls.class(chain_class);
            let members: Vec<(String, DeclId, Pos)> = class
                .attributes
                .iter()
                .map(|&v| {
                    let var = self.decls.var(v);
                    (var.name.clone(), DeclId::Var(v), var.pos)
                })
                .chain(class.methods.iter().map(|&m| {
                    let method = self.decls.method(m);
                    (method.name.clone(), DeclId::Method(m), method.pos)
                }))
                .collect();
            for (name, decl, pos) in members {
                self.scopes.add(&name, decl, pos)?;
            }
        }

        // Method scope: synthetic variables, then parameters, then locals.
        self.scopes.enter();
        let method = self.decls.method(self.method);
        let (self_var, base_var, result_var) = (method.self_var, method.base_var, method.result_var);
        self.scopes.add("_self", DeclId::Var(self_var), Pos::DUMMY)?;
        if let Some(base_var) = base_var {
            self.scopes.add("_base", DeclId::Var(base_var), Pos::DUMMY)?;
        }
        self.scopes.add("_result", DeclId::Var(result_var), Pos::DUMMY)?;

        for &param in &self.decls.method(self.method).params.clone() {
            let (name, pos) = {
                let var = self.decls.var(param);
                (var.name.clone(), var.pos)
            };
            self.scopes.add(&name, DeclId::Var(param), pos)?;
        }

        let mut locals = Vec::with_capacity(method_ast.locals.len());
        for (index, local) in method_ast.locals.iter().enumerate() {
            let ty = self.resolve_type(&local.ty)?;
            let var = self.decls.add_var(VarSym {
                name: local.name.name.clone(),
                pos: local.name.pos,
                ty,
                is_attribute: false,
                access: ast::AccessRight::Public,
                owner: None,
                offset: index as i32 + 1,
            });
            self.scopes.add(&local.name.name, DeclId::Var(var), local.name.pos)?;
            locals.push(var);
        }

        let body = self.analyze_block(&method_ast.body)?;

        let method = self.decls.method(self.method);
        if method.ret.is_some() && !covers(&body) {
            return Err(CompileError::context(
                method_ast.name.pos,
                format!(
                    "method '{}' does not return a value on every path",
                    method.name
                ),
            ));
        }

        Ok((locals, body))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn analyze_block(&mut self, stmts: &[ast::Stmt]) -> CompileResult<Vec<hir::Stmt>> {
        stmts.iter().map(|s| self.analyze_stmt(s)).collect()
    }

    fn analyze_stmt(&mut self, stmt: &ast::Stmt) -> CompileResult<hir::Stmt> {
        match stmt {
            ast::Stmt::Assign { target, value, pos } => {
                let target_hir = self.analyze_expr(target)?;
                if !target_hir.lvalue {
                    return Err(CompileError::context(
                        target.pos(),
                        "target of assignment is not an l-value".to_string(),
                    ));
                }
                let value_hir = self.analyze_expr(value)?;
                let value_hir = self.coerce(value_hir, target_hir.ty, value.pos())?;
                Ok(hir::Stmt::Assign {
                    target: target_hir,
                    value: value_hir,
                    pos: *pos,
                })
            }
            ast::Stmt::Call { expr } => {
                let pos = expr.pos();
                let hir_expr = self.analyze_expr(expr)?;
                let hir_expr = self.rvalue(hir_expr);
                Ok(hir::Stmt::Call {
                    expr: hir_expr,
                    pos,
                })
            }
            ast::Stmt::Read { target, pos } => {
                let target_hir = self.analyze_expr(target)?;
                if !target_hir.lvalue {
                    return Err(CompileError::context(
                        target.pos(),
                        "READ target is not an l-value".to_string(),
                    ));
                }
                if target_hir.ty != INTEGER {
                    return Err(CompileError::context(
                        target.pos(),
                        format!(
                            "READ target must have type 'Integer', found '{}'",
                            self.type_name(target_hir.ty)
                        ),
                    ));
                }
                Ok(hir::Stmt::Read {
                    target: target_hir,
                    pos: *pos,
                })
            }
            ast::Stmt::Write { value, pos } => {
                let value_hir = self.analyze_expr(value)?;
                let value_hir = self.to_primitive(value_hir, INT, value.pos())?;
                Ok(hir::Stmt::Write {
                    value: value_hir,
                    pos: *pos,
                })
            }
            ast::Stmt::If {
                cond,
                then_branch,
                else_branch,
                pos,
            } => {
                let cond_hir = self.analyze_expr(cond)?;
                let cond_hir = self.to_primitive(cond_hir, BOOL, cond.pos())?;
                Ok(hir::Stmt::If {
                    cond: cond_hir,
                    then_branch: self.analyze_block(then_branch)?,
                    else_branch: self.analyze_block(else_branch)?,
                    pos: *pos,
                })
            }
            ast::Stmt::While { cond, body, pos } => {
                let cond_hir = self.analyze_expr(cond)?;
                let cond_hir = self.to_primitive(cond_hir, BOOL, cond.pos())?;
                Ok(hir::Stmt::While {
                    cond: cond_hir,
                    body: self.analyze_block(body)?,
                    pos: *pos,
                })
            }
            ast::Stmt::Return { value, pos } => {
                let method = self.decls.method(self.method);
                let method_name = method.name.clone();
                match (method.ret, value) {
                    (None, Some(_)) => Err(CompileError::context(
                        *pos,
                        format!("method '{}' has no return type", method_name),
                    )),
                    (Some(_), None) => Err(CompileError::context(
                        *pos,
                        format!("method '{}' must return a value", method_name),
                    )),
                    (None, None) => Ok(hir::Stmt::Return {
                        value: None,
                        pos: *pos,
                    }),
                    (Some(ret), Some(value)) => {
                        let value_hir = self.analyze_expr(value)?;
                        let value_hir = self.coerce(value_hir, ret, value.pos())?;
                        Ok(hir::Stmt::Return {
                            value: Some(value_hir),
                            pos: *pos,
                        })
                    }
                }
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn analyze_expr(&mut self, expr: &ast::Expr) -> CompileResult<hir::Expr> {
        match expr {
            ast::Expr::IntLit { value, .. } => Ok(hir::Expr {
                kind: ExprKind::Int(*value),
                ty: INT,
                lvalue: false,
            }),
            ast::Expr::BoolLit { value, .. } => Ok(hir::Expr {
                kind: ExprKind::Bool(*value),
                ty: BOOL,
                lvalue: false,
            }),
            ast::Expr::NullLit { .. } => Ok(hir::Expr {
                kind: ExprKind::Null,
                ty: builtins::NULL_TYPE,
                lvalue: false,
            }),
            ast::Expr::SelfRef { .. } => Ok(self.self_value()),
            ast::Expr::BaseRef { .. } => Ok(self.base_value()),
            ast::Expr::New { class, .. } => {
                let ty = self.resolve_type(class)?;
                if !self.decls.is_reference(ty) {
                    return Err(CompileError::context(
                        class.pos,
                        format!("'{}' is not a class type", class.name),
                    ));
                }
                self.record(class.pos, &class.name, format!("class '{}'", class.name));
                Ok(hir::Expr {
                    kind: ExprKind::New { class: ty },
                    ty,
                    lvalue: false,
                })
            }
            ast::Expr::VarOrCall { name, args } => self.analyze_bare(name, args.as_deref()),
            ast::Expr::Access {
                object,
                member,
                pos,
            } => self.analyze_access(object, member, *pos),
            ast::Expr::Unary { op, operand, pos } => {
                let want = match op {
                    hir::UnOp::Neg => INT,
                    hir::UnOp::Not => BOOL,
                };
                let operand_hir = self.analyze_expr(operand)?;
                let operand_hir = self.to_primitive(operand_hir, want, *pos)?;
                Ok(hir::Expr {
                    kind: ExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand_hir),
                    },
                    ty: want,
                    lvalue: false,
                })
            }
            ast::Expr::Binary {
                op,
                lhs,
                rhs,
                pos: _,
            } => {
                use hir::BinOp::*;
                let (operand_ty, result_ty) = match op {
                    Add | Sub | Mul | Div | Mod => (INT, INT),
                    Eq | Neq | Lt | LtEq | Gt | GtEq => (INT, BOOL),
                    And | Or | AndThen | OrElse => (BOOL, BOOL),
                };
                let lhs_hir = self.analyze_expr(lhs)?;
                let lhs_hir = self.to_primitive(lhs_hir, operand_ty, lhs.pos())?;
                let rhs_hir = self.analyze_expr(rhs)?;
                let rhs_hir = self.to_primitive(rhs_hir, operand_ty, rhs.pos())?;
                Ok(hir::Expr {
                    kind: ExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs_hir),
                        rhs: Box::new(rhs_hir),
                    },
                    ty: result_ty,
                    lvalue: false,
                })
            }
        }
    }

    /// A bare identifier, possibly with arguments: a frame variable, an
    /// attribute of `SELF`, or a direct call on `SELF`.
    fn analyze_bare(
        &mut self,
        name: &ast::Ident,
        args: Option<&[ast::Expr]>,
    ) -> CompileResult<hir::Expr> {
        let decl = self.scopes.resolve(&name.name).ok_or_else(|| {
            CompileError::context(name.pos, format!("undeclared identifier '{}'", name.name))
        })?;

        match decl {
            DeclId::Var(var_id) => {
                if args.is_some() {
                    return Err(CompileError::context(
                        name.pos,
                        format!("'{}' is not a method", name.name),
                    ));
                }
                let var = self.decls.var(var_id);
                let (is_attribute, access, owner, ty, offset) =
                    (var.is_attribute, var.access, var.owner, var.ty, var.offset);
                if is_attribute {
                    let owner = owner.expect("attributes have an owner");
                    self.check_access(access, owner, &name.name, name.pos)?;
                    self.record(
                        name.pos,
                        &name.name,
                        format!(
                            "attribute '{}.{}' (offset {})",
                            self.decls.class(owner).name,
                            name.name,
                            offset
                        ),
                    );
                    Ok(hir::Expr {
                        kind: ExprKind::Attr {
                            object: Box::new(self.self_value()),
                            var: var_id,
                        },
                        ty,
                        lvalue: true,
                    })
                } else {
                    self.record(
                        name.pos,
                        &name.name,
                        format!("variable '{}' (offset {})", name.name, offset),
                    );
                    Ok(hir::Expr {
                        kind: ExprKind::Var(var_id),
                        ty,
                        lvalue: true,
                    })
                }
            }
            DeclId::Method(method_id) => {
                let method = self.decls.method(method_id);
                let (access, owner) = (method.access, method.owner);
                self.check_access(access, owner, &name.name, name.pos)?;
                self.record(
                    name.pos,
                    &name.name,
                    format!(
                        "method '{}.{}' (vmt slot {})",
                        self.decls.class(owner).name,
                        name.name,
                        self.decls.method(method_id).vmt_index
                    ),
                );
                let args = self.analyze_args(method_id, args.unwrap_or_default(), name.pos)?;
                let receiver = self.self_value();
                let ty = self.decls.method(method_id).ret.unwrap_or(VOID);
                Ok(hir::Expr {
                    kind: ExprKind::Call {
                        receiver: Box::new(receiver),
                        method: method_id,
                        args,
                        dispatch: Dispatch::Direct,
                    },
                    ty,
                    lvalue: false,
                })
            }
            DeclId::Class(_) => Err(CompileError::context(
                name.pos,
                format!("'{}' is not a variable or method", name.name),
            )),
        }
    }

    /// The access operator `object.member`.
    fn analyze_access(
        &mut self,
        object: &ast::Expr,
        member: &ast::Expr,
        pos: Pos,
    ) -> CompileResult<hir::Expr> {
        // `BASE.m` binds the receiver statically to the base class.
        let base_receiver = matches!(object, ast::Expr::BaseRef { .. });
        let receiver = self.analyze_expr(object)?;
        let receiver = self.rvalue(receiver);

        // An unboxed receiver is boxed so that the member is looked up on
        // its boxing class.
        let receiver = match self.decls.boxed(receiver.ty) {
            Some(boxed) => hir::Expr {
                kind: ExprKind::Box_ {
                    operand: Box::new(receiver),
                },
                ty: boxed,
                lvalue: false,
            },
            None => receiver,
        };

        if !self.decls.is_reference(receiver.ty) {
            return Err(CompileError::context(
                object.pos(),
                format!(
                    "expression of type '{}' has no members",
                    self.type_name(receiver.ty)
                ),
            ));
        }

        let ast::Expr::VarOrCall { name, args } = member else {
            return Err(CompileError::internal(
                pos,
                "access member is not a variable or call".to_string(),
            ));
        };

        let found = self
            .decls
            .find_member(receiver.ty, &name.name)
            .ok_or_else(|| {
                CompileError::context(
                    name.pos,
                    format!(
                        "class '{}' has no member '{}'",
                        self.type_name(receiver.ty),
                        name.name
                    ),
                )
            })?;

        match found {
            Member::Attribute(var_id) => {
                if args.is_some() {
                    return Err(CompileError::context(
                        name.pos,
                        format!("'{}' is not a method", name.name),
                    ));
                }
                let var = self.decls.var(var_id);
                let owner = var.owner.expect("attributes have an owner");
                let ty = var.ty;
                let offset = var.offset;
                self.check_access(var.access, owner, &name.name, name.pos)?;
                self.record(
                    name.pos,
                    &name.name,
                    format!(
                        "attribute '{}.{}' (offset {})",
                        self.decls.class(owner).name,
                        name.name,
                        offset
                    ),
                );
                Ok(hir::Expr {
                    kind: ExprKind::Attr {
                        object: Box::new(receiver),
                        var: var_id,
                    },
                    ty,
                    lvalue: true,
                })
            }
            Member::Method(method_id) => {
                let method = self.decls.method(method_id);
                let (access, owner, vmt_index) = (method.access, method.owner, method.vmt_index);
                self.check_access(access, owner, &name.name, name.pos)?;
                self.record(
                    name.pos,
                    &name.name,
                    format!(
                        "method '{}.{}' (vmt slot {})",
                        self.decls.class(owner).name,
                        name.name,
                        vmt_index
                    ),
                );
                let args = self.analyze_args(method_id, args.as_deref().unwrap_or_default(), name.pos)?;
                let dispatch = if base_receiver {
                    Dispatch::Direct
                } else {
                    Dispatch::Virtual(vmt_index)
                };
                let ty = self.decls.method(method_id).ret.unwrap_or(VOID);
                Ok(hir::Expr {
                    kind: ExprKind::Call {
                        receiver: Box::new(receiver),
                        method: method_id,
                        args,
                        dispatch,
                    },
                    ty,
                    lvalue: false,
                })
            }
        }
    }

    /// Checks arity and coerces every actual argument to its formal type.
    fn analyze_args(
        &mut self,
        method: MethodId,
        args: &[ast::Expr],
        call_pos: Pos,
    ) -> CompileResult<Vec<hir::Expr>> {
        let params = self.decls.method(method).params.clone();
        if params.len() != args.len() {
            let name = self.decls.method(method).name.clone();
            return Err(CompileError::context(
                call_pos,
                format!(
                    "method '{}' expects {} argument(s), got {}",
                    name,
                    params.len(),
                    args.len()
                ),
            ));
        }

        params
            .iter()
            .zip(args)
            .map(|(&param, arg)| {
                let formal = self.decls.var(param).ty;
                let arg_hir = self.analyze_expr(arg)?;
                self.coerce(arg_hir, formal, arg.pos())
            })
            .collect()
    }

    // =========================================================================
    // Conversions and checks
    // =========================================================================

    /// Loads through an l-value, leaving r-values untouched.
    fn rvalue(&self, expr: hir::Expr) -> hir::Expr {
        if expr.lvalue {
            hir::Expr {
                ty: expr.ty,
                lvalue: false,
                kind: ExprKind::Deref {
                    operand: Box::new(expr),
                },
            }
        } else {
            expr
        }
    }

    /// Coerces to an unboxed primitive (`Int` or `Bool`): dereferences,
    /// then unboxes a boxed operand.
    fn to_primitive(
        &self,
        expr: hir::Expr,
        want: ClassId,
        pos: Pos,
    ) -> CompileResult<hir::Expr> {
        let expr = self.rvalue(expr);
        if expr.ty == want {
            return Ok(expr);
        }
        if self.decls.unboxed(expr.ty) == Some(want) {
            return Ok(hir::Expr {
                ty: want,
                lvalue: false,
                kind: ExprKind::Unbox {
                    operand: Box::new(expr),
                },
            });
        }
        Err(self.type_mismatch(pos, want, expr.ty))
    }

    /// Coerces a value to `target`: dereference, then box an unboxed
    /// source assigned into a reference target, unbox a boxed source
    /// assigned into a primitive target, and accept plain up-casts.
    fn coerce(&self, expr: hir::Expr, target: ClassId, pos: Pos) -> CompileResult<hir::Expr> {
        let expr = self.rvalue(expr);
        if expr.ty == target {
            return Ok(expr);
        }
        if self.decls.unboxed(expr.ty) == Some(target) {
            return Ok(hir::Expr {
                ty: target,
                lvalue: false,
                kind: ExprKind::Unbox {
                    operand: Box::new(expr),
                },
            });
        }
        if !self.decls.is_subtype(expr.ty, target) {
            return Err(self.type_mismatch(pos, target, expr.ty));
        }
        if let Some(boxed) = self.decls.boxed(expr.ty) {
            return Ok(hir::Expr {
                ty: boxed,
                lvalue: false,
                kind: ExprKind::Box_ {
                    operand: Box::new(expr),
                },
            });
        }
        Ok(expr)
    }

    fn check_access(
        &self,
        access: ast::AccessRight,
        owner: ClassId,
        name: &str,
        pos: Pos,
    ) -> CompileResult<()> {
        if self.decls.accessible(access, owner, self.class) {
            Ok(())
        } else {
            Err(CompileError::context(
                pos,
                format!(
                    "{} member '{}' of class '{}' is not accessible here",
                    access.keyword(),
                    name,
                    self.decls.class(owner).name
                ),
            ))
        }
    }

    /// Resolves a type name through the scope stack; non-class bindings
    /// are rejected.
    fn resolve_type(&mut self, name: &ast::Ident) -> CompileResult<ClassId> {
        match self.scopes.resolve(&name.name) {
            Some(DeclId::Class(id)) => {
                if id == VOID || id == builtins::NULL_TYPE {
                    return Err(CompileError::context(
                        name.pos,
                        format!("'{}' is not a legal declaration type", name.name),
                    ));
                }
                Ok(id)
            }
            Some(_) => Err(CompileError::context(
                name.pos,
                format!("'{}' is not a type", name.name),
            )),
            None => Err(CompileError::context(
                name.pos,
                format!("undeclared identifier '{}'", name.name),
            )),
        }
    }

    /// The value of `SELF`: the object pointer stored in the `_self`
    /// slot.
    fn self_value(&self) -> hir::Expr {
        let self_var = self.decls.method(self.method).self_var;
        let ty = self.decls.var(self_var).ty;
        self.rvalue(hir::Expr {
            kind: ExprKind::Var(self_var),
            ty,
            lvalue: true,
        })
    }

    /// The value of `BASE`: the same object as `SELF`, statically typed
    /// as the base class.
    fn base_value(&self) -> hir::Expr {
        let base_var = self
            .decls
            .method(self.method)
            .base_var
            .expect("source classes always have a base");
        let ty = self.decls.var(base_var).ty;
        self.rvalue(hir::Expr {
            kind: ExprKind::Var(base_var),
            ty,
            lvalue: true,
        })
    }

    fn type_name(&self, id: ClassId) -> &str {
        &self.decls.class(id).name
    }

    fn type_mismatch(&self, pos: Pos, expected: ClassId, found: ClassId) -> CompileError {
        CompileError::context(
            pos,
            format!(
                "type mismatch: expected '{}', found '{}'",
                self.type_name(expected),
                self.type_name(found)
            ),
        )
    }

    fn record(&mut self, pos: Pos, name: &str, target: String) {
        if let Some(resolutions) = self.resolutions.as_mut() {
            resolutions.push(Resolution {
                pos,
                name: name.to_string(),
                target,
            });
        }
    }
}

/// Return coverage: an `if` covers iff both branches cover; `while`
/// never covers; `return` covers; a block covers iff any statement does.
fn covers(stmts: &[hir::Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        hir::Stmt::Return { .. } => true,
        hir::Stmt::If {
            then_branch,
            else_branch,
            ..
        } => covers(then_branch) && covers(else_branch),
        _ => false,
    })
}
