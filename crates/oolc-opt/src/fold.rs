//! The folding pass.

use oolc_sem::hir::{BinOp, Expr, ExprKind, Stmt, UnOp};
use oolc_sem::{Decls, BOOL, INT};
use tracing::debug;

/// Folds every method body in place.
pub fn optimize(decls: &mut Decls) {
    let class_ids: Vec<_> = decls.class_ids().collect();
    for class_id in class_ids {
        let methods = decls.class(class_id).methods.clone();
        for method in methods {
            let body = std::mem::take(&mut decls.method_mut(method).body);
            decls.method_mut(method).body = fold_block(body);
        }
        debug!(class = %decls.class(class_id).name, "folded class");
    }
}

fn fold_block(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        fold_stmt(stmt, &mut out);
    }
    out
}

fn fold_stmt(stmt: Stmt, out: &mut Vec<Stmt>) {
    match stmt {
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            pos,
        } => {
            let cond = fold_expr(cond);
            match cond.as_bool() {
                // A literal condition selects its branch; the other one
                // is dead.
                Some(true) => out.extend(fold_block(then_branch)),
                Some(false) => out.extend(fold_block(else_branch)),
                None => out.push(Stmt::If {
                    cond,
                    then_branch: fold_block(then_branch),
                    else_branch: fold_block(else_branch),
                    pos,
                }),
            }
        }
        Stmt::While { cond, body, pos } => {
            let cond = fold_expr(cond);
            match cond.as_bool() {
                Some(false) => {} // never entered
                _ => out.push(Stmt::While {
                    cond,
                    body: fold_block(body),
                    pos,
                }),
            }
        }
        Stmt::Assign { target, value, pos } => out.push(Stmt::Assign {
            target: fold_expr(target),
            value: fold_expr(value),
            pos,
        }),
        Stmt::Call { expr, pos } => out.push(Stmt::Call {
            expr: fold_expr(expr),
            pos,
        }),
        Stmt::Read { target, pos } => out.push(Stmt::Read {
            target: fold_expr(target),
            pos,
        }),
        Stmt::Write { value, pos } => out.push(Stmt::Write {
            value: fold_expr(value),
            pos,
        }),
        Stmt::Return { value, pos } => out.push(Stmt::Return {
            value: value.map(fold_expr),
            pos,
        }),
    }
}

fn fold_expr(expr: Expr) -> Expr {
    let Expr { kind, ty, lvalue } = expr;
    let kind = match kind {
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs = fold_expr(*lhs);

            // The short-circuit forms are decided by the left operand
            // alone; the right operand would never run.
            if op == BinOp::AndThen {
                match lhs.as_bool() {
                    Some(false) => return bool_lit(false),
                    Some(true) => return fold_expr(*rhs),
                    None => {}
                }
            }
            if op == BinOp::OrElse {
                match lhs.as_bool() {
                    Some(true) => return bool_lit(true),
                    Some(false) => return fold_expr(*rhs),
                    None => {}
                }
            }

            let rhs = fold_expr(*rhs);
            if let Some(folded) = fold_binary(op, &lhs, &rhs) {
                return folded;
            }
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }
        ExprKind::Unary { op, operand } => {
            let operand = fold_expr(*operand);
            match (op, operand.as_int(), operand.as_bool()) {
                (UnOp::Neg, Some(value), _) => {
                    if let Some(negated) = value.checked_neg() {
                        return int_lit(negated);
                    }
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    }
                }
                (UnOp::Not, _, Some(value)) => return bool_lit(!value),
                _ => ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            }
        }
        ExprKind::Deref { operand } => ExprKind::Deref {
            operand: Box::new(fold_expr(*operand)),
        },
        ExprKind::Box_ { operand } => ExprKind::Box_ {
            operand: Box::new(fold_expr(*operand)),
        },
        ExprKind::Unbox { operand } => ExprKind::Unbox {
            operand: Box::new(fold_expr(*operand)),
        },
        ExprKind::Attr { object, var } => ExprKind::Attr {
            object: Box::new(fold_expr(*object)),
            var,
        },
        ExprKind::Call {
            receiver,
            method,
            args,
            dispatch,
        } => ExprKind::Call {
            receiver: Box::new(fold_expr(*receiver)),
            method,
            args: args.into_iter().map(fold_expr).collect(),
            dispatch,
        },
        leaf @ (ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Var(_)
        | ExprKind::New { .. }) => leaf,
    };
    Expr { kind, ty, lvalue }
}

/// Folds a strict binary operator over two literals. Division and modulo
/// by zero, and overflowing results, return `None` and stay in the tree.
fn fold_binary(op: BinOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        let folded = match op {
            BinOp::Add => int_lit(a.checked_add(b)?),
            BinOp::Sub => int_lit(a.checked_sub(b)?),
            BinOp::Mul => int_lit(a.checked_mul(b)?),
            BinOp::Div => int_lit(a.checked_div(b)?),
            BinOp::Mod => int_lit(a.checked_rem(b)?),
            BinOp::Eq => bool_lit(a == b),
            BinOp::Neq => bool_lit(a != b),
            BinOp::Lt => bool_lit(a < b),
            BinOp::LtEq => bool_lit(a <= b),
            BinOp::Gt => bool_lit(a > b),
            BinOp::GtEq => bool_lit(a >= b),
            _ => return None,
        };
        return Some(folded);
    }

    if let (Some(a), Some(b)) = (lhs.as_bool(), rhs.as_bool()) {
        let folded = match op {
            BinOp::And => bool_lit(a && b),
            BinOp::Or => bool_lit(a || b),
            _ => return None,
        };
        return Some(folded);
    }

    None
}

fn int_lit(value: i32) -> Expr {
    Expr {
        kind: ExprKind::Int(value),
        ty: INT,
        lvalue: false,
    }
}

fn bool_lit(value: bool) -> Expr {
    Expr {
        kind: ExprKind::Bool(value),
        ty: BOOL,
        lvalue: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oolc_lex::Lexer;
    use oolc_sem::{analyze, Analysis};

    fn optimized(body_src: &str) -> (Analysis, Vec<Stmt>) {
        let source = format!(
            "CLASS Main IS
               n: Integer;
               METHOD helper: Integer IS BEGIN RETURN 1; END METHOD
               METHOD main IS x: Int; b: Bool; BEGIN {} END METHOD
             END CLASS",
            body_src
        );
        let program = oolc_par::parse(Lexer::tokenize(&source).unwrap()).unwrap();
        let mut analysis = analyze(&program, false).unwrap();
        optimize(&mut analysis.decls);

        let decls = &analysis.decls;
        let main_class = decls.lookup_class("Main").unwrap();
        let main = decls
            .class(main_class)
            .methods
            .iter()
            .copied()
            .find(|&m| decls.method(m).name == "main")
            .unwrap();
        let body = decls.method(main).body.clone();
        (analysis, body)
    }

    fn assign_value(body: &[Stmt]) -> Expr {
        let Stmt::Assign { value, .. } = &body[0] else {
            panic!("expected assignment, got {:?}", body);
        };
        value.clone()
    }

    #[test]
    fn test_arithmetic_folds() {
        let (_, body) = optimized("x := 1 + 2 * 3;");
        assert_eq!(assign_value(&body).as_int(), Some(7));

        let (_, body) = optimized("x := (10 - 4) / 2;");
        assert_eq!(assign_value(&body).as_int(), Some(3));

        let (_, body) = optimized("x := 7 MOD 3;");
        assert_eq!(assign_value(&body).as_int(), Some(1));
    }

    #[test]
    fn test_division_by_zero_is_left_for_the_runtime() {
        let (_, body) = optimized("x := 1 / 0;");
        assert!(matches!(
            assign_value(&body).kind,
            ExprKind::Binary { op: BinOp::Div, .. }
        ));

        let (_, body) = optimized("x := 1 MOD 0;");
        assert!(matches!(
            assign_value(&body).kind,
            ExprKind::Binary { op: BinOp::Mod, .. }
        ));
    }

    #[test]
    fn test_overflow_is_left_unfolded() {
        let (_, body) = optimized("x := 2147483647 + 1;");
        assert!(matches!(
            assign_value(&body).kind,
            ExprKind::Binary { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_comparisons_fold() {
        let (_, body) = optimized("b := 1 < 2;");
        assert_eq!(assign_value(&body).as_bool(), Some(true));

        let (_, body) = optimized("b := 3 = 4;");
        assert_eq!(assign_value(&body).as_bool(), Some(false));

        let (_, body) = optimized("b := 5 >= 5;");
        assert_eq!(assign_value(&body).as_bool(), Some(true));
    }

    #[test]
    fn test_unary_folds() {
        let (_, body) = optimized("x := -(3 + 4);");
        assert_eq!(assign_value(&body).as_int(), Some(-7));

        let (_, body) = optimized("b := NOT TRUE;");
        assert_eq!(assign_value(&body).as_bool(), Some(false));
    }

    #[test]
    fn test_strict_boolean_folds_only_when_fully_literal() {
        let (_, body) = optimized("b := TRUE AND FALSE;");
        assert_eq!(assign_value(&body).as_bool(), Some(false));

        // One non-literal operand: the strict form stays.
        let (_, body) = optimized("b := b AND TRUE;");
        assert!(matches!(
            assign_value(&body).kind,
            ExprKind::Binary { op: BinOp::And, .. }
        ));
    }

    #[test]
    fn test_short_circuit_folds_lazily() {
        // The right operand would trap at runtime; it is discarded
        // because it would never have been evaluated.
        let (_, body) = optimized("b := FALSE AND THEN (1 / 0 = 0);");
        assert_eq!(assign_value(&body).as_bool(), Some(false));

        let (_, body) = optimized("b := TRUE OR ELSE (1 / 0 = 0);");
        assert_eq!(assign_value(&body).as_bool(), Some(true));

        // A true left operand selects the (folded) right operand.
        let (_, body) = optimized("b := TRUE AND THEN 1 < 2;");
        assert_eq!(assign_value(&body).as_bool(), Some(true));

        // A non-literal left operand keeps the short-circuit form.
        let (_, body) = optimized("b := b OR ELSE TRUE;");
        assert!(matches!(
            assign_value(&body).kind,
            ExprKind::Binary {
                op: BinOp::OrElse,
                ..
            }
        ));
    }

    #[test]
    fn test_if_with_literal_condition_collapses() {
        let (_, body) = optimized("IF 1 < 2 THEN x := 1; ELSE x := 2; END IF");
        assert_eq!(body.len(), 1);
        assert_eq!(assign_value(&body).as_int(), Some(1));

        let (_, body) = optimized("IF FALSE THEN x := 1; ELSE x := 2; END IF");
        assert_eq!(assign_value(&body).as_int(), Some(2));

        let (_, body) = optimized("IF FALSE THEN x := 1; END IF");
        assert!(body.is_empty());
    }

    #[test]
    fn test_while_false_is_removed_while_true_stays() {
        let (_, body) = optimized("WHILE 1 > 2 DO WRITE 1; END WHILE");
        assert!(body.is_empty());

        let (_, body) = optimized("WHILE TRUE DO WRITE 1; END WHILE");
        assert!(matches!(&body[0], Stmt::While { .. }));
    }

    #[test]
    fn test_calls_are_never_folded() {
        let (_, body) = optimized("x := helper + 0;");
        // The sum survives because one operand is a call.
        let value = assign_value(&body);
        let ExprKind::Binary { op: BinOp::Add, lhs, .. } = &value.kind else {
            panic!("expected surviving addition, got {:?}", value.kind);
        };
        assert!(matches!(lhs.kind, ExprKind::Unbox { .. }));
    }

    #[test]
    fn test_types_are_preserved() {
        let (_, body) = optimized("b := 1 < 2 AND 3 < 4;");
        let value = assign_value(&body);
        assert_eq!(value.ty, BOOL);
        assert_eq!(value.as_bool(), Some(true));

        let (_, body) = optimized("n := 1 + 2;");
        let Stmt::Assign { value, .. } = &body[0] else {
            panic!("expected assignment");
        };
        // The folded literal is still boxed for the Integer target.
        let ExprKind::Box_ { operand } = &value.kind else {
            panic!("expected box, got {:?}", value.kind);
        };
        assert_eq!(operand.as_int(), Some(3));
    }

    #[test]
    fn test_nested_if_collapse() {
        let (_, body) = optimized(
            "IF TRUE THEN IF FALSE THEN x := 1; ELSE x := 2; END IF ELSE x := 3; END IF",
        );
        assert_eq!(body.len(), 1);
        assert_eq!(assign_value(&body).as_int(), Some(2));
    }
}
