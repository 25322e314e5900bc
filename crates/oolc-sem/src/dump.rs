//! Human-readable dumps of the analysis results, backing the driver's
//! `-c` (typed program) and `-i` (identifier-resolution map) flags.

use std::fmt::Write as _;

use crate::analysis::Analysis;
use crate::decls::{ClassId, Decls, MethodId};
use crate::hir::{Dispatch, Expr, ExprKind, Stmt};

/// Renders every source class with its layout, VMT and typed bodies.
pub fn typed_program(analysis: &Analysis) -> String {
    let decls = &analysis.decls;
    let mut out = String::new();

    for class_id in decls.class_ids() {
        let class = decls.class(class_id);
        if class.pos.is_dummy() {
            continue; // builtins
        }

        let base = class
            .base
            .map(|b| decls.class(b).name.as_str())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "CLASS {} EXTENDS {} (size {})",
            class.name, base, class.size
        );

        for &var in &class.attributes {
            let var = decls.var(var);
            let _ = writeln!(
                out,
                "  ATTRIBUTE {} {}: {} (offset {})",
                var.access.keyword(),
                var.name,
                decls.class(var.ty).name,
                var.offset
            );
        }
        for (slot, &method) in class.vmt.iter().enumerate() {
            let _ = writeln!(
                out,
                "  VMT {} -> {}",
                slot,
                decls.method(method).label(decls)
            );
        }
        for &method in &class.methods {
            dump_method(&mut out, decls, method);
        }
    }

    out
}

fn dump_method(out: &mut String, decls: &Decls, id: MethodId) {
    let method = decls.method(id);
    let ret = method
        .ret
        .map(|r| decls.class(r).name.as_str())
        .unwrap_or("Void");
    let _ = writeln!(
        out,
        "  METHOD {} {}: {} (vmt slot {})",
        method.access.keyword(),
        method.name,
        ret,
        method.vmt_index
    );
    for &param in &method.params {
        let param = decls.var(param);
        let _ = writeln!(
            out,
            "    PARAM {}: {} (offset {})",
            param.name,
            decls.class(param.ty).name,
            param.offset
        );
    }
    for &local in &method.locals {
        let local = decls.var(local);
        let _ = writeln!(
            out,
            "    LOCAL {}: {} (offset {})",
            local.name,
            decls.class(local.ty).name,
            local.offset
        );
    }
    for stmt in &method.body {
        dump_stmt(out, decls, stmt, 2);
    }
}

fn dump_stmt(out: &mut String, decls: &Decls, stmt: &Stmt, depth: usize) {
    let pad = "  ".repeat(depth);
    match stmt {
        Stmt::Assign { target, value, .. } => {
            let _ = writeln!(out, "{}ASSIGN", pad);
            dump_expr(out, decls, target, depth + 1);
            dump_expr(out, decls, value, depth + 1);
        }
        Stmt::Call { expr, .. } => {
            let _ = writeln!(out, "{}CALL", pad);
            dump_expr(out, decls, expr, depth + 1);
        }
        Stmt::Read { target, .. } => {
            let _ = writeln!(out, "{}READ", pad);
            dump_expr(out, decls, target, depth + 1);
        }
        Stmt::Write { value, .. } => {
            let _ = writeln!(out, "{}WRITE", pad);
            dump_expr(out, decls, value, depth + 1);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            let _ = writeln!(out, "{}IF", pad);
            dump_expr(out, decls, cond, depth + 1);
            let _ = writeln!(out, "{}THEN", pad);
            for s in then_branch {
                dump_stmt(out, decls, s, depth + 1);
            }
            if !else_branch.is_empty() {
                let _ = writeln!(out, "{}ELSE", pad);
                for s in else_branch {
                    dump_stmt(out, decls, s, depth + 1);
                }
            }
        }
        Stmt::While { cond, body, .. } => {
            let _ = writeln!(out, "{}WHILE", pad);
            dump_expr(out, decls, cond, depth + 1);
            let _ = writeln!(out, "{}DO", pad);
            for s in body {
                dump_stmt(out, decls, s, depth + 1);
            }
        }
        Stmt::Return { value, .. } => {
            let _ = writeln!(out, "{}RETURN", pad);
            if let Some(value) = value {
                dump_expr(out, decls, value, depth + 1);
            }
        }
    }
}

fn dump_expr(out: &mut String, decls: &Decls, expr: &Expr, depth: usize) {
    let pad = "  ".repeat(depth);
    let ty = type_name(decls, expr.ty);
    match &expr.kind {
        ExprKind::Int(value) => {
            let _ = writeln!(out, "{}INT {}: {}", pad, value, ty);
        }
        ExprKind::Bool(value) => {
            let _ = writeln!(out, "{}BOOL {}: {}", pad, value, ty);
        }
        ExprKind::Null => {
            let _ = writeln!(out, "{}NULL: {}", pad, ty);
        }
        ExprKind::Var(var) => {
            let var = decls.var(*var);
            let _ = writeln!(out, "{}VAR {} (offset {}): {}", pad, var.name, var.offset, ty);
        }
        ExprKind::Attr { object, var } => {
            let var = decls.var(*var);
            let _ = writeln!(
                out,
                "{}ATTR {} (offset {}): {}",
                pad, var.name, var.offset, ty
            );
            dump_expr(out, decls, object, depth + 1);
        }
        ExprKind::New { class } => {
            let _ = writeln!(out, "{}NEW {}: {}", pad, decls.class(*class).name, ty);
        }
        ExprKind::Call {
            receiver,
            method,
            args,
            dispatch,
        } => {
            let how = match dispatch {
                Dispatch::Direct => "direct".to_string(),
                Dispatch::Virtual(slot) => format!("vmt slot {}", slot),
            };
            let _ = writeln!(
                out,
                "{}CALL {} ({}): {}",
                pad,
                decls.method(*method).label(decls),
                how,
                ty
            );
            dump_expr(out, decls, receiver, depth + 1);
            for arg in args {
                dump_expr(out, decls, arg, depth + 1);
            }
        }
        ExprKind::Unary { op, operand } => {
            let _ = writeln!(out, "{}UNARY {:?}: {}", pad, op, ty);
            dump_expr(out, decls, operand, depth + 1);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let _ = writeln!(out, "{}BINARY {}: {}", pad, op.spelling(), ty);
            dump_expr(out, decls, lhs, depth + 1);
            dump_expr(out, decls, rhs, depth + 1);
        }
        ExprKind::Box_ { operand } => {
            let _ = writeln!(out, "{}BOX: {}", pad, ty);
            dump_expr(out, decls, operand, depth + 1);
        }
        ExprKind::Unbox { operand } => {
            let _ = writeln!(out, "{}UNBOX: {}", pad, ty);
            dump_expr(out, decls, operand, depth + 1);
        }
        ExprKind::Deref { operand } => {
            let _ = writeln!(out, "{}DEREF: {}", pad, ty);
            dump_expr(out, decls, operand, depth + 1);
        }
    }
}

fn type_name(decls: &Decls, id: ClassId) -> &str {
    &decls.class(id).name
}

/// Renders the identifier-resolution map, one line per resolved use,
/// ordered by source position.
pub fn resolution_map(analysis: &Analysis) -> String {
    let mut resolutions = analysis.resolutions.clone();
    resolutions.sort_by_key(|r| r.pos);

    let mut out = String::new();
    for r in &resolutions {
        let _ = writeln!(out, "{}: {} -> {}", r.pos, r.name, r.target);
    }
    out
}
