//! Method, statement and expression lowering.
//!
//! The stack discipline: every expression pushes exactly one word — an
//! address for l-values, a value otherwise. Binary operators pop two
//! words and push one; calls leave exactly one word (the receiver slot,
//! overwritten with the result by the callee's epilogue).

use oolc_sem::hir::{BinOp, Dispatch, Expr, ExprKind, Stmt, UnOp};
use oolc_sem::{Analysis, ClassId, Decls, MethodId};
use tracing::debug;

use crate::asm::Reg::*;
use crate::asm::AsmWriter;

/// Heap and stack reservation sizes, in words.
#[derive(Clone, Copy, Debug)]
pub struct EmitParams {
    pub heap_words: u32,
    pub stack_words: u32,
}

impl Default for EmitParams {
    fn default() -> Self {
        Self {
            heap_words: 100,
            stack_words: 100,
        }
    }
}

/// Emits the complete assembly text for an analyzed program.
pub fn emit(analysis: &Analysis, params: EmitParams) -> String {
    let mut emitter = Emitter {
        decls: &analysis.decls,
        w: AsmWriter::new(),
    };

    emitter
        .w
        .comment(&format!("generated by oolc {}", env!("CARGO_PKG_VERSION")));
    emitter.prelude(analysis.main_method);
    emitter.vmts();

    emitter.w.blank();
    emitter.w.comment("method code");
    for class_id in emitter.decls.class_ids().collect::<Vec<_>>() {
        let class = emitter.decls.class(class_id);
        if class.pos.is_dummy() {
            continue; // builtins have no code
        }
        for &method in &class.methods.clone() {
            emitter.method(method);
        }
    }

    emitter.trailer(params.stack_words, params.heap_words);
    emitter.w.finish()
}

/// Walks the analyzed program and writes assembly.
pub(crate) struct Emitter<'a> {
    pub(crate) decls: &'a Decls,
    pub(crate) w: AsmWriter,
}

impl Emitter<'_> {
    pub(crate) fn vmt_label(&self, class: ClassId) -> String {
        format!("_{}_VMT", self.decls.class(class).name)
    }

    /// Pushes a register onto the runtime stack.
    pub(crate) fn push(&mut self, r: crate::asm::Reg) {
        self.w.add(R2, R1);
        self.w.mmr(R2, r);
    }

    /// Pops the topmost stack word into a register.
    pub(crate) fn pop(&mut self, r: crate::asm::Reg) {
        self.w.mrm(r, R2);
        self.w.sub(R2, R1);
    }

    /// Pushes the address of a frame slot (`R3 + offset`) in `R5`.
    fn push_frame_addr(&mut self, offset: i32) {
        self.w.mrr(R5, R3);
        self.w.mri(R6, offset.unsigned_abs());
        if offset >= 0 {
            self.w.add(R5, R6);
        } else {
            self.w.sub(R5, R6);
        }
        self.push(R5);
    }

    /// Calls a runtime routine with the link-register convention.
    fn call_runtime(&mut self, name: &str) {
        let ret = self.w.fresh_label();
        self.w.mri(R5, &ret);
        self.w.mri(R0, name);
        self.w.label(&ret);
    }

    /// One method: prologue, body, shared epilogue.
    fn method(&mut self, id: MethodId) {
        let method = self.decls.method(id);
        let label = method.label(self.decls);
        let end_label = format!("end_{}", label);
        let param_count = method.params.len() as i32;
        let local_count = method.locals.len() as u32;
        let start_line = method.pos.line;
        let end_line = method.end_pos.line;
        let body = method.body.clone();
        let result_offset = self.decls.var(method.result_var).offset;

        debug!(method = %label, "emitting method");

        self.w.blank();
        self.w.open_method(&label);
        self.w.line_marker(start_line);
        self.w.label(&label);

        // Prologue: save the caller's frame, establish the new one,
        // reserve the locals.
        self.push(R3);
        self.w.mrr(R3, R2);
        if local_count > 0 {
            self.w.mri(R5, local_count);
            self.w.add(R2, R5);
        }

        for stmt in &body {
            self.stmt(stmt, result_offset, &end_label);
        }

        // Shared epilogue: drop the frame and the parameters so the
        // receiver slot (now holding `_result`) is the top of stack,
        // then return.
        self.w.line_marker(end_line);
        self.w.label(&end_label);
        self.w.mrr(R5, R3);
        self.w.sub(R5, R1);
        self.w.mrm(R5, R5);
        self.w.mrm(R6, R3);
        self.w.mri(R7, param_count + 2);
        self.w.sub(R3, R7);
        self.w.mrr(R2, R3);
        self.w.mrr(R3, R6);
        self.w.mrr(R0, R5);
    }

    fn stmt(&mut self, stmt: &Stmt, result_offset: i32, end_label: &str) {
        self.w.line_marker(stmt.pos().line);
        match stmt {
            Stmt::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
                self.pop(R5);
                self.pop(R6);
                self.w.mmr(R6, R5);
            }
            Stmt::Call { expr, .. } => {
                self.expr(expr);
                self.w.sub(R2, R1); // discard the result word
            }
            Stmt::Read { target, .. } => {
                self.expr(target);
                self.call_runtime("_readChar");
                // Box the character into a fresh Integer.
                self.w.mri(R7, "_Integer_VMT");
                self.w.mmr(R4, R7);
                self.w.mrr(R7, R4);
                self.w.add(R7, R1);
                self.w.mmr(R7, R6);
                self.pop(R5);
                self.w.mmr(R5, R4);
                self.w.mri(R7, 2);
                self.w.add(R4, R7);
            }
            Stmt::Write { value, .. } => {
                self.expr(value);
                self.pop(R6);
                self.call_runtime("_writeChar");
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.expr(cond);
                self.pop(R5);
                self.w.isz(R5, R5);
                if else_branch.is_empty() {
                    let end_if = self.w.fresh_label();
                    self.w.jpc(R5, &end_if);
                    for s in then_branch {
                        self.stmt(s, result_offset, end_label);
                    }
                    self.w.label(&end_if);
                } else {
                    let else_part = self.w.fresh_label();
                    let end_if = self.w.fresh_label();
                    self.w.jpc(R5, &else_part);
                    for s in then_branch {
                        self.stmt(s, result_offset, end_label);
                    }
                    self.w.mri(R0, &end_if);
                    self.w.label(&else_part);
                    for s in else_branch {
                        self.stmt(s, result_offset, end_label);
                    }
                    self.w.label(&end_if);
                }
            }
            Stmt::While { cond, body, .. } => {
                let head = self.w.fresh_label();
                let done = self.w.fresh_label();
                self.w.label(&head);
                self.expr(cond);
                self.pop(R5);
                self.w.isz(R5, R5);
                self.w.jpc(R5, &done);
                for s in body {
                    self.stmt(s, result_offset, end_label);
                }
                self.w.mri(R0, &head);
                self.w.label(&done);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.expr(value);
                    self.pop(R5);
                    self.w.mrr(R6, R3);
                    self.w.mri(R7, result_offset.unsigned_abs());
                    self.w.sub(R6, R7);
                    self.w.mmr(R6, R5);
                }
                self.w.mri(R0, end_label);
            }
        }
    }

    /// Evaluates an expression onto the stack.
    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(value) => {
                self.w.mri(R5, *value);
                self.push(R5);
            }
            ExprKind::Bool(value) => {
                self.w.mri(R5, *value as i32);
                self.push(R5);
            }
            ExprKind::Null => {
                self.w.mri(R5, 0);
                self.push(R5);
            }
            ExprKind::Var(var) => {
                self.push_frame_addr(self.decls.var(*var).offset);
            }
            ExprKind::Attr { object, var } => {
                self.expr(object);
                self.pop(R5);
                self.w.mri(R6, self.decls.var(*var).offset);
                self.w.add(R5, R6);
                self.push(R5);
            }
            ExprKind::Deref { operand } => {
                self.expr(operand);
                self.pop(R5);
                self.w.mrm(R5, R5);
                self.push(R5);
            }
            ExprKind::Unbox { operand } => {
                self.expr(operand);
                self.pop(R5);
                self.w.add(R5, R1);
                self.w.mrm(R5, R5);
                self.push(R5);
            }
            ExprKind::Box_ { operand } => {
                self.expr(operand);
                let vmt = self.vmt_label(expr.ty);
                self.w.mri(R6, &vmt);
                self.w.mmr(R4, R6);
                self.pop(R5);
                self.w.mrr(R6, R4);
                self.w.add(R6, R1);
                self.w.mmr(R6, R5);
                self.push(R4);
                self.w.mri(R6, 2);
                self.w.add(R4, R6);
            }
            ExprKind::New { class } => {
                let vmt = self.vmt_label(*class);
                let size = self.decls.class(*class).size;
                self.w.mri(R5, &vmt);
                self.w.mmr(R4, R5);
                self.push(R4);
                self.w.mri(R5, size);
                self.w.add(R4, R5);
            }
            ExprKind::Unary { op, operand } => {
                self.expr(operand);
                match op {
                    UnOp::Neg => {
                        self.pop(R6);
                        self.w.mri(R5, 0);
                        self.w.sub(R5, R6);
                        self.push(R5);
                    }
                    UnOp::Not => {
                        self.pop(R5);
                        self.w.isz(R5, R5);
                        self.push(R5);
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::AndThen => self.short_circuit(lhs, rhs, false),
                BinOp::OrElse => self.short_circuit(lhs, rhs, true),
                _ => {
                    self.expr(lhs);
                    self.expr(rhs);
                    self.pop(R6);
                    self.pop(R5);
                    self.strict_binary(*op);
                    self.push(R5);
                }
            },
            ExprKind::Call {
                receiver,
                method,
                args,
                dispatch,
            } => {
                self.expr(receiver);
                for arg in args {
                    self.expr(arg);
                }
                match dispatch {
                    Dispatch::Direct => {
                        let target = self.decls.method(*method).label(self.decls);
                        let ret = self.w.fresh_label();
                        self.w.mri(R5, &ret);
                        self.push(R5);
                        self.w.mri(R0, &target);
                        self.w.label(&ret);
                    }
                    Dispatch::Virtual(slot) => {
                        // Fetch the entry through the receiver's VMT:
                        // object word 0 holds the table address.
                        self.w.mrr(R7, R2);
                        if !args.is_empty() {
                            self.w.mri(R6, args.len() as u32);
                            self.w.sub(R7, R6);
                        }
                        self.w.mrm(R7, R7);
                        self.w.mrm(R7, R7);
                        if *slot > 0 {
                            self.w.mri(R6, *slot as u32);
                            self.w.add(R7, R6);
                        }
                        self.w.mrm(R7, R7);
                        let ret = self.w.fresh_label();
                        self.w.mri(R5, &ret);
                        self.push(R5);
                        self.w.mrr(R0, R7);
                        self.w.label(&ret);
                    }
                }
            }
        }
    }

    /// Pops-free part of a strict binary operator: combines `R5` (left)
    /// and `R6` (right) into `R5`.
    fn strict_binary(&mut self, op: BinOp) {
        match op {
            BinOp::Add => self.w.add(R5, R6),
            BinOp::Sub => self.w.sub(R5, R6),
            BinOp::Mul => self.w.mul(R5, R6),
            BinOp::Div => self.w.div(R5, R6),
            BinOp::Mod => self.w.mod_(R5, R6),
            BinOp::And => self.w.and(R5, R6),
            BinOp::Or => self.w.or(R5, R6),
            BinOp::Eq => {
                self.w.sub(R5, R6);
                self.w.isz(R5, R5);
            }
            BinOp::Neq => {
                self.w.sub(R5, R6);
                self.w.isz(R5, R5);
                self.w.isz(R5, R5);
            }
            BinOp::Lt => {
                self.w.sub(R5, R6);
                self.w.isn(R5, R5);
            }
            BinOp::Gt => {
                self.w.sub(R5, R6);
                self.w.isp(R5, R5);
            }
            BinOp::LtEq => {
                self.w.sub(R5, R6);
                self.w.isp(R5, R5);
                self.w.isz(R5, R5);
            }
            BinOp::GtEq => {
                self.w.sub(R5, R6);
                self.w.isn(R5, R5);
                self.w.isz(R5, R5);
            }
            BinOp::AndThen | BinOp::OrElse => {
                unreachable!("short-circuit operators lower through labels")
            }
        }
    }

    /// `AND THEN` / `OR ELSE`: the right operand is evaluated only when
    /// the left one does not decide the result.
    fn short_circuit(&mut self, lhs: &Expr, rhs: &Expr, decide_on_true: bool) {
        let decided = self.w.fresh_label();
        let done = self.w.fresh_label();

        self.expr(lhs);
        self.pop(R5);
        if !decide_on_true {
            self.w.isz(R5, R5);
        }
        self.w.jpc(R5, &decided);
        self.expr(rhs);
        self.w.mri(R0, &done);
        self.w.label(&decided);
        self.w.mri(R5, decide_on_true as i32);
        self.push(R5);
        self.w.label(&done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oolc_lex::Lexer;
    use oolc_sem::analyze;

    fn compile(source: &str, optimize: bool) -> String {
        let program = oolc_par::parse(Lexer::tokenize(source).unwrap()).unwrap();
        let mut analysis = analyze(&program, false).unwrap();
        if optimize {
            oolc_opt::optimize(&mut analysis.decls);
        }
        emit(&analysis, EmitParams::default())
    }

    const WRITE_SUM: &str =
        "CLASS Main IS METHOD main IS BEGIN WRITE 1+2; END METHOD END CLASS";

    #[test]
    fn test_overall_layout() {
        let asm = compile(WRITE_SUM, false);
        // Prelude before VMTs before code before trailer.
        let prelude = asm.find("MRI R2, _stack").expect("stack init");
        let vmt = asm.find("_Main_VMT:").expect("vmt blob");
        let code = asm.find("Main_main:").expect("method label");
        let trailer = asm.find("_stack:").expect("trailer");
        assert!(prelude < vmt && vmt < code && code < trailer);
    }

    #[test]
    fn test_prelude_bootstraps_main() {
        let asm = compile(WRITE_SUM, false);
        assert!(asm.contains("MRI R1, 1"));
        assert!(asm.contains("MRI R4, _heap"));
        assert!(asm.contains("MRI R5, _Main_VMT"));
        assert!(asm.contains("MRI R0, Main_main"));
        assert!(asm.contains("_end:\n  SYS 0, 0"), "halt after main returns");
    }

    #[test]
    fn test_runtime_routines_present() {
        let asm = compile(WRITE_SUM, false);
        for label in ["_readChar:", "_writeChar:", "_readInt:", "_writeInt:"] {
            assert!(asm.contains(label), "missing {}", label);
        }
    }

    #[test]
    fn test_write_sum_without_optimizer() {
        let asm = compile(WRITE_SUM, false);
        assert!(asm.contains("MRI R5, 1"));
        assert!(asm.contains("MRI R5, 2"));
        assert!(asm.contains("ADD R5, R6"));
        assert!(asm.contains("MRI R0, _writeChar"));
    }

    #[test]
    fn test_write_sum_with_optimizer_folds() {
        let asm = compile(WRITE_SUM, true);
        let main = &asm[asm.find("Main_main:").unwrap()..];
        assert!(main.contains("MRI R5, 3"), "1+2 folds to 3");
        assert!(!main.contains("ADD R5, R6"), "no addition remains");
    }

    #[test]
    fn test_prologue_and_epilogue_shape() {
        let asm = compile(WRITE_SUM, false);
        let main = &asm[asm.find("Main_main:").unwrap()..];
        // Prologue: push caller frame, establish new frame.
        assert!(main.contains("  ADD R2, R1\n  MMR (R2), R3\n  MRR R3, R2"));
        // Shared epilogue label and the final indirect jump.
        assert!(main.contains("end_Main_main:"));
        assert!(main.contains("  MRR R0, R5"));
    }

    #[test]
    fn test_virtual_dispatch_loads_through_offset_zero() {
        let source = "CLASS Animal IS
               METHOD speak IS BEGIN WRITE 'A'; END METHOD
             END CLASS
             CLASS Dog EXTENDS Animal IS
               METHOD speak IS BEGIN WRITE 'D'; END METHOD
             END CLASS
             CLASS Main IS
               METHOD main IS a: Animal; BEGIN
                 a := NEW Dog;
                 a.speak;
               END METHOD
             END CLASS";
        let asm = compile(source, false);
        // The dispatch sequence: load the object, then its word 0 (the
        // VMT pointer), then the slot entry.
        assert!(
            asm.contains("  MRM R7, (R7)\n  MRM R7, (R7)"),
            "dispatch must load through object offset 0:\n{}",
            asm
        );
        // Both implementations exist, and the VMTs point at them.
        assert!(asm.contains("Animal_speak:"));
        assert!(asm.contains("Dog_speak:"));
        assert!(asm.contains("_Dog_VMT:\n  DAT 1, Dog_speak"));
        assert!(asm.contains("_Animal_VMT:\n  DAT 1, Animal_speak"));
    }

    #[test]
    fn test_base_call_is_direct() {
        let source = "CLASS A IS
               METHOD speak IS BEGIN END METHOD
             END CLASS
             CLASS B EXTENDS A IS
               METHOD speak IS BEGIN BASE.speak; END METHOD
             END CLASS
             CLASS Main IS METHOD main IS BEGIN END METHOD END CLASS";
        let asm = compile(source, false);
        let b_speak = &asm[asm.find("B_speak:").unwrap()..asm.find("end_B_speak:").unwrap()];
        assert!(
            b_speak.contains("MRI R0, A_speak"),
            "BASE call must jump directly:\n{}",
            b_speak
        );
    }

    #[test]
    fn test_new_initializes_vmt_pointer() {
        let source = "CLASS Point IS x, y: Integer; END CLASS
             CLASS Main IS METHOD main IS p: Point; BEGIN p := NEW Point; END METHOD END CLASS";
        let asm = compile(source, false);
        assert!(asm.contains("MRI R5, _Point_VMT\n  MMR (R4), R5"));
        // size(Point) = 1 + 2 attributes
        assert!(asm.contains("MRI R5, 3\n  ADD R4, R5"));
    }

    #[test]
    fn test_read_boxes_into_fresh_integer() {
        let source = "CLASS Main IS
               n: Integer;
               METHOD main IS BEGIN READ n; END METHOD
             END CLASS";
        let asm = compile(source, false);
        assert!(asm.contains("MRI R0, _readChar"));
        assert!(asm.contains("MRI R7, _Integer_VMT"));
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        let source = "CLASS Main IS
               METHOD main IS b: Bool; BEGIN
                 b := b AND THEN 1 / 0 = 0;
               END METHOD
             END CLASS";
        let asm = compile(source, false);
        let main = &asm[asm.find("Main_main:").unwrap()..];
        // A conditional jump around the division.
        let jpc = main.find("JPC R5, Main_main_").expect("short-circuit jump");
        let div = main.find("DIV R5, R6").expect("division code");
        assert!(jpc < div, "the jump must precede the right operand");
    }

    #[test]
    fn test_line_markers_follow_statements() {
        let source = "CLASS Main IS\nMETHOD main IS BEGIN\nWRITE 1;\nWRITE 2;\nEND METHOD\nEND CLASS";
        let asm = compile(source, false);
        assert!(asm.contains("#L 3"));
        assert!(asm.contains("#L 4"));
    }

    #[test]
    fn test_trailer_reserves_requested_words() {
        let program = oolc_par::parse(Lexer::tokenize(WRITE_SUM).unwrap()).unwrap();
        let analysis = analyze(&program, false).unwrap();
        let asm = emit(
            &analysis,
            EmitParams {
                heap_words: 500,
                stack_words: 64,
            },
        );
        assert!(asm.contains("_stack:\n  DAT 64, 0"));
        assert!(asm.contains("_heap:\n  DAT 500, 0"));
    }

    #[test]
    fn test_labels_are_unique() {
        let source = "CLASS A IS
               METHOD m(x: Int): Int IS BEGIN
                 IF x > 0 THEN RETURN 1; ELSE RETURN 0; END IF
               END METHOD
             END CLASS
             CLASS Main IS
               METHOD main IS a: A; BEGIN
                 a := NEW A;
                 IF a.m(1) = 1 THEN WRITE 'y'; END IF
                 WHILE a.m(0) = 1 DO WRITE 'n'; END WHILE
               END METHOD
             END CLASS";
        let asm = compile(source, false);
        let mut labels = Vec::new();
        for line in asm.lines() {
            if let Some(label) = line.strip_suffix(':') {
                if !line.starts_with(' ') {
                    labels.push(label.to_string());
                }
            }
        }
        let mut deduped = labels.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(labels.len(), deduped.len(), "duplicate labels in:\n{}", asm);
    }

    #[test]
    fn test_return_writes_into_receiver_slot() {
        let source = "CLASS C IS
               METHOD one: Integer IS BEGIN RETURN 1; END METHOD
             END CLASS
             CLASS Main IS METHOD main IS BEGIN END METHOD END CLASS";
        let asm = compile(source, false);
        let one = &asm[asm.find("C_one:").unwrap()..asm.find("end_C_one:").unwrap()];
        // result slot for a parameterless method sits at R3 - 2
        assert!(
            one.contains("MRI R7, 2\n  SUB R6, R7\n  MMR (R6), R5"),
            "{}",
            one
        );
        assert!(one.contains("MRI R0, end_C_one"));
    }
}
