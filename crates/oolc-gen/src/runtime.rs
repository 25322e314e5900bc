//! Runtime prelude, VMT blobs and the data trailer.

use oolc_sem::MethodId;

use crate::asm::Reg::*;
use crate::emit::Emitter;

impl Emitter<'_> {
    /// Register initialization, `Main` bootstrap and the I/O routines.
    ///
    /// `R2`/`R3` start one word below `_stack` so the first push lands on
    /// `_stack[0]`; `R4` starts at `_heap[0]`. The bootstrap performs an
    /// ordinary call of `Main_main` on a freshly allocated `Main` object
    /// with `_end` as the return address, so returning from `main` runs
    /// straight into the halt instruction.
    pub(crate) fn prelude(&mut self, main: MethodId) {
        let main_class = self.decls.method(main).owner;
        let main_label = self.decls.method(main).label(self.decls);
        let size = self.decls.class(main_class).size;
        let vmt_label = self.vmt_label(main_class);

        self.w.comment("oolc runtime prelude");
        self.w.mri(R1, 1);
        self.w.mri(R2, "_stack");
        self.w.sub(R2, R1);
        self.w.mrr(R3, R2);
        self.w.mri(R4, "_heap");

        self.w.comment("allocate the Main object and call Main_main");
        self.w.mri(R5, &vmt_label);
        self.w.mmr(R4, R5);
        self.push(R4);
        self.w.mri(R5, size);
        self.w.add(R4, R5);
        self.w.mri(R5, "_end");
        self.push(R5);
        self.w.mri(R0, &main_label);
        self.w.label("_end");
        self.w.sys(0, 0);

        self.io_routines();
    }

    /// The four I/O routines. Convention: the value travels in `R6`, the
    /// return address in `R5`; routines that need `R5` as scratch save it
    /// on the stack first.
    fn io_routines(&mut self) {
        self.w.blank();
        self.w.comment("runtime: read one character into R6");
        self.w.label("_readChar");
        self.w.sys(0, 1);
        self.w.mrr(R0, R5);

        self.w.comment("runtime: write the character in R6");
        self.w.label("_writeChar");
        self.w.sys(0, 2);
        self.w.mrr(R0, R5);

        self.w.comment("runtime: read a decimal integer into R6");
        self.w.label("_readInt");
        self.push(R5);
        self.w.sys(0, 1);
        // Leading minus sign?
        self.w.mrr(R7, R6);
        self.w.mri(R5, '-' as i32);
        self.w.sub(R7, R5);
        self.w.isz(R7, R7);
        self.push(R7);
        self.w.mri(R5, 0);
        self.w.isz(R7, R7);
        self.w.jpc(R7, "_readInt_digit");
        self.w.sys(0, 1);
        self.w.label("_readInt_digit");
        self.w.mri(R7, '0' as i32);
        self.w.sub(R6, R7);
        self.w.isn(R7, R6);
        self.w.jpc(R7, "_readInt_done");
        self.w.mri(R7, 9);
        self.w.sub(R7, R6);
        self.w.isn(R7, R7);
        self.w.jpc(R7, "_readInt_done");
        self.w.mri(R7, 10);
        self.w.mul(R5, R7);
        self.w.add(R5, R6);
        self.w.sys(0, 1);
        self.w.mri(R0, "_readInt_digit");
        self.w.label("_readInt_done");
        self.pop(R7); // sign flag
        self.w.mrr(R6, R5);
        self.w.isz(R7, R7);
        self.w.jpc(R7, "_readInt_ret");
        self.w.mri(R7, 0);
        self.w.sub(R7, R6);
        self.w.mrr(R6, R7);
        self.w.label("_readInt_ret");
        self.pop(R5);
        self.w.mrr(R0, R5);

        self.w.comment("runtime: write R6 as a decimal integer");
        self.w.label("_writeInt");
        self.push(R5);
        self.w.isn(R7, R6);
        self.w.isz(R7, R7);
        self.w.jpc(R7, "_writeInt_nonneg");
        self.w.mrr(R7, R6);
        self.w.mri(R6, '-' as i32);
        self.w.sys(0, 2);
        self.w.mri(R6, 0);
        self.w.sub(R6, R7);
        self.w.label("_writeInt_nonneg");
        // Digits are pushed onto the stack above a -1 sentinel, then
        // flushed in order.
        self.w.mri(R5, 0);
        self.w.sub(R5, R1);
        self.push(R5);
        self.w.label("_writeInt_next");
        self.w.mrr(R5, R6);
        self.w.mri(R7, 10);
        self.w.mod_(R5, R7);
        self.w.mri(R7, '0' as i32);
        self.w.add(R5, R7);
        self.push(R5);
        self.w.mri(R7, 10);
        self.w.div(R6, R7);
        self.w.isz(R7, R6);
        self.w.isz(R7, R7);
        self.w.jpc(R7, "_writeInt_next");
        self.w.label("_writeInt_flush");
        self.pop(R6);
        self.w.isn(R7, R6);
        self.w.jpc(R7, "_writeInt_done");
        self.w.sys(0, 2);
        self.w.mri(R0, "_writeInt_flush");
        self.w.label("_writeInt_done");
        self.pop(R5);
        self.w.mrr(R0, R5);
    }

    /// One labeled blob per class, entries in VMT order.
    pub(crate) fn vmts(&mut self) {
        self.w.blank();
        self.w.comment("virtual method tables");
        for class_id in self.decls.class_ids().collect::<Vec<_>>() {
            if !self.decls.is_reference(class_id) {
                continue;
            }
            let label = self.vmt_label(class_id);
            self.w.label(&label);
            for &method in &self.decls.class(class_id).vmt {
                let entry = self.decls.method(method).label(self.decls);
                self.w.dat(1, entry);
            }
        }
    }

    /// The uninitialized stack and heap reservations.
    pub(crate) fn trailer(&mut self, stack_words: u32, heap_words: u32) {
        self.w.blank();
        self.w.comment("reserved storage");
        self.w.label("_stack");
        self.w.dat(stack_words, 0);
        self.w.label("_heap");
        self.w.dat(heap_words, 0);
    }
}
