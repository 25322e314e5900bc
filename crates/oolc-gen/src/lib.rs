//! oolc-gen - Stack-machine assembly emission.
//!
//! The emitter turns an analyzed program into the line-oriented assembly
//! text executed by the VM. The output has four sections:
//!
//! 1. the runtime prelude: register initialization, allocation of the
//!    `Main` object, the call into `Main_main`, the halt instruction, and
//!    the I/O routines `_readChar` / `_readInt` / `_writeChar` /
//!    `_writeInt`;
//! 2. one `_<Class>_VMT` blob per class, listing method entry labels in
//!    VMT order;
//! 3. per-method code with the fixed activation-record convention;
//! 4. the `_stack` / `_heap` reservations.
//!
//! # Instruction set
//!
//! The VM is a word machine with eight registers. `R0` is the program
//! counter, `R1` permanently holds 1, `R2` the address of the topmost
//! occupied stack word, `R3` the frame pointer, `R4` the next free heap
//! word, `R5`-`R7` are scratch. Mnemonics:
//!
//! | Mnemonic      | Effect                                            |
//! |---------------|---------------------------------------------------|
//! | `MRI r, v`    | `r := v` (immediate number or label address)      |
//! | `MRR a, b`    | `a := b`                                          |
//! | `MRM a, (b)`  | `a := mem[b]`                                     |
//! | `MMR (a), b`  | `mem[a] := b`                                     |
//! | `ADD/SUB/MUL a, b` | `a := a op b` (wrapping)                     |
//! | `DIV/MOD a, b`| `a := a op b`; the VM traps when `b` is zero      |
//! | `AND/OR/XOR a, b`  | bitwise                                      |
//! | `ISZ a, b`    | `a := (b = 0) ? 1 : 0`                            |
//! | `ISP a, b`    | `a := (b > 0) ? 1 : 0`                            |
//! | `ISN a, b`    | `a := (b < 0) ? 1 : 0`                            |
//! | `JPC r, l`    | jump to `l` when `r` is non-zero                  |
//! | `SYS a, b`    | system call: `0,0` halt; `0,1` read a character   |
//! |               | into `R6` (-1 at end of input); `0,2` write the   |
//! |               | character in `R6`                                 |
//! | `DAT n, v`    | reserve `n` words, each initialized to `v`        |
//!
//! `;` starts a comment, `#L n` marks the source line of the following
//! code, and `name:` on a line of its own defines a label. The VM traps
//! on memory access through a null (zero) reference and on division by
//! zero; the compiler emits no guards for either.
//!
//! # Activation records
//!
//! A call pushes the receiver, the arguments left to right, and the
//! return address; the prologue pushes the caller's frame pointer and
//! points `R3` at that word. Relative to `R3`: locals live at `+1..+N`,
//! the saved frame pointer at `0`, the return address at `-1`, the
//! parameters at `-2..-(n+1)` (last parameter highest), and the receiver
//! at `-(n+2)`. The shared epilogue drops everything above the receiver
//! slot, which the method's `RETURN` has overwritten with the result, so
//! callers always find exactly one word left behind.

mod asm;
mod emit;
mod runtime;

pub use asm::{AsmWriter, Reg};
pub use emit::{emit, EmitParams};
