//! The assembly text writer.

use std::fmt::{self, Display, Write as _};

/// A VM register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    /// Program counter.
    R0,
    /// Constant 1.
    R1,
    /// Stack top (address of the topmost occupied word).
    R2,
    /// Frame pointer.
    R3,
    /// Heap pointer (next free word).
    R4,
    R5,
    R6,
    R7,
}

impl Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::R0 => "R0",
            Reg::R1 => "R1",
            Reg::R2 => "R2",
            Reg::R3 => "R3",
            Reg::R4 => "R4",
            Reg::R5 => "R5",
            Reg::R6 => "R6",
            Reg::R7 => "R7",
        };
        f.write_str(name)
    }
}

/// Builds the output text line by line.
///
/// The writer also owns the per-method label namespace: [`open_method`]
/// resets a counter, and [`fresh_label`] derives unique local labels from
/// the method's name. Identifiers of the source language cannot contain
/// underscores, so generated names never collide with method labels.
///
/// [`open_method`]: AsmWriter::open_method
/// [`fresh_label`]: AsmWriter::fresh_label
#[derive(Debug, Default)]
pub struct AsmWriter {
    out: String,
    namespace: String,
    next_label: u32,
    last_line: u32,
}

impl AsmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer, returning the finished text.
    pub fn finish(self) -> String {
        self.out
    }

    /// Starts the label namespace of a method.
    pub fn open_method(&mut self, label: &str) {
        self.namespace = label.to_string();
        self.next_label = 0;
        self.last_line = 0;
    }

    /// Returns a label unique within the current method.
    pub fn fresh_label(&mut self) -> String {
        self.next_label += 1;
        format!("{}_{}", self.namespace, self.next_label)
    }

    /// Emits `name:` on its own line.
    pub fn label(&mut self, name: &str) {
        let _ = writeln!(self.out, "{}:", name);
    }

    /// Emits a `; comment` line.
    pub fn comment(&mut self, text: &str) {
        let _ = writeln!(self.out, "; {}", text);
    }

    /// Emits a blank separator line.
    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emits a `#L` marker when the source line changed since the last
    /// marker.
    pub fn line_marker(&mut self, line: u32) {
        if line != 0 && line != self.last_line {
            self.last_line = line;
            let _ = writeln!(self.out, "#L {}", line);
        }
    }

    // Instructions. `v` operands accept numbers and labels alike.

    pub fn mri(&mut self, r: Reg, v: impl Display) {
        let _ = writeln!(self.out, "  MRI {}, {}", r, v);
    }

    pub fn mrr(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  MRR {}, {}", a, b);
    }

    pub fn mrm(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  MRM {}, ({})", a, b);
    }

    pub fn mmr(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  MMR ({}), {}", a, b);
    }

    pub fn add(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  ADD {}, {}", a, b);
    }

    pub fn sub(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  SUB {}, {}", a, b);
    }

    pub fn mul(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  MUL {}, {}", a, b);
    }

    pub fn div(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  DIV {}, {}", a, b);
    }

    pub fn mod_(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  MOD {}, {}", a, b);
    }

    pub fn and(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  AND {}, {}", a, b);
    }

    pub fn or(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  OR {}, {}", a, b);
    }

    pub fn isz(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  ISZ {}, {}", a, b);
    }

    pub fn isp(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  ISP {}, {}", a, b);
    }

    pub fn isn(&mut self, a: Reg, b: Reg) {
        let _ = writeln!(self.out, "  ISN {}, {}", a, b);
    }

    pub fn jpc(&mut self, r: Reg, label: &str) {
        let _ = writeln!(self.out, "  JPC {}, {}", r, label);
    }

    pub fn sys(&mut self, a: i32, b: i32) {
        let _ = writeln!(self.out, "  SYS {}, {}", a, b);
    }

    pub fn dat(&mut self, count: u32, value: impl Display) {
        let _ = writeln!(self.out, "  DAT {}, {}", count, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_formats() {
        let mut w = AsmWriter::new();
        w.label("start");
        w.mri(Reg::R1, 1);
        w.mri(Reg::R0, "start");
        w.mrm(Reg::R5, Reg::R2);
        w.mmr(Reg::R2, Reg::R5);
        w.jpc(Reg::R5, "start");
        w.dat(100, 0);
        assert_eq!(
            w.finish(),
            "start:\n  MRI R1, 1\n  MRI R0, start\n  MRM R5, (R2)\n  MMR (R2), R5\n  JPC R5, start\n  DAT 100, 0\n"
        );
    }

    #[test]
    fn test_fresh_labels_are_namespaced() {
        let mut w = AsmWriter::new();
        w.open_method("Main_main");
        assert_eq!(w.fresh_label(), "Main_main_1");
        assert_eq!(w.fresh_label(), "Main_main_2");
        w.open_method("Counter_inc");
        assert_eq!(w.fresh_label(), "Counter_inc_1");
    }

    #[test]
    fn test_line_marker_deduplicates() {
        let mut w = AsmWriter::new();
        w.open_method("M_m");
        w.line_marker(3);
        w.line_marker(3);
        w.line_marker(4);
        w.line_marker(0); // synthesized nodes carry no line
        assert_eq!(w.finish(), "#L 3\n#L 4\n");
    }
}
