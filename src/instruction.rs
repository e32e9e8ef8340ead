//! The instruction set: one tagged variant per mnemonic, each carrying its
//! fully validated operands.
//!
//! Grounded on the teacher's `instruction::Instruction` (a "giant enum" of
//! tuple variants, one per mnemonic) rather than the original C++'s
//! polymorphic `Instruction*` hierarchy with a virtual `exec` -- see
//! spec.md §9 ("Polymorphic instruction set -> tagged variant").

use crate::register::Register;

/// A fully parsed, immutable instruction. Immediates are signed 64-bit, per
/// spec.md §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // --- register/immediate moves and ALU ops ---
    /// `li rd, imm`
    Li(Register, i64),
    /// `mv rd, rs`
    Mv(Register, Register),
    /// `add rd, rs1, rs2`
    Add(Register, Register, Register),
    /// `sub rd, rs1, rs2`
    Sub(Register, Register, Register),
    /// `and rd, rs1, rs2`
    And(Register, Register, Register),
    /// `or rd, rs1, rs2`
    Or(Register, Register, Register),
    /// `xor rd, rs1, rs2`
    Xor(Register, Register, Register),
    /// `addi rd, rs, imm`
    Addi(Register, Register, i64),
    /// `sll rd, rs1, rs2`
    Sll(Register, Register, Register),
    /// `srl rd, rs1, rs2`
    Srl(Register, Register, Register),
    /// `slli rd, rs, imm`
    Slli(Register, Register, i64),
    /// `srli rd, rs, imm`
    Srli(Register, Register, i64),

    // --- memory ---
    /// `sb rs, imm(rd)` -- store low byte of `rs` at `rd + imm`
    Sb(Register, i64, Register),
    /// `sh rs, imm(rd)` -- store low 4 bytes of `rs` at `rd + imm`
    Sh(Register, i64, Register),
    /// `sw rs, imm(rd)` -- store all 8 bytes of `rs` at `rd + imm`
    Sw(Register, i64, Register),
    /// `lb rd, imm(rs)` -- load 1 byte, zero-extended
    Lb(Register, i64, Register),
    /// `lh rd, imm(rs)` -- load 4 bytes, zero-extended
    Lh(Register, i64, Register),
    /// `lw rd, imm(rs)` -- load 8 bytes
    Lw(Register, i64, Register),
    /// `la rd, label`
    La(Register, String),

    // --- control flow ---
    /// `j label`
    J(String),
    /// `jal rd, label`
    Jal(Register, String),
    /// `call label` -- `jal ra, label`
    Call(String),
    /// `ret` -- `pc <- ra`
    Ret,
    /// `beq rs1, rs2, label`
    Beq(Register, Register, String),
    /// `bne rs1, rs2, label`
    Bne(Register, Register, String),
    /// `blt rs1, rs2, label`
    Blt(Register, Register, String),
    /// `bge rs1, rs2, label`
    Bge(Register, Register, String),
    /// `bgt rs1, rs2, label`
    Bgt(Register, Register, String),
    /// `beqz rs, label`
    Beqz(Register, String),

    // --- environment ---
    Ecall,
    /// No-op during execution; surfaces as a debugger stop (spec.md §4.6).
    Ebreak,

    /// Not a real mnemonic -- a raw 64-bit literal serialized into the data
    /// segment at session start (spec.md §4.5). Executing one is a bug in
    /// the interpreter's fetch/execute loop, not a user error.
    Data(i64),
}

impl Instruction {
    /// Mnemonic this instruction was parsed from, used in diagnostics and by
    /// the debugger's step-over logic (spec.md §4.6: "if the current
    /// instruction is `call` or `jal`").
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            Li(..) => "li",
            Mv(..) => "mv",
            Add(..) => "add",
            Sub(..) => "sub",
            And(..) => "and",
            Or(..) => "or",
            Xor(..) => "xor",
            Addi(..) => "addi",
            Sll(..) => "sll",
            Srl(..) => "srl",
            Slli(..) => "slli",
            Srli(..) => "srli",
            Sb(..) => "sb",
            Sh(..) => "sh",
            Sw(..) => "sw",
            Lb(..) => "lb",
            Lh(..) => "lh",
            Lw(..) => "lw",
            La(..) => "la",
            J(..) => "j",
            Jal(..) => "jal",
            Call(..) => "call",
            Ret => "ret",
            Beq(..) => "beq",
            Bne(..) => "bne",
            Blt(..) => "blt",
            Bge(..) => "bge",
            Bgt(..) => "bgt",
            Beqz(..) => "beqz",
            Ecall => "ecall",
            Ebreak => "ebreak",
            Data(..) => "<data>",
        }
    }

    /// Whether this is a call-like instruction for step-over purposes
    /// (spec.md §4.6: step-over arms a breakpoint right after `call`/`jal`).
    pub fn is_call_like(&self) -> bool {
        matches!(self, Instruction::Call(_) | Instruction::Jal(..))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Instruction::Data(_))
    }
}
