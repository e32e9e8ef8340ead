//! Register file, memory, label table and the fetch/execute step for a
//! single instruction (spec.md §3, §4.4, §4.5).
//!
//! Grounded on the original `State`/`Interpreter::interpret` (one `exec` per
//! instruction, uniform post-increment of `pc`) but reshaped per spec.md §9:
//! a single `execute` dispatch function over the tagged [`Instruction`] enum
//! instead of a virtual method per polymorphic instruction class, and a
//! plain owned register array/byte buffer instead of a heap-allocated
//! `State*`.

use fnv::FnvHashMap;

use crate::ecall;
use crate::error::RuntimeError;
use crate::instruction::Instruction;
use crate::memory::Memory;
use crate::register::Register;

/// Bytes occupied by one instruction in the address space `pc` arithmetic
/// operates over. Also the width of one data-segment literal (spec.md §4.5),
/// so that `la` on a data label yields the literal's actual byte offset.
pub const INSTRUCTION_SIZE: i64 = 8;

/// Outcome of fetching and executing one instruction.
#[derive(Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Instruction executed, program counter advanced; more to do.
    Continued,
    /// `pc` has run off the end of the instruction stream (or an `ecall`
    /// requested exit): nothing left to execute.
    Finished,
}

/// Owns the whole machine: registers, memory, labels and the instruction
/// stream. Lives exactly one interpreter session (spec.md §3).
pub struct Interpreter {
    registers: [i64; Register::COUNT],
    memory: Memory,
    labels: FnvHashMap<String, usize>,
    code: Vec<Instruction>,
    ecalls: ecall::Registry,
    exited: bool,
    /// Set by an `ecall` handler when the environment call itself didn't
    /// error but the requested behavior isn't representable as a register
    /// write (reserved for future handlers; unused by any builtin today).
    pending_runtime_error: Option<RuntimeError>,
}

impl Interpreter {
    /// Builds a fresh machine for `code`/`labels`, serializing any leading
    /// [`Instruction::Data`] literals into memory and positioning `pc` at the
    /// first real instruction, per spec.md §4.5.
    pub fn new(code: Vec<Instruction>, labels: FnvHashMap<String, usize>) -> Self {
        let mut interp = Self {
            registers: [0; Register::COUNT],
            memory: Memory::new(),
            labels,
            code,
            ecalls: ecall::Registry::new(),
            exited: false,
            pending_runtime_error: None,
        };
        interp.load_data_segment();
        interp
    }

    fn load_data_segment(&mut self) {
        let mut sp: i64 = 0;
        let mut code_started = false;
        for instr in &self.code {
            if instr.is_data() {
                if let Instruction::Data(value) = instr {
                    // Infallible: the data segment never exceeds memory size
                    // for any program that would itself fit in source form.
                    let _ = self.memory.set_word(sp, *value);
                    sp += INSTRUCTION_SIZE;
                }
            } else if !code_started {
                code_started = true;
            }
        }
        self.set_reg(Register::Pc, sp);
        self.set_reg(Register::Sp, sp);
    }

    pub fn register_ecall(
        &mut self,
        code: i64,
        handler: impl FnMut(&mut Interpreter) -> Result<ecall::Outcome, RuntimeError> + 'static,
    ) {
        self.ecalls.register(code, handler);
    }

    pub fn reg(&self, r: Register) -> i64 {
        self.registers[r.index()]
    }

    pub fn set_reg(&mut self, r: Register, value: i64) {
        if matches!(r, Register::Zero) {
            return;
        }
        self.registers[r.index()] = value;
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn labels(&self) -> &FnvHashMap<String, usize> {
        &self.labels
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn pc(&self) -> i64 {
        self.reg(Register::Pc)
    }

    pub fn set_pc(&mut self, value: i64) {
        self.set_reg(Register::Pc, value);
    }

    /// The index into `code` the current `pc` refers to, if it is aligned
    /// and in range.
    pub fn current_index(&self) -> Result<usize, RuntimeError> {
        let pc = self.pc();
        if pc % INSTRUCTION_SIZE != 0 {
            return Err(RuntimeError::InvalidPc(pc));
        }
        Ok((pc / INSTRUCTION_SIZE) as usize)
    }

    pub fn request_exit(&mut self) {
        self.exited = true;
    }

    pub fn has_more(&self) -> Result<bool, RuntimeError> {
        if self.exited {
            return Ok(false);
        }
        Ok(self.current_index()? < self.code.len())
    }

    /// Resolves `(label - 1) * INSTRUCTION_SIZE`: the branch-target bias
    /// described in spec.md §4.4/§9, chosen so the unconditional
    /// post-increment lands exactly on the target.
    fn biased_target(&self, label: &str) -> Result<i64, RuntimeError> {
        let line = self
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| RuntimeError::Runtime(format!("undefined label '{}'", label)))?;
        Ok((line as i64 - 1) * INSTRUCTION_SIZE)
    }

    /// Executes the instruction at the current `pc`, then advances `pc` by
    /// [`INSTRUCTION_SIZE`] unconditionally (spec.md §4.4: "The program
    /// counter advances by the instruction size after every instruction").
    pub fn step(&mut self) -> Result<StepOutcome, RuntimeError> {
        if !self.has_more()? {
            return Ok(StepOutcome::Finished);
        }
        let idx = self.current_index()?;
        let instr = self.code[idx].clone();
        self.execute(&instr)?;
        let advanced = self.pc() + INSTRUCTION_SIZE;
        self.set_pc(advanced);

        if let Some(err) = self.pending_runtime_error.take() {
            return Err(err);
        }
        if self.exited {
            return Ok(StepOutcome::Finished);
        }
        Ok(StepOutcome::Continued)
    }

    fn execute(&mut self, instr: &Instruction) -> Result<(), RuntimeError> {
        use Instruction::*;
        match instr {
            Li(rd, imm) => self.set_reg(*rd, *imm),
            Mv(rd, rs) => self.set_reg(*rd, self.reg(*rs)),
            Add(rd, rs1, rs2) => self.set_reg(*rd, self.reg(*rs1).wrapping_add(self.reg(*rs2))),
            Sub(rd, rs1, rs2) => self.set_reg(*rd, self.reg(*rs1).wrapping_sub(self.reg(*rs2))),
            And(rd, rs1, rs2) => self.set_reg(*rd, self.reg(*rs1) & self.reg(*rs2)),
            Or(rd, rs1, rs2) => self.set_reg(*rd, self.reg(*rs1) | self.reg(*rs2)),
            Xor(rd, rs1, rs2) => self.set_reg(*rd, self.reg(*rs1) ^ self.reg(*rs2)),
            Addi(rd, rs, imm) => self.set_reg(*rd, self.reg(*rs).wrapping_add(*imm)),
            Sll(rd, rs1, rs2) => {
                let shamt = (self.reg(*rs2) & 0x7F) as u32;
                self.set_reg(*rd, ((self.reg(*rs1) as u64) << shamt) as i64);
            }
            Srl(rd, rs1, rs2) => {
                let shamt = (self.reg(*rs2) & 0x7F) as u32;
                self.set_reg(*rd, ((self.reg(*rs1) as u64) >> shamt) as i64);
            }
            Slli(rd, rs, imm) => {
                let shamt = (*imm & 0x7F) as u32;
                self.set_reg(*rd, ((self.reg(*rs) as u64) << shamt) as i64);
            }
            Srli(rd, rs, imm) => {
                let shamt = (*imm & 0x7F) as u32;
                self.set_reg(*rd, ((self.reg(*rs) as u64) >> shamt) as i64);
            }

            Sb(rs, imm, rd) => {
                let addr = self.reg(*rd) + imm;
                self.memory.set_byte(addr, (self.reg(*rs) & 0xFF) as u8)?;
            }
            Sh(rs, imm, rd) => {
                let addr = self.reg(*rd) + imm;
                self.memory.set_half(addr, self.reg(*rs))?;
            }
            Sw(rs, imm, rd) => {
                let addr = self.reg(*rd) + imm;
                self.memory.set_word(addr, self.reg(*rs))?;
            }
            Lb(rd, imm, rs) => {
                let addr = self.reg(*rs) + imm;
                let v = self.memory.get_byte(addr)? as i64;
                self.set_reg(*rd, v);
            }
            Lh(rd, imm, rs) => {
                let addr = self.reg(*rs) + imm;
                let v = self.memory.get_half(addr)?;
                self.set_reg(*rd, v);
            }
            Lw(rd, imm, rs) => {
                let addr = self.reg(*rs) + imm;
                let v = self.memory.get_word(addr)?;
                self.set_reg(*rd, v);
            }
            La(rd, label) => {
                let line = self
                    .labels
                    .get(label)
                    .copied()
                    .ok_or_else(|| RuntimeError::Runtime(format!("undefined label '{}'", label)))?;
                self.set_reg(*rd, line as i64 * INSTRUCTION_SIZE);
            }

            J(label) => self.set_pc(self.biased_target(label)?),
            Jal(rd, label) => {
                let ret = self.pc();
                let target = self.biased_target(label)?;
                self.set_reg(*rd, ret);
                self.set_pc(target);
            }
            Call(label) => {
                let ret = self.pc();
                let target = self.biased_target(label)?;
                self.set_reg(Register::Ra, ret);
                self.set_pc(target);
            }
            Ret => self.set_pc(self.reg(Register::Ra)),
            Beq(a, b, label) => {
                if self.reg(*a) == self.reg(*b) {
                    self.set_pc(self.biased_target(label)?);
                }
            }
            Bne(a, b, label) => {
                if self.reg(*a) != self.reg(*b) {
                    self.set_pc(self.biased_target(label)?);
                }
            }
            Blt(a, b, label) => {
                if self.reg(*a) < self.reg(*b) {
                    self.set_pc(self.biased_target(label)?);
                }
            }
            Bge(a, b, label) => {
                if self.reg(*a) >= self.reg(*b) {
                    self.set_pc(self.biased_target(label)?);
                }
            }
            Bgt(a, b, label) => {
                if self.reg(*a) > self.reg(*b) {
                    self.set_pc(self.biased_target(label)?);
                }
            }
            Beqz(a, label) => {
                if self.reg(*a) == 0 {
                    self.set_pc(self.biased_target(label)?);
                }
            }

            Ecall => {
                let code = self.reg(Register::A7);
                // Detach the registry so the handler can take `&mut self`
                // without aliasing the very field it's called through.
                let mut ecalls = std::mem::take(&mut self.ecalls);
                let outcome = ecalls.dispatch(code, self);
                self.ecalls = ecalls;
                match outcome {
                    Ok(ecall::Outcome::Exit) => self.exited = true,
                    Ok(ecall::Outcome::Continue) => {}
                    Err(e) => self.pending_runtime_error = Some(e),
                }
            }
            Ebreak => { /* no-op during execution; the debugger checks for it before fetch */ }

            Data(_) => {
                return Err(RuntimeError::Runtime(
                    "the data segment cannot be executed".into(),
                ))
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register::*;

    fn run(src: &str) -> Interpreter {
        let p = crate::preprocessor::preprocess(src).unwrap();
        let code = crate::parser::parse_all(&p.lines).unwrap();
        let mut interp = Interpreter::new(code, p.labels);
        while interp.step().unwrap() == StepOutcome::Continued {}
        interp
    }

    #[test]
    fn s1_li_add_mv() {
        let interp = run("li a1, 1\nli a2, 2\nadd a0, a1, a2\nmv t0, a0\n");
        assert_eq!(interp.reg(A0), 3);
        assert_eq!(interp.reg(T0), 3);
        assert_eq!(interp.reg(A1), 1);
        assert_eq!(interp.reg(A2), 2);
    }

    #[test]
    fn s2_branch_and_label() {
        let src = "li a0, 0\nli a1, 3\nloop: addi a0, a0, 1\nbne a0, a1, loop\n";
        let interp = run(src);
        assert_eq!(interp.reg(A0), 3);
    }

    #[test]
    fn s3_call_ret() {
        let src = "li a0, 5\ncall inc\nj end\ninc: addi a0, a0, 1\nret\nend:\n";
        let interp = run(src);
        assert_eq!(interp.reg(A0), 6);
    }

    #[test]
    fn s4_store_load_round_trip() {
        let src = "li t0, 0\nli t1, 0x1122334455667788\nsw t1, 0(t0)\nlw t2, 0(t0)\n";
        let interp = run(src);
        assert_eq!(interp.reg(T2), 0x1122334455667788u64 as i64);
        let bytes: Vec<u8> = (0..8).map(|i| interp.memory().get_byte(i).unwrap()).collect();
        assert_eq!(bytes, vec![0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn zero_register_is_always_zero() {
        let interp = run("li zero, 123\nadd zero, zero, zero\n");
        assert_eq!(interp.reg(Zero), 0);
    }

    #[test]
    fn shifts_mask_shift_amount_to_low_seven_bits() {
        let interp = run("li t0, 1\nli t1, 129\nsll a0, t0, t1\n"); // 129 & 0x7F == 1
        assert_eq!(interp.reg(A0), 2);
    }

    #[test]
    fn invalid_pc_is_reported() {
        let p = crate::preprocessor::preprocess("li a0, 1\n").unwrap();
        let code = crate::parser::parse_all(&p.lines).unwrap();
        let mut interp = Interpreter::new(code, p.labels);
        interp.set_pc(1);
        assert!(matches!(interp.step(), Err(RuntimeError::InvalidPc(1))));
    }

    #[test]
    fn add_then_sub_recovers_original_operand() {
        let interp = run("li a1, 7\nli a2, 3\nadd a0, a1, a2\nsub a3, a0, a2\n");
        assert_eq!(interp.reg(A3), interp.reg(A1));
    }
}
