//! Property tests for spec.md §8 invariants 1, 2 and 6, generating small
//! random instruction sequences from the safe arithmetic subset (SPEC_FULL.md
//! §8). Invariant 3 is covered by `s5_macro_expansion_and_source_map`,
//! invariant 4 by `debugger::tests::set_then_delete_breakpoint_restores_prior_flag`,
//! and invariant 5 by the proptest cases in `memory.rs`.

use proptest::prelude::*;

use rvasm::interpreter::{Interpreter, StepOutcome, INSTRUCTION_SIZE};
use rvasm::register::Register;
use rvasm::{parser, preprocessor};

fn run(src: &str) -> Interpreter {
    let p = preprocessor::preprocess(src).unwrap();
    let code = parser::parse_all(&p.lines).unwrap();
    let mut interp = Interpreter::new(code, p.labels);
    while interp.step().unwrap() == StepOutcome::Continued {}
    interp
}

proptest! {
    /// Invariant 1: after any instruction, the zero register reads 0, even
    /// when it's written directly or used as an operand.
    #[test]
    fn zero_register_always_reads_zero(a in any::<i32>(), b in any::<i32>()) {
        let src = format!(
            "li t0, {a}\nli t1, {b}\nli zero, {a}\nadd zero, t0, t1\nsub zero, zero, t0\n"
        );
        let interp = run(&src);
        prop_assert_eq!(interp.reg(Register::Zero), 0);
    }

    /// Invariant 2: `pc` is always a multiple of the instruction size between
    /// instructions, for any straight-line sequence of `li`s.
    #[test]
    fn pc_stays_aligned_through_straight_line_execution(
        values in proptest::collection::vec(any::<i32>(), 1..8)
    ) {
        let mut src = String::new();
        for v in &values {
            src.push_str(&format!("li t0, {v}\n"));
        }
        let p = preprocessor::preprocess(&src).unwrap();
        let code = parser::parse_all(&p.lines).unwrap();
        let mut interp = Interpreter::new(code, p.labels);
        loop {
            match interp.step().unwrap() {
                StepOutcome::Continued => prop_assert_eq!(interp.pc() % INSTRUCTION_SIZE, 0),
                StepOutcome::Finished => break,
            }
        }
    }

    /// Invariant 6: `add rd, rs1, rs2` followed by `sub rd', rd, rs2` yields
    /// `rd' = rs1` when `rd, rd' != x0`.
    #[test]
    fn add_then_sub_recovers_original_operand(a in any::<i32>(), b in any::<i32>()) {
        let src = format!("li a1, {a}\nli a2, {b}\nadd a0, a1, a2\nsub a3, a0, a2\n");
        let interp = run(&src);
        prop_assert_eq!(interp.reg(Register::A3), interp.reg(Register::A1));
    }
}
