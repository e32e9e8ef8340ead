//! The closed set of register names recognized by the assembler, and the
//! machinery to turn a spelled-out name like `"a0"` into a [`Register`].

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use std::fmt;

/// One of the 32 named machine slots, including the hardwired zero register
/// and the program counter. Reads from `Zero` always yield 0; writes to it
/// are discarded everywhere a register is a write destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Register {
    Zero,
    Ra,
    Sp,
    Gp,
    Tp,
    Pc,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
    S11,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
}

/// All 32 general-purpose slots in the canonical index order, plus `pc`.
pub const ALL: [Register; 33] = [
    Register::Zero,
    Register::Ra,
    Register::Sp,
    Register::Gp,
    Register::Tp,
    Register::T0,
    Register::T1,
    Register::T2,
    Register::T3,
    Register::T4,
    Register::T5,
    Register::T6,
    Register::S0,
    Register::S1,
    Register::S2,
    Register::S3,
    Register::S4,
    Register::S5,
    Register::S6,
    Register::S7,
    Register::S8,
    Register::S9,
    Register::S10,
    Register::S11,
    Register::A0,
    Register::A1,
    Register::A2,
    Register::A3,
    Register::A4,
    Register::A5,
    Register::A6,
    Register::A7,
    Register::Pc,
];

impl Register {
    /// Index into the fixed register file backing [`crate::interpreter::Interpreter`].
    pub fn index(self) -> usize {
        use Register::*;
        match self {
            Zero => 0,
            Ra => 1,
            Sp => 2,
            Gp => 3,
            Tp => 4,
            Pc => 5,
            T0 => 6,
            T1 => 7,
            T2 => 8,
            T3 => 9,
            T4 => 10,
            T5 => 11,
            T6 => 12,
            S0 => 13,
            S1 => 14,
            S2 => 15,
            S3 => 16,
            S4 => 17,
            S5 => 18,
            S6 => 19,
            S7 => 20,
            S8 => 21,
            S9 => 22,
            S10 => 23,
            S11 => 24,
            A0 => 25,
            A1 => 26,
            A2 => 27,
            A3 => 28,
            A4 => 29,
            A5 => 30,
            A6 => 31,
            A7 => 32,
        }
    }

    /// The canonical ABI spelling, as used in diagnostics and `show registers`.
    pub fn name(self) -> &'static str {
        use Register::*;
        match self {
            Zero => "zero",
            Ra => "ra",
            Sp => "sp",
            Gp => "gp",
            Tp => "tp",
            Pc => "pc",
            T0 => "t0",
            T1 => "t1",
            T2 => "t2",
            T3 => "t3",
            T4 => "t4",
            T5 => "t5",
            T6 => "t6",
            S0 => "s0",
            S1 => "s1",
            S2 => "s2",
            S3 => "s3",
            S4 => "s4",
            S5 => "s5",
            S6 => "s6",
            S7 => "s7",
            S8 => "s8",
            S9 => "s9",
            S10 => "s10",
            S11 => "s11",
            A0 => "a0",
            A1 => "a1",
            A2 => "a2",
            A3 => "a3",
            A4 => "a4",
            A5 => "a5",
            A6 => "a6",
            A7 => "a7",
        }
    }

    pub const COUNT: usize = 33;
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

lazy_static! {
    /// Name -> Register lookup, built once. Mirrors the teacher's
    /// `parser::register_names::regs()` but over the closed ABI-name set
    /// this dialect recognizes (no `x0`..`x31` aliases).
    static ref NAMES: FnvHashMap<&'static str, Register> = {
        let mut map = FnvHashMap::with_capacity_and_hasher(ALL.len(), Default::default());
        for &r in ALL.iter() {
            map.insert(r.name(), r);
        }
        map
    };
}

/// Looks up a register by its spelled-out name (e.g. `"a0"`, `"sp"`).
/// Returns `None` for anything not in the closed set, including the `x0..x31`
/// spellings real RISC-V assemblers accept -- this dialect only recognizes
/// ABI names plus `pc`, per spec.
pub fn by_name(name: &str) -> Option<Register> {
    NAMES.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_name() {
        for &r in ALL.iter() {
            assert_eq!(by_name(r.name()), Some(r));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(by_name("x0"), None);
        assert_eq!(by_name("bogus"), None);
    }

    #[test]
    fn indices_are_dense_and_unique() {
        let mut seen = [false; Register::COUNT];
        for &r in ALL.iter() {
            assert!(!seen[r.index()], "duplicate index for {}", r);
            seen[r.index()] = true;
        }
        assert!(seen.iter().all(|&b| b));
    }
}
