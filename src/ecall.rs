//! Environment-call dispatch (spec.md §4.4, `ecall`; §6, "Ecall ABI").
//!
//! The core ships no handlers of its own -- spec.md is explicit that "the
//! core reserves no ecall numbers itself". [`Registry`] is the dispatch
//! table an embedder populates; [`stdlib`] is an optional, separate set of
//! conventional handlers (grounded in the teacher's `Simulator::ecall` match
//! arms) that a standalone CLI can choose to register.

use fnv::FnvHashMap;

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;

/// What an ecall handler did, as far as the fetch/execute loop cares.
pub enum Outcome {
    /// Nothing special; keep running.
    Continue,
    /// The program is done (e.g. a conventional "exit" ecall).
    Exit,
}

type Handler = Box<dyn FnMut(&mut Interpreter) -> Result<Outcome, RuntimeError>>;

/// Maps an `a7` code to the handler that services it. Registered entirely
/// by the embedder; see spec.md §6.
#[derive(Default)]
pub struct Registry {
    handlers: FnvHashMap<i64, Handler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        code: i64,
        handler: impl FnMut(&mut Interpreter) -> Result<Outcome, RuntimeError> + 'static,
    ) {
        self.handlers.insert(code, Box::new(handler));
    }

    /// Looks up and runs the handler for `code`. Callers must pass a
    /// `Registry` that has already been detached from the `Interpreter` it
    /// dispatches into (see `Interpreter::execute`'s `Ecall` arm), since a
    /// handler needs `&mut Interpreter` itself.
    pub fn dispatch(&mut self, code: i64, interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        match self.handlers.get_mut(&code) {
            Some(handler) => handler(interp),
            None => Err(RuntimeError::BadEcall(code)),
        }
    }
}

/// Conventional ecall handlers, grounded in the teacher's `Simulator::ecall`
/// match (print int/string/char, read int, exit, random int) and registered
/// opt-in by an embedder that wants a usable standalone CLI without
/// hardcoding ABI choices into the core.
pub mod stdlib {
    use super::*;
    use crate::register::Register::{A0, A1};
    use std::io::Write;

    /// Registers the handful of ecalls this crate's own `main` uses.
    pub fn register_defaults(interp: &mut Interpreter) {
        interp.register_ecall(1, print_int);
        interp.register_ecall(4, print_string);
        interp.register_ecall(5, read_int);
        interp.register_ecall(10, exit);
        interp.register_ecall(11, print_char);
        interp.register_ecall(41, rand_int);
    }

    fn print_int(interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        print!("{}", interp.reg(A0));
        let _ = std::io::stdout().flush();
        Ok(Outcome::Continue)
    }

    fn print_char(interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        print!("{}", (interp.reg(A0) as u8) as char);
        let _ = std::io::stdout().flush();
        Ok(Outcome::Continue)
    }

    fn print_string(interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        let mut addr = interp.reg(A0);
        loop {
            let byte = interp.memory().get_byte(addr)?;
            if byte == 0 {
                break;
            }
            print!("{}", byte as char);
            addr += 1;
        }
        let _ = std::io::stdout().flush();
        Ok(Outcome::Continue)
    }

    fn read_int(interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        let mut buf = String::new();
        std::io::stdin()
            .read_line(&mut buf)
            .map_err(|e| RuntimeError::Runtime(e.to_string()))?;
        let value = buf
            .trim()
            .parse::<i64>()
            .map_err(|_| RuntimeError::Runtime(format!("not an integer: '{}'", buf.trim())))?;
        interp.set_reg(A0, value);
        Ok(Outcome::Continue)
    }

    fn exit(_interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        Ok(Outcome::Exit)
    }

    fn rand_int(interp: &mut Interpreter) -> Result<Outcome, RuntimeError> {
        use rand::Rng;
        let value: i64 = rand::thread_rng().gen();
        interp.set_reg(A0, value);
        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register::{A0, A7};

    fn make_interp(src: &str) -> Interpreter {
        let p = crate::preprocessor::preprocess(src).unwrap();
        let code = crate::parser::parse_all(&p.lines).unwrap();
        Interpreter::new(code, p.labels)
    }

    #[test]
    fn unregistered_ecall_is_bad_ecall() {
        let mut interp = make_interp("li a7, 999\necall\n");
        assert_eq!(
            interp.step(),
            Err(RuntimeError::BadEcall(999))
        );
    }

    #[test]
    fn registered_handler_runs() {
        let mut interp = make_interp("li a7, 10\necall\n");
        interp.register_ecall(10, |_| Ok(Outcome::Exit));
        assert_eq!(interp.step().unwrap(), crate::interpreter::StepOutcome::Finished);
    }

    #[test]
    fn exit_ecall_stops_the_session() {
        let mut interp = make_interp("li a0, 7\nli a7, 10\necall\nli a0, 999\n");
        stdlib::register_defaults(&mut interp);
        while interp.step().unwrap() == crate::interpreter::StepOutcome::Continued {}
        assert_eq!(interp.reg(A0), 7);
        let _ = A7;
    }
}
