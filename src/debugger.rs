//! Breakpoints, stepping and inspection (spec.md §4.6).
//!
//! Grounded on the original `Interpreter`'s REPL (`process_request`,
//! `step_over`/`step_in`/`step_out`, `show_*`): same command surface and
//! exit codes, but commands return structured [`ShowResult`]s and
//! [`DebuggerError`]s instead of printing straight to stdout, and breakpoints
//! live in two `Vec<bool>` sized to the instruction count (spec.md §9,
//! "Fixed 100000-entry bitset -> `Vec<bool>` sized to the program") rather
//! than the original's fixed 100000-bit `std::bitset`.

use crate::error::DebuggerError;
use crate::instruction::Instruction;
use crate::interpreter::{Interpreter, StepOutcome, INSTRUCTION_SIZE};
use crate::register::{self, Register};
use crate::source_map::SourceMap;

/// What happened when the interpreter was run forward to the next stop.
#[derive(Debug)]
pub enum Event {
    /// Execution paused at instruction `idx` (a breakpoint, `ebreak`, or a
    /// single step). `orig_line` is the source line it maps back to, if any.
    Stopped { idx: usize, orig_line: Option<usize> },
    /// The program ran off the end of its instructions (or called exit).
    Finished,
    /// The program faulted.
    Runtime(crate::error::RuntimeError),
}

/// The data a `show` command produces, for a caller to format however it likes.
#[derive(Debug)]
pub enum ShowResult {
    Registers(Vec<(Register, i64)>),
    Register(Register, i64),
    Memory { from: i64, words: Vec<i64> },
    Context { lines: Vec<(usize, String)>, current: usize },
    Help,
}

/// One command's outcome, before the REPL decides what to do with it.
#[derive(Debug)]
pub enum CommandResult {
    /// Resume stepping: `continue`, `step in/over/out` all fall here once
    /// the breakpoint state has been armed.
    Resume,
    Show(ShowResult),
    Exit,
    Err(DebuggerError),
}

impl CommandResult {
    fn is_failure(&self) -> bool {
        matches!(self, CommandResult::Err(_))
    }
}

/// Per-session breakpoint and stepping state. Outlives any single
/// `Interpreter::step` call; one instance per debug session (spec.md §4.6).
pub struct Debugger {
    break_points: Vec<bool>,
    /// Breakpoints the user set explicitly, as opposed to the transient ones
    /// `step_over`/`step_out` arm and clear again once hit.
    manual: Vec<bool>,
    break_on_next: bool,
    /// The instruction index the session last returned `Stopped` at, so the
    /// next `run_until_break` can resume past a persistent breakpoint there
    /// instead of re-triggering it with zero progress (mirrors the original
    /// interpreter's "don't re-check the instruction you just stopped at"
    /// rule, generalized across calls instead of a per-call flag).
    resuming_from_idx: Option<usize>,
    failed_commands: u32,
    source_lines: Vec<String>,
    source_map: SourceMap,
}

impl Debugger {
    pub fn new(source: &str, source_map: SourceMap, instruction_count: usize) -> Self {
        Self {
            break_points: vec![false; instruction_count],
            manual: vec![false; instruction_count],
            break_on_next: false,
            resuming_from_idx: None,
            failed_commands: 0,
            source_lines: source.lines().map(str::to_string).collect(),
            source_map,
        }
    }

    /// The initial pause before anything has executed, for the REPL to show
    /// the user where they're starting from.
    pub fn initial_event(&self, interp: &Interpreter) -> Event {
        match interp.current_index() {
            Ok(idx) => Event::Stopped {
                idx,
                orig_line: self.source_map.orig_for(idx),
            },
            Err(e) => Event::Runtime(e),
        }
    }

    /// Steps the interpreter forward until a breakpoint, `ebreak`, an armed
    /// single step, or the end of the program.
    ///
    /// Persistent stops (a breakpoint or `ebreak` sitting at the current
    /// instruction) are checked *before* executing it, so a breakpoint is
    /// never silently skipped -- except once, for the exact instruction this
    /// session just reported a stop at, so resuming actually executes it
    /// instead of re-stopping with no progress. The transient "stop after
    /// one instruction" flag (`step in`/`step over`) is checked *after*
    /// executing, since stepping means "run one, then stop".
    pub fn run_until_break(&mut self, interp: &mut Interpreter) -> Event {
        loop {
            let idx = match interp.current_index() {
                Ok(idx) => idx,
                Err(e) => return Event::Runtime(e),
            };
            match interp.has_more() {
                Ok(true) => {}
                Ok(false) => {
                    self.resuming_from_idx = None;
                    return Event::Finished;
                }
                Err(e) => return Event::Runtime(e),
            }

            if self.resuming_from_idx != Some(idx) {
                let at_ebreak = matches!(interp.code()[idx], Instruction::Ebreak);
                let at_breakpoint = self.break_points.get(idx).copied().unwrap_or(false);
                if at_ebreak || at_breakpoint {
                    if !self.manual.get(idx).copied().unwrap_or(false) {
                        if let Some(slot) = self.break_points.get_mut(idx) {
                            *slot = false;
                        }
                    }
                    self.resuming_from_idx = Some(idx);
                    return Event::Stopped {
                        idx,
                        orig_line: self.source_map.orig_for(idx),
                    };
                }
            }
            self.resuming_from_idx = None;

            match interp.step() {
                Ok(StepOutcome::Finished) => return Event::Finished,
                Ok(StepOutcome::Continued) => {}
                Err(e) => return Event::Runtime(e),
            }

            if self.break_on_next {
                self.break_on_next = false;
                let new_idx = match interp.current_index() {
                    Ok(idx) => idx,
                    Err(e) => return Event::Runtime(e),
                };
                self.resuming_from_idx = Some(new_idx);
                return Event::Stopped {
                    idx: new_idx,
                    orig_line: self.source_map.orig_for(new_idx),
                };
            }
        }
    }

    fn step_in(&mut self) {
        self.break_on_next = true;
    }

    fn step_over(&mut self, interp: &Interpreter) {
        let idx = interp.current_index().unwrap_or(usize::MAX);
        let calls = interp
            .code()
            .get(idx)
            .map(Instruction::is_call_like)
            .unwrap_or(false);
        if calls && idx + 1 < self.break_points.len() {
            self.break_points[idx + 1] = true;
        } else {
            self.break_on_next = true;
        }
    }

    fn step_out(&mut self, interp: &Interpreter) {
        let target = (interp.reg(Register::Ra) / INSTRUCTION_SIZE) as usize + 1;
        if target < self.break_points.len() {
            self.break_points[target] = true;
        }
    }

    fn set_breakpoint_by_label(
        &mut self,
        label: &str,
        interp: &Interpreter,
    ) -> Result<(), DebuggerError> {
        let idx = *interp
            .labels()
            .get(label)
            .ok_or_else(|| DebuggerError::UnknownLabel(label.to_string()))?;
        self.break_points[idx] = true;
        self.manual[idx] = true;
        Ok(())
    }

    fn delete_breakpoint_by_label(
        &mut self,
        label: &str,
        interp: &Interpreter,
    ) -> Result<(), DebuggerError> {
        let idx = *interp
            .labels()
            .get(label)
            .ok_or_else(|| DebuggerError::UnknownLabel(label.to_string()))?;
        self.break_points[idx] = false;
        self.manual[idx] = false;
        Ok(())
    }

    /// Resolves a 0-based source line to an instruction index, per spec.md
    /// §4.6's "breakpoint set on a macro-invocation line applies to the
    /// first emitted instruction" rule.
    fn resolve_line(&self, line: usize) -> Result<usize, DebuggerError> {
        self.source_map.resolve_breakpoint_line(line).map_err(|past_end| {
            if past_end {
                DebuggerError::LineOutOfRange(line)
            } else {
                DebuggerError::LineInsideMacro(line)
            }
        })
    }

    fn set_breakpoint_by_line(&mut self, line: usize) -> Result<(), DebuggerError> {
        let idx = self.resolve_line(line)?;
        self.break_points[idx] = true;
        self.manual[idx] = true;
        Ok(())
    }

    fn delete_breakpoint_by_line(&mut self, line: usize) -> Result<(), DebuggerError> {
        let idx = self.resolve_line(line)?;
        self.break_points[idx] = false;
        self.manual[idx] = false;
        Ok(())
    }

    fn show_registers(&self, interp: &Interpreter) -> ShowResult {
        let regs = register::ALL.iter().map(|&r| (r, interp.reg(r))).collect();
        ShowResult::Registers(regs)
    }

    fn show_register(&self, name: &str, interp: &Interpreter) -> Result<ShowResult, DebuggerError> {
        let r = register::by_name(name).ok_or_else(|| DebuggerError::UnknownRegister(name.to_string()))?;
        Ok(ShowResult::Register(r, interp.reg(r)))
    }

    fn show_memory(&self, from: i64, to: i64, interp: &Interpreter) -> Vec<i64> {
        (from..to)
            .map(|i| interp.memory().get_word(i * INSTRUCTION_SIZE).unwrap_or(0))
            .collect()
    }

    fn show_context(&self, interp: &Interpreter) -> ShowResult {
        let idx = interp.current_index().unwrap_or(0);
        let current = self
            .source_map
            .orig_for(idx)
            .unwrap_or(self.source_lines.len());
        let lo = current.saturating_sub(3);
        let hi = (current + 3).min(self.source_lines.len().saturating_sub(1));
        let lines = (lo..=hi)
            .filter_map(|i| self.source_lines.get(i).map(|s| (i, s.clone())))
            .collect();
        ShowResult::Context { lines, current }
    }

    /// Parses and runs one REPL command. Returns the outcome plus whether
    /// the caller should now show help on its own (spec.md §4.6: "three
    /// consecutive failed commands").
    pub fn process_command(&mut self, raw: &str, interp: &mut Interpreter) -> (CommandResult, bool) {
        let result = self.dispatch(raw.trim(), interp);
        let auto_help = if result.is_failure() {
            self.failed_commands += 1;
            if self.failed_commands >= 3 {
                self.failed_commands = 0;
                true
            } else {
                false
            }
        } else {
            self.failed_commands = 0;
            false
        };
        (result, auto_help)
    }

    fn dispatch(&mut self, request: &str, interp: &mut Interpreter) -> CommandResult {
        if matches!(request, "exit" | "q") {
            return CommandResult::Exit;
        }

        let result: Result<Option<ShowResult>, DebuggerError> = (|| match request {
            "" | "continue" | "c" => Ok(None),
            "step in" | "s" => {
                self.step_in();
                Ok(None)
            }
            "step over" | "n" => {
                self.step_over(interp);
                Ok(None)
            }
            "step out" | "o" => {
                self.step_out(interp);
                Ok(None)
            }
            "show registers" | "sr" => Ok(Some(self.show_registers(interp))),
            "show context" => Ok(Some(self.show_context(interp))),
            "help" => Ok(Some(ShowResult::Help)),
            _ if request.starts_with("show register ") => {
                let name = request["show register ".len()..].trim();
                self.show_register(name, interp).map(Some)
            }
            _ if request.starts_with("sr ") => {
                let name = request["sr ".len()..].trim();
                self.show_register(name, interp).map(Some)
            }
            _ if request.starts_with("show memory") => {
                let rest: Vec<&str> = request["show memory".len()..].split_whitespace().collect();
                match rest.len() {
                    2 => {
                        let from = crate::parser::parse_immediate(rest[0])
                            .map_err(|_| DebuggerError::UnknownCommand(request.to_string()))?;
                        let to = crate::parser::parse_immediate(rest[1])
                            .map_err(|_| DebuggerError::UnknownCommand(request.to_string()))?;
                        Ok(Some(ShowResult::Memory {
                            from,
                            words: self.show_memory(from, to, interp),
                        }))
                    }
                    _ => Err(DebuggerError::UnknownCommand(request.to_string())),
                }
            }
            _ if request.starts_with("breakpoint set --name ") => {
                let label = request["breakpoint set --name ".len()..].trim();
                self.set_breakpoint_by_label(label, interp).map(|_| None)
            }
            _ if request.starts_with("breakpoint set --line ") => {
                let raw_line = request["breakpoint set --line ".len()..].trim();
                let line = crate::parser::parse_immediate(raw_line)
                    .map_err(|_| DebuggerError::UnknownCommand(request.to_string()))?;
                self.set_breakpoint_by_line(line.max(0) as usize).map(|_| None)
            }
            _ if request.starts_with("breakpoint delete --name ") => {
                let label = request["breakpoint delete --name ".len()..].trim();
                self.delete_breakpoint_by_label(label, interp).map(|_| None)
            }
            _ if request.starts_with("breakpoint delete --line ") => {
                let raw_line = request["breakpoint delete --line ".len()..].trim();
                let line = crate::parser::parse_immediate(raw_line)
                    .map_err(|_| DebuggerError::UnknownCommand(request.to_string()))?;
                self.delete_breakpoint_by_line(line.max(0) as usize).map(|_| None)
            }
            other => Err(DebuggerError::UnknownCommand(other.to_string())),
        })();

        match result {
            Ok(Some(show)) => CommandResult::Show(show),
            Ok(None) => CommandResult::Resume,
            Err(e) => CommandResult::Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(src: &str) -> (Debugger, Interpreter) {
        let p = crate::preprocessor::preprocess(src).unwrap();
        let code = crate::parser::parse_all(&p.lines).unwrap();
        let interp = Interpreter::new(code.clone(), p.labels);
        let dbg = Debugger::new(src, p.source_map, code.len());
        (dbg, interp)
    }

    #[test]
    fn ebreak_stops_the_session() {
        let (mut dbg, mut interp) = make("li a0, 1\nebreak\nli a0, 2\n");
        match dbg.run_until_break(&mut interp) {
            Event::Stopped { idx, .. } => assert_eq!(idx, 1),
            other => panic!("expected Stopped, got {:?}", other),
        }
        assert_eq!(interp.reg(Register::A0), 1);
    }

    #[test]
    fn breakpoint_by_label_stops_there() {
        let (mut dbg, mut interp) = make("li a0, 1\ntarget: li a0, 9\nli a0, 2\n");
        dbg.set_breakpoint_by_label("target", &interp).unwrap();
        match dbg.run_until_break(&mut interp) {
            Event::Stopped { idx, .. } => assert_eq!(idx, 1),
            other => panic!("expected Stopped, got {:?}", other),
        }
    }

    #[test]
    fn unknown_label_breakpoint_is_an_error() {
        let (mut dbg, interp) = make("li a0, 1\n");
        assert_eq!(
            dbg.set_breakpoint_by_label("nope", &interp),
            Err(DebuggerError::UnknownLabel("nope".into()))
        );
    }

    #[test]
    fn step_in_stops_after_one_instruction() {
        let (mut dbg, mut interp) = make("li a0, 1\nli a0, 2\nli a0, 3\n");
        dbg.step_in();
        match dbg.run_until_break(&mut interp) {
            Event::Stopped { idx, .. } => assert_eq!(idx, 1),
            other => panic!("expected Stopped, got {:?}", other),
        }
        assert_eq!(interp.reg(Register::A0), 1);
    }

    #[test]
    fn step_over_skips_a_call() {
        let src = "call fn\nli a0, 99\nj end\nfn: li a1, 1\nret\nend:\n";
        let (mut dbg, mut interp) = make(src);
        dbg.step_over(&interp);
        match dbg.run_until_break(&mut interp) {
            Event::Stopped { idx, .. } => assert_eq!(idx, 1),
            other => panic!("expected Stopped, got {:?}", other),
        }
        assert_eq!(interp.reg(Register::A1), 1);
    }

    #[test]
    fn unknown_command_is_reported_and_three_strikes_triggers_help() {
        let (mut dbg, mut interp) = make("li a0, 1\n");
        let (_, help1) = dbg.process_command("bogus", &mut interp);
        let (_, help2) = dbg.process_command("bogus", &mut interp);
        let (r3, help3) = dbg.process_command("bogus", &mut interp);
        assert!(!help1 && !help2 && help3);
        assert!(matches!(r3, CommandResult::Err(DebuggerError::UnknownCommand(_))));
    }

    #[test]
    fn show_registers_reports_every_register() {
        let (mut dbg, mut interp) = make("li a0, 42\n");
        let (result, _) = dbg.process_command("show registers", &mut interp);
        match result {
            CommandResult::Show(ShowResult::Registers(regs)) => {
                assert_eq!(regs.len(), Register::COUNT);
            }
            other => panic!("expected Show(Registers), got {:?}", other),
        }
    }

    /// spec.md §8 invariant 4: set then delete returns `set_flag` to its
    /// prior value, both for a label that already had no breakpoint and one
    /// that already did.
    #[test]
    fn set_then_delete_breakpoint_restores_prior_flag() {
        let (mut dbg, interp) = make("start: li a0, 1\nli a0, 2\n");
        assert!(!dbg.break_points[0]);
        dbg.set_breakpoint_by_label("start", &interp).unwrap();
        assert!(dbg.break_points[0]);
        dbg.delete_breakpoint_by_label("start", &interp).unwrap();
        assert!(!dbg.break_points[0]);

        // Now start from "already set" (e.g. an `ebreak` left `manual` false
        // but the slot could still be independently re-armed by hand first).
        dbg.break_points[0] = true;
        dbg.manual[0] = true;
        dbg.set_breakpoint_by_label("start", &interp).unwrap();
        assert!(dbg.break_points[0]);
        dbg.delete_breakpoint_by_label("start", &interp).unwrap();
        assert!(!dbg.break_points[0]);
    }
}
