//! Crate-wide error types, one enum per pipeline phase, unified by [`Error`].
//!
//! Mirrors the shape of the teacher's `parser::error` module: small
//! `thiserror`-derived enums per phase, wrapped in a top-level `Error` that
//! can additionally carry source position context.

use thiserror::Error as ThisError;

/// Failures that can occur while expanding macros, `.eqv`s and labels.
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum PreprocessorError {
    #[error("unknown directive '.{0}'")]
    UnknownDirective(String),

    #[error("malformed directive: '{0}'")]
    BadDirective(String),

    #[error("macro '{0}' is already defined")]
    DuplicateMacro(String),

    #[error("label '{0}' is already defined")]
    DuplicateLabel(String),

    #[error("malformed label definition: '{0}'")]
    BadLabel(String),

    #[error("macro '{name}' expects {expected} argument(s), got {found}")]
    MacroArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error(".macro '{0}' was never closed by .end_macro")]
    UnterminatedMacro(String),
}

/// Failures that can occur while turning normalized lines into [`crate::instruction::Instruction`]s.
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum ParserError {
    #[error("'{mnemonic}' expects {expected} operand(s), got {found}")]
    BadArity {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("expected a register name, found '{0}'")]
    BadRegister(String),

    #[error("'{0}' is not a valid immediate")]
    BadImmediate(String),

    #[error("'{mnemonic}': invalid operand '{operand}'")]
    BadOperand { mnemonic: String, operand: String },

    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
}

/// Failures that can occur once the machine is running.
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum RuntimeError {
    #[error("pc {0:#x} is not a multiple of the instruction size")]
    InvalidPc(i64),

    #[error("memory access out of bounds at address {0:#x}")]
    MemoryFault(i64),

    #[error("no handler registered for ecall {0}")]
    BadEcall(i64),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Failures reported by debugger commands. Non-fatal: the REPL keeps running
/// and returns the matching numeric code to the caller (spec.md §7).
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum DebuggerError {
    #[error("unknown label '{0}'")]
    UnknownLabel(String),

    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    #[error("line {0} is past the end of the source")]
    LineOutOfRange(usize),

    #[error("line {0} has no corresponding instruction (inside a macro body, blank, or a comment)")]
    LineInsideMacro(usize),

    #[error("unrecognized command: '{0}'")]
    UnknownCommand(String),
}

/// Where in the original source a fatal error occurred, if known. Carried
/// separately from the error variants themselves so every phase can attach
/// it uniformly, the way the teacher's `Context` rides alongside `parser::error::Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub line: usize,
    pub text: Option<String>,
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.line + 1)?;
        if let Some(text) = &self.text {
            write!(f, ": {}", text)?;
        }
        Ok(())
    }
}

/// The union of every error kind the pipeline can produce.
#[derive(Debug, ThisError, Clone)]
pub enum Error {
    #[error("{0}")]
    Preprocessor(#[from] PreprocessorError),

    #[error("{0}")]
    Parser(#[from] ParserError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("{0}")]
    Debugger(#[from] DebuggerError),

    #[error("{err}\n   --> {ctx}")]
    WithContext { err: Box<Error>, ctx: Context },
}

/// Attaches source position context to any error, matching the teacher's
/// `Contextualize` trait.
pub trait Contextualize {
    fn with_context(self, ctx: Context) -> Error;
}

impl Contextualize for Error {
    fn with_context(self, ctx: Context) -> Error {
        match self {
            Error::WithContext { err, .. } => Error::WithContext { err, ctx },
            other => Error::WithContext {
                err: Box::new(other),
                ctx,
            },
        }
    }
}

macro_rules! impl_contextualize {
    ($t:ty) => {
        impl Contextualize for $t {
            fn with_context(self, ctx: Context) -> Error {
                Error::WithContext {
                    err: Box::new(self.into()),
                    ctx,
                }
            }
        }
    };
}

impl_contextualize! { PreprocessorError }
impl_contextualize! { ParserError }
impl_contextualize! { RuntimeError }
impl_contextualize! { DebuggerError }
