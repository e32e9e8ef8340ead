//! A small RISC-V-style assembler, interpreter and line debugger.
//!
//! Source goes through three stages: [`preprocessor`] expands macros and
//! `.eqv`s and records a [`source_map`] back to the original file, [`lexer`]
//! and [`parser`] turn each normalized line into a typed [`instruction`], and
//! [`interpreter`] runs the resulting program against a flat [`register`]
//! file and [`memory`]. [`debugger`] layers breakpoints and stepping on top
//! of the interpreter; [`ecall`] is the environment-call dispatch table an
//! embedder populates -- this crate reserves no ecall numbers of its own.

pub mod config;
pub mod debugger;
pub mod ecall;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod preprocessor;
pub mod register;
pub mod source_map;
