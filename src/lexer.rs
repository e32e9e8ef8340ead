//! Turns one normalized line (already comment- and comma-free, per
//! [`crate::preprocessor`]) into a mnemonic and its operand tokens.
//!
//! Deliberately tiny: spec.md §4.2 calls this "a pure function", and the
//! teacher's own `parser::lexer::Lexer` is the character-level scanner one
//! layer down from this -- here, the preprocessor has already done the
//! character-level work, so lexing is just "split on whitespace".

/// A lexed line: its mnemonic and operand tokens, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed<'a> {
    pub mnemonic: &'a str,
    pub operands: Vec<&'a str>,
}

/// Lexes a single normalized line. Callers never hand this an empty line --
/// the preprocessor only emits lines that produced at least one token.
pub fn lex(line: &str) -> Lexed<'_> {
    let mut tokens = line.split_whitespace();
    let mnemonic = tokens.next().unwrap_or_default();
    Lexed {
        mnemonic,
        operands: tokens.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mnemonic_from_operands() {
        let l = lex("addi a0 a0 1");
        assert_eq!(l.mnemonic, "addi");
        assert_eq!(l.operands, vec!["a0", "a0", "1"]);
    }

    #[test]
    fn no_operands() {
        let l = lex("ret");
        assert_eq!(l.mnemonic, "ret");
        assert!(l.operands.is_empty());
    }
}
