//! Bidirectional index between original source lines and post-expansion
//! (emitted) instruction lines.
//!
//! Grounded on the original implementation's `from_in_to_inparse` /
//! `from_inparse_to_in` vectors (`Preprocessor.cpp`, `Interpreter.cpp`), kept
//! as two parallel `Vec`s the way the teacher favors plain owned buffers over
//! a fancier structure (see `simulator::memory::Memory`).

/// Sentinel stored in [`SourceMap::orig_to_emitted`] for an original line that
/// produced no instruction (blank, comment, label-only, directive, or a line
/// consumed while capturing a macro body).
pub const NO_EMITTED: isize = -1;

#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    /// `orig_to_emitted[i]` = index of the instruction emitted for original
    /// line `i`, or [`NO_EMITTED`].
    orig_to_emitted: Vec<isize>,

    /// `emitted_to_orig[j]` = original source line that produced emitted
    /// instruction `j`. For instructions materialized from a macro body,
    /// this is the line of the macro invocation.
    emitted_to_orig: Vec<usize>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per line of the raw source file, in order, before any
    /// instruction it might emit is known. Pre-allocates the `orig_to_emitted`
    /// slot so later lines can always be indexed directly.
    pub fn push_orig_line(&mut self) {
        self.orig_to_emitted.push(NO_EMITTED);
    }

    /// Records that original line `orig` produced the emitted instruction at
    /// index `emitted` (the next push onto `emitted_to_orig`).
    ///
    /// Invariant upheld by every caller (preprocessor.rs): emitted lines are
    /// appended in increasing order, and `orig` is the line currently being
    /// processed (the macro invocation line, for macro-expanded instructions).
    pub fn record_emission(&mut self, orig: usize) {
        let emitted = self.emitted_to_orig.len();
        self.emitted_to_orig.push(orig);
        if self.orig_to_emitted[orig] == NO_EMITTED {
            self.orig_to_emitted[orig] = emitted as isize;
        }
    }

    pub fn emitted_len(&self) -> usize {
        self.emitted_to_orig.len()
    }

    pub fn orig_len(&self) -> usize {
        self.orig_to_emitted.len()
    }

    /// The emitted index produced directly by original line `orig`, if any.
    pub fn emitted_for(&self, orig: usize) -> Option<usize> {
        self.orig_to_emitted
            .get(orig)
            .copied()
            .filter(|&e| e != NO_EMITTED)
            .map(|e| e as usize)
    }

    /// The original line that produced emitted instruction `emitted`.
    pub fn orig_for(&self, emitted: usize) -> Option<usize> {
        self.emitted_to_orig.get(emitted).copied()
    }

    /// Walks backwards from `orig` until it finds a line that emitted an
    /// instruction, returning that instruction's emitted index. This is how
    /// a breakpoint set on a macro-invocation line (which itself emits
    /// nothing -- its body does) resolves to "the first emitted instruction
    /// of the expansion", per spec.md §4.6.
    ///
    /// Returns `Err(true)` if `orig` is past the end of the source, `Err(false)`
    /// if no non-sentinel predecessor exists (e.g. it's inside an unreachable
    /// prefix of blank/comment lines).
    pub fn resolve_breakpoint_line(&self, orig: usize) -> Result<usize, bool> {
        if orig >= self.orig_len() {
            return Err(true);
        }
        let mut n = orig as isize;
        while n >= 0 && self.orig_to_emitted[n as usize] == NO_EMITTED {
            n -= 1;
        }
        if n < 0 {
            return Err(false);
        }
        Ok(self.orig_to_emitted[n as usize] as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_expansion_maps_back_to_invocation_line() {
        // start: inc2 a0   <- orig line 0, expands to 2 instructions
        let mut map = SourceMap::new();
        map.push_orig_line();
        map.record_emission(0);
        map.record_emission(0);

        assert_eq!(map.emitted_for(0), Some(0));
        assert_eq!(map.orig_for(0), Some(0));
        assert_eq!(map.orig_for(1), Some(0));
        assert_eq!(map.resolve_breakpoint_line(0), Ok(0));
    }

    #[test]
    fn blank_lines_fall_back_to_predecessor() {
        let mut map = SourceMap::new();
        map.push_orig_line(); // 0: li a0, 1
        map.record_emission(0);
        map.push_orig_line(); // 1: blank
        map.push_orig_line(); // 2: addi a0, a0, 1
        map.record_emission(2);

        assert_eq!(map.emitted_for(1), None);
        assert_eq!(map.resolve_breakpoint_line(1), Ok(0));
    }

    #[test]
    fn out_of_range_line_errs() {
        let map = SourceMap::new();
        assert_eq!(map.resolve_breakpoint_line(0), Err(true));
    }

    #[test]
    fn no_predecessor_errs() {
        let mut map = SourceMap::new();
        map.push_orig_line(); // 0: blank
        assert_eq!(map.resolve_breakpoint_line(0), Err(false));
    }
}
