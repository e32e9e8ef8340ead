//! Macro expansion, `.eqv` substitution, label collection, and comment
//! stripping (spec.md §4.1).
//!
//! Grounded on the original `Preprocessor.cpp`, reshaped into the teacher's
//! idiom: a scoped struct that owns its macro/eqv tables only for the
//! duration of preprocessing (spec.md §9, "Global-ish eqv/macros tables ->
//! scoped Preprocessor object") and a plain `fnv::FnvHashMap` rather than
//! `std::map`, matching `parser::preprocessor::MacroParser`.

use fnv::FnvHashMap;

use crate::error::{Contextualize, Error, PreprocessorError};
use crate::source_map::SourceMap;

/// A captured `.macro` body: its formal parameters and its lines, each
/// already split into comment-stripped, comma-stripped tokens but *not yet*
/// substituted.
struct Macro {
    params: Vec<String>,
    body_lines: Vec<Vec<String>>,
}

/// The result of preprocessing: normalized instruction-line text ready for
/// the lexer, the label table, and the map tying emitted lines back to their
/// original source line.
pub struct Preprocessed {
    pub lines: Vec<String>,
    pub labels: FnvHashMap<String, usize>,
    pub source_map: SourceMap,
}

/// Splits a raw line into tokens: whitespace-delimited, comments (a token
/// starting with `#`, and everything after it) dropped, trailing commas
/// stripped from every token (spec.md §4.1, steps 2-3).
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in line.split_whitespace() {
        if raw.starts_with('#') {
            break;
        }
        let tok = raw.strip_suffix(',').unwrap_or(raw);
        if !tok.is_empty() {
            tokens.push(tok.to_string());
        }
    }
    tokens
}

/// Applies every registered `.eqv` substitution to `tokens`, whole-token,
/// in insertion order (spec.md §3: "Applied to every normalized output line
/// as a whole-token textual substitution"). A replacement may itself contain
/// whitespace, in which case it expands into multiple tokens.
fn apply_eqv(tokens: Vec<String>, eqv: &[(String, String)]) -> Vec<String> {
    if eqv.is_empty() {
        return tokens;
    }
    let mut out = Vec::with_capacity(tokens.len());
    for tok in tokens {
        match eqv.iter().find(|(name, _)| *name == tok) {
            Some((_, replacement)) => out.extend(replacement.split_whitespace().map(String::from)),
            None => out.push(tok),
        }
    }
    out
}

/// Substitutes a macro's formal parameters with the actual arguments,
/// token-wise (spec.md §4.1).
fn substitute_params(body_tokens: &[String], params: &[String], args: &[String]) -> Vec<String> {
    body_tokens
        .iter()
        .map(|t| match params.iter().position(|p| p == t) {
            Some(i) => args[i].clone(),
            None => t.clone(),
        })
        .collect()
}

/// Expands macros and `.eqv`s, collects labels, and produces a normalized
/// instruction stream along with the bookkeeping needed to map it back to
/// `source`.
pub fn preprocess(source: &str) -> Result<Preprocessed, Error> {
    let raw_lines: Vec<&str> = source.lines().collect();

    let mut macros: FnvHashMap<String, Macro> = FnvHashMap::default();
    let mut eqv: Vec<(String, String)> = Vec::new();
    let mut labels: FnvHashMap<String, usize> = FnvHashMap::default();
    let mut source_map = SourceMap::new();
    let mut lines: Vec<String> = Vec::new();
    let mut counter = 0usize;

    let ctx = |orig: usize| crate::error::Context {
        line: orig,
        text: raw_lines.get(orig).map(|s| s.trim().to_string()),
    };

    let mut i = 0usize;
    while i < raw_lines.len() {
        let orig = i;
        source_map.push_orig_line();
        let raw = raw_lines[orig];
        i += 1;

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens = tokenize(raw);
        if tokens.is_empty() {
            continue;
        }
        let first = tokens[0].clone();

        // Macro invocation
        if let Some(m) = macros.get(&first) {
            let args = &tokens[1..];
            if args.len() != m.params.len() {
                return Err(PreprocessorError::MacroArityMismatch {
                    name: first,
                    expected: m.params.len(),
                    found: args.len(),
                }
                .with_context(ctx(orig)));
            }
            for body_tokens in &m.body_lines {
                let substituted = substitute_params(body_tokens, &m.params, args);
                let expanded = apply_eqv(substituted, &eqv);
                lines.push(expanded.join(" "));
                source_map.record_emission(orig);
                counter += 1;
            }
            continue;
        }

        // Directive
        if first.starts_with('.') {
            match first.as_str() {
                ".macro" => {
                    if tokens.len() < 2 {
                        return Err(PreprocessorError::BadDirective(raw.trim().to_string())
                            .with_context(ctx(orig)));
                    }
                    let name = tokens[1].clone();
                    if macros.contains_key(&name) {
                        return Err(
                            PreprocessorError::DuplicateMacro(name).with_context(ctx(orig))
                        );
                    }
                    let params = tokens[2..].to_vec();

                    let mut body_lines = Vec::new();
                    loop {
                        if i >= raw_lines.len() {
                            return Err(PreprocessorError::UnterminatedMacro(name)
                                .with_context(ctx(orig)));
                        }
                        let body_orig = i;
                        source_map.push_orig_line();
                        let body_raw = raw_lines[body_orig];
                        i += 1;

                        let body_trimmed = body_raw.trim();
                        if body_trimmed.is_empty() || body_trimmed.starts_with('#') {
                            continue;
                        }
                        let body_tokens = tokenize(body_raw);
                        if body_tokens.is_empty() {
                            continue;
                        }
                        if body_tokens[0] == ".end_macro" {
                            break;
                        }
                        body_lines.push(body_tokens);
                    }
                    macros.insert(name, Macro { params, body_lines });
                }
                ".eqv" => {
                    if tokens.len() != 3 {
                        return Err(PreprocessorError::BadDirective(raw.trim().to_string())
                            .with_context(ctx(orig)));
                    }
                    eqv.push((tokens[1].clone(), tokens[2].clone()));
                }
                ".data" | ".text" => { /* no-op: one address space */ }
                other => {
                    return Err(PreprocessorError::UnknownDirective(
                        other.trim_start_matches('.').to_string(),
                    )
                    .with_context(ctx(orig)));
                }
            }
            continue;
        }

        // Label definition
        if first.ends_with(':') {
            if tokens.len() != 1 || first.len() == 1 {
                return Err(
                    PreprocessorError::BadLabel(raw.trim().to_string()).with_context(ctx(orig))
                );
            }
            let name = first[..first.len() - 1].to_string();
            if labels.contains_key(&name) {
                return Err(PreprocessorError::DuplicateLabel(name).with_context(ctx(orig)));
            }
            labels.insert(name, counter);
            continue;
        }

        // Plain instruction
        let expanded = apply_eqv(tokens, &eqv);
        lines.push(expanded.join(" "));
        source_map.record_emission(orig);
        counter += 1;
    }

    Ok(Preprocessed {
        lines,
        labels,
        source_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_expansion_and_source_map_s5() {
        let src = ".macro inc2 %r\naddi %r, %r, 1\naddi %r, %r, 1\n.end_macro\nstart: inc2 a0\n";
        let p = preprocess(src).unwrap();

        assert_eq!(p.lines, vec!["addi a0 a0 1", "addi a0 a0 1"]);
        assert_eq!(p.labels.get("start"), Some(&0));
        assert_eq!(p.source_map.orig_for(0), Some(4));
        assert_eq!(p.source_map.orig_for(1), Some(4));
    }

    #[test]
    fn eqv_applies_after_macro_expansion() {
        let src = ".eqv N 10\nli a0, N\n";
        let p = preprocess(src).unwrap();
        assert_eq!(p.lines, vec!["li a0 10"]);
    }

    #[test]
    fn commas_and_comments_are_stripped() {
        let src = "add a0, a1, a2 # add them up\n";
        let p = preprocess(src).unwrap();
        assert_eq!(p.lines, vec!["add a0 a1 a2"]);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let src = "foo: li a0, 1\nfoo: li a0, 2\n";
        assert!(matches!(
            preprocess(src),
            Err(Error::WithContext { err, .. })
                if matches!(*err, Error::Preprocessor(PreprocessorError::DuplicateLabel(_)))
        ));
    }

    #[test]
    fn label_with_trailing_operand_is_bad_label() {
        let src = "foo: li a0, 1\n";
        assert!(matches!(
            preprocess(src),
            Err(Error::WithContext { err, .. })
                if matches!(*err, Error::Preprocessor(PreprocessorError::BadLabel(_)))
        ));
    }

    #[test]
    fn unterminated_macro_is_an_error() {
        let src = ".macro foo %r\naddi %r, %r, 1\n";
        assert!(matches!(
            preprocess(src),
            Err(Error::WithContext { err, .. })
                if matches!(*err, Error::Preprocessor(PreprocessorError::UnterminatedMacro(_)))
        ));
    }

    #[test]
    fn macro_arity_mismatch_is_an_error() {
        let src = ".macro foo %a %b\nadd %a, %a, %b\n.end_macro\nfoo a0\n";
        assert!(matches!(
            preprocess(src),
            Err(Error::WithContext { err, .. })
                if matches!(*err, Error::Preprocessor(PreprocessorError::MacroArityMismatch { .. }))
        ));
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let src = ".globl main\n";
        assert!(matches!(
            preprocess(src),
            Err(Error::WithContext { err, .. })
                if matches!(*err, Error::Preprocessor(PreprocessorError::UnknownDirective(_)))
        ));
    }

    #[test]
    fn duplicate_macro_is_an_error() {
        let src = ".macro foo\nli a0, 1\n.end_macro\n.macro foo\nli a0, 2\n.end_macro\n";
        assert!(matches!(
            preprocess(src),
            Err(Error::WithContext { err, .. })
                if matches!(*err, Error::Preprocessor(PreprocessorError::DuplicateMacro(_)))
        ));
    }
}
