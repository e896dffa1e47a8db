//! Word Expansion
//!
//! Main entry point for shell word expansion.
//!
//! Handles shell word expansion including:
//! - Variable expansion ($VAR, ${VAR})
//! - Command substitution $(...)
//! - Arithmetic expansion $((...)
//! - Tilde expansion (~)
//! - Brace expansion {a,b,c}
//! - Glob expansion (*, ?, [...])
//!
//! This module provides the high-level expansion functions.
//! The actual expansion logic is implemented in the expansion/ submodules.
//! Command substitution requires a runtime callback since it needs to run a
//! full script through the execution engine, which sits a layer above this
//! module.

use crate::ast::types::{
    WordNode, WordPart, CommandSubstitutionPart, ScriptNode,
    BraceItem, LiteralPart,
};
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::types::{ExecResult, InterpreterState};

// Re-export commonly used expansion functions
pub use crate::interpreter::expansion::analysis::*;
pub use crate::interpreter::expansion::brace_range::*;
pub use crate::interpreter::expansion::glob_escape::*;
pub use crate::interpreter::expansion::pattern::*;
pub use crate::interpreter::expansion::pattern_removal::*;
pub use crate::interpreter::expansion::quoting::*;
pub use crate::interpreter::expansion::tilde::*;
pub use crate::interpreter::expansion::variable::*;
pub use crate::interpreter::expansion::word_split::*;

use crate::interpreter::expansion::command_substitution::get_file_read_shorthand;
use crate::interpreter::expansion::word_glob_expansion::expand_glob_pattern;
use crate::interpreter::helpers::get_ifs;

/// Result of word expansion.
#[derive(Debug, Clone)]
pub struct WordExpansionResult {
    /// The expanded string value
    pub value: String,
    /// Whether the expansion produced multiple words (from word splitting)
    pub split_words: Option<Vec<String>>,
    /// Any stderr output from command substitutions
    pub stderr: String,
    /// Exit code from command substitutions (if any)
    pub exit_code: Option<i32>,
}

impl WordExpansionResult {
    /// Create a simple result with just a value.
    pub fn simple(value: String) -> Self {
        Self {
            value,
            split_words: None,
            stderr: String::new(),
            exit_code: None,
        }
    }

    /// Create a result with split words.
    pub fn with_split(value: String, words: Vec<String>) -> Self {
        Self {
            value,
            split_words: Some(words),
            stderr: String::new(),
            exit_code: None,
        }
    }
}

/// Options for word expansion.
#[derive(Debug, Clone, Default)]
pub struct WordExpansionOptions {
    /// Whether we're inside double quotes
    pub in_double_quotes: bool,
    /// Whether to perform word splitting
    pub do_word_split: bool,
    /// Whether to perform glob expansion
    pub do_glob: bool,
    /// Whether to preserve empty fields
    pub preserve_empty: bool,
    /// Whether extglob is enabled
    pub extglob: bool,
}

/// Callback type for command substitution execution.
///
/// The runtime must provide this callback to execute command substitutions.
/// It runs the substituted script to completion and returns its result;
/// bash runs command substitution in a subshell, so the callback is only
/// ever given a read-only view of the calling state.
pub type CommandSubstFn = dyn Fn(&InterpreterState, &ScriptNode) -> ExecResult;

/// Legacy alias kept for callers still constructing callbacks the old way.
pub type CommandSubstitutionFn = Box<dyn Fn(&InterpreterState, &ScriptNode) -> ExecResult + Send + Sync>;

/// Expand a word for a single-value context (command name, redirection
/// target, heredoc body). Performs tilde/parameter/command/arithmetic
/// expansion and quote removal, but never splits into multiple words.
///
/// If the word is a brace expansion (`{a,b,c}foo`), only the first
/// alternative is used — brace expansion producing several independent
/// words only makes sense in argument-list contexts, which go through
/// [`expand_word_with_glob`] instead.
pub fn expand_word(
    state: &mut InterpreterState,
    word: &WordNode,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> WordExpansionResult {
    let options = WordExpansionOptions::default();
    let first = expand_braces(word).into_iter().next().unwrap_or_else(|| word.clone());

    let mut value = String::new();
    let mut stderr = String::new();
    for part in &first.parts {
        let (v, e) = expand_part(state, part, &options, fs, exec_fn);
        value.push_str(&v);
        stderr.push_str(&e);
    }

    WordExpansionResult { value, split_words: None, stderr, exit_code: None }
}

/// Expand a word for an argument-list context: full word splitting by IFS
/// and pathname (glob) expansion, honoring `noglob`/`nullglob`/`failglob`/
/// `extglob`. Brace expansion runs first, each alternative independently
/// splits and globs, and the results are concatenated.
pub fn expand_word_with_glob(
    state: &mut InterpreterState,
    word: &WordNode,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> WordExpansionResult {
    let extglob = state.shopt_options.extglob;
    let noglob = state.options.noglob;
    let failglob = state.shopt_options.failglob;
    let nullglob = state.shopt_options.nullglob;
    let ifs_chars = get_ifs(&state.env).to_string();
    let cwd = std::path::PathBuf::from(&state.cwd);

    let options = WordExpansionOptions {
        do_word_split: true,
        do_glob: true,
        extglob,
        ..Default::default()
    };

    let mut all_words: Vec<String> = Vec::new();
    let mut stderr = String::new();

    for bw in expand_braces(word) {
        let fully_quoted = is_word_fully_quoted(&bw);

        let mut segments: Vec<WordSplitSegment> = Vec::new();
        for part in &bw.parts {
            let (value, part_stderr) = expand_part(state, part, &options, fs, exec_fn);
            stderr.push_str(&part_stderr);
            segments.push(WordSplitSegment {
                value,
                is_splittable: is_part_splittable(part),
                is_quoted: is_quoted_part(part),
            });
        }

        let split = smart_word_split(&segments, &ifs_chars);
        let words = if split.words.is_empty() && bw.parts.is_empty() {
            vec![String::new()]
        } else {
            split.words
        };

        for w in words {
            if fully_quoted || noglob || !has_glob_pattern(&w, extglob) {
                all_words.push(unescape_glob_pattern(&w));
                continue;
            }
            match expand_glob_pattern(&w, &cwd, failglob, nullglob, extglob) {
                Ok(result) => all_words.extend(result.values),
                Err(_) => stderr.push_str(&format!("bash: no match: {}\n", w)),
            }
        }
    }

    if all_words.len() <= 1 {
        WordExpansionResult {
            value: all_words.into_iter().next().unwrap_or_default(),
            split_words: None,
            stderr,
            exit_code: None,
        }
    } else {
        let value = all_words.join(" ");
        WordExpansionResult { value, split_words: Some(all_words), stderr, exit_code: None }
    }
}

/// Expand every brace-expansion part of a word into its alternatives,
/// producing the cross product of all brace groups in the word. A word
/// with no brace expansion parts expands to itself.
fn expand_braces(word: &WordNode) -> Vec<WordNode> {
    match brace_alternatives(word) {
        None => vec![word.clone()],
        Some(alts) => alts.into_iter().flat_map(|w| expand_braces(&w)).collect(),
    }
}

/// Replace the first `BraceExpansion` part found with each of its
/// alternatives, returning one `WordNode` per alternative. Returns `None`
/// if the word has no brace expansion part left to resolve.
fn brace_alternatives(word: &WordNode) -> Option<Vec<WordNode>> {
    let idx = word.parts.iter().position(|p| matches!(p, WordPart::BraceExpansion(_)))?;
    let brace = match &word.parts[idx] {
        WordPart::BraceExpansion(b) => b,
        _ => unreachable!(),
    };

    let mut alt_words = Vec::new();
    for item in &brace.items {
        match item {
            BraceItem::Word { word: alt } => {
                let mut parts = word.parts.clone();
                parts.splice(idx..idx + 1, alt.parts.clone());
                alt_words.push(WordNode { parts });
            }
            BraceItem::Range { start, end, step, start_str, end_str } => {
                let to_range_value = |v: &crate::ast::types::BraceRangeValue| match v {
                    crate::ast::types::BraceRangeValue::Number(n) => RangeValue::Numeric(*n),
                    crate::ast::types::BraceRangeValue::Char(c) => RangeValue::Char(*c),
                };
                let expanded = expand_brace_range(
                    to_range_value(start),
                    to_range_value(end),
                    *step,
                    start_str.as_deref(),
                    end_str.as_deref(),
                );
                let values = match expanded {
                    Ok(result) => result.expanded.unwrap_or_else(|| vec![result.literal]),
                    Err(_) => continue,
                };
                for v in values {
                    let mut parts = word.parts.clone();
                    parts.splice(idx..idx + 1, std::iter::once(WordPart::Literal(LiteralPart { value: v })));
                    alt_words.push(WordNode { parts });
                }
            }
        }
    }
    Some(alt_words)
}

/// Expand a single word part, threading command-substitution output and
/// any stderr it produced back to the caller.
fn expand_part(
    state: &mut InterpreterState,
    part: &WordPart,
    options: &WordExpansionOptions,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> (String, String) {
    use crate::interpreter::helpers::word_parts::get_literal_value;
    use crate::interpreter::expansion::tilde::apply_tilde_expansion;
    use crate::interpreter::expansion::variable::get_variable;

    if let Some(literal) = get_literal_value(part) {
        return (literal.to_string(), String::new());
    }

    match part {
        WordPart::TildeExpansion(tilde) => {
            let tilde_str = match &tilde.user {
                Some(u) => format!("~{}", u),
                None => "~".to_string(),
            };
            if options.in_double_quotes {
                (tilde_str, String::new())
            } else {
                (apply_tilde_expansion(state, &tilde_str), String::new())
            }
        }
        WordPart::ParameterExpansion(param) => (get_variable(state, &param.parameter), String::new()),
        WordPart::DoubleQuoted(dq) => {
            let inner_options = WordExpansionOptions { in_double_quotes: true, ..options.clone() };
            let mut result = String::new();
            let mut stderr = String::new();
            for inner_part in &dq.parts {
                let (v, e) = expand_part(state, inner_part, &inner_options, fs, exec_fn);
                result.push_str(&v);
                stderr.push_str(&e);
            }
            (result, stderr)
        }
        WordPart::CommandSubstitution(cs) => expand_command_substitution(state, cs, fs, exec_fn),
        WordPart::ArithmeticExpansion(arith) => {
            use crate::interpreter::arithmetic::evaluate_arithmetic;
            use crate::interpreter::types::{ExecutionLimits, InterpreterContext};

            let limits = ExecutionLimits::default();
            let mut ctx = InterpreterContext::new(state, &limits);
            match evaluate_arithmetic(&mut ctx, &arith.expression.expression, false, None) {
                Ok(value) => (value.to_string(), String::new()),
                Err(e) => (String::new(), format!("{}\n", e)),
            }
        }
        WordPart::Glob(glob) => (glob.pattern.clone(), String::new()),
        // Resolved one level up by expand_braces; reaching here means a
        // nested/nonstandard shape we don't special-case.
        WordPart::BraceExpansion(_) => (String::new(), String::new()),
        WordPart::ProcessSubstitution(_) => (String::new(), String::new()),
        _ => (String::new(), String::new()),
    }
}

/// Strip at most one trailing newline from command-substitution output,
/// matching bash's `$(...)`/backtick capture (not all trailing newlines).
fn strip_one_trailing_newline(s: &str) -> String {
    match s.strip_suffix('\n') {
        Some(stripped) => stripped.to_string(),
        None => s.to_string(),
    }
}

/// Expand a `$(...)`/backtick command substitution. Special-cases the
/// `$(< file)` shorthand (read the file directly, no subprocess), and
/// otherwise defers to the caller-supplied execution callback.
fn expand_command_substitution(
    state: &mut InterpreterState,
    cs: &CommandSubstitutionPart,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> (String, String) {
    if let Some(file_word) = get_file_read_shorthand(&cs.body) {
        let options = WordExpansionOptions::default();
        let mut path = String::new();
        for part in &file_word.parts {
            let (v, _) = expand_part(state, part, &options, fs, exec_fn);
            path.push_str(&v);
        }
        let resolved = fs.resolve_path(&state.cwd, &path);
        return match fs.read_file(&resolved) {
            Ok(contents) => (strip_one_trailing_newline(&contents), String::new()),
            Err(e) => (String::new(), format!("bash: {}: {}\n", path, e)),
        };
    }

    match exec_fn {
        Some(f) => {
            let result = f(state, &cs.body);
            (strip_one_trailing_newline(&result.stdout), result.stderr)
        }
        None => (String::new(), String::new()),
    }
}

/// Check if a word is "fully quoted" - meaning glob characters should be treated literally.
///
/// A word is fully quoted if all its parts are either:
/// - SingleQuoted
/// - DoubleQuoted (entirely quoted variable expansion like "$pat")
/// - Escaped characters
pub fn is_word_fully_quoted(word: &WordNode) -> bool {
    use crate::interpreter::helpers::word_parts::is_quoted_part;

    // Empty word is considered quoted (matches empty pattern literally)
    if word.parts.is_empty() {
        return true;
    }

    // Check if we have any unquoted parts with actual content
    for part in &word.parts {
        if !is_quoted_part(part) {
            return false;
        }
    }
    true
}

/// Check if a word contains any glob patterns.
pub fn word_has_glob_pattern(word: &WordNode, extglob: bool) -> bool {
    use crate::interpreter::expansion::glob_escape::has_glob_pattern;

    for part in &word.parts {
        match part {
            WordPart::Glob(_) => return true,
            WordPart::Literal(lit) => {
                if has_glob_pattern(&lit.value, extglob) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Check if a word contains command substitution.
pub fn word_has_command_substitution(word: &WordNode) -> bool {
    for part in &word.parts {
        if matches!(part, WordPart::CommandSubstitution(_)) {
            return true;
        }
        if let WordPart::DoubleQuoted(dq) = part {
            for inner in &dq.parts {
                if matches!(inner, WordPart::CommandSubstitution(_)) {
                    return true;
                }
            }
        }
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{SingleQuotedPart, ParameterExpansionPart, GlobPart};
    use crate::fs::in_memory_fs::InMemoryFs;
    use crate::interpreter::sync_fs_adapter::SyncFsAdapter;
    use std::sync::Arc;

    fn make_literal_word(s: &str) -> WordNode {
        WordNode {
            parts: vec![WordPart::Literal(LiteralPart {
                value: s.to_string(),
            })],
        }
    }

    fn make_var_word(name: &str) -> WordNode {
        WordNode {
            parts: vec![WordPart::ParameterExpansion(ParameterExpansionPart {
                parameter: name.to_string(),
                operation: None,
            })],
        }
    }

    fn test_fs(handle: tokio::runtime::Handle) -> SyncFsAdapter {
        SyncFsAdapter::new(Arc::new(InMemoryFs::new()), handle)
    }

    #[tokio::test]
    async fn test_expand_word_literal() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        let word = make_literal_word("hello");
        let result = expand_word(&mut state, &word, &fs, None);
        assert_eq!(result.value, "hello");
    }

    #[tokio::test]
    async fn test_expand_word_variable() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        state.env.insert("FOO".to_string(), "bar".to_string());
        let word = make_var_word("FOO");
        let result = expand_word(&mut state, &word, &fs, None);
        assert_eq!(result.value, "bar");
    }

    #[tokio::test]
    async fn test_expand_word_unset_variable() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        let word = make_var_word("UNSET");
        let result = expand_word(&mut state, &word, &fs, None);
        assert_eq!(result.value, "");
    }

    #[tokio::test]
    async fn test_expand_word_with_glob_splits_on_ifs() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        state.env.insert("LIST".to_string(), "a b c".to_string());
        let word = make_var_word("LIST");
        let result = expand_word_with_glob(&mut state, &word, &fs, None);
        assert_eq!(result.split_words, Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[tokio::test]
    async fn test_expand_word_with_glob_no_split_for_single_word() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        let word = make_literal_word("hello");
        let result = expand_word_with_glob(&mut state, &word, &fs, None);
        assert_eq!(result.value, "hello");
        assert!(result.split_words.is_none());
    }

    #[tokio::test]
    async fn test_command_substitution_uses_callback() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        let word = WordNode {
            parts: vec![WordPart::CommandSubstitution(CommandSubstitutionPart {
                body: ScriptNode { statements: vec![] },
                legacy: false,
            })],
        };
        let cb: &CommandSubstFn = &|_state, _script| ExecResult::new("hi\n".to_string(), String::new(), 0);
        let result = expand_word(&mut state, &word, &fs, Some(cb));
        assert_eq!(result.value, "hi");
    }

    #[tokio::test]
    async fn test_command_substitution_strips_at_most_one_newline() {
        let mut state = InterpreterState::default();
        let fs = test_fs(tokio::runtime::Handle::current());
        let word = WordNode {
            parts: vec![WordPart::CommandSubstitution(CommandSubstitutionPart {
                body: ScriptNode { statements: vec![] },
                legacy: false,
            })],
        };
        let cb: &CommandSubstFn = &|_state, _script| ExecResult::new("a\n\n\n".to_string(), String::new(), 0);
        let result = expand_word(&mut state, &word, &fs, Some(cb));
        assert_eq!(result.value, "a\n\n");
    }

    #[tokio::test]
    async fn test_file_read_shorthand_goes_through_capability() {
        use crate::fs::FileSystem as AsyncFileSystem;
        use crate::parser::Parser;

        let mut state = InterpreterState::default();
        let inner = Arc::new(InMemoryFs::new());
        inner.write_file("/greeting.txt", b"hi\n").await.unwrap();
        let fs = SyncFsAdapter::new(inner, tokio::runtime::Handle::current());

        let script = Parser::new().parse("echo $(< /greeting.txt)").unwrap();
        let word = match &script.statements[0].pipelines[0].commands[0] {
            crate::ast::types::CommandNode::Simple(sc) => sc.args[0].clone(),
            _ => panic!("expected a simple command"),
        };
        let result = expand_word(&mut state, &word, &fs, None);
        assert_eq!(result.value, "hi");

        // A path outside the virtual filesystem must not be visible.
        let escape = Parser::new().parse("echo $(< /etc/passwd)").unwrap();
        let escape_word = match &escape.statements[0].pipelines[0].commands[0] {
            crate::ast::types::CommandNode::Simple(sc) => sc.args[0].clone(),
            _ => panic!("expected a simple command"),
        };
        let escape_result = expand_word(&mut state, &escape_word, &fs, None);
        assert_eq!(escape_result.value, "");
        assert!(!escape_result.stderr.is_empty());
    }

    #[test]
    fn test_is_word_fully_quoted_empty() {
        let word = WordNode { parts: vec![] };
        assert!(is_word_fully_quoted(&word));
    }

    #[test]
    fn test_is_word_fully_quoted_single_quoted() {
        let word = WordNode {
            parts: vec![WordPart::SingleQuoted(SingleQuotedPart {
                value: "hello".to_string(),
            })],
        };
        assert!(is_word_fully_quoted(&word));
    }

    #[test]
    fn test_is_word_fully_quoted_literal() {
        let word = make_literal_word("hello");
        assert!(!is_word_fully_quoted(&word));
    }

    #[test]
    fn test_word_has_glob_pattern() {
        let word = WordNode {
            parts: vec![WordPart::Glob(GlobPart {
                pattern: "*.txt".to_string(),
            })],
        };
        assert!(word_has_glob_pattern(&word, false));

        let word = make_literal_word("hello");
        assert!(!word_has_glob_pattern(&word, false));
    }

    #[test]
    fn test_word_has_command_substitution() {
        let word = WordNode {
            parts: vec![WordPart::CommandSubstitution(CommandSubstitutionPart {
                body: ScriptNode { statements: vec![] },
                legacy: false,
            })],
        };
        assert!(word_has_command_substitution(&word));

        let word = make_literal_word("hello");
        assert!(!word_has_command_substitution(&word));
    }
}
