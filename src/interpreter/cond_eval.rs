//! Evaluator for `[[ ... ]]` conditional expressions.
//!
//! The AST tree (`ConditionalExpressionNode`) is produced by the parser;
//! this module walks it and reuses the same comparison helpers the
//! `test`/`[` builtin would reach for, consolidated under `helpers/`.

use crate::ast::types::{
    CondBinaryNode, CondBinaryOperator, CondUnaryNode, CondUnaryOperator, ConditionalExpressionNode,
};
use crate::interpreter::conditionals::{evaluate_shell_option, match_pattern, posix_ere_to_regex};
use crate::interpreter::helpers::numeric_compare::compare_numeric_str;
use crate::interpreter::helpers::string_tests::{evaluate_string_test, StringTestOp};
use crate::interpreter::helpers::variable_tests::{evaluate_nameref_test, evaluate_variable_test};
use crate::interpreter::interpreter::FileSystem as SyncFileSystem;
use crate::interpreter::types::InterpreterState;
use crate::interpreter::word_expansion::{expand_word, is_word_fully_quoted, CommandSubstFn};
use regex_lite::Regex;

/// Result of evaluating a `[[ ]]` expression: truth value plus any stderr
/// accumulated from word expansion (e.g. command substitution failures).
pub struct CondEvalResult {
    pub truth: bool,
    pub stderr: String,
}

pub fn evaluate_conditional(
    state: &mut InterpreterState,
    expr: &ConditionalExpressionNode,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> CondEvalResult {
    match expr {
        ConditionalExpressionNode::Word(w) => {
            let result = expand_word(state, &w.word, fs, exec_fn);
            CondEvalResult { truth: !result.value.is_empty(), stderr: result.stderr }
        }
        ConditionalExpressionNode::Not(n) => {
            let inner = evaluate_conditional(state, &n.operand, fs, exec_fn);
            CondEvalResult { truth: !inner.truth, stderr: inner.stderr }
        }
        ConditionalExpressionNode::And(n) => {
            let left = evaluate_conditional(state, &n.left, fs, exec_fn);
            if !left.truth {
                return left;
            }
            let right = evaluate_conditional(state, &n.right, fs, exec_fn);
            CondEvalResult { truth: right.truth, stderr: left.stderr + &right.stderr }
        }
        ConditionalExpressionNode::Or(n) => {
            let left = evaluate_conditional(state, &n.left, fs, exec_fn);
            if left.truth {
                return left;
            }
            let right = evaluate_conditional(state, &n.right, fs, exec_fn);
            CondEvalResult { truth: right.truth, stderr: left.stderr + &right.stderr }
        }
        ConditionalExpressionNode::Group(g) => evaluate_conditional(state, &g.expression, fs, exec_fn),
        ConditionalExpressionNode::Unary(u) => evaluate_unary(state, u, fs, exec_fn),
        ConditionalExpressionNode::Binary(b) => evaluate_binary(state, b, fs, exec_fn),
    }
}

fn evaluate_unary(
    state: &mut InterpreterState,
    u: &CondUnaryNode,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> CondEvalResult {
    use CondUnaryOperator::*;

    let expanded = expand_word(state, &u.operand, fs, exec_fn);
    let value = expanded.value;
    let mut stderr = expanded.stderr;

    let resolved = fs.resolve_path(&state.cwd, &value);

    let truth = match u.operator {
        A | E => fs.exists(&resolved),
        F => fs.is_file(&resolved),
        D => fs.is_dir(&resolved),
        R => fs.stat(&resolved).map(|st| st.mode & 0o444 != 0).unwrap_or(false),
        W => fs.stat(&resolved).map(|st| st.mode & 0o222 != 0).unwrap_or(false),
        X => fs.stat(&resolved).map(|st| st.mode & 0o111 != 0).unwrap_or(false),
        S => fs.stat(&resolved).map(|st| st.size > 0).unwrap_or(false),
        H | L => fs.stat(&resolved).map(|st| st.is_symlink).unwrap_or(false),
        K => fs.stat(&resolved).map(|st| st.mode & 0o1000 != 0).unwrap_or(false),
        G => fs.stat(&resolved).map(|st| st.mode & 0o2000 != 0).unwrap_or(false),
        U => fs.stat(&resolved).map(|st| st.mode & 0o4000 != 0).unwrap_or(false),
        B | C | P | UpperS | UpperG | UpperO | N => false,
        T => false,
        Z => evaluate_string_test(StringTestOp::Empty, &value),
        LowerN => evaluate_string_test(StringTestOp::NonEmpty, &value),
        LowerO => evaluate_shell_option(state, &value),
        V => {
            let (truth, warn) = evaluate_variable_test(state, &state.env, &value, Some(state.current_line as i32));
            if let Some(w) = warn {
                stderr.push_str(&w);
            }
            truth
        }
        UpperR => evaluate_nameref_test(state, &value),
    };

    CondEvalResult { truth, stderr }
}

fn evaluate_binary(
    state: &mut InterpreterState,
    b: &CondBinaryNode,
    fs: &dyn SyncFileSystem,
    exec_fn: Option<&CommandSubstFn>,
) -> CondEvalResult {
    use CondBinaryOperator::*;

    let left = expand_word(state, &b.left, fs, exec_fn);
    let right_quoted = is_word_fully_quoted(&b.right);
    let right = expand_word(state, &b.right, fs, exec_fn);
    let mut stderr = left.stderr + &right.stderr;

    let truth = match b.operator {
        Eq | EqEq => {
            if right_quoted {
                left.value == right.value
            } else {
                match_pattern(&left.value, &right.value, state.shopt_options.nocasematch, state.shopt_options.extglob)
            }
        }
        Ne => {
            if right_quoted {
                left.value != right.value
            } else {
                !match_pattern(&left.value, &right.value, state.shopt_options.nocasematch, state.shopt_options.extglob)
            }
        }
        Match => {
            let pattern = posix_ere_to_regex(&right.value);
            let re = if state.shopt_options.nocasematch {
                Regex::new(&format!("(?i){}", pattern))
            } else {
                Regex::new(&pattern)
            };
            match re {
                Ok(re) => {
                    if let Some(caps) = re.captures(&left.value) {
                        state.env.insert("BASH_REMATCH_0".to_string(), caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default());
                        for i in 1..caps.len() {
                            state.env.insert(format!("BASH_REMATCH_{}", i), caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default());
                        }
                        true
                    } else {
                        false
                    }
                }
                Err(e) => {
                    stderr.push_str(&format!("bash: {}: invalid regex: {}\n", right.value, e));
                    false
                }
            }
        }
        Lt => left.value < right.value,
        Gt => left.value > right.value,
        NumEq | NumNe | NumLt | NumLe | NumGt | NumGe => {
            use crate::interpreter::conditionals::parse_numeric;
            let l = parse_numeric(&left.value);
            let r = parse_numeric(&right.value);
            let op = match b.operator {
                NumEq => "-eq",
                NumNe => "-ne",
                NumLt => "-lt",
                NumLe => "-le",
                NumGt => "-gt",
                NumGe => "-ge",
                _ => unreachable!(),
            };
            compare_numeric_str(op, l, r).unwrap_or(false)
        }
        Nt => {
            let lm = fs.stat(&fs.resolve_path(&state.cwd, &left.value)).map(|s| s.mtime);
            let rm = fs.stat(&fs.resolve_path(&state.cwd, &right.value)).map(|s| s.mtime);
            match (lm, rm) {
                (Ok(l), Ok(r)) => l > r,
                (Ok(_), Err(_)) => true,
                _ => false,
            }
        }
        Ot => {
            let lm = fs.stat(&fs.resolve_path(&state.cwd, &left.value)).map(|s| s.mtime);
            let rm = fs.stat(&fs.resolve_path(&state.cwd, &right.value)).map(|s| s.mtime);
            match (lm, rm) {
                (Ok(l), Ok(r)) => l < r,
                (Err(_), Ok(_)) => true,
                _ => false,
            }
        }
        Ef => {
            fs.resolve_path(&state.cwd, &left.value) == fs.resolve_path(&state.cwd, &right.value)
                && fs.exists(&fs.resolve_path(&state.cwd, &left.value))
        }
    };

    CondEvalResult { truth, stderr }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{CondWordNode, LiteralPart, WordNode, WordPart};
    use crate::fs::InMemoryFs;
    use crate::interpreter::sync_fs_adapter::SyncFsAdapter;
    use std::sync::Arc;

    fn literal_word(s: &str) -> WordNode {
        WordNode { parts: vec![WordPart::Literal(LiteralPart { value: s.to_string() })] }
    }

    #[tokio::test]
    async fn test_word_truthiness() {
        let mut state = InterpreterState::default();
        let fs: Arc<InMemoryFs> = Arc::new(InMemoryFs::new());
        let adapter = SyncFsAdapter::new(fs, tokio::runtime::Handle::current());

        let expr = ConditionalExpressionNode::Word(CondWordNode { word: literal_word("hello") });
        let result = evaluate_conditional(&mut state, &expr, &adapter, None);
        assert!(result.truth);

        let expr = ConditionalExpressionNode::Word(CondWordNode { word: literal_word("") });
        let result = evaluate_conditional(&mut state, &expr, &adapter, None);
        assert!(!result.truth);
    }

    #[tokio::test]
    async fn test_string_equality() {
        let mut state = InterpreterState::default();
        let fs: Arc<InMemoryFs> = Arc::new(InMemoryFs::new());
        let adapter = SyncFsAdapter::new(fs, tokio::runtime::Handle::current());

        let expr = ConditionalExpressionNode::Binary(CondBinaryNode {
            operator: CondBinaryOperator::EqEq,
            left: literal_word("foo"),
            right: literal_word("foo"),
        });
        assert!(evaluate_conditional(&mut state, &expr, &adapter, None).truth);

        let expr = ConditionalExpressionNode::Binary(CondBinaryNode {
            operator: CondBinaryOperator::Ne,
            left: literal_word("foo"),
            right: literal_word("bar"),
        });
        assert!(evaluate_conditional(&mut state, &expr, &adapter, None).truth);
    }

    #[tokio::test]
    async fn test_numeric_comparison() {
        let mut state = InterpreterState::default();
        let fs: Arc<InMemoryFs> = Arc::new(InMemoryFs::new());
        let adapter = SyncFsAdapter::new(fs, tokio::runtime::Handle::current());

        let expr = ConditionalExpressionNode::Binary(CondBinaryNode {
            operator: CondBinaryOperator::NumGt,
            left: literal_word("5"),
            right: literal_word("3"),
        });
        assert!(evaluate_conditional(&mut state, &expr, &adapter, None).truth);
    }

    #[tokio::test]
    async fn test_and_short_circuits() {
        let mut state = InterpreterState::default();
        let fs: Arc<InMemoryFs> = Arc::new(InMemoryFs::new());
        let adapter = SyncFsAdapter::new(fs, tokio::runtime::Handle::current());

        let expr = ConditionalExpressionNode::And(Box::new(crate::ast::types::CondAndNode {
            left: ConditionalExpressionNode::Word(CondWordNode { word: literal_word("") }),
            right: ConditionalExpressionNode::Word(CondWordNode { word: literal_word("anything") }),
        }));
        assert!(!evaluate_conditional(&mut state, &expr, &adapter, None).truth);
    }

    #[tokio::test]
    async fn test_string_test_operators() {
        let mut state = InterpreterState::default();
        let fs: Arc<InMemoryFs> = Arc::new(InMemoryFs::new());
        let adapter = SyncFsAdapter::new(fs, tokio::runtime::Handle::current());

        let expr = ConditionalExpressionNode::Unary(CondUnaryNode {
            operator: CondUnaryOperator::Z,
            operand: literal_word(""),
        });
        assert!(evaluate_conditional(&mut state, &expr, &adapter, None).truth);

        let expr = ConditionalExpressionNode::Unary(CondUnaryNode {
            operator: CondUnaryOperator::LowerN,
            operand: literal_word("x"),
        });
        assert!(evaluate_conditional(&mut state, &expr, &adapter, None).truth);
    }
}
