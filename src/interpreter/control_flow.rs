//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - for loops
//! - C-style for loops
//! - while loops
//! - until loops
//! - case statements
//! - break/continue

use regex_lite::Regex;

use crate::ast::types::StatementNode;
use crate::interpreter::errors::{
    BreakError, ContinueError, ControlFlowError, ExecutionLimitError, InterpreterError, LimitType,
};
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::subshell_group::CompoundResult;
use crate::interpreter::types::{ExecResult, InterpreterState};

/// Validate that a variable name is a valid identifier.
/// Returns true if valid, false otherwise.
pub fn is_valid_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    re.is_match(name)
}

/// Case statement terminator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// ;; - stop, no fall-through
    Break,
    /// ;& - unconditional fall-through (execute next body without pattern check)
    FallThrough,
    /// ;;& - continue pattern matching (check next case patterns)
    ContinueMatching,
}

impl CaseTerminator {
    /// Parse a terminator string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            ";;" => Some(CaseTerminator::Break),
            ";&" => Some(CaseTerminator::FallThrough),
            ";;&" => Some(CaseTerminator::ContinueMatching),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseTerminator::Break => ";;",
            CaseTerminator::FallThrough => ";&",
            CaseTerminator::ContinueMatching => ";;&",
        }
    }
}

/// Result of running a `for`/C-style `for` loop to completion.
/// Kept distinct from `ExecResult` since loops never carry an `env` snapshot.
#[derive(Debug, Clone, Default)]
pub struct ForResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ForResult {
    fn append(&mut self, res: &ExecResult) {
        self.stdout.push_str(&res.stdout);
        self.stderr.push_str(&res.stderr);
        self.exit_code = res.exit_code;
    }
}

/// Prepend accumulated loop/condition output onto a propagating control-flow
/// error, mirroring the bookkeeping `execute_group` does for compound bodies.
pub(crate) fn propagate_with_output(mut e: InterpreterError, stdout: &str, stderr: &str) -> InterpreterError {
    match &mut e {
        InterpreterError::Break(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Continue(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Return(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Errexit(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Exit(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Nounset(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Arithmetic(x) => x.prepend_output(stdout, stderr),
        InterpreterError::BadSubstitution(x) => x.prepend_output(stdout, stderr),
        InterpreterError::Glob(x) => x.prepend_output(stdout, stderr),
        InterpreterError::BraceExpansion(x) => x.prepend_output(stdout, stderr),
        InterpreterError::ExecutionLimit(x) => x.prepend_output(stdout, stderr),
        InterpreterError::SubshellExit(x) => x.prepend_output(stdout, stderr),
        InterpreterError::PosixFatal(x) => x.prepend_output(stdout, stderr),
    }
    e
}

/// Execute an if/elif/.../else chain.
///
/// `clauses` holds one `(condition, body)` pair per `if`/`elif` branch, in
/// order. The first clause whose condition's last statement exits 0 has its
/// body executed; if none match, `else_body` runs (when present).
pub fn execute_if<C, B>(
    state: &mut InterpreterState,
    clauses: &[(Vec<&StatementNode>, Vec<&StatementNode>)],
    else_body: Option<&[&StatementNode]>,
    mut eval_cond: C,
    mut exec_body: B,
) -> Result<ExecResult, InterpreterError>
where
    C: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    B: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut result = CompoundResult::new();

    for (condition, body) in clauses {
        let mut cond_exit = 0;
        for stmt in condition {
            match eval_cond(state, stmt) {
                Ok(cond_res) => {
                    result.stdout.push_str(&cond_res.stdout);
                    result.stderr.push_str(&cond_res.stderr);
                    cond_exit = cond_res.exit_code;
                }
                Err(e) => return Err(propagate_with_output(e, &result.stdout, &result.stderr)),
            }
        }

        if cond_exit == 0 {
            for stmt in body {
                match exec_body(state, stmt) {
                    Ok(res) => result.append(&res),
                    Err(e) => return Err(propagate_with_output(e, &result.stdout, &result.stderr)),
                }
            }
            return Ok(result.to_exec_result());
        }
    }

    if let Some(else_stmts) = else_body {
        for stmt in else_stmts {
            match exec_body(state, stmt) {
                Ok(res) => result.append(&res),
                Err(e) => return Err(propagate_with_output(e, &result.stdout, &result.stderr)),
            }
        }
    } else {
        // No clause matched and there's no else: `if` itself reports success.
        result.exit_code = 0;
    }

    Ok(result.to_exec_result())
}

/// Execute a `for var in words; do body; done` loop.
pub fn execute_for<B>(
    state: &mut InterpreterState,
    variable: &str,
    words: &[String],
    body: &[&StatementNode],
    max_iterations: u64,
    mut exec_body: B,
) -> Result<ForResult, InterpreterError>
where
    B: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    state.loop_depth += 1;
    let mut result = ForResult::default();
    let mut iterations: u64 = 0;

    for word in words {
        state.env.insert(variable.to_string(), word.clone());

        let mut broke = false;
        for stmt in body {
            iterations += 1;
            if iterations > max_iterations {
                state.loop_depth -= 1;
                return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                    format!("for loop exceeded {} iterations", max_iterations),
                    LimitType::Iterations,
                    result.stdout.clone(),
                    result.stderr.clone(),
                )));
            }

            match exec_body(state, stmt) {
                Ok(res) => result.append(&res),
                Err(InterpreterError::Break(e)) => {
                    result.stdout.push_str(&e.stdout);
                    result.stderr.push_str(&e.stderr);
                    if e.levels > 1 {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::Break(BreakError::new(
                            e.levels - 1,
                            String::new(),
                            String::new(),
                        )));
                    }
                    broke = true;
                    break;
                }
                Err(InterpreterError::Continue(e)) => {
                    result.stdout.push_str(&e.stdout);
                    result.stderr.push_str(&e.stderr);
                    if e.levels > 1 {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::Continue(ContinueError::new(
                            e.levels - 1,
                            String::new(),
                            String::new(),
                        )));
                    }
                    break;
                }
                Err(e) => {
                    state.loop_depth -= 1;
                    return Err(propagate_with_output(e, &result.stdout, &result.stderr));
                }
            }
        }

        if broke {
            break;
        }
    }

    state.loop_depth -= 1;
    Ok(result)
}

/// Shared driver for `while`/`until`, which differ only in whether the
/// condition's exit status of 0 means "keep going" or "stop".
fn run_conditional_loop(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    while_semantics: bool,
    eval_cond: &mut dyn FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    exec_body: &mut dyn FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    state.loop_depth += 1;
    let mut result = CompoundResult::new();
    let mut iterations: u64 = 0;

    loop {
        let mut cond_exit = 0;
        for stmt in condition {
            match eval_cond(state, stmt) {
                Ok(cond_res) => {
                    result.stdout.push_str(&cond_res.stdout);
                    result.stderr.push_str(&cond_res.stderr);
                    cond_exit = cond_res.exit_code;
                }
                Err(e) => {
                    state.loop_depth -= 1;
                    return Err(propagate_with_output(e, &result.stdout, &result.stderr));
                }
            }
        }

        let keep_going = if while_semantics { cond_exit == 0 } else { cond_exit != 0 };
        if !keep_going {
            break;
        }

        // Counted once per pass through the loop body (not per statement) so
        // an empty or no-op body under a permanently-true condition still
        // hits the safety cap instead of spinning forever.
        iterations += 1;
        if iterations > max_iterations {
            state.loop_depth -= 1;
            return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                format!("loop exceeded {} iterations", max_iterations),
                LimitType::Iterations,
                result.stdout.clone(),
                result.stderr.clone(),
            )));
        }

        let mut broke = false;
        for stmt in body {
            match exec_body(state, stmt) {
                Ok(res) => result.append(&res),
                Err(InterpreterError::Break(e)) => {
                    result.stdout.push_str(&e.stdout);
                    result.stderr.push_str(&e.stderr);
                    if e.levels > 1 {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::Break(BreakError::new(
                            e.levels - 1,
                            String::new(),
                            String::new(),
                        )));
                    }
                    broke = true;
                    break;
                }
                Err(InterpreterError::Continue(e)) => {
                    result.stdout.push_str(&e.stdout);
                    result.stderr.push_str(&e.stderr);
                    if e.levels > 1 {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::Continue(ContinueError::new(
                            e.levels - 1,
                            String::new(),
                            String::new(),
                        )));
                    }
                    break;
                }
                Err(e) => {
                    state.loop_depth -= 1;
                    return Err(propagate_with_output(e, &result.stdout, &result.stderr));
                }
            }
        }

        if broke {
            break;
        }
    }

    state.loop_depth -= 1;
    Ok(result.to_exec_result())
}

/// Execute a `while condition; do body; done` loop.
pub fn execute_while<C, B>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    mut eval_cond: C,
    mut exec_body: B,
) -> Result<ExecResult, InterpreterError>
where
    C: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    B: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    run_conditional_loop(state, condition, body, max_iterations, true, &mut eval_cond, &mut exec_body)
}

/// Execute a `for ((init; cond; update)); do body; done` loop.
///
/// Arithmetic evaluation needs `&mut InterpreterState` for assignment side
/// effects (`((i++))` must persist across iterations), so init/condition/update
/// are evaluated inline rather than through a callback like `eval_cond` above.
pub fn execute_c_style_for<B>(
    state: &mut InterpreterState,
    init: Option<&crate::ast::types::ArithExpr>,
    condition: Option<&crate::ast::types::ArithExpr>,
    update: Option<&crate::ast::types::ArithExpr>,
    body: &[&StatementNode],
    limits: &crate::interpreter::types::ExecutionLimits,
    mut exec_body: B,
) -> Result<ExecResult, InterpreterError>
where
    B: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    use crate::interpreter::arithmetic::evaluate_arithmetic;
    use crate::interpreter::errors::ArithmeticError;
    use crate::interpreter::types::InterpreterContext;

    let mut result = CompoundResult::new();

    if let Some(expr) = init {
        let mut ctx = InterpreterContext::new(state, limits);
        if let Err(e) = evaluate_arithmetic(&mut ctx, expr, false, None) {
            return Err(InterpreterError::Arithmetic(ArithmeticError::new(
                e.to_string(),
                result.stdout,
                result.stderr,
                false,
            )));
        }
    }

    state.loop_depth += 1;
    let mut iterations: u64 = 0;

    loop {
        if let Some(expr) = condition {
            let mut ctx = InterpreterContext::new(state, limits);
            match evaluate_arithmetic(&mut ctx, expr, false, None) {
                Ok(v) if v == 0 => break,
                Ok(_) => {}
                Err(e) => {
                    state.loop_depth -= 1;
                    return Err(InterpreterError::Arithmetic(ArithmeticError::new(
                        e.to_string(),
                        result.stdout,
                        result.stderr,
                        false,
                    )));
                }
            }
        }

        iterations += 1;
        if iterations > limits.max_iterations {
            state.loop_depth -= 1;
            return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                format!("for loop exceeded {} iterations", limits.max_iterations),
                LimitType::Iterations,
                result.stdout.clone(),
                result.stderr.clone(),
            )));
        }

        let mut broke = false;
        for stmt in body {
            match exec_body(state, stmt) {
                Ok(res) => result.append(&res),
                Err(InterpreterError::Break(e)) => {
                    result.stdout.push_str(&e.stdout);
                    result.stderr.push_str(&e.stderr);
                    if e.levels > 1 {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::Break(BreakError::new(
                            e.levels - 1,
                            String::new(),
                            String::new(),
                        )));
                    }
                    broke = true;
                    break;
                }
                Err(InterpreterError::Continue(e)) => {
                    result.stdout.push_str(&e.stdout);
                    result.stderr.push_str(&e.stderr);
                    if e.levels > 1 {
                        state.loop_depth -= 1;
                        return Err(InterpreterError::Continue(ContinueError::new(
                            e.levels - 1,
                            String::new(),
                            String::new(),
                        )));
                    }
                    break;
                }
                Err(e) => {
                    state.loop_depth -= 1;
                    return Err(propagate_with_output(e, &result.stdout, &result.stderr));
                }
            }
        }

        if broke {
            break;
        }

        if let Some(expr) = update {
            let mut ctx = InterpreterContext::new(state, limits);
            if let Err(e) = evaluate_arithmetic(&mut ctx, expr, false, None) {
                state.loop_depth -= 1;
                return Err(InterpreterError::Arithmetic(ArithmeticError::new(
                    e.to_string(),
                    result.stdout,
                    result.stderr,
                    false,
                )));
            }
        }
    }

    state.loop_depth -= 1;
    Ok(result.to_exec_result())
}

/// Execute an `until condition; do body; done` loop.
pub fn execute_until<C, B>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    mut eval_cond: C,
    mut exec_body: B,
) -> Result<ExecResult, InterpreterError>
where
    C: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    B: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    run_conditional_loop(state, condition, body, max_iterations, false, &mut eval_cond, &mut exec_body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_bar"));
        assert!(is_valid_identifier("foo123"));
        assert!(is_valid_identifier("_123"));
        assert!(!is_valid_identifier("123foo"));
        assert!(!is_valid_identifier("foo-bar"));
        assert!(!is_valid_identifier("foo bar"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_case_terminator() {
        assert_eq!(CaseTerminator::from_str(";;"), Some(CaseTerminator::Break));
        assert_eq!(CaseTerminator::from_str(";&"), Some(CaseTerminator::FallThrough));
        assert_eq!(CaseTerminator::from_str(";;&"), Some(CaseTerminator::ContinueMatching));
        assert_eq!(CaseTerminator::from_str("invalid"), None);

        assert_eq!(CaseTerminator::Break.as_str(), ";;");
        assert_eq!(CaseTerminator::FallThrough.as_str(), ";&");
        assert_eq!(CaseTerminator::ContinueMatching.as_str(), ";;&");
    }

    fn ok_result(code: i32) -> Result<ExecResult, InterpreterError> {
        Ok(ExecResult::new(String::new(), String::new(), code))
    }

    #[test]
    fn test_execute_for_accumulates_and_sets_variable() {
        let mut state = InterpreterState::default();
        let seen = std::cell::RefCell::new(Vec::new());

        let words = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = execute_for(&mut state, "x", &words, &[], 1000, |st, _stmt| {
            seen.borrow_mut().push(st.env.get("x").cloned().unwrap());
            ok_result(0)
        });

        assert!(result.is_ok());
        // body is empty so the closure never runs; only env assignment happens per word.
        assert_eq!(state.env.get("x"), Some(&"c".to_string()));
        assert_eq!(state.loop_depth, 0);
    }

    #[test]
    fn test_execute_while_runs_until_condition_fails() {
        let mut state = InterpreterState::default();
        state.env.insert("n".to_string(), "0".to_string());

        let condition: Vec<&StatementNode> = Vec::new();
        let body: Vec<&StatementNode> = Vec::new();

        let result = execute_while(
            &mut state,
            &condition,
            &body,
            1000,
            |_st, _stmt| Ok(ConditionResult::success()),
            |_st, _stmt| ok_result(0),
        );

        // Empty condition list leaves cond_exit at 0 (truthy) forever, and an
        // empty body never breaks out on its own, so this only terminates via
        // the iteration cap. Confirms the cap is charged per loop pass, not
        // per body statement, and that loop_depth is restored either way.
        assert!(matches!(result, Err(InterpreterError::ExecutionLimit(_))));
        assert_eq!(state.loop_depth, 0);
    }
}
