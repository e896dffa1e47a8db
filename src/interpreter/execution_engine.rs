//! Execution Engine
//!
//! The core execution engine that ties all interpreter components together.
//! Implements the full AST execution chain:
//!
//! execute_script -> execute_statement -> execute_pipeline -> execute_command

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::types::{
    CommandNode, CompoundCommandNode, PipelineNode, RedirectionOperator, RedirectionTarget,
    ScriptNode, SimpleCommandNode, StatementNode, StatementOperator,
};
use crate::commands::registry::CommandRegistry;
use crate::commands::{CommandContext, CommandResult};
use crate::fs::FileSystem as AsyncFileSystem;
use crate::interpreter::builtins;
use crate::interpreter::control_flow::{execute_c_style_for, execute_for, execute_if, execute_while, execute_until, ForResult};
use crate::interpreter::errors::{InterpreterError, ErrexitError, ExitError, ControlFlowError};
use crate::interpreter::functions::{call_function, execute_function_def};
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::interpreter::{
    check_command_limit, should_trigger_errexit, update_exit_code,
    FileSystem as SyncFileSystem,
};
use crate::interpreter::pipeline_execution::{execute_pipeline, PipelineOptions, PipelineState, set_pipestatus};
use crate::interpreter::subshell_group::{execute_group, execute_subshell};
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterState};
use crate::interpreter::word_expansion::{expand_word, expand_word_with_glob};

fn from_builtin(r: builtins::BuiltinResult) -> ExecResult {
    ExecResult::new(r.stdout, r.stderr, r.exit_code)
}

/// Bind an `ExecutionEngine` into the `CommandSubstFn` shape `word_expansion`
/// needs: command substitution runs in a subshell, so the callback clones
/// the caller's state rather than mutating it, matching `execute_subshell`'s
/// isolation of variable assignments made inside `$(...)`.
fn command_subst_closure<'a, 'b>(
    engine: &'b ExecutionEngine<'a>,
) -> impl Fn(&InterpreterState, &ScriptNode) -> ExecResult + 'b {
    move |state: &InterpreterState, script: &ScriptNode| {
        let mut subshell_state = state.clone();
        match engine.execute_script(&mut subshell_state, script) {
            Ok(result) => result,
            Err(e) => {
                let (stdout, stderr) = control_flow_error_output(&e);
                ExecResult::new(stdout, stderr, 1)
            }
        }
    }
}

/// Pull the accumulated stdout/stderr out of any `InterpreterError` variant,
/// since they don't share a common field and the unified enum doesn't
/// implement `ControlFlowError` itself.
fn control_flow_error_output(e: &InterpreterError) -> (String, String) {
    match e {
        InterpreterError::Break(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Continue(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Return(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Errexit(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Nounset(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Exit(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Arithmetic(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::BadSubstitution(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::Glob(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::BraceExpansion(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::ExecutionLimit(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::SubshellExit(x) => (x.stdout.clone(), x.stderr.clone()),
        InterpreterError::PosixFatal(x) => (x.stdout.clone(), x.stderr.clone()),
    }
}

/// The execution engine that ties all interpreter components together.
pub struct ExecutionEngine<'a> {
    /// Execution limits (max commands, recursion depth, iterations)
    pub limits: &'a ExecutionLimits,
    /// Sync filesystem interface, used by control-flow and builtin helpers
    pub fs: &'a dyn SyncFileSystem,
    /// Async filesystem shared with the rest of the process; bridged into
    /// synchronous calls the same way `SyncFsAdapter` bridges `self.fs`.
    pub async_fs: Arc<dyn AsyncFileSystem>,
    /// Handle back into the tokio runtime driving `async_fs` and the
    /// command registry's async `Command::execute`.
    pub handle: tokio::runtime::Handle,
    /// Simulated external/basic-utility commands (cat, ls, jq, git, ...).
    pub registry: &'a CommandRegistry,
}

impl<'a> ExecutionEngine<'a> {
    /// Create a new execution engine.
    pub fn new(
        limits: &'a ExecutionLimits,
        fs: &'a dyn SyncFileSystem,
        async_fs: Arc<dyn AsyncFileSystem>,
        handle: tokio::runtime::Handle,
        registry: &'a CommandRegistry,
    ) -> Self {
        Self { limits, fs, async_fs, handle, registry }
    }

    fn block_on<F: std::future::Future>(&self, f: F) -> F::Output {
        let handle = self.handle.clone();
        tokio::task::block_in_place(|| handle.block_on(f))
    }

    /// Execute a complete script (list of statements).
    pub fn execute_script(
        &self,
        state: &mut InterpreterState,
        ast: &ScriptNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for statement in &ast.statements {
            match self.execute_statement(state, statement) {
                Ok(result) => {
                    stdout.push_str(&result.stdout);
                    stderr.push_str(&result.stderr);
                    exit_code = result.exit_code;
                    update_exit_code(state, exit_code);
                }
                Err(InterpreterError::Exit(e)) => {
                    // ExitError propagates up to terminate the script
                    let mut err = e;
                    err.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Exit(err));
                }
                Err(InterpreterError::ExecutionLimit(e)) => {
                    // ExecutionLimitError must always propagate
                    return Err(InterpreterError::ExecutionLimit(e));
                }
                Err(InterpreterError::Errexit(e)) => {
                    // Errexit terminates the script
                    stdout.push_str(&e.stdout);
                    stderr.push_str(&e.stderr);
                    exit_code = e.exit_code;
                    return Ok(ExecResult::new(stdout, stderr, exit_code));
                }
                Err(InterpreterError::Break(mut e)) => {
                    // Break/continue outside loops - silently continue
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Continue(mut e)) => {
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Return(mut e)) => {
                    // Return outside function - propagate
                    e.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Return(e));
                }
                Err(e) => {
                    // Other errors - convert to result
                    stderr.push_str(&format!("{}\n", e));
                    exit_code = 1;
                }
            }
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a single statement (list of pipelines with && || operators).
    pub fn execute_statement(
        &self,
        state: &mut InterpreterState,
        stmt: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        // Handle deferred syntax errors
        if let Some(ref err) = stmt.deferred_error {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: syntax error near unexpected token `{}'\n", err.token),
                2,
            ));
        }

        // noexec mode (set -n): parse but don't execute
        if state.options.noexec {
            return Ok(ExecResult::ok());
        }

        // Reset errexit_safe at start of each statement
        state.errexit_safe = Some(false);

        let mut stdout = String::new();
        let mut stderr = String::new();

        // verbose mode (set -v): print source before execution
        if state.options.verbose {
            if let Some(ref source) = stmt.source_text {
                stderr.push_str(source);
                stderr.push('\n');
            }
        }

        let mut exit_code = 0;
        let mut last_executed_index: i32 = -1;
        let mut last_pipeline_negated = false;

        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            // Check && / || short-circuit
            if i > 0 {
                let op = &stmt.operators[i - 1];
                match op {
                    StatementOperator::And => {
                        if exit_code != 0 {
                            continue;
                        }
                    }
                    StatementOperator::Or => {
                        if exit_code == 0 {
                            continue;
                        }
                    }
                    StatementOperator::Semi => {
                        // Always execute
                    }
                }
            }

            let result = self.execute_pipeline_node(state, pipeline)?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            exit_code = result.exit_code;
            last_executed_index = i as i32;
            last_pipeline_negated = pipeline.negated;

            update_exit_code(state, exit_code);
        }

        // Check errexit
        let was_short_circuited = last_executed_index < (stmt.pipelines.len() as i32 - 1);
        let inner_was_safe = state.errexit_safe.unwrap_or(false);

        if should_trigger_errexit(state, exit_code, was_short_circuited, last_pipeline_negated)
            && !inner_was_safe
        {
            return Err(InterpreterError::Errexit(ErrexitError::new(
                exit_code, stdout, stderr,
            )));
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a pipeline (list of commands connected by |).
    pub fn execute_pipeline_node(
        &self,
        state: &mut InterpreterState,
        pipeline: &PipelineNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut pipe_state = PipelineState::new();
        let pipe_stderr = pipeline.pipe_stderr.clone().unwrap_or_default();

        let options = PipelineOptions {
            pipefail: state.options.pipefail,
            lastpipe: state.shopt_options.lastpipe,
            runs_in_subshell: false,
            time_pipeline: pipeline.timed,
            time_posix_format: pipeline.time_posix,
        };

        // We need to pass state through the closure, but execute_pipeline
        // takes ownership of the closure. Use a RefCell pattern.
        use std::cell::RefCell;
        let state_cell = RefCell::new(state);

        let result = execute_pipeline(
            &mut pipe_state,
            &pipeline.commands,
            &pipe_stderr,
            &options,
            |cmd, stdin| {
                let state = &mut *state_cell.borrow_mut();
                self.execute_command(state, cmd, stdin)
            },
        )?;

        // Get state back
        let state = state_cell.into_inner();

        // Set PIPESTATUS
        set_pipestatus(&mut state.env, &result.exit_codes);

        let mut exec_result = result.to_exec_result();

        // Handle negation
        if pipeline.negated {
            exec_result.exit_code = if exec_result.exit_code == 0 { 1 } else { 0 };
        }

        Ok(exec_result)
    }

    /// Execute a single command.
    pub fn execute_command(
        &self,
        state: &mut InterpreterState,
        cmd: &CommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Check command limit
        if let Some(msg) = check_command_limit(state, self.limits) {
            return Err(InterpreterError::ExecutionLimit(
                crate::interpreter::errors::ExecutionLimitError::simple(
                    msg,
                    crate::interpreter::errors::LimitType::Commands,
                ),
            ));
        }

        match cmd {
            CommandNode::Simple(simple) => self.execute_simple_command(state, simple, stdin),
            CommandNode::Compound(compound) => {
                self.execute_compound_command(state, compound, stdin)
            }
            CommandNode::FunctionDef(func_def) => {
                let current_source = state.current_source.clone();
                execute_function_def(state, func_def, current_source.as_deref())
                    .map_err(InterpreterError::Exit)
            }
        }
    }

    /// Execute a simple command (name + args + redirections).
    ///
    /// Resolution order mirrors bash: special builtins (break/continue/
    /// return/exit/shift/set), then user-defined functions, then ordinary
    /// builtins, then the simulated external-command registry.
    pub fn execute_simple_command(
        &self,
        state: &mut InterpreterState,
        cmd: &SimpleCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        if let Some(line) = cmd.line {
            state.current_line = line as u32;
        }

        // Name-less commands are plain assignments: `FOO=bar BAZ=qux`.
        // Bash persists these directly into the current scope.
        if cmd.name.is_none() {
            for assignment in &cmd.assignments {
                self.apply_assignment(state, assignment);
            }
            return Ok(ExecResult::ok());
        }

        let cmd_subst = command_subst_closure(self);
        let cmd_name = expand_word(state, cmd.name.as_ref().unwrap(), self.fs, Some(&cmd_subst)).value;

        // Prefix assignments (`VAR=val cmd ...`) apply to the command's
        // environment; for builtins/functions that means the current scope,
        // since there is no real subprocess to scope them to.
        for assignment in &cmd.assignments {
            self.apply_assignment(state, assignment);
        }

        let mut args: Vec<String> = Vec::new();
        for arg in &cmd.args {
            let result = expand_word_with_glob(state, arg, self.fs, Some(&cmd_subst));
            if let Some(words) = result.split_words {
                args.extend(words);
            } else {
                args.push(result.value);
            }
        }

        let (effective_stdin, out_redirects) = self.resolve_redirections(state, cmd, stdin)?;

        let result = self.dispatch_command(state, &cmd_name, &args, &effective_stdin)?;

        self.write_output_redirections(&out_redirects, &result)
    }

    /// Resolve a command's redirections into (effective stdin, output
    /// targets). Output targets are applied after the command runs, since
    /// the result's stdout/stderr strings are only known then.
    fn resolve_redirections(
        &self,
        state: &mut InterpreterState,
        cmd: &SimpleCommandNode,
        stdin: &str,
    ) -> Result<(String, Vec<(u8, String, bool)>), InterpreterError> {
        let mut effective_stdin = stdin.to_string();
        let mut out_redirects: Vec<(u8, String, bool)> = Vec::new();
        let cmd_subst = command_subst_closure(self);

        for redir in &cmd.redirections {
            let fd = redir.fd.unwrap_or(match redir.operator {
                RedirectionOperator::Less | RedirectionOperator::LessAnd
                | RedirectionOperator::LessGreat | RedirectionOperator::TLess
                | RedirectionOperator::DLess | RedirectionOperator::DLessDash => 0,
                _ => 1,
            });

            let target = match &redir.target {
                RedirectionTarget::Word(word) => expand_word(state, word, self.fs, Some(&cmd_subst)).value,
                // A quoted heredoc delimiter (`<<'EOF'`) suppresses expansion
                // at parse time, so the content's parts are already literal.
                RedirectionTarget::HereDoc(heredoc) => expand_word(state, &heredoc.content, self.fs, Some(&cmd_subst)).value,
            };

            match redir.operator {
                RedirectionOperator::Less => {
                    let path = self.fs.resolve_path(&state.cwd, &target);
                    effective_stdin = self.fs.read_file(&path).unwrap_or_default();
                }
                RedirectionOperator::DLess | RedirectionOperator::DLessDash
                | RedirectionOperator::TLess => {
                    effective_stdin = target;
                }
                RedirectionOperator::Great | RedirectionOperator::Clobber => {
                    out_redirects.push((fd as u8, self.fs.resolve_path(&state.cwd, &target), false));
                }
                RedirectionOperator::DGreat => {
                    out_redirects.push((fd as u8, self.fs.resolve_path(&state.cwd, &target), true));
                }
                RedirectionOperator::AndGreat => {
                    let path = self.fs.resolve_path(&state.cwd, &target);
                    out_redirects.push((1, path.clone(), false));
                    out_redirects.push((2, path, false));
                }
                RedirectionOperator::AndDGreat => {
                    let path = self.fs.resolve_path(&state.cwd, &target);
                    out_redirects.push((1, path.clone(), true));
                    out_redirects.push((2, path, true));
                }
                RedirectionOperator::GreatAnd | RedirectionOperator::LessAnd
                | RedirectionOperator::LessGreat => {
                    // fd-to-fd duplication (2>&1 and friends): no distinct
                    // target file to open, handled by the caller merging
                    // streams where it matters.
                }
            }
        }

        Ok((effective_stdin, out_redirects))
    }

    fn write_output_redirections(
        &self,
        redirects: &[(u8, String, bool)],
        result: &ExecResult,
    ) -> Result<ExecResult, InterpreterError> {
        if redirects.is_empty() {
            return Ok(result.clone());
        }

        let mut stdout = result.stdout.clone();
        let mut stderr = result.stderr.clone();

        for (fd, path, append) in redirects {
            let content = match fd {
                1 => { let c = stdout.clone(); stdout.clear(); c }
                2 => { let c = stderr.clone(); stderr.clear(); c }
                _ => continue,
            };
            let write = if *append {
                self.async_fs.append_file(path, content.as_bytes())
            } else {
                self.async_fs.write_file(path, content.as_bytes())
            };
            if let Err(e) = self.block_on(write) {
                stderr.push_str(&format!("bash: {}: {}\n", path, e));
            }
        }

        Ok(ExecResult::new(stdout, stderr, result.exit_code))
    }

    fn apply_assignment(&self, state: &mut InterpreterState, assignment: &crate::ast::types::AssignmentNode) {
        let cmd_subst = command_subst_closure(self);
        let value = match &assignment.value {
            Some(word) => expand_word(state, word, self.fs, Some(&cmd_subst)).value,
            None => String::new(),
        };
        if assignment.append {
            let existing = state.env.get(&assignment.name).cloned().unwrap_or_default();
            state.env.insert(assignment.name.clone(), format!("{}{}", existing, value));
        } else {
            state.env.insert(assignment.name.clone(), value);
        }
    }

    /// Special builtins (break/continue/return/exit/shift/set) bypass
    /// function-name lookup entirely, matching bash's reserved-word-like
    /// treatment of them; everything else goes through the normal chain.
    fn dispatch_command(
        &self,
        state: &mut InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match cmd_name {
            "break" => return Ok(from_builtin(builtins::handle_break(state, args)?)),
            "continue" => return Ok(from_builtin(builtins::handle_continue(state, args)?)),
            "return" => return Ok(from_builtin(builtins::handle_return(state, args)?)),
            "exit" => return Err(builtins::handle_exit(state, args).unwrap_err()),
            "shift" => return Ok(from_builtin(builtins::handle_shift(state, args)?)),
            "set" => return Ok(from_builtin(builtins::handle_set(state, args)?)),
            _ => {}
        }

        if let Some(func) = state.functions.get(cmd_name).cloned() {
            return call_function(state, &func, args, stdin, Some(state.current_line), self.limits.max_recursion_depth, |state, stdin| {
                self.execute_compound_command(state, &func.body, stdin)
            });
        }

        match cmd_name {
            "cd" => return Ok(builtins::handle_cd(state, args)),
            "local" => return Ok(builtins::handle_local(state, args)),
            "unset" => return Ok(builtins::handle_unset(state, args)),
            "export" => return Ok(from_builtin(builtins::handle_export(state, args))),
            "declare" | "typeset" => return Ok(from_builtin(builtins::handle_declare(state, args))),
            "readonly" => return Ok(from_builtin(builtins::handle_readonly(state, args))),
            "shopt" => return Ok(from_builtin(builtins::handle_shopt(state, args))),
            "let" => return Ok(from_builtin(builtins::handle_let(state, args))),
            "read" => return Ok(from_builtin(builtins::handle_read(state, args, stdin, -1))),
            "getopts" => return Ok(from_builtin(builtins::handle_getopts(state, args))),
            "hash" => return Ok(from_builtin(builtins::handle_hash(state, args))),
            "help" => return Ok(from_builtin(builtins::handle_help(args))),
            "pushd" => return Ok(from_builtin(builtins::handle_pushd(state, args))),
            "popd" => return Ok(from_builtin(builtins::handle_popd(state, args))),
            "dirs" => return Ok(from_builtin(builtins::handle_dirs(state, args))),
            "mapfile" | "readarray" => return Ok(from_builtin(builtins::handle_mapfile(state, args, stdin))),
            _ => {}
        }

        // `command`/`builtin`/`exec` re-enter dispatch directly rather than
        // through `dispatch_builtin`'s `run_command` callback, since `state`
        // is already borrowed mutably here and the callback's signature
        // can't thread a second mutable borrow through without a RefCell
        // that `command`/`builtin` would then re-borrow reentrantly.
        match cmd_name {
            "command" => {
                let mut rest = args.to_vec();
                while rest.first().map(|s| s.as_str()) == Some("-p")
                    || rest.first().map(|s| s.as_str()) == Some("-v")
                    || rest.first().map(|s| s.as_str()) == Some("-V")
                {
                    rest.remove(0);
                }
                if rest.first().map(|s| s.as_str()) == Some("--") {
                    rest.remove(0);
                }
                return match rest.split_first() {
                    Some((name, rest_args)) => self.run_external(state, name, rest_args, stdin),
                    None => Ok(ExecResult::ok()),
                };
            }
            "builtin" => {
                return match args.split_first() {
                    Some((name, rest_args)) => self.dispatch_command(state, name, rest_args, stdin),
                    None => Ok(ExecResult::ok()),
                };
            }
            "exec" => {
                return match args.split_first() {
                    Some((name, rest_args)) => self.dispatch_command(state, name, rest_args, stdin),
                    None => Ok(ExecResult::ok()),
                };
            }
            "wait" => return Ok(ExecResult::ok()),
            ":" | "true" => return Ok(ExecResult::ok()),
            "false" => return Ok(ExecResult::new(String::new(), String::new(), 1)),
            "[" | "test" => {
                let mut test_args = args.to_vec();
                if cmd_name == "[" {
                    if test_args.last().map(|s| s.as_str()) != Some("]") {
                        return Ok(ExecResult::new(String::new(), "[: missing `]'\n".to_string(), 2));
                    }
                    test_args.pop();
                }
                return self.run_external(state, "test", &test_args, stdin);
            }
            _ => {}
        }

        self.run_external(state, cmd_name, args, stdin)
    }

    /// Dispatch to the simulated external-command registry (cat, ls, jq,
    /// git, sandbox, ...), bridging the async `Command` trait the same way
    /// `SyncFsAdapter` bridges filesystem calls.
    fn run_external(
        &self,
        state: &mut InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        let Some(command) = self.registry.get(cmd_name) else {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: {}: command not found\n", cmd_name),
                127,
            ));
        };

        let env: HashMap<String, String> = state.env.clone();
        let ctx = CommandContext {
            args: args.to_vec(),
            stdin: stdin.to_string(),
            cwd: state.cwd.clone(),
            env,
            fs: self.async_fs.clone(),
            exec_fn: None,
            fetch_fn: None,
        };

        let CommandResult { stdout, stderr, exit_code } = self.block_on(command.execute(ctx));
        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a compound command (if, for, while, etc.).
    pub fn execute_compound_command(
        &self,
        state: &mut InterpreterState,
        compound: &CompoundCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match compound {
            CompoundCommandNode::If(if_node) => {
                // Build clauses for execute_if
                let clauses: Vec<(Vec<&StatementNode>, Vec<&StatementNode>)> = if_node
                    .clauses
                    .iter()
                    .map(|c| {
                        (
                            c.condition.iter().collect(),
                            c.body.iter().collect(),
                        )
                    })
                    .collect();

                let else_body: Option<Vec<&StatementNode>> =
                    if_node.else_body.as_ref().map(|b| b.iter().collect());

                let result = execute_if(
                    state,
                    &clauses,
                    else_body.as_deref(),
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::For(for_node) => {
                // Expand words
                let mut words: Vec<String> = Vec::new();
                let cmd_subst = command_subst_closure(self);
                if let Some(ref word_list) = for_node.words {
                    for word in word_list {
                        let result = expand_word_with_glob(state, word, self.fs, Some(&cmd_subst));
                        if let Some(split) = result.split_words {
                            words.extend(split);
                        } else {
                            words.push(result.value);
                        }
                    }
                } else {
                    // Default to positional parameters
                    let argc: usize = state.env.get("#")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    for i in 1..=argc {
                        if let Some(val) = state.env.get(&i.to_string()) {
                            words.push(val.clone());
                        }
                    }
                }

                let body: Vec<&StatementNode> = for_node.body.iter().collect();

                let result = execute_for(
                    state,
                    &for_node.variable,
                    &words,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::While(while_node) => {
                let condition: Vec<&StatementNode> = while_node.condition.iter().collect();
                let body: Vec<&StatementNode> = while_node.body.iter().collect();

                let result = execute_while(
                    state,
                    &condition,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Until(until_node) => {
                let condition: Vec<&StatementNode> = until_node.condition.iter().collect();
                let body: Vec<&StatementNode> = until_node.body.iter().collect();

                let result = execute_until(
                    state,
                    &condition,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Case(case_node) => {
                use crate::ast::types::CaseTerminator;
                use crate::interpreter::conditionals::match_pattern;
                use crate::interpreter::control_flow::propagate_with_output;

                let cmd_subst = command_subst_closure(self);
                let subject = expand_word(state, &case_node.word, self.fs, Some(&cmd_subst));
                let nocasematch = state.shopt_options.nocasematch;
                let extglob = state.shopt_options.extglob;

                let mut stdout = String::new();
                let mut stderr = subject.stderr;
                let mut exit_code = 0;
                let mut matched = false;
                let mut force_next = false;
                let mut idx = 0;

                while idx < case_node.items.len() {
                    let item = &case_node.items[idx];
                    let pattern_matches = force_next
                        || item.patterns.iter().any(|p| {
                            let expanded = expand_word(state, p, self.fs, Some(&cmd_subst));
                            stderr.push_str(&expanded.stderr);
                            match_pattern(&subject.value, &expanded.value, nocasematch, extglob)
                        });
                    force_next = false;

                    if !pattern_matches {
                        idx += 1;
                        continue;
                    }

                    matched = true;
                    for stmt in &item.body {
                        match self.execute_statement(state, stmt) {
                            Ok(res) => {
                                stdout.push_str(&res.stdout);
                                stderr.push_str(&res.stderr);
                                exit_code = res.exit_code;
                            }
                            Err(e) => return Err(propagate_with_output(e, &stdout, &stderr)),
                        }
                    }

                    match item.terminator {
                        CaseTerminator::DoubleSemi => break,
                        CaseTerminator::SemiAnd => {
                            force_next = true;
                            idx += 1;
                        }
                        CaseTerminator::SemiSemiAnd => {
                            idx += 1;
                        }
                    }
                }

                Ok(ExecResult::new(stdout, stderr, if matched { exit_code } else { 0 }))
            }

            CompoundCommandNode::Subshell(subshell_node) => {
                execute_subshell(
                    state,
                    &subshell_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::Group(group_node) => {
                execute_group(
                    state,
                    &group_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::ArithmeticCommand(arith) => {
                use crate::interpreter::arithmetic::evaluate_arithmetic;
                use crate::interpreter::types::InterpreterContext;

                let mut ctx = InterpreterContext::new(state, self.limits);
                match evaluate_arithmetic(&mut ctx, &arith.expression.expression, false, None) {
                    Ok(value) => {
                        // Arithmetic command: exit 0 if non-zero, exit 1 if zero
                        let exit_code = if value != 0 { 0 } else { 1 };
                        Ok(ExecResult::new(String::new(), String::new(), exit_code))
                    }
                    Err(e) => {
                        Ok(ExecResult::new(
                            String::new(),
                            format!("bash: {}\n", e),
                            1,
                        ))
                    }
                }
            }

            CompoundCommandNode::ConditionalCommand(cond) => {
                use crate::interpreter::cond_eval::evaluate_conditional;

                let cmd_subst = command_subst_closure(self);
                let result = evaluate_conditional(state, &cond.expression, self.fs, Some(&cmd_subst));
                let exit_code = if result.truth { 0 } else { 1 };
                Ok(ExecResult::new(String::new(), result.stderr, exit_code))
            }

            CompoundCommandNode::CStyleFor(cfor) => {
                let body: Vec<&StatementNode> = cfor.body.iter().collect();
                let result = execute_c_style_for(
                    state,
                    cfor.init.as_ref().map(|e| &e.expression),
                    cfor.condition.as_ref().map(|e| &e.expression),
                    cfor.update.as_ref().map(|e| &e.expression),
                    &body,
                    self.limits,
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(result)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{InMemoryFs, FileSystem as AsyncFileSystem};
    use crate::interpreter::sync_fs_adapter::SyncFsAdapter;
    use std::sync::Arc;

    fn make_engine_and_state() -> (ExecutionEngine<'static>, InterpreterState, Arc<InMemoryFs>) {
        let fs: Arc<InMemoryFs> = Arc::new(InMemoryFs::new());
        let limits = Box::leak(Box::new(ExecutionLimits::default()));

        // We need a static reference for the test, so we leak the adapter
        let handle = tokio::runtime::Handle::current();
        let adapter = Box::leak(Box::new(SyncFsAdapter::new(fs.clone(), handle.clone())));
        let registry = Box::leak(Box::new(crate::commands::registry::build_default_registry()));

        let async_fs: Arc<dyn AsyncFileSystem> = fs.clone();
        let engine = ExecutionEngine::new(limits, adapter, async_fs, handle, registry);
        let state = InterpreterState::default();

        (engine, state, fs)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_echo() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("echo hello world").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();

        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_variable_expansion() {
        let (engine, mut state, _fs) = make_engine_and_state();
        state.env.insert("NAME".to_string(), "world".to_string());

        let ast = crate::parser::parse("echo hello $NAME").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();

        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_true_false() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("true").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.exit_code, 0);

        let ast = crate::parser::parse("false").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_and_or() {
        let (engine, mut state, _fs) = make_engine_and_state();

        // true && echo yes
        let ast = crate::parser::parse("true && echo yes").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");

        // false && echo no (should not print)
        let ast = crate::parser::parse("false && echo no").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "");

        // false || echo fallback
        let ast = crate::parser::parse("false || echo fallback").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "fallback\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_if() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("if true; then echo yes; fi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");

        let ast = crate::parser::parse("if false; then echo no; else echo else; fi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "else\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_for() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("for i in a b c; do echo $i; done").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "a\nb\nc\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_c_style_for() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("for ((i=0; i<3; i++)); do echo $i; done").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "0\n1\n2\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_case() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse(
            "case hello in\n  hi) echo no ;;\n  hel*) echo yes ;;\n  *) echo default ;;\nesac",
        )
        .unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_case_fallthrough() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("case a in\n  a) echo one ;&\n  b) echo two ;;\nesac").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "one\ntwo\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_conditional_command() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("if [[ -n \"hello\" ]]; then echo yes; fi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");

        let ast = crate::parser::parse("if [[ 3 -gt 2 && -z \"\" ]]; then echo yes; fi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_while() {
        let (engine, mut state, _fs) = make_engine_and_state();
        state.env.insert("x".to_string(), "3".to_string());

        // Simple while that would loop - but we need arithmetic for decrement
        // For now just test basic structure
        let ast = crate::parser::parse("while false; do echo loop; done").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_subshell() {
        let (engine, mut state, _fs) = make_engine_and_state();
        state.env.insert("X".to_string(), "original".to_string());

        // Subshell should not affect parent
        let ast = crate::parser::parse("(X=modified; echo $X); echo $X").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        // Note: assignment in subshell not fully implemented yet
        // Just verify subshell executes
        assert!(result.stdout.contains("original"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_group() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("{ echo a; echo b; }").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "a\nb\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_pwd_cd() {
        let fs = Arc::new(InMemoryFs::new());
        let limits = Box::leak(Box::new(ExecutionLimits::default()));

        // Create directory structure using async API directly
        fs.mkdir("/home", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.mkdir("/home/user", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();

        // Now create the sync adapter
        let handle = tokio::runtime::Handle::current();
        let adapter = Box::leak(Box::new(SyncFsAdapter::new(fs.clone(), handle.clone())));
        let registry = Box::leak(Box::new(crate::commands::registry::build_default_registry()));

        let async_fs: Arc<dyn AsyncFileSystem> = fs.clone();
        let engine = ExecutionEngine::new(limits, adapter, async_fs, handle, registry);
        let mut state = InterpreterState::default();

        state.cwd = "/".to_string();
        state.env.insert("PWD".to_string(), "/".to_string());

        let ast = crate::parser::parse("pwd").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "/\n");

        let ast = crate::parser::parse("cd /home/user && pwd").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "/home/user\n");
    }
}
