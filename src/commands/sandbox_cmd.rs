// src/commands/sandbox_cmd.rs
//! Front-end for the sandboxed JavaScript execution bridge. This is the one
//! shell builtin the worker subsystem is layered behind: everything else
//! about running JS lives in `crate::worker`.

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use crate::commands::{Command, CommandContext, CommandResult};
use crate::worker::{ExecuteOptions, WorkerHost, WorkerOptions};

const HELP: &str = "Usage: sandbox [-c CODE] [--strip-types] [--timeout-ms N] [FILE]\n\n\
Run JavaScript (or TypeScript with --strip-types) in a sandboxed engine.\n\
Reads from -c, a FILE argument, or stdin when neither is given. Module mode\n\
is enabled automatically for .mjs/.ts/.mts files or scripts using top-level await.\n";

/// Process-wide worker singleton: created on first `sandbox` invocation,
/// serves every execution after that, and idles itself out internally
/// (see `WorkerHost::spawn`'s background sweeper) rather than being rebuilt
/// per call.
static WORKER_HOST: OnceLock<Arc<WorkerHost>> = OnceLock::new();

fn worker_host(ctx: &CommandContext) -> Arc<WorkerHost> {
    WORKER_HOST
        .get_or_init(|| WorkerHost::spawn(ctx.fs.clone(), tokio::runtime::Handle::current(), WorkerOptions::default()))
        .clone()
}

pub struct SandboxExecCommand;

#[async_trait]
impl Command for SandboxExecCommand {
    fn name(&self) -> &'static str { "sandbox" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.iter().any(|a| a == "--help") {
            return CommandResult::success(HELP.to_string());
        }

        let mut code: Option<String> = None;
        let mut file: Option<String> = None;
        let mut strip_types = false;
        let mut timeout_ms: u64 = 30_000;
        let mut i = 0;
        while i < ctx.args.len() {
            match ctx.args[i].as_str() {
                "-c" => {
                    if i + 1 >= ctx.args.len() {
                        return CommandResult::error("sandbox: -c requires an argument\n".to_string());
                    }
                    code = Some(ctx.args[i + 1].clone());
                    i += 2;
                }
                "--strip-types" => { strip_types = true; i += 1; }
                "--timeout-ms" => {
                    if i + 1 >= ctx.args.len() {
                        return CommandResult::error("sandbox: --timeout-ms requires an argument\n".to_string());
                    }
                    timeout_ms = ctx.args[i + 1].parse().unwrap_or(30_000);
                    i += 2;
                }
                other if !other.starts_with('-') => { file = Some(other.to_string()); i += 1; }
                _ => { i += 1; }
            }
        }

        let (source, path_hint) = if let Some(c) = code {
            (c, String::new())
        } else if let Some(f) = file.clone() {
            match ctx.fs.read_file(&ctx.fs.resolve_path(&ctx.cwd, &f)).await {
                Ok(content) => (content, f),
                Err(e) => return CommandResult::with_exit_code(String::new(), format!("sandbox: {}: {}\n", f, e), 1),
            }
        } else {
            (ctx.stdin.clone(), String::new())
        };

        let is_typescript = path_hint.ends_with(".ts") || path_hint.ends_with(".mts") || strip_types;
        let module_mode = path_hint.ends_with(".mjs")
            || path_hint.ends_with(".ts")
            || path_hint.ends_with(".mts")
            || source.contains("await ") && !source.contains("async function");

        let host = worker_host(&ctx);
        let opts = ExecuteOptions {
            cwd: ctx.cwd.clone(),
            exec_timeout: Some(std::time::Duration::from_millis(timeout_ms)),
            exec_fn: ctx.exec_fn.clone(),
            fetch_fn: ctx.fetch_fn.clone(),
        };

        match host.execute(&source, module_mode, is_typescript, opts).await {
            Ok(result) => CommandResult::with_exit_code(result.stdout, result.stderr, result.exit_code),
            Err(e) => CommandResult::with_exit_code(String::new(), format!("sandbox: {}\n", e), 1),
        }
    }
}
