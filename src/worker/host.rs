//! The worker host: a singleton QuickJS context fed one script at a time.
//!
//! Follows the same block_in_place/block_on bridging idiom as
//! [`crate::interpreter::sync_fs_adapter::SyncFsAdapter`]: the embedded
//! engine's `eval` is synchronous, so any bridge call a script makes is
//! serviced by blocking on the host's async `FileSystem`/network/executor
//! capabilities from inside the call.
//!
//! The context is lazily created on first use and torn down after
//! `idle_timeout` of inactivity; a `tokio::sync::Mutex` around execution
//! gives callers FIFO, single-flight scheduling for free — a second
//! `execute()` call simply waits for the first to finish. Everything a
//! running script can reach back into the host for (filesystem, HTTP,
//! sub-shell exec) goes through `BridgeOp`/`BridgeRequest`/`BridgeResponse`
//! (see `protocol.rs`), dispatched by `dispatch_bridge_request` below.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use rquickjs::{Context, Ctx, Function, Runtime};
use tokio::sync::Mutex as AsyncMutex;

use crate::commands::types::{ExecFn, FetchFn};
use crate::fs::{FileSystem, MkdirOptions, RmOptions, CpOptions, FsStat};
use crate::worker::policy::SecurityPolicy;
use crate::worker::protocol::{BridgeError, BridgeOp, BridgeRequest, BridgeResponse};

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// How long an idle context is kept alive before being dropped.
    pub idle_timeout: Duration,
    /// Per-execution wall-clock budget.
    pub exec_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            exec_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-call knobs that vary with the invoking `sandbox` command, as opposed
/// to `WorkerOptions`, which is fixed for the lifetime of the singleton.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub cwd: String,
    /// Overrides `WorkerOptions::exec_timeout` for this call only (the
    /// `sandbox --timeout-ms` flag).
    pub exec_timeout: Option<Duration>,
    /// Capability used to service `BridgeOp::ExecCommand` (sub-shell exec).
    /// `None` means the sandbox front-end didn't have one to offer, and
    /// scripts calling `execCommandSync` get a bridge error back.
    pub exec_fn: Option<ExecFn>,
    /// Capability used to service `BridgeOp::HttpRequest`.
    pub fetch_fn: Option<FetchFn>,
}

#[derive(Debug, Clone, Default)]
pub struct JsExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub value: Option<serde_json::Value>,
}

struct LiveContext {
    runtime: Runtime,
    context: Context,
}

pub struct WorkerHost {
    fs: Arc<dyn FileSystem>,
    handle: tokio::runtime::Handle,
    policy: Arc<SecurityPolicy>,
    options: WorkerOptions,
    live: AsyncMutex<Option<LiveContext>>,
    last_used_ms: AtomicI64,
}

impl WorkerHost {
    pub fn new(fs: Arc<dyn FileSystem>, handle: tokio::runtime::Handle, options: WorkerOptions) -> Self {
        Self {
            fs,
            handle,
            policy: Arc::new(SecurityPolicy::default()),
            options,
            live: AsyncMutex::new(None),
            last_used_ms: AtomicI64::new(0),
        }
    }

    /// Create the singleton and start its background idle sweeper. Callers
    /// (the `sandbox` front-end) hold onto the returned `Arc` for the life
    /// of the process rather than calling `new` per invocation.
    pub fn spawn(fs: Arc<dyn FileSystem>, handle: tokio::runtime::Handle, options: WorkerOptions) -> Arc<Self> {
        let host = Arc::new(Self::new(fs, handle, options));
        host.spawn_idle_sweeper();
        host
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Run `code` to completion and collect anything written via
    /// `console.log`/`console.error` plus the script's resolved value.
    ///
    /// `module_mode` selects ESM evaluation (auto-enabled by the sandbox
    /// front-end for `.mjs`/`.ts`/`.mts` or a script containing top-level
    /// `await`); `strip_types` runs a lightweight TypeScript-annotation
    /// eraser before handing the source to QuickJS, which only understands
    /// plain JS.
    pub async fn execute(
        &self,
        code: &str,
        module_mode: bool,
        strip_types: bool,
        opts: ExecuteOptions,
    ) -> Result<JsExecResult, String> {
        let source = if strip_types { strip_type_annotations(code) } else { code.to_string() };
        let exec_timeout = opts.exec_timeout.unwrap_or(self.options.exec_timeout);

        let mut guard = self.live.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn_context()?);
        }
        self.last_used_ms.store(now_ms(), Ordering::Relaxed);

        let result = tokio::time::timeout(
            exec_timeout,
            self.run_in_context(guard.as_ref().unwrap(), source, module_mode, &opts),
        )
        .await;

        self.last_used_ms.store(now_ms(), Ordering::Relaxed);

        match result {
            Ok(r) => r,
            Err(_) => {
                // A timed-out context may be left mid-evaluation; drop it
                // rather than reuse a possibly wedged engine.
                *guard = None;
                Err("script execution timed out".to_string())
            }
        }
    }

    /// Tears down the context if it has been idle past `idle_timeout`.
    pub async fn sweep_idle(&self) {
        let idle_for = now_ms() - self.last_used_ms.load(Ordering::Relaxed);
        if idle_for >= self.options.idle_timeout.as_millis() as i64 {
            let mut guard = self.live.lock().await;
            *guard = None;
        }
    }

    /// Spawn a background task that polls `sweep_idle` on a fraction of
    /// `idle_timeout`. Holds only a `Weak` reference so the task exits on
    /// its own once the singleton itself is dropped (process shutdown),
    /// instead of keeping it alive forever.
    fn spawn_idle_sweeper(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = (self.options.idle_timeout / 2).max(Duration::from_millis(100));
        self.handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(host) => host.sweep_idle().await,
                    None => break,
                }
            }
        });
    }

    fn spawn_context(&self) -> Result<LiveContext, String> {
        let runtime = Runtime::new().map_err(|e| format!("failed to start JS runtime: {}", e))?;
        let context = Context::full(&runtime).map_err(|e| format!("failed to start JS context: {}", e))?;
        Ok(LiveContext { runtime, context })
    }

    async fn run_in_context(
        &self,
        live: &LiveContext,
        source: String,
        _module_mode: bool,
        opts: &ExecuteOptions,
    ) -> Result<JsExecResult, String> {
        let fs = self.fs.clone();
        let handle = self.handle.clone();
        let policy = self.policy.clone();
        let bootstrap = policy.bootstrap_script();
        let cwd = opts.cwd.clone();
        let exec_fn = opts.exec_fn.clone();
        let fetch_fn = opts.fetch_fn.clone();

        let captured: Arc<std::sync::Mutex<JsExecResult>> = Arc::new(std::sync::Mutex::new(JsExecResult::default()));
        let captured_for_ctx = captured.clone();

        let context = live.context.clone();
        tokio::task::block_in_place(move || {
            context.with(|ctx: Ctx<'_>| -> Result<(), String> {
                install_host_functions(&ctx, fs, cwd, handle, policy, exec_fn, fetch_fn, captured_for_ctx.clone())
                    .map_err(|e| format!("failed to install host bindings: {}", e))?;

                ctx.eval::<(), _>(bootstrap.as_bytes())
                    .map_err(|e| format!("sandbox bootstrap failed: {}", e))?;
                ctx.eval::<(), _>(BRIDGE_SHIM.as_bytes())
                    .map_err(|e| format!("sandbox bridge shim failed: {}", e))?;

                let eval_result: Result<rquickjs::Value<'_>, rquickjs::Error> = ctx.eval(source.as_bytes());
                match eval_result {
                    Ok(value) => {
                        let mut out = captured_for_ctx.lock().unwrap();
                        out.value = js_value_to_json(&ctx, &value);
                    }
                    Err(e) => {
                        let mut out = captured_for_ctx.lock().unwrap();
                        out.stderr.push_str(&format!("{}\n", e));
                        out.exit_code = 1;
                    }
                }
                Ok(())
            })
        })?;

        let result = Arc::try_unwrap(captured).map(|m| m.into_inner().unwrap()).unwrap_or_default();
        Ok(result)
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn js_value_to_json(_ctx: &Ctx<'_>, value: &rquickjs::Value<'_>) -> Option<serde_json::Value> {
    if value.is_undefined() || value.is_null() {
        None
    } else if let Some(b) = value.as_bool() {
        Some(serde_json::Value::Bool(b))
    } else if let Some(n) = value.as_float() {
        serde_json::Number::from_f64(n).map(serde_json::Value::Number)
    } else if let Some(s) = value.as_string() {
        s.to_string().ok().map(serde_json::Value::String)
    } else {
        None
    }
}

fn stat_to_json(st: &FsStat) -> serde_json::Value {
    let mtime_ms = st
        .mtime
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    serde_json::json!({
        "isFile": st.is_file,
        "isDirectory": st.is_directory,
        "isSymlink": st.is_symlink,
        "size": st.size,
        "mode": st.mode,
        "mtimeMs": mtime_ms,
    })
}

/// Naive TypeScript-annotation eraser: strips `: Type` in parameter and
/// variable positions and leading `interface`/`type` declarations. This is
/// not a real parser — it is only meant to unblock simple, annotation-only
/// scripts the way `--strip-types` promises for the common case.
fn strip_type_annotations(code: &str) -> String {
    use regex_lite::Regex;
    lazy_static::lazy_static! {
        static ref INTERFACE_BLOCK: Regex = Regex::new(r"(?s)\binterface\s+\w+\s*\{[^}]*\}").unwrap();
        static ref TYPE_ALIAS: Regex = Regex::new(r"(?m)^\s*type\s+\w+.*=.*;?\s*$").unwrap();
        static ref PARAM_ANNOTATION: Regex = Regex::new(r":\s*[A-Za-z_][\w<>\[\]., |]*(?=[,)=])").unwrap();
        static ref AS_CAST: Regex = Regex::new(r"\s+as\s+[A-Za-z_][\w<>\[\]., |]*").unwrap();
    }
    let step1 = INTERFACE_BLOCK.replace_all(code, "");
    let step2 = TYPE_ALIAS.replace_all(&step1, "");
    let step3 = PARAM_ANNOTATION.replace_all(&step2, "");
    AS_CAST.replace_all(&step3, "").to_string()
}

/// JS-side wrappers over the single `__bridgeCall` host function, giving
/// scripts the synchronous-looking `readFileSync`/`statSync`/... surface
/// spec.md §4.8 describes while every call actually round-trips through
/// `BridgeOp`/`BridgeRequest`/`BridgeResponse`.
const BRIDGE_SHIM: &str = r#"
(function() {
  let seq = 0;
  function call(op) {
    const req = JSON.stringify({ seq: seq++, op });
    const resJson = __bridgeCall(req);
    const res = JSON.parse(resJson);
    if (res.error !== 'None') {
      throw new Error('bridge error: ' + res.error);
    }
    return res.data;
  }
  globalThis.readFileSync = (path) => call({ op: 'READ_FILE', path });
  globalThis.writeFileSync = (path, data) => call({ op: 'WRITE_FILE', path, data: Array.from(Buffer_toBytes(data)) });
  globalThis.appendFileSync = (path, data) => call({ op: 'APPEND_FILE', path, data: Array.from(Buffer_toBytes(data)) });
  globalThis.existsSync = (path) => call({ op: 'EXISTS', path });
  globalThis.statSync = (path) => call({ op: 'STAT', path });
  globalThis.lstatSync = (path) => call({ op: 'LSTAT', path });
  globalThis.readdirSync = (path) => call({ op: 'READDIR', path });
  globalThis.mkdirSync = (path, opts) => call({ op: 'MKDIR', path, recursive: !!(opts && opts.recursive) });
  globalThis.rmSync = (path, opts) => call({ op: 'RM', path, recursive: !!(opts && opts.recursive), force: !!(opts && opts.force) });
  globalThis.symlinkSync = (target, linkPath) => call({ op: 'SYMLINK', target, link_path: linkPath });
  globalThis.readlinkSync = (path) => call({ op: 'READLINK', path });
  globalThis.chmodSync = (path, mode) => call({ op: 'CHMOD', path, mode });
  globalThis.realpathSync = (path) => call({ op: 'REALPATH', path });
  globalThis.renameSync = (from, to) => call({ op: 'RENAME', from, to });
  globalThis.copyFileSync = (from, to) => call({ op: 'COPY_FILE', from, to });
  globalThis.httpRequestSync = (url, method, headers, body) =>
    call({ op: 'HTTP_REQUEST', url, method: method || 'GET', headers: headers || {}, body: body ?? null });
  globalThis.execCommandSync = (command, stdin) =>
    call({ op: 'EXEC_COMMAND', command, stdin: stdin ?? null });
  // Minimal helper: data is always passed as a plain string from this
  // engine (no typed-array/Buffer surface), so writes just forward UTF-8 bytes.
  function Buffer_toBytes(data) {
    if (typeof data === 'string') {
      const bytes = [];
      for (let i = 0; i < data.length; i++) bytes.push(data.charCodeAt(i) & 0xff);
      return bytes;
    }
    return data;
  }
})();
"#;

/// Register the synchronous host bindings a sandboxed script can call:
/// filesystem/network/sub-shell access via `__bridgeCall`, plus
/// `console.log`/`console.error` and process exit.
fn install_host_functions(
    ctx: &Ctx<'_>,
    fs: Arc<dyn FileSystem>,
    cwd: String,
    handle: tokio::runtime::Handle,
    policy: Arc<SecurityPolicy>,
    exec_fn: Option<ExecFn>,
    fetch_fn: Option<FetchFn>,
    captured: Arc<std::sync::Mutex<JsExecResult>>,
) -> Result<(), rquickjs::Error> {
    let globals = ctx.globals();

    globals.set(
        "__reportViolation",
        Function::new(ctx.clone(), move |what: String, detail: String| {
            policy.record_violation(&what, &detail);
        })?,
    )?;

    let stdout_captured = captured.clone();
    let console = rquickjs::Object::new(ctx.clone())?;
    console.set(
        "log",
        Function::new(ctx.clone(), move |msg: String| {
            let mut out = stdout_captured.lock().unwrap();
            out.stdout.push_str(&msg);
            out.stdout.push('\n');
        })?,
    )?;
    let stderr_captured = captured.clone();
    console.set(
        "error",
        Function::new(ctx.clone(), move |msg: String| {
            let mut out = stderr_captured.lock().unwrap();
            out.stderr.push_str(&msg);
            out.stderr.push('\n');
        })?,
    )?;
    globals.set("console", console)?;

    let exit_captured = captured.clone();
    globals.set(
        "__exit",
        Function::new(ctx.clone(), move |code: i32| {
            exit_captured.lock().unwrap().exit_code = code;
        })?,
    )?;

    let bridge_fs = fs.clone();
    let bridge_cwd = cwd;
    let bridge_handle = handle;
    let bridge_exec_fn = exec_fn;
    let bridge_fetch_fn = fetch_fn;
    let bridge_captured = captured;
    globals.set(
        "__bridgeCall",
        Function::new(ctx.clone(), move |req_json: String| -> String {
            let parsed: Result<BridgeRequest, _> = serde_json::from_str(&req_json);
            let resp = match parsed {
                Ok(req) => {
                    let fs = bridge_fs.clone();
                    let cwd = bridge_cwd.clone();
                    let exec_fn = bridge_exec_fn.clone();
                    let fetch_fn = bridge_fetch_fn.clone();
                    let captured = bridge_captured.clone();
                    tokio::task::block_in_place(|| {
                        bridge_handle.block_on(dispatch_bridge_request(fs, cwd, exec_fn, fetch_fn, captured, req))
                    })
                }
                Err(_) => BridgeResponse::err(0, BridgeError::InvalidPath),
            };
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"seq\":0,\"error\":\"IoError\",\"data\":null}".to_string())
        })?,
    )?;

    Ok(())
}

/// Service one `BridgeRequest`, routing filesystem ops through the
/// capability every other I/O path uses, HTTP through `fetch_fn`, and
/// sub-shell exec through `exec_fn` — both absent unless the sandbox
/// front-end was given one.
async fn dispatch_bridge_request(
    fs: Arc<dyn FileSystem>,
    cwd: String,
    exec_fn: Option<ExecFn>,
    fetch_fn: Option<FetchFn>,
    captured: Arc<std::sync::Mutex<JsExecResult>>,
    req: BridgeRequest,
) -> BridgeResponse {
    let seq = req.seq;
    match req.op {
        BridgeOp::ReadFile { path } => match fs.read_file(&path).await {
            Ok(s) => BridgeResponse::ok(seq, serde_json::Value::String(s)),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::WriteFile { path, data } => match fs.write_file(&path, &data).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::AppendFile { path, data } => match fs.append_file(&path, &data).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Stat { path } => match fs.stat(&path).await {
            Ok(st) => BridgeResponse::ok(seq, stat_to_json(&st)),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Lstat { path } => match fs.lstat(&path).await {
            Ok(st) => BridgeResponse::ok(seq, stat_to_json(&st)),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Readdir { path } => match fs.readdir(&path).await {
            Ok(names) => BridgeResponse::ok(seq, serde_json::json!(names)),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Mkdir { path, recursive } => match fs.mkdir(&path, &MkdirOptions { recursive }).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Rm { path, recursive, force } => match fs.rm(&path, &RmOptions { recursive, force }).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Exists { path } => BridgeResponse::ok(seq, serde_json::Value::Bool(fs.exists(&path).await)),
        BridgeOp::Symlink { target, link_path } => match fs.symlink(&target, &link_path).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Readlink { path } => match fs.readlink(&path).await {
            Ok(s) => BridgeResponse::ok(seq, serde_json::Value::String(s)),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Chmod { path, mode } => match fs.chmod(&path, mode).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Realpath { path } => match fs.realpath(&path).await {
            Ok(s) => BridgeResponse::ok(seq, serde_json::Value::String(s)),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::Rename { from, to } => match fs.mv(&from, &to).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::CopyFile { from, to } => match fs.cp(&from, &to, &CpOptions::default()).await {
            Ok(()) => BridgeResponse::ok(seq, serde_json::Value::Null),
            Err(e) => BridgeResponse::err(seq, BridgeError::from_fs_error(&e)),
        },
        BridgeOp::WriteStdout { data } => {
            captured.lock().unwrap().stdout.push_str(&data);
            BridgeResponse::ok(seq, serde_json::Value::Null)
        }
        BridgeOp::WriteStderr { data } => {
            captured.lock().unwrap().stderr.push_str(&data);
            BridgeResponse::ok(seq, serde_json::Value::Null)
        }
        BridgeOp::Exit { code } => {
            captured.lock().unwrap().exit_code = code;
            BridgeResponse::ok(seq, serde_json::Value::Null)
        }
        BridgeOp::HttpRequest { url, method, headers, body } => match &fetch_fn {
            Some(f) => match f(url, method, headers, body).await {
                Ok(resp) => BridgeResponse::ok(
                    seq,
                    serde_json::json!({
                        "status": resp.status,
                        "headers": resp.headers,
                        "body": resp.body,
                        "url": resp.url,
                    }),
                ),
                Err(_) => BridgeResponse::err(seq, BridgeError::NetworkError),
            },
            None => BridgeResponse::err(seq, BridgeError::NetworkNotConfigured),
        },
        BridgeOp::ExecCommand { command, stdin } => match &exec_fn {
            Some(f) => {
                let result = f(command, stdin.unwrap_or_default(), cwd, HashMap::new(), fs.clone()).await;
                BridgeResponse::ok(
                    seq,
                    serde_json::json!({
                        "stdout": result.stdout,
                        "stderr": result.stderr,
                        "exitCode": result.exit_code,
                    }),
                )
            }
            None => BridgeResponse::err(seq, BridgeError::IoError),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::in_memory_fs::InMemoryFs;

    #[test]
    fn strips_simple_param_annotations() {
        let src = "function add(a: number, b: number): number { return a + b; }";
        let stripped = strip_type_annotations(src);
        assert!(!stripped.contains(": number"));
        assert!(stripped.contains("function add(a, b) { return a + b; }"));
    }

    #[test]
    fn strips_interface_blocks() {
        let src = "interface Foo { a: number }\nconst x = 1;";
        let stripped = strip_type_annotations(src);
        assert!(!stripped.contains("interface"));
        assert!(stripped.contains("const x = 1;"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn executes_simple_script_and_captures_console_log() {
        let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
        let host = WorkerHost::spawn(fs, tokio::runtime::Handle::current(), WorkerOptions::default());
        let result = host
            .execute("console.log('hi')", false, false, ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(result.stdout, "hi\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reuses_singleton_context_across_calls() {
        let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
        let host = WorkerHost::spawn(fs, tokio::runtime::Handle::current(), WorkerOptions::default());
        host.execute("globalThis.__x = 41", false, false, ExecuteOptions::default())
            .await
            .unwrap();
        let result = host
            .execute("console.log(globalThis.__x + 1)", false, false, ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(result.stdout, "42\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_file_sync_goes_through_bridge() {
        let inner = Arc::new(InMemoryFs::new());
        inner.write_file("/greeting.txt", b"hello from fs\n").await.unwrap();
        let fs: Arc<dyn FileSystem> = inner;
        let host = WorkerHost::spawn(fs, tokio::runtime::Handle::current(), WorkerOptions::default());
        let result = host
            .execute("console.log(readFileSync('/greeting.txt'))", false, false, ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(result.stdout, "hello from fs\n\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_request_without_fetch_fn_throws() {
        let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
        let host = WorkerHost::spawn(fs, tokio::runtime::Handle::current(), WorkerOptions::default());
        let result = host
            .execute(
                "try { httpRequestSync('https://example.com', 'GET'); console.log('no error'); } catch (e) { console.log('threw'); }",
                false,
                false,
                ExecuteOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.stdout, "threw\n");
    }
}
