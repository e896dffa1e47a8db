//! Sandboxed JavaScript execution bridge.
//!
//! A host-side `WorkerHost` owns a single embedded QuickJS context and feeds
//! it scripts one at a time. While a script runs, any synchronous call it
//! makes back into the host (reading a file, issuing an HTTP request,
//! spawning a sub-shell) is modeled as a `BridgeRequest`/`BridgeResponse`
//! round trip through `protocol`, dispatched by `host` and constrained by
//! `policy`.
//!
//! There is no real OS-level sandbox here (no separate process, no seccomp):
//! isolation is cooperative, enforced by what capabilities `WorkerHost` wires
//! up and what the `SecurityPolicy` blocks inside the JS global scope.

pub mod policy;
pub mod protocol;
pub mod host;

pub use host::{WorkerHost, WorkerOptions, ExecuteOptions, JsExecResult};
pub use policy::SecurityPolicy;
pub use protocol::{BridgeOp, BridgeError, BridgeRequest, BridgeResponse};
