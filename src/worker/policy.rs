//! Security policy applied to the embedded JS global scope.
//!
//! Blocks the usual escape hatches (dynamic `eval`, the `Function`
//! constructor, string-argument timers, weak refs/finalizers that could be
//! used to snoop on host-side object lifetimes, and reassignment of
//! `Error.prepareStackTrace`) and keeps a bounded audit log of attempts so a
//! caller can inspect what a script tried to do after the fact.

use std::collections::VecDeque;
use std::sync::Mutex;

const MAX_AUDIT_LOG: usize = 1000;

#[derive(Debug, Clone)]
pub struct PolicyViolation {
    pub what: String,
    pub detail: String,
}

/// Policy knobs plus the bounded violation log.
///
/// `audit_log` is a `Mutex` rather than `RefCell` because `WorkerHost` holds
/// a `SecurityPolicy` behind an `Arc` shared with whatever closures get
/// registered against the QuickJS context.
pub struct SecurityPolicy {
    pub block_eval: bool,
    pub block_function_constructor: bool,
    pub block_string_timers: bool,
    pub block_weak_refs: bool,
    pub hide_env: bool,
    pub hide_native_addon_loading: bool,
    audit_log: Mutex<VecDeque<PolicyViolation>>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            block_eval: true,
            block_function_constructor: true,
            block_string_timers: true,
            block_weak_refs: true,
            hide_env: true,
            hide_native_addon_loading: true,
            audit_log: Mutex::new(VecDeque::with_capacity(MAX_AUDIT_LOG)),
        }
    }
}

impl SecurityPolicy {
    pub fn record_violation(&self, what: &str, detail: &str) {
        let mut log = self.audit_log.lock().unwrap();
        if log.len() >= MAX_AUDIT_LOG {
            log.pop_front();
        }
        log.push_back(PolicyViolation { what: what.to_string(), detail: detail.to_string() });
    }

    pub fn violations(&self) -> Vec<PolicyViolation> {
        self.audit_log.lock().unwrap().iter().cloned().collect()
    }

    /// JS source installed before any user script runs. Removes or traps the
    /// globals a sandbox escape would rely on; every trap records a
    /// violation through the `__reportViolation` host function rather than
    /// failing silently.
    pub fn bootstrap_script(&self) -> String {
        let mut parts = Vec::new();
        if self.block_eval {
            parts.push(
                "globalThis.eval = function() { __reportViolation('eval', String(arguments[0])); throw new Error('eval is disabled'); };"
            );
        }
        if self.block_function_constructor {
            parts.push(
                "globalThis.Function = new Proxy(Function, { construct() { __reportViolation('Function', 'constructor'); throw new Error('Function constructor is disabled'); } });"
            );
        }
        if self.block_string_timers {
            parts.push(
                "(function(){ const wrap = (fn) => function(handler, ...rest) { if (typeof handler === 'string') { __reportViolation('string-timer', handler); throw new TypeError('string arguments to timers are disabled'); } return fn(handler, ...rest); }; globalThis.setTimeout = wrap(globalThis.setTimeout); globalThis.setInterval = wrap(globalThis.setInterval); })();"
            );
        }
        if self.block_weak_refs {
            parts.push(
                "globalThis.WeakRef = undefined; globalThis.FinalizationRegistry = undefined;"
            );
        }
        if self.hide_env {
            parts.push(
                "globalThis.process = new Proxy({}, { get(_, prop) { __reportViolation('process-access', String(prop)); throw new Error('process is not available'); } });"
            );
        }
        if self.hide_native_addon_loading {
            parts.push(
                "globalThis.require = new Proxy(function(){}, { apply() { __reportViolation('require', 'call'); throw new Error('require is not available'); } });"
            );
        }
        parts.push(
            "Object.defineProperty(Error, 'prepareStackTrace', { set() { __reportViolation('prepareStackTrace', 'reassignment'); }, get() { return undefined; } });"
        );
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_bounded_audit_log() {
        let policy = SecurityPolicy::default();
        for i in 0..(MAX_AUDIT_LOG + 10) {
            policy.record_violation("eval", &i.to_string());
        }
        assert_eq!(policy.violations().len(), MAX_AUDIT_LOG);
        assert_eq!(policy.violations().first().unwrap().detail, "10");
    }

    #[test]
    fn bootstrap_script_contains_guards() {
        let policy = SecurityPolicy::default();
        let script = policy.bootstrap_script();
        assert!(script.contains("eval is disabled"));
        assert!(script.contains("Function constructor is disabled"));
        assert!(script.contains("prepareStackTrace"));
    }
}
