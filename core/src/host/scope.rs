//! Scoped evaluator placeholders
//!
//! Cursors that the evaluator must manipulate (`++$it`, `$end - $begin`) live
//! in host placeholders. A [`ScopedVars`] binds them under process-unique
//! names, remembers whatever each name held before, and puts it back when the
//! scope is dropped. Dropping covers early `?` returns, errors, and lazy
//! sequences the host stops pulling half way.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::{Host, HostError, HostResult};

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(0);

/// A set of placeholders restored on drop
pub struct ScopedVars<'a, H: Host> {
    host: &'a H,
    /// (key, bound name, previous value)
    saved: SmallVec<[(String, String, Option<H::Value>); 4]>,
}

impl<'a, H: Host> ScopedVars<'a, H> {
    /// Bind each `(key, value)` pair to a fresh placeholder
    pub fn bind(host: &'a H, bindings: &[(&str, H::Value)]) -> HostResult<Self> {
        let scope_id = NEXT_SCOPE.fetch_add(1, Ordering::Relaxed);
        let mut scope = Self {
            host,
            saved: SmallVec::new(),
        };

        for (key, value) in bindings {
            if key.starts_with('$') {
                // Already-bound names are restored by Drop
                return Err(HostError::InvalidPlaceholder(key.to_string()));
            }
            let name = format!("vt_{}_{}", key, scope_id);
            let previous = host.var(&name);
            host.set_var(&name, Some(value.clone()));
            scope.saved.push((key.to_string(), name, previous));
        }

        Ok(scope)
    }

    /// Placeholder reference for `key`, ready to splice into an expression
    ///
    /// Unknown keys yield a reference the evaluator will reject.
    pub fn var(&self, key: &str) -> String {
        match self.saved.iter().find(|(k, _, _)| k == key) {
            Some((_, name, _)) => format!("${}", name),
            None => format!("$unbound_{}", key),
        }
    }

    /// Evaluate an expression built from this scope's placeholders
    pub fn eval(&self, expr: &str) -> HostResult<H::Value> {
        self.host.evaluate(expr)
    }

    /// Current value bound to `key`
    pub fn get(&self, key: &str) -> HostResult<H::Value> {
        self.eval(&self.var(key))
    }
}

impl<H: Host> Drop for ScopedVars<'_, H> {
    fn drop(&mut self) {
        for (_, name, previous) in self.saved.drain(..).rev() {
            self.host.set_var(&name, previous);
        }
    }
}
