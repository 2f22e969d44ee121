//! Elements of one chunk

use crate::dispatch::Child;
use crate::host::{Host, HostResult, ScopedVars, TypeCode};

/// Lazy sequence of the elements of one chunk
pub struct ChunkElements<'a, H: Host> {
    host: &'a H,
    /// Scoped copy of the cursor; `None` once finished
    scope: Option<ScopedVars<'a, H>>,
    is_pointer: bool,
    offset: u64,
    size: u64,
    emitted: u64,
}

/// Yield `size` elements labelled `[offset]`, `[offset + 1]`, ...
///
/// Each element is read by dereferencing a scoped copy of `cursor`, which is
/// then incremented; the caller's cursor is never modified and the copy never
/// moves past the last element.
pub fn chunk_elements<H: Host>(host: &H, cursor: H::Value, offset: u64, size: u64) -> ChunkElements<'_, H> {
    let is_pointer = matches!(host.type_code(&cursor), Ok(TypeCode::Pointer));
    let scope = match ScopedVars::bind(host, &[("it", cursor)]) {
        Ok(scope) => Some(scope),
        Err(e) => {
            tracing::warn!("chunk elements: cannot bind cursor: {}", e);
            None
        }
    };

    ChunkElements {
        host,
        scope,
        is_pointer,
        offset,
        size,
        emitted: 0,
    }
}

impl<H: Host> ChunkElements<'_, H> {
    fn element(&self, scope: &ScopedVars<'_, H>) -> HostResult<H::Value> {
        if self.emitted > 0 {
            scope.eval(&format!("++{}", scope.var("it")))?;
        }
        if self.is_pointer {
            self.host.dereference(&scope.get("it")?)
        } else {
            scope.eval(&format!("*{}", scope.var("it")))
        }
    }
}

impl<H: Host> Iterator for ChunkElements<'_, H> {
    type Item = (String, Child<H::Value>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted >= self.size {
            self.scope = None;
            return None;
        }
        let scope = self.scope.as_ref()?;
        let label = format!("[{}]", self.offset + self.emitted);

        match self.element(scope) {
            Ok(value) => {
                self.emitted += 1;
                Some((label, Child::Value(value)))
            }
            Err(e) => {
                tracing::warn!("chunk element {}: {}", label, e);
                self.scope = None;
                Some((label, Child::error(e)))
            }
        }
    }
}
