//! Chunked range scanning
//!
//! Paginates a `(begin, end[, size])` sequence into chunks of at most
//! `chunk_size` elements without materialising more than one chunk. Three
//! traversal strategies are tried, cheapest first:
//!
//! 1. **Pointer**: both endpoints are raw pointers, or a well-known iterator
//!    wrapper around one. Length and chunk starts come from native pointer
//!    arithmetic.
//! 2. **Random access**: the evaluator accepts `end - begin` and `begin + 1`.
//!    Same as the pointer path, through evaluated arithmetic.
//! 3. **Forward**: step a copy of `begin` with `++`, stopping at `end`
//!    (tested with `==`) or after `size` elements. Without both an equality
//!    test and a size the end cannot be detected and at most one chunk is
//!    produced.
//!
//! Each chunk is a synthetic child tagged `CHUNK(offset, size)` whose value is
//! the cursor at the chunk start; [`chunk_elements`] expands it.

mod chunks;
mod elements;

pub use chunks::Chunks;
pub use elements::{ChunkElements, chunk_elements};

use crate::host::{Host, ScopedVars, TypeCode};

/// Members through which common library iterators wrap a raw pointer
///
/// libstdc++ `__normal_iterator` (`_M_current`), libc++ `__wrap_iter` (`__i`),
/// MSVC checked iterators (`_Ptr`).
pub const POINTER_MEMBERS: [&str; 3] = ["_M_current", "__i", "_Ptr"];

/// A sequence to paginate
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDescriptor<V> {
    pub begin: V,
    pub end: V,
    /// Element count; authoritative when present
    pub size: Option<u64>,
}

impl<V> ChunkDescriptor<V> {
    pub fn new(begin: V, end: V) -> Self {
        Self {
            begin,
            end,
            size: None,
        }
    }

    pub fn with_size(begin: V, end: V, size: u64) -> Self {
        Self {
            begin,
            end,
            size: Some(size),
        }
    }
}

/// Traversal strategy chosen for a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Pointer,
    RandomAccess,
    Forward,
}

/// The raw pointer inside `value`, if it is one or wraps one
pub fn unwrap_pointer_like<H: Host>(host: &H, value: &H::Value) -> Option<H::Value> {
    if matches!(host.type_code(value), Ok(TypeCode::Pointer)) {
        return Some(value.clone());
    }
    POINTER_MEMBERS.iter().find_map(|member| {
        host.field(value, member)
            .ok()
            .filter(|inner| matches!(host.type_code(inner), Ok(TypeCode::Pointer)))
    })
}

/// Whether the evaluator supports `end - begin` and `begin + 1`
pub fn has_random_access<H: Host>(host: &H, begin: &H::Value, end: &H::Value) -> bool {
    let Ok(scope) = ScopedVars::bind(host, &[("b", begin.clone()), ("e", end.clone())]) else {
        return false;
    };
    let b = scope.var("b");
    let e = scope.var("e");
    scope.eval(&format!("{} - {}", e, b)).is_ok() && scope.eval(&format!("{} + 1", b)).is_ok()
}

/// Pick the cheapest traversal that applies
pub fn classify<H: Host>(host: &H, descriptor: &ChunkDescriptor<H::Value>) -> Traversal {
    if unwrap_pointer_like(host, &descriptor.begin).is_some()
        && unwrap_pointer_like(host, &descriptor.end).is_some()
    {
        Traversal::Pointer
    } else if has_random_access(host, &descriptor.begin, &descriptor.end) {
        Traversal::RandomAccess
    } else {
        Traversal::Forward
    }
}

/// Inclusive index-range label of a chunk, e.g. `[16..31]`
pub fn chunk_label(offset: u64, size: u64) -> String {
    format!("[{}..{}]", offset, offset + size.saturating_sub(1))
}

/// Splits sequences into chunks of bounded size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeScanner {
    chunk_size: u64,
}

impl Default for RangeScanner {
    fn default() -> Self {
        Self::new(16)
    }
}

impl RangeScanner {
    /// Scanner producing chunks of at most `chunk_size` (at least 1) elements
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1) as u64,
        }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Lazy, forward-only sequence of `(label, chunk)` children
    pub fn scan<'a, H: Host>(&self, host: &'a H, descriptor: ChunkDescriptor<H::Value>) -> Chunks<'a, H> {
        Chunks::new(host, self.chunk_size, descriptor)
    }
}
