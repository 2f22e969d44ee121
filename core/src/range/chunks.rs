//! Chunk sequence

use super::{ChunkDescriptor, Traversal, chunk_label, classify, unwrap_pointer_like};
use crate::dispatch::Child;
use crate::host::{Host, HostError, HostResult, ScopedVars};
use crate::tag::{RenderRequest, ViewTag};

enum ScanState<'a, H: Host> {
    /// Not classified yet; work starts on the first pull
    Pending(ChunkDescriptor<H::Value>),
    Pointer {
        begin: H::Value,
        length: u64,
    },
    RandomAccess {
        scope: ScopedVars<'a, H>,
        length: u64,
    },
    Forward {
        scope: ScopedVars<'a, H>,
        size: Option<u64>,
        /// Whether `it == end` evaluates at all
        end_test: bool,
    },
    Done,
}

/// Lazy sequence of chunk children
///
/// Placeholders used by the scan are released when the sequence is dropped,
/// whether or not it was fully consumed.
pub struct Chunks<'a, H: Host> {
    host: &'a H,
    chunk_size: u64,
    /// Index of the first element of the next chunk
    next_index: u64,
    state: ScanState<'a, H>,
}

impl<'a, H: Host> Chunks<'a, H> {
    pub(super) fn new(host: &'a H, chunk_size: u64, descriptor: ChunkDescriptor<H::Value>) -> Self {
        Self {
            host,
            chunk_size,
            next_index: 0,
            state: ScanState::Pending(descriptor),
        }
    }

    fn start(&self, descriptor: ChunkDescriptor<H::Value>) -> HostResult<ScanState<'a, H>> {
        let host = self.host;
        let traversal = classify(host, &descriptor);
        tracing::debug!("scanning range with {:?} traversal", traversal);

        match traversal {
            Traversal::Pointer => {
                let not_pointer = || HostError::TypeMismatch("range endpoint is not pointer-like".into());
                let begin = unwrap_pointer_like(host, &descriptor.begin).ok_or_else(not_pointer)?;
                let end = unwrap_pointer_like(host, &descriptor.end).ok_or_else(not_pointer)?;
                let length = match descriptor.size {
                    Some(size) => size,
                    None => host.pointer_difference(&end, &begin)?.max(0) as u64,
                };
                Ok(ScanState::Pointer { begin, length })
            }
            Traversal::RandomAccess => {
                let scope = ScopedVars::bind(host, &[("b", descriptor.begin), ("e", descriptor.end)])?;
                let length = match descriptor.size {
                    Some(size) => size,
                    None => {
                        let diff = scope.eval(&format!("{} - {}", scope.var("e"), scope.var("b")))?;
                        host.to_integer(&diff)?.max(0) as u64
                    }
                };
                Ok(ScanState::RandomAccess { scope, length })
            }
            Traversal::Forward => {
                let scope = ScopedVars::bind(host, &[("it", descriptor.begin), ("end", descriptor.end)])?;
                let end_test = scope.eval(&equality(&scope)).is_ok();
                if !end_test && descriptor.size.is_none() {
                    tracing::debug!("range has no size and no working ==, capping at one chunk");
                }
                Ok(ScanState::Forward {
                    scope,
                    size: descriptor.size,
                    end_test,
                })
            }
        }
    }

    /// Produce the next chunk, or `None` once the state is exhausted
    fn advance(&mut self) -> HostResult<Option<(String, Child<H::Value>)>> {
        let index = self.next_index;
        let chunk_size = self.chunk_size;

        let (cursor, count) = match &self.state {
            ScanState::Pending(_) | ScanState::Done => return Ok(None),
            ScanState::Pointer { begin, length } => {
                if index >= *length {
                    return Ok(None);
                }
                let count = chunk_size.min(length - index);
                (self.host.offset_pointer(begin, index as i64)?, count)
            }
            ScanState::RandomAccess { scope, length } => {
                if index >= *length {
                    return Ok(None);
                }
                let count = chunk_size.min(length - index);
                (scope.eval(&format!("{} + {}", scope.var("b"), index))?, count)
            }
            ScanState::Forward {
                scope,
                size,
                end_test,
            } => {
                match size {
                    Some(total) if index >= *total => return Ok(None),
                    Some(_) => {}
                    None if !*end_test && index > 0 => return Ok(None),
                    None => {
                        if *end_test && at_end(self.host, scope) {
                            return Ok(None);
                        }
                    }
                }

                let start = scope.get("it")?;
                let limit = size.map_or(chunk_size, |total| chunk_size.min(total - index));
                let increment = format!("++{}", scope.var("it"));

                let mut steps = 0;
                while steps < limit {
                    if size.is_none() && *end_test && at_end(self.host, scope) {
                        break;
                    }
                    if let Err(e) = scope.eval(&increment) {
                        tracing::warn!("range scan stopped: cannot advance iterator: {}", e);
                        break;
                    }
                    steps += 1;
                }
                (start, steps)
            }
        };

        if count == 0 {
            return Ok(None);
        }

        self.next_index += count;
        let request = RenderRequest::new(cursor, &ViewTag::Chunk { offset: index, size: count });
        Ok(Some((chunk_label(index, count), Child::Tagged(request))))
    }
}

fn equality<H: Host>(scope: &ScopedVars<'_, H>) -> String {
    format!("({} == {})", scope.var("it"), scope.var("end"))
}

fn at_end<H: Host>(host: &H, scope: &ScopedVars<'_, H>) -> bool {
    scope
        .eval(&equality(scope))
        .and_then(|result| host.to_integer(&result))
        .map(|flag| flag != 0)
        .unwrap_or(false)
}

impl<H: Host> Iterator for Chunks<'_, H> {
    type Item = (String, Child<H::Value>);

    fn next(&mut self) -> Option<Self::Item> {
        if let ScanState::Pending(_) = self.state {
            let ScanState::Pending(descriptor) = std::mem::replace(&mut self.state, ScanState::Done) else {
                return None;
            };
            match self.start(descriptor) {
                Ok(state) => self.state = state,
                Err(e) => {
                    tracing::warn!("range scan failed to start: {}", e);
                    return None;
                }
            }
        }

        match self.advance() {
            Ok(Some(chunk)) => Some(chunk),
            Ok(None) => {
                self.state = ScanState::Done;
                None
            }
            Err(e) => {
                tracing::warn!("range scan failed: {}", e);
                self.state = ScanState::Done;
                None
            }
        }
    }
}
