//! Tree-rendering protocol as seen from the host
//!
//! Hosts keep an ordered list of resolvers and ask each in turn how to render
//! a value; the first renderer returned wins and the host falls back to its
//! own printing when none answers.

use crate::dispatch::Renderer;

/// Something that may know how to render a value
pub trait Resolver<V> {
    /// Renderer for `value`, or `None` to let later resolvers try
    fn resolve(&self, value: &V) -> Option<Box<dyn Renderer<V> + '_>>;
}

/// Ordered resolver list, first match wins
pub struct ResolverChain<'a, V> {
    resolvers: Vec<&'a dyn Resolver<V>>,
}

impl<V> Default for ResolverChain<'_, V> {
    fn default() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }
}

impl<'a, V> ResolverChain<'a, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver after the existing ones
    pub fn push(&mut self, resolver: &'a dyn Resolver<V>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl<V> Resolver<V> for ResolverChain<'_, V> {
    fn resolve(&self, value: &V) -> Option<Box<dyn Renderer<V> + '_>> {
        self.resolvers.iter().find_map(|r| r.resolve(value))
    }
}
