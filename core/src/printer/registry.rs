//! Printer registry
//!
//! Maps type names to printer specifications. Exact names are looked up first
//! and can never be shadowed by a pattern; patterns are then tried in
//! registration order and the first match wins. Registration happens during a
//! configuration phase; after [`PrinterRegistry::finalize`] the registry is
//! read-only.

use hashbrown::HashMap;
use regex::Regex;

use super::spec::PrinterSpec;
use crate::host::Host;

/// Failure registering a printer
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid type pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// How a registered printer is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher<'a> {
    Exact(&'a str),
    Pattern(&'a str),
}

/// Registry of printer specifications
pub struct PrinterRegistry<H: Host> {
    /// Exact type name → spec
    exact: HashMap<String, PrinterSpec<H>>,
    /// (source pattern, compiled anchored pattern, spec) in registration order
    patterns: Vec<(String, Regex, PrinterSpec<H>)>,
    /// Whether the configuration phase is over
    finalized: bool,
}

impl<H: Host> Default for PrinterRegistry<H> {
    fn default() -> Self {
        Self {
            exact: HashMap::new(),
            patterns: Vec::new(),
            finalized: false,
        }
    }
}

impl<H: Host> PrinterRegistry<H> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a printer for one exact type name
    ///
    /// A later registration for the same name replaces the earlier one.
    pub fn add_printer(&mut self, type_name: &str, spec: PrinterSpec<H>) {
        if self.finalized {
            tracing::warn!("add_printer({}) called after finalize - ignored", type_name);
            return;
        }
        report_problems(type_name, &spec);
        tracing::debug!("adding exact printer for type: {}", type_name);
        if self.exact.insert(type_name.to_string(), spec).is_some() {
            tracing::warn!("printer for {} replaced", type_name);
        }
    }

    /// Register a printer for every type name matching `pattern`
    ///
    /// The pattern is anchored at the start of the type name.
    pub fn add_pattern(&mut self, pattern: &str, spec: PrinterSpec<H>) -> Result<(), RegistryError> {
        if self.finalized {
            tracing::warn!("add_pattern({}) called after finalize - ignored", pattern);
            return Ok(());
        }
        let regex =
            Regex::new(&format!("^(?:{})", pattern)).map_err(|source| RegistryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        report_problems(pattern, &spec);
        tracing::debug!("adding pattern printer for types: {}", pattern);
        self.patterns.push((pattern.to_string(), regex, spec));
        Ok(())
    }

    /// End the configuration phase
    pub fn finalize(&mut self) {
        self.finalized = true;
        tracing::info!(
            "printer registry: {} exact, {} pattern printers",
            self.exact.len(),
            self.patterns.len()
        );
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Spec for a type name: exact match first, then patterns in order
    pub fn resolve(&self, type_name: &str) -> Option<&PrinterSpec<H>> {
        if let Some(spec) = self.exact.get(type_name) {
            tracing::trace!("exact match for type: {}", type_name);
            return Some(spec);
        }
        self.patterns
            .iter()
            .find(|(_, regex, _)| regex.is_match(type_name))
            .map(|(pattern, _, spec)| {
                tracing::trace!("pattern match for type: {} with {}", type_name, pattern);
                spec
            })
    }

    /// Every registration, exact names (sorted) before patterns (in order)
    pub fn matchers(&self) -> Vec<(Matcher<'_>, &PrinterSpec<H>)> {
        let mut exact: Vec<_> = self.exact.iter().collect();
        exact.sort_by(|a, b| a.0.cmp(b.0));

        exact
            .into_iter()
            .map(|(name, spec)| (Matcher::Exact(name.as_str()), spec))
            .chain(
                self.patterns
                    .iter()
                    .map(|(pattern, _, spec)| (Matcher::Pattern(pattern.as_str()), spec)),
            )
            .collect()
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

fn report_problems<H: Host>(matcher: &str, spec: &PrinterSpec<H>) {
    for problem in spec.problems() {
        tracing::warn!("printer {}: {}", matcher, problem);
    }
}
