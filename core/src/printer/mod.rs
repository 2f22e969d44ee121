//! Printer specifications and their registry
//!
//! Printer authors describe a type declaratively with [`PrinterSpec`] and
//! [`ViewSpec`], register it in a [`PrinterRegistry`] during the configuration
//! phase, and hand the finalized registry to the dispatch engine.
//!
//! ```rust,ignore
//! registry.add_printer(
//!     "ColorRGBA",
//!     PrinterSpec::new()
//!         .field_summary(SummaryFormatter::named())
//!         .default_view("Alpha")
//!         .view(ViewSpec::fixed("Alpha", Nodes::new().member("raw", "a"))),
//! );
//! ```

pub mod access;
mod registry;
mod spec;
mod summary;

pub use access::{container_range, member, member_int};
pub use registry::{Matcher, PrinterRegistry, RegistryError};
pub use spec::{
    AccessorFn, ElementsFn, NodeAccessor, NodeFn, Nodes, PrinterSpec, SummaryFn, ViewExpansion,
    ViewNode, ViewSpec,
};
pub use summary::SummaryFormatter;
