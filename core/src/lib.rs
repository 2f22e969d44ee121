//! Viewtree Core - value introspection and tree rendering for debuggers
//!
//! This crate turns raw debugger values into readable trees: one-line
//! summaries, named views, and lazily paginated sequences. It is written
//! against an abstract [`Host`] (the debugger's value model) so the same
//! printers work under any backend that can read fields and evaluate
//! expressions.
//!
//! # Architecture
//!
//! - [`PrinterRegistry`] - printers keyed by type name or name pattern
//! - [`DispatchEngine`] - picks the renderer for a value or synthetic node
//! - [`RangeScanner`] - splits iterator ranges into bounded chunks
//! - [`TypeTagCodec`] - carries render tags inside forged type names
//! - [`tree::expand`] - what a front end does with the protocol
//! - [`SimProcess`] - an in-memory host used by the CLI and tests

pub mod config;
pub mod dispatch;
pub mod host;
pub mod printer;
pub mod range;
pub mod sim;
pub mod tag;
pub mod tree;

pub use config::{ConfigError, RenderConfig, TagMode};
pub use dispatch::{Child, Children, DispatchEngine, ERROR_MARKER, RenderContext, Renderer};
pub use host::{FieldInfo, Host, HostError, HostResult, TypeCode, TypeName};
pub use printer::{
    Nodes, PrinterRegistry, PrinterSpec, RegistryError, SummaryFormatter, ViewNode, ViewSpec,
};
pub use range::{ChunkDescriptor, RangeScanner, Traversal};
pub use sim::{SimProcess, SimValue};
pub use tag::{RenderRequest, TagError, TypeTagCodec, ViewTag};
pub use tree::{TreeNode, expand};
