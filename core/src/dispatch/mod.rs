//! Dispatch engine
//!
//! The host-visible entry point. For each value the host is about to display
//! the engine recovers any synthetic tag, resolves the printer spec and
//! returns a [`Renderer`]: a bounded one-line summary plus a lazy sequence of
//! labelled children. Children may themselves be synthetic (`<Raw>`,
//! `<Static>`, `<Alpha>`, `[16..31]`), which the host feeds back through the
//! engine.
//!
//! # Failure semantics
//!
//! Nothing raises past the engine. A child that cannot be fetched becomes an
//! inline `<error>` entry; a node that cannot be rendered at all becomes an
//! error renderer. Siblings are unaffected.

mod renderers;
mod tests;

pub use renderers::{
    ArrayRenderer, ChunkRenderer, ErrorRenderer, MessageRenderer, RawRenderer, StaticRenderer,
    TopLevelRenderer, ViewRenderer,
};

use std::fmt;

use crate::config::{RenderConfig, TagMode};
use crate::host::{Host, Resolver, TypeCode, TypeName};
use crate::printer::{PrinterRegistry, PrinterSpec};
use crate::range::{ChunkDescriptor, RangeScanner};
use crate::tag::{RenderRequest, TypeTagCodec, ViewTag, is_tagged};

/// Placeholder shown for a child that could not be evaluated
pub const ERROR_MARKER: &str = "<error>";

/// One child of a rendered node
#[derive(Debug, Clone, PartialEq)]
pub enum Child<V> {
    /// A real value, rendered by the host (possibly through the engine again)
    Value(V),
    /// A synthetic node
    Tagged(RenderRequest<V>),
    /// Literal text computed by a printer
    Text(String),
    /// The child could not be evaluated; shown as `<error>`
    Error(String),
}

impl<V> Child<V> {
    /// Error child recording why evaluation failed
    pub fn error(reason: impl fmt::Display) -> Self {
        Child::Error(reason.to_string())
    }

    /// Text the host shows in place of a value, for text and error children
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Child::Text(text) => Some(text),
            Child::Error(_) => Some(ERROR_MARKER),
            Child::Value(_) | Child::Tagged(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Child::Error(_))
    }
}

/// Lazy sequence of labelled children
pub type Children<'a, V> = Box<dyn Iterator<Item = (String, Child<V>)> + 'a>;

/// Tree-rendering protocol object handed to the host
pub trait Renderer<V> {
    /// One-line summary of at most roughly `max_length` characters
    fn summary(&self, max_length: usize) -> String;

    /// Lazy children; the host may stop pulling at any point
    fn children(&self) -> Children<'_, V>;
}

/// Host, registry and configuration, as seen by renderers and printers
pub struct RenderContext<'a, H: Host> {
    pub host: &'a H,
    pub registry: &'a PrinterRegistry<H>,
    pub config: &'a RenderConfig,
}

impl<H: Host> Clone for RenderContext<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: Host> Copy for RenderContext<'_, H> {}

impl<'a, H: Host> RenderContext<'a, H> {
    pub fn new(host: &'a H, registry: &'a PrinterRegistry<H>, config: &'a RenderConfig) -> Self {
        Self {
            host,
            registry,
            config,
        }
    }

    /// Printer spec registered for a value's unqualified type
    pub fn printer_for(&self, value: &H::Value) -> Option<&'a PrinterSpec<H>> {
        let type_text = self.host.type_name(value).ok()?;
        let name = TypeName::parse(&type_text).unqualified().to_string();
        self.registry.resolve(&name)
    }

    /// Summary from the value's own printer, when one is registered and says
    /// something
    pub fn nested_summary(&self, value: &H::Value, max_length: usize) -> Option<String> {
        let spec = self.printer_for(value)?;
        let text = TopLevelRenderer::new(*self, value.clone(), Some(spec)).summary(max_length);
        (!text.is_empty()).then_some(text)
    }

    /// Chunked children for a sequence, using the configured chunk size
    pub fn chunked(&self, descriptor: ChunkDescriptor<H::Value>) -> Children<'a, H::Value> {
        Box::new(RangeScanner::new(self.config.chunk_size).scan(self.host, descriptor))
    }
}

/// Chooses and builds renderers for host values
pub struct DispatchEngine<'a, H: Host> {
    cx: RenderContext<'a, H>,
}

impl<'a, H: Host> DispatchEngine<'a, H> {
    pub fn new(host: &'a H, registry: &'a PrinterRegistry<H>, config: &'a RenderConfig) -> Self {
        Self {
            cx: RenderContext::new(host, registry, config),
        }
    }

    pub fn context(&self) -> RenderContext<'a, H> {
        self.cx
    }

    /// Renderer for a host value, or `None` to let the host print it itself
    pub fn render(&self, value: &H::Value) -> Option<Box<dyn Renderer<H::Value> + 'a>> {
        let cx = self.cx;
        let type_text = match cx.host.type_name(value) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("cannot read type of value: {}", e);
                return None;
            }
        };
        tracing::debug!("type: {}", type_text);

        if is_tagged(&type_text) {
            return match TypeTagCodec::decode(cx.host, value) {
                Ok(request) => Some(self.render_request(&request)),
                Err(e) => {
                    tracing::warn!("cannot decode tagged value of type {}: {}", type_text, e);
                    Some(Box::new(ErrorRenderer::new(e.to_string())))
                }
            };
        }

        let name = TypeName::parse(&type_text).unqualified().to_string();
        if let Some(spec) = cx.registry.resolve(&name) {
            tracing::debug!("printer found for type: {}", name);
            return Some(Box::new(TopLevelRenderer::new(cx, value.clone(), Some(spec))));
        }

        match cx.host.type_code(value) {
            Ok(code) if code.is_composite() => {
                tracing::debug!("default printer for composite type: {}", name);
                Some(Box::new(TopLevelRenderer::new(cx, value.clone(), None)))
            }
            Ok(TypeCode::Array) => {
                tracing::debug!("array printer for type: {}", name);
                Some(Box::new(ArrayRenderer::new(cx, value.clone())))
            }
            Ok(_) => {
                tracing::trace!("no printer found for type: {}", name);
                None
            }
            Err(e) => {
                tracing::warn!("cannot classify type {}: {}", name, e);
                None
            }
        }
    }

    /// Renderer for a synthetic node
    pub fn render_request(&self, request: &RenderRequest<H::Value>) -> Box<dyn Renderer<H::Value> + 'a> {
        let cx = self.cx;
        let tag = match request.view_tag() {
            Ok(tag) => tag,
            Err(e) => {
                tracing::warn!("cannot render synthetic node: {}", e);
                return Box::new(ErrorRenderer::new(e.to_string()));
            }
        };
        let value = request.value.clone();
        tracing::debug!("synthetic node {:?}", tag);

        match tag {
            ViewTag::Static => Box::new(StaticRenderer::new(cx, value)),
            ViewTag::Raw => {
                let spec = cx.printer_for(&value);
                Box::new(RawRenderer::new(cx, value, spec))
            }
            ViewTag::Chunk { offset, size } => Box::new(ChunkRenderer::new(cx, value, offset, size)),
            ViewTag::View(index) => {
                let Some(spec) = cx.printer_for(&value) else {
                    tracing::warn!("view {} requested for a type without a printer", index);
                    return Box::new(ErrorRenderer::new(format!("no printer for view {}", index)));
                };
                match spec.views().get(index) {
                    Some(view) => Box::new(ViewRenderer::new(cx, value, view)),
                    None => {
                        tracing::warn!("view index {} out of range ({} views)", index, spec.views().len());
                        Box::new(ErrorRenderer::new(format!("no view {}", index)))
                    }
                }
            }
            ViewTag::Message(bytes) => Box::new(MessageRenderer::new(String::from_utf8_lossy(&bytes))),
        }
    }

    /// Renderer for a child produced by another renderer
    pub fn render_child(&self, child: &Child<H::Value>) -> Option<Box<dyn Renderer<H::Value> + 'a>> {
        match child {
            Child::Value(value) => self.render(value),
            Child::Tagged(request) => Some(self.render_request(request)),
            Child::Text(_) | Child::Error(_) => None,
        }
    }

    /// Children of `renderer` in the configured transport
    ///
    /// With [`TagMode::TypeEncoded`] synthetic children are handed over as
    /// forged host values instead of render requests.
    pub fn children<'r>(&self, renderer: &'r dyn Renderer<H::Value>) -> Children<'r, H::Value>
    where
        'a: 'r,
    {
        let children = renderer.children();
        match self.cx.config.tag_mode {
            TagMode::Request => children,
            TagMode::TypeEncoded => {
                let host = self.cx.host;
                Box::new(children.map(move |(label, child)| match child {
                    Child::Tagged(request) => match TypeTagCodec::encode(host, &request) {
                        Ok(value) => (label, Child::Value(value)),
                        Err(e) => {
                            tracing::warn!("cannot encode synthetic node {}: {}", label, e);
                            (label, Child::error(e))
                        }
                    },
                    other => (label, other),
                }))
            }
        }
    }
}

impl<H: Host> Resolver<H::Value> for DispatchEngine<'_, H> {
    fn resolve(&self, value: &H::Value) -> Option<Box<dyn Renderer<H::Value> + '_>> {
        self.render(value)
    }
}
