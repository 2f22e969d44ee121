//! Concrete renderers
//!
//! One renderer per kind of node: the top level of a value, its class-level
//! fields, its raw fields, one declared view, one chunk of a sequence, a
//! generic array, and the message and error placeholders.

use std::cell::OnceCell;
use std::iter;

use super::{Child, Children, ERROR_MARKER, RenderContext, Renderer};
use crate::host::{FieldInfo, Host, TypeName};
use crate::printer::{Nodes, PrinterSpec, SummaryFn, ViewExpansion, ViewNode, ViewSpec};
use crate::range::{ChunkDescriptor, chunk_elements};
use crate::tag::{RenderRequest, ViewTag};

fn run_summary<H: Host>(
    cx: RenderContext<'_, H>,
    summary: Option<&SummaryFn<H>>,
    value: &H::Value,
    max_length: usize,
) -> String {
    let Some(summary) = summary else {
        return String::new();
    };
    summary(cx, value, max_length).unwrap_or_else(|e| {
        tracing::warn!("summary failed: {}", e);
        ERROR_MARKER.to_string()
    })
}

fn fields_or_error<H: Host>(
    cx: RenderContext<'_, H>,
    value: &H::Value,
) -> Result<Vec<FieldInfo>, (String, Child<H::Value>)> {
    cx.host.fields(value).map_err(|e| {
        tracing::warn!("cannot enumerate fields: {}", e);
        (ERROR_MARKER.to_string(), Child::error(e))
    })
}

/// Instance fields, base-class sub-objects first where declared
fn raw_children<'a, H: Host>(cx: RenderContext<'a, H>, value: &'a H::Value) -> Children<'a, H::Value> {
    let fields = match fields_or_error(cx, value) {
        Ok(fields) => fields,
        Err(entry) => return Box::new(iter::once(entry)),
    };

    Box::new(
        fields
            .into_iter()
            .filter(|f| f.has_storage)
            .filter_map(move |f| {
                let Some(name) = f.name else {
                    tracing::debug!("skipping anonymous field");
                    return None;
                };
                let (label, fetched) = if f.is_base_class {
                    (format!("{} (base)", name), cx.host.base_class(value, &name))
                } else {
                    let fetched = cx.host.field(value, &name);
                    (name, fetched)
                };
                let child = fetched.map(Child::Value).unwrap_or_else(|e| {
                    tracing::warn!("raw field {}: {}", label, e);
                    Child::error(e)
                });
                Some((label, child))
            }),
    )
}

/// Whether the value's type declares any class-level data
fn has_static<H: Host>(cx: RenderContext<'_, H>, value: &H::Value) -> bool {
    match cx.host.fields(value) {
        Ok(fields) => fields
            .iter()
            .any(|f| !f.has_storage && !f.is_base_class && f.name.is_some()),
        Err(e) => {
            tracing::warn!("has_static: {}", e);
            false
        }
    }
}

fn fixed_nodes<'a, H: Host>(
    cx: RenderContext<'a, H>,
    value: &'a H::Value,
    nodes: &'a Nodes<H>,
) -> impl Iterator<Item = (String, Child<H::Value>)> + 'a {
    nodes.iter().map(move |entry| {
        let child = (entry.get)(cx, value).unwrap_or_else(|e| {
            tracing::warn!("view node {}: {}", entry.label, e);
            Child::error(e)
        });
        (entry.label.clone(), child)
    })
}

/// Expansion of one declared view of one value
struct ViewExpander<'a, H: Host> {
    cx: RenderContext<'a, H>,
    value: H::Value,
    view: &'a ViewSpec<H>,
    /// Hand-written expansion, built on first use
    node: OnceCell<Box<dyn ViewNode<H>>>,
}

impl<'a, H: Host> ViewExpander<'a, H> {
    fn new(cx: RenderContext<'a, H>, value: H::Value, view: &'a ViewSpec<H>) -> Self {
        Self {
            cx,
            value,
            view,
            node: OnceCell::new(),
        }
    }

    fn nested(&self) -> Option<&dyn ViewNode<H>> {
        match self.view.expansion() {
            ViewExpansion::NestedRenderer(build) => {
                Some(self.node.get_or_init(|| build(&self.value)).as_ref())
            }
            _ => None,
        }
    }

    fn summary(&self, max_length: usize) -> String {
        if self.view.has_summary() {
            return run_summary(self.cx, self.view.summary.as_ref(), &self.value, max_length);
        }
        match self.nested() {
            Some(node) => node.summary(self.cx, max_length).unwrap_or_else(|e| {
                tracing::warn!("view summary failed: {}", e);
                ERROR_MARKER.to_string()
            }),
            None => String::new(),
        }
    }

    fn children(&self) -> Children<'_, H::Value> {
        let cx = self.cx;
        let value = &self.value;
        match self.view.expansion() {
            ViewExpansion::FixedNodes(nodes) => Box::new(fixed_nodes(cx, value, nodes)),
            ViewExpansion::NestedRenderer(_) => match self.nested() {
                Some(node) => node.children(cx),
                None => Box::new(iter::empty()),
            },
            ViewExpansion::FixedNodesWithTail { nodes, elements } => Box::new(
                fixed_nodes(cx, value, nodes).chain(iter::once_with(move || elements(cx, value)).flatten()),
            ),
        }
    }
}

/// What the top level of a value shows before its synthetic entries
enum TopView<'a, H: Host> {
    Raw,
    View(ViewExpander<'a, H>),
    Missing(String),
}

/// The top-level expansion of a value
///
/// Shows the default view's children (or the raw fields), followed by
/// `<Static>`, `<Raw>` and one entry per non-default view.
pub struct TopLevelRenderer<'a, H: Host> {
    cx: RenderContext<'a, H>,
    value: H::Value,
    spec: Option<&'a PrinterSpec<H>>,
    top: TopView<'a, H>,
}

impl<'a, H: Host> TopLevelRenderer<'a, H> {
    pub fn new(cx: RenderContext<'a, H>, value: H::Value, spec: Option<&'a PrinterSpec<H>>) -> Self {
        let top = match spec {
            Some(spec) if !spec.views().is_empty() => match spec.default_view_name() {
                None => TopView::Raw,
                Some(name) => match spec.view_named(name) {
                    Some((_, view)) => TopView::View(ViewExpander::new(cx, value.clone(), view)),
                    None => TopView::Missing(name.to_string()),
                },
            },
            _ => TopView::Raw,
        };

        Self { cx, value, spec, top }
    }

    fn synthetic(&self, label: String, tag: ViewTag) -> (String, Child<H::Value>) {
        (label, Child::Tagged(RenderRequest::new(self.value.clone(), &tag)))
    }

    fn synthetic_entries(&self) -> Vec<(String, Child<H::Value>)> {
        let mut entries = Vec::new();

        if has_static(self.cx, &self.value) {
            entries.push(self.synthetic("<Static>".to_string(), ViewTag::Static));
        }

        let Some(spec) = self.spec else {
            return entries;
        };
        if !spec.views().is_empty() {
            entries.push(self.synthetic("<Raw>".to_string(), ViewTag::Raw));
        }

        let default_name = spec.default_view_name();
        for (index, view) in spec.views().iter().enumerate() {
            let name = view.display_name(index);
            if Some(name.as_str()) != default_name {
                entries.push(self.synthetic(format!("<{}>", name), ViewTag::View(index)));
            }
        }

        entries
    }
}

fn missing_view_message(name: &str) -> String {
    format!("<default_view \"{}\" not defined>", name)
}

impl<H: Host> Renderer<H::Value> for TopLevelRenderer<'_, H> {
    fn summary(&self, max_length: usize) -> String {
        match &self.top {
            TopView::Raw => run_summary(
                self.cx,
                self.spec.and_then(|spec| spec.summary.as_ref()),
                &self.value,
                max_length,
            ),
            TopView::View(view) => view.summary(max_length),
            TopView::Missing(name) => missing_view_message(name),
        }
    }

    fn children(&self) -> Children<'_, H::Value> {
        let top: Children<'_, H::Value> = match &self.top {
            TopView::Raw => raw_children(self.cx, &self.value),
            TopView::View(view) => view.children(),
            TopView::Missing(name) => {
                tracing::warn!("default view \"{}\" is not declared", name);
                let message = missing_view_message(name);
                let tag = ViewTag::message(&message);
                Box::new(iter::once(self.synthetic(message, tag)))
            }
        };

        Box::new(top.chain(iter::once_with(|| self.synthetic_entries()).flatten()))
    }
}

/// Class-level fields only
pub struct StaticRenderer<'a, H: Host> {
    cx: RenderContext<'a, H>,
    value: H::Value,
}

impl<'a, H: Host> StaticRenderer<'a, H> {
    pub fn new(cx: RenderContext<'a, H>, value: H::Value) -> Self {
        Self { cx, value }
    }

    /// Class-level data the host cannot reach through the value is looked up
    /// as `Type::name`
    fn class_member(&self, name: &str) -> Child<H::Value> {
        let host = self.cx.host;
        let direct = match host.field(&self.value, name) {
            Ok(found) => return Child::Value(found),
            Err(e) => e,
        };

        let qualified = host
            .type_name(&self.value)
            .map(|text| format!("{}::{}", TypeName::parse(&text).unqualified(), name));
        match qualified.and_then(|expr| host.evaluate(&expr)) {
            Ok(found) => Child::Value(found),
            Err(e) => {
                tracing::warn!("static field {}: {} ({})", name, direct, e);
                Child::error(direct)
            }
        }
    }
}

impl<H: Host> Renderer<H::Value> for StaticRenderer<'_, H> {
    fn summary(&self, _max_length: usize) -> String {
        String::new()
    }

    fn children(&self) -> Children<'_, H::Value> {
        let fields = match fields_or_error(self.cx, &self.value) {
            Ok(fields) => fields,
            Err(entry) => return Box::new(iter::once(entry)),
        };

        Box::new(
            fields
                .into_iter()
                .filter(|f| !f.has_storage && !f.is_base_class)
                .filter_map(|f| f.name)
                .map(|name| {
                    let child = self.class_member(&name);
                    (name, child)
                }),
        )
    }
}

/// Instance fields only
pub struct RawRenderer<'a, H: Host> {
    cx: RenderContext<'a, H>,
    value: H::Value,
    spec: Option<&'a PrinterSpec<H>>,
}

impl<'a, H: Host> RawRenderer<'a, H> {
    pub fn new(cx: RenderContext<'a, H>, value: H::Value, spec: Option<&'a PrinterSpec<H>>) -> Self {
        Self { cx, value, spec }
    }
}

impl<H: Host> Renderer<H::Value> for RawRenderer<'_, H> {
    fn summary(&self, max_length: usize) -> String {
        run_summary(
            self.cx,
            self.spec.and_then(|spec| spec.summary.as_ref()),
            &self.value,
            max_length,
        )
    }

    fn children(&self) -> Children<'_, H::Value> {
        raw_children(self.cx, &self.value)
    }
}

/// One declared view
pub struct ViewRenderer<'a, H: Host> {
    inner: ViewExpander<'a, H>,
}

impl<'a, H: Host> ViewRenderer<'a, H> {
    pub fn new(cx: RenderContext<'a, H>, value: H::Value, view: &'a ViewSpec<H>) -> Self {
        Self {
            inner: ViewExpander::new(cx, value, view),
        }
    }
}

impl<H: Host> Renderer<H::Value> for ViewRenderer<'_, H> {
    fn summary(&self, max_length: usize) -> String {
        self.inner.summary(max_length)
    }

    fn children(&self) -> Children<'_, H::Value> {
        self.inner.children()
    }
}

/// The elements of one chunk
pub struct ChunkRenderer<'a, H: Host> {
    cx: RenderContext<'a, H>,
    cursor: H::Value,
    offset: u64,
    size: u64,
}

impl<'a, H: Host> ChunkRenderer<'a, H> {
    pub fn new(cx: RenderContext<'a, H>, cursor: H::Value, offset: u64, size: u64) -> Self {
        Self {
            cx,
            cursor,
            offset,
            size,
        }
    }
}

impl<H: Host> Renderer<H::Value> for ChunkRenderer<'_, H> {
    fn summary(&self, _max_length: usize) -> String {
        String::new()
    }

    fn children(&self) -> Children<'_, H::Value> {
        Box::new(chunk_elements(self.cx.host, self.cursor.clone(), self.offset, self.size))
    }
}

/// Generic fallback for arrays without a printer
///
/// Short arrays list their elements; longer ones are chunked.
pub struct ArrayRenderer<'a, H: Host> {
    cx: RenderContext<'a, H>,
    value: H::Value,
}

impl<'a, H: Host> ArrayRenderer<'a, H> {
    pub fn new(cx: RenderContext<'a, H>, value: H::Value) -> Self {
        Self { cx, value }
    }

    fn chunks(&self, len: u64) -> Children<'_, H::Value> {
        let host = self.cx.host;
        let range = host
            .index(&self.value, 0)
            .and_then(|first| host.address_of(&first))
            .and_then(|begin| {
                let end = host.offset_pointer(&begin, len as i64)?;
                Ok(ChunkDescriptor::with_size(begin, end, len))
            });

        match range {
            Ok(descriptor) => self.cx.chunked(descriptor),
            Err(e) => {
                tracing::warn!("cannot chunk array: {}", e);
                Box::new(iter::once((ERROR_MARKER.to_string(), Child::error(e))))
            }
        }
    }
}

impl<H: Host> Renderer<H::Value> for ArrayRenderer<'_, H> {
    fn summary(&self, _max_length: usize) -> String {
        self.cx.host.type_name(&self.value).unwrap_or_default()
    }

    fn children(&self) -> Children<'_, H::Value> {
        let len = match self.cx.host.array_len(&self.value) {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!("cannot read array length: {}", e);
                return Box::new(iter::once((ERROR_MARKER.to_string(), Child::error(e))));
            }
        };

        if len > self.cx.config.chunk_size as u64 {
            return self.chunks(len);
        }

        let host = self.cx.host;
        Box::new((0..len).map(move |i| {
            let child = host.index(&self.value, i).map(Child::Value).unwrap_or_else(|e| {
                tracing::warn!("array element {}: {}", i, e);
                Child::error(e)
            });
            (format!("[{}]", i), child)
        }))
    }
}

/// A placeholder node that only carries a message
pub struct MessageRenderer {
    message: String,
}

impl MessageRenderer {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<V: 'static> Renderer<V> for MessageRenderer {
    fn summary(&self, _max_length: usize) -> String {
        self.message.clone()
    }

    fn children(&self) -> Children<'_, V> {
        Box::new(iter::empty())
    }
}

/// A node that could not be rendered at all
pub struct ErrorRenderer {
    reason: String,
}

impl ErrorRenderer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl<V: 'static> Renderer<V> for ErrorRenderer {
    fn summary(&self, _max_length: usize) -> String {
        ERROR_MARKER.to_string()
    }

    fn children(&self) -> Children<'_, V> {
        Box::new(iter::empty())
    }
}
