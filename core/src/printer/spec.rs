//! Printer and view specifications
//!
//! A [`PrinterSpec`] describes how one type (or family of types) is shown: an
//! optional one-line summary, an optional default view and an ordered list of
//! [`ViewSpec`]s. View order is load-bearing: view tags refer to views by
//! position.

use crate::dispatch::{Child, Children, RenderContext};
use crate::host::{Host, HostResult};

use super::summary::SummaryFormatter;

/// Bounded one-line summary of a value
pub type SummaryFn<H> =
    Box<dyn Fn(RenderContext<'_, H>, &<H as Host>::Value, usize) -> HostResult<String>>;

/// Computes one labelled child of a fixed-nodes view
pub type AccessorFn<H> = Box<
    dyn Fn(RenderContext<'_, H>, &<H as Host>::Value) -> HostResult<Child<<H as Host>::Value>>,
>;

/// Builds the hand-written expansion of a nested-renderer view
pub type NodeFn<H> = Box<dyn Fn(&<H as Host>::Value) -> Box<dyn ViewNode<H>>>;

/// Lazily produces the container-like tail of a view
pub type ElementsFn<H> = Box<
    dyn for<'a> Fn(RenderContext<'a, H>, &<H as Host>::Value) -> Children<'a, <H as Host>::Value>,
>;

/// A hand-written view expansion
///
/// Implementations own whatever they captured from the value; the context is
/// supplied on every call.
pub trait ViewNode<H: Host> {
    /// Labelled children of the view
    fn children<'a>(&'a self, cx: RenderContext<'a, H>) -> Children<'a, H::Value>;

    /// One-line summary, empty by default
    fn summary(&self, _cx: RenderContext<'_, H>, _max_length: usize) -> HostResult<String> {
        Ok(String::new())
    }
}

/// One `(label, accessor)` entry of a fixed-nodes view
pub struct NodeAccessor<H: Host> {
    pub label: String,
    pub(crate) get: AccessorFn<H>,
}

/// Ordered list of fixed nodes
pub struct Nodes<H: Host> {
    entries: Vec<NodeAccessor<H>>,
}

impl<H: Host> Default for Nodes<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H: Host> Nodes<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node evaluated by `get`
    pub fn node(
        mut self,
        label: impl Into<String>,
        get: impl Fn(RenderContext<'_, H>, &H::Value) -> HostResult<Child<H::Value>> + 'static,
    ) -> Self {
        self.entries.push(NodeAccessor {
            label: label.into(),
            get: Box::new(get),
        });
        self
    }

    /// Append a node showing the named member
    pub fn member(self, label: impl Into<String>, member: &str) -> Self {
        let member = member.to_string();
        self.node(label, move |cx, value| {
            super::access::member(cx.host, value, &member).map(Child::Value)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeAccessor<H>> {
        self.entries.iter()
    }
}

/// How a view expands into children
pub enum ViewExpansion<H: Host> {
    /// A fixed, ordered list of labelled accessors
    FixedNodes(Nodes<H>),
    /// A hand-written renderer
    NestedRenderer(NodeFn<H>),
    /// Fixed nodes followed by a lazily generated tail
    FixedNodesWithTail { nodes: Nodes<H>, elements: ElementsFn<H> },
}

/// A named alternate grouping of a type's data
pub struct ViewSpec<H: Host> {
    name: Option<String>,
    pub(crate) expansion: ViewExpansion<H>,
    pub(crate) summary: Option<SummaryFn<H>>,
}

impl<H: Host> ViewSpec<H> {
    /// View with an explicit expansion; unnamed views display as `View N`
    pub fn new(name: Option<String>, expansion: ViewExpansion<H>) -> Self {
        Self {
            name,
            expansion,
            summary: None,
        }
    }

    /// View made of fixed nodes
    pub fn fixed(name: impl Into<String>, nodes: Nodes<H>) -> Self {
        Self::new(Some(name.into()), ViewExpansion::FixedNodes(nodes))
    }

    /// View delegating to a hand-written renderer
    pub fn nested<N>(name: impl Into<String>, node: impl Fn(&H::Value) -> N + 'static) -> Self
    where
        N: ViewNode<H> + 'static,
    {
        Self::new(
            Some(name.into()),
            ViewExpansion::NestedRenderer(Box::new(
                move |value: &H::Value| -> Box<dyn ViewNode<H>> { Box::new(node(value)) },
            )),
        )
    }

    /// View made of fixed nodes followed by a lazy tail
    pub fn fixed_with_tail(
        name: impl Into<String>,
        nodes: Nodes<H>,
        elements: impl for<'a> Fn(RenderContext<'a, H>, &H::Value) -> Children<'a, H::Value>
        + 'static,
    ) -> Self {
        Self::new(
            Some(name.into()),
            ViewExpansion::FixedNodesWithTail {
                nodes,
                elements: Box::new(elements),
            },
        )
    }

    /// View that only shows a lazy tail
    pub fn elements(
        name: impl Into<String>,
        elements: impl for<'a> Fn(RenderContext<'a, H>, &H::Value) -> Children<'a, H::Value>
        + 'static,
    ) -> Self {
        Self::fixed_with_tail(name, Nodes::new(), elements)
    }

    /// Set the view's one-line summary
    pub fn summary(
        mut self,
        summary: impl Fn(RenderContext<'_, H>, &H::Value, usize) -> HostResult<String> + 'static,
    ) -> Self {
        self.summary = Some(Box::new(summary));
        self
    }

    /// Summarize the view with a field summary
    pub fn field_summary(self, formatter: SummaryFormatter) -> Self {
        self.summary(move |cx, value, max_length| formatter.format(cx, value, max_length))
    }

    /// Summarize the view with fixed text
    pub fn summary_text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.summary(move |_, _, _| Ok(text.clone()))
    }

    /// Declared name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name shown to the user for the view at `index`
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("View {}", index),
        }
    }

    pub fn expansion(&self) -> &ViewExpansion<H> {
        &self.expansion
    }

    pub fn has_summary(&self) -> bool {
        self.summary.is_some()
    }
}

/// Everything registered for one type
pub struct PrinterSpec<H: Host> {
    pub(crate) summary: Option<SummaryFn<H>>,
    default_view: Option<String>,
    views: Vec<ViewSpec<H>>,
}

impl<H: Host> Default for PrinterSpec<H> {
    fn default() -> Self {
        Self {
            summary: None,
            default_view: None,
            views: Vec::new(),
        }
    }
}

impl<H: Host> PrinterSpec<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the summary shown when no view is selected
    pub fn summary(
        mut self,
        summary: impl Fn(RenderContext<'_, H>, &H::Value, usize) -> HostResult<String> + 'static,
    ) -> Self {
        self.summary = Some(Box::new(summary));
        self
    }

    /// Summarize with a field summary
    pub fn field_summary(self, formatter: SummaryFormatter) -> Self {
        self.summary(move |cx, value, max_length| formatter.format(cx, value, max_length))
    }

    /// Summarize with fixed text
    pub fn summary_text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.summary(move |_, _, _| Ok(text.clone()))
    }

    /// Show the named view at the top of the tree
    pub fn default_view(mut self, name: impl Into<String>) -> Self {
        self.default_view = Some(name.into());
        self
    }

    /// Append a view; its position is its tag index
    pub fn view(mut self, view: ViewSpec<H>) -> Self {
        self.views.push(view);
        self
    }

    pub fn views(&self) -> &[ViewSpec<H>] {
        &self.views
    }

    pub fn default_view_name(&self) -> Option<&str> {
        self.default_view.as_deref()
    }

    /// First view whose display name is `name`
    pub fn view_named(&self, name: &str) -> Option<(usize, &ViewSpec<H>)> {
        self.views
            .iter()
            .enumerate()
            .find(|(index, view)| view.display_name(*index) == name)
    }

    pub fn has_summary(&self) -> bool {
        self.summary.is_some()
    }

    /// Problems worth reporting at registration time
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Some(default) = &self.default_view {
            if self.view_named(default).is_none() {
                problems.push(format!("default view \"{}\" is not declared", default));
            }
        }

        for (index, view) in self.views.iter().enumerate() {
            let name = view.display_name(index);
            if self.views[..index]
                .iter()
                .enumerate()
                .any(|(i, other)| other.display_name(i) == name)
            {
                problems.push(format!("view \"{}\" is declared more than once", name));
            }
        }

        problems
    }
}
