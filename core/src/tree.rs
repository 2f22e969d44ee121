//! Host-side tree expansion
//!
//! What a debugger front end does with the rendering protocol: ask the engine
//! for a renderer, show its summary, pull children and feed each one back
//! through the engine. Expansion is bounded by depth and by the configured
//! `max_children`, so lazily generated sequences are never drained.

use std::fmt;

use crate::dispatch::{Child, DispatchEngine, ERROR_MARKER, Renderer};
use crate::host::Host;

/// One expanded node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeNode {
    pub label: String,
    pub summary: String,
    pub children: Vec<TreeNode>,
    /// Children exist but were not expanded (depth limit reached)
    pub collapsed: bool,
    /// More children exist than were pulled
    pub truncated: bool,
}

impl TreeNode {
    fn leaf(label: String, summary: impl Into<String>) -> Self {
        Self {
            label,
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Direct child with the given label
    pub fn child(&self, label: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Descendant reached by following `path` labels
    pub fn find(&self, path: &[&str]) -> Option<&TreeNode> {
        path.iter().try_fold(self, |node, label| node.child(label))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.label.as_str()).collect()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.label, indent = indent)?;
        if !self.summary.is_empty() {
            write!(f, " = {}", self.summary)?;
        }
        if self.collapsed {
            write!(f, " [+]")?;
        }
        writeln!(f)?;

        for child in &self.children {
            child.write_indented(f, indent + 2)?;
        }
        if self.truncated {
            writeln!(f, "{:indent$}...", "", indent = indent + 2)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Expand `child` under `label`, `depth` levels deep
pub fn expand<H: Host>(
    engine: &DispatchEngine<'_, H>,
    label: impl Into<String>,
    child: &Child<H::Value>,
    depth: usize,
) -> TreeNode {
    let label = label.into();
    let cx = engine.context();

    let renderer = match child {
        Child::Text(text) => return TreeNode::leaf(label, text.as_str()),
        Child::Error(reason) => {
            tracing::debug!("{}: {}", label, reason);
            return TreeNode::leaf(label, ERROR_MARKER);
        }
        Child::Value(value) => match engine.render(value) {
            Some(renderer) => renderer,
            None => {
                let text = cx.host.format_value(value).unwrap_or_else(|e| {
                    tracing::warn!("{}: cannot format value: {}", label, e);
                    ERROR_MARKER.to_string()
                });
                return TreeNode::leaf(label, text);
            }
        },
        Child::Tagged(request) => engine.render_request(request),
    };

    expand_renderer(engine, label, renderer.as_ref(), depth)
}

fn expand_renderer<H: Host>(
    engine: &DispatchEngine<'_, H>,
    label: String,
    renderer: &dyn Renderer<H::Value>,
    depth: usize,
) -> TreeNode {
    let config = engine.context().config;
    let mut node = TreeNode::leaf(label, renderer.summary(config.summary_max_length));

    let mut children = engine.children(renderer);
    if depth == 0 {
        node.collapsed = children.next().is_some();
        return node;
    }

    for (label, child) in children.by_ref().take(config.max_children) {
        node.children.push(expand(engine, label, &child, depth - 1));
    }
    node.truncated = children.next().is_some();
    node
}
