//! Demonstration printers
//!
//! `ColorRGBA` with three views and a pattern printer for `std::vector`. The
//! printers only use the [`Host`] interface, so they work for any backend.

use std::iter;

use viewtree_core::printer::{container_range, member, member_int};
use viewtree_core::{
    Child, Children, Host, HostResult, Nodes, PrinterRegistry, PrinterSpec, RenderContext,
    SummaryFormatter, ViewNode, ViewSpec,
};

pub const VECTOR_PATTERN: &str = "std::vector<.*>";

/// Colour channels as separate children
struct Components<V>(V);

impl<H: Host> ViewNode<H> for Components<H::Value> {
    fn children<'a>(&'a self, cx: RenderContext<'a, H>) -> Children<'a, H::Value> {
        Box::new(
            [("red", "r"), ("green", "g"), ("blue", "b")]
                .into_iter()
                .map(move |(label, channel)| {
                    let child = member(cx.host, &self.0, channel)
                        .map(Child::Value)
                        .unwrap_or_else(|e| Child::error(e));
                    (label.to_string(), child)
                }),
        )
    }
}

/// Values computed from the channels
struct Statistics<V>(V);

impl<V> Statistics<V> {
    fn brightness<H: Host<Value = V>>(&self, host: &H) -> HostResult<f64> {
        let sum = ["r", "g", "b"]
            .iter()
            .map(|channel| member_int(host, &self.0, channel))
            .sum::<HostResult<i64>>()?;
        Ok(sum as f64 / 3.0)
    }
}

impl<H: Host> ViewNode<H> for Statistics<H::Value> {
    fn children<'a>(&'a self, cx: RenderContext<'a, H>) -> Children<'a, H::Value> {
        let brightness = self
            .brightness(cx.host)
            .map(|b| Child::Text(format!("{:.1}", b)))
            .unwrap_or_else(|e| Child::error(e));
        let opacity = normalized_alpha(cx, &self.0).unwrap_or_else(|e| Child::error(e));

        Box::new(
            [("brightness", brightness), ("opacity", opacity)]
                .into_iter()
                .map(|(label, child)| (label.to_string(), child)),
        )
    }
}

fn normalized_alpha<H: Host>(cx: RenderContext<'_, H>, color: &H::Value) -> HostResult<Child<H::Value>> {
    let alpha = member_int(cx.host, color, "a")?;
    Ok(Child::Text(format!("{:.3}", alpha as f64 / 255.0)))
}

fn color_printer<H: Host + 'static>() -> PrinterSpec<H> {
    let alpha = Nodes::<H>::new()
        .member("raw", "a")
        .node("normalized", normalized_alpha::<H>);

    PrinterSpec::new()
        .field_summary(SummaryFormatter::named())
        .view(
            ViewSpec::<H>::nested("Components", |v: &H::Value| Components(v.clone()))
                .field_summary(SummaryFormatter::named().with_type(false)),
        )
        .view(ViewSpec::fixed("Alpha", alpha).field_summary(SummaryFormatter::new().with_type(false)))
        .view(ViewSpec::<H>::nested("Statistics", |v: &H::Value| Statistics(v.clone())))
}

fn vector_elements<'a, H: Host>(cx: RenderContext<'a, H>, vector: &H::Value) -> Children<'a, H::Value> {
    match container_range(cx.host, vector, "begin", "end", Some("size")) {
        Ok(range) => cx.chunked(range),
        Err(e) => Box::new(iter::once(("<error>".to_string(), Child::error(e)))),
    }
}

fn vector_printer<H: Host + 'static>() -> PrinterSpec<H> {
    let size = Nodes::<H>::new().member("size", "size");

    PrinterSpec::new().default_view("Elements").view(
        ViewSpec::fixed_with_tail("Elements", size, vector_elements::<H>)
            .summary(|cx, v, _max_length| Ok(format!("size={}", member_int(cx.host, v, "size")?))),
    )
}

/// Registry holding the demonstration printers, finalized
pub fn registry<H: Host + 'static>() -> PrinterRegistry<H> {
    let mut registry = PrinterRegistry::new();
    registry.add_printer("ColorRGBA", color_printer());
    if let Err(e) = registry.add_pattern(VECTOR_PATTERN, vector_printer()) {
        tracing::error!("{}", e);
    }
    registry.finalize();
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewtree_core::{DispatchEngine, RenderConfig, SimProcess, TagMode, expand};

    fn show(process: &SimProcess, config: &RenderConfig, global: &str, depth: usize) -> viewtree_core::TreeNode {
        let registry = registry::<SimProcess>();
        let engine = DispatchEngine::new(process, &registry, config);
        let value = process.global(global).unwrap();
        expand(&engine, global, &Child::Value(value), depth)
    }

    #[test]
    fn test_color_views() {
        let process = SimProcess::with_samples();
        let tree = show(&process, &RenderConfig::default(), "color", 2);

        assert_eq!(tree.summary, "ColorRGBA { r=255, g=128, b=64, a=200 }");
        assert_eq!(
            tree.labels(),
            ["r", "g", "b", "a", "<Static>", "<Raw>", "<Components>", "<Alpha>", "<Statistics>"]
        );
        assert_eq!(tree.find(&["<Components>"]).unwrap().summary, "{ r=255, g=128, b=64, a=200 }");
        assert_eq!(tree.find(&["<Alpha>"]).unwrap().summary, "{ 255, 128, 64, 200 }");
        assert_eq!(tree.find(&["<Alpha>", "normalized"]).unwrap().summary, "0.784");
        assert_eq!(tree.find(&["<Statistics>", "brightness"]).unwrap().summary, "149.0");
        assert_eq!(tree.find(&["<Statistics>", "opacity"]).unwrap().summary, "0.784");
    }

    #[test]
    fn test_vector_elements_in_both_modes() {
        let process = SimProcess::with_samples();
        let request = RenderConfig::default();
        let encoded = RenderConfig {
            tag_mode: TagMode::TypeEncoded,
            ..RenderConfig::default()
        };

        let tree = show(&process, &request, "numbers", 2);
        assert_eq!(tree.summary, "size=35");
        assert_eq!(tree.labels(), ["size", "[0..15]", "[16..31]", "[32..34]", "<Raw>"]);
        assert_eq!(tree.find(&["[32..34]"]).unwrap().labels(), ["[32]", "[33]", "[34]"]);
        assert_eq!(tree.find(&["[32..34]", "[34]"]).unwrap().summary, "34");

        assert_eq!(show(&process, &encoded, "numbers", 2), tree);
        assert!(process.placeholders().is_empty());
    }

    #[test]
    fn test_registry_contents() {
        let registry = registry::<SimProcess>();
        assert!(registry.is_finalized());
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("std::vector<char, std::allocator<char> >").is_some());
        assert!(registry.resolve("ColorRGBA").is_some());
    }
}
