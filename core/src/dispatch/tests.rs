//! Tests for the dispatch engine and its renderers

#![cfg(test)]

use super::*;
use crate::host::{HostResult, ResolverChain};
use crate::printer::{Nodes, SummaryFormatter, ViewNode, ViewSpec, container_range, member_int};
use crate::sim::{SimProcess, SimValue};
use crate::tag::TagTuple;

type Sim = SimProcess;

struct Components(SimValue);

impl ViewNode<Sim> for Components {
    fn children<'a>(&'a self, cx: RenderContext<'a, Sim>) -> Children<'a, SimValue> {
        Box::new(
            [("red", "r"), ("green", "g"), ("blue", "b")]
                .into_iter()
                .map(move |(label, member)| {
                    let child = cx
                        .host
                        .field(&self.0, member)
                        .map(Child::Value)
                        .unwrap_or_else(|e| Child::error(e));
                    (label.to_string(), child)
                }),
        )
    }
}

struct Statistics(SimValue);

impl ViewNode<Sim> for Statistics {
    fn children<'a>(&'a self, cx: RenderContext<'a, Sim>) -> Children<'a, SimValue> {
        let brightness = ["r", "g", "b"]
            .iter()
            .map(|c| member_int(cx.host, &self.0, c))
            .sum::<HostResult<i64>>()
            .map(|sum| Child::Text(format!("{:.1}", sum as f64 / 3.0)))
            .unwrap_or_else(|e| Child::error(e));
        Box::new(std::iter::once(("brightness".to_string(), brightness)))
    }

    fn summary(&self, _cx: RenderContext<'_, Sim>, _max_length: usize) -> HostResult<String> {
        Ok("stats".to_string())
    }
}

fn color_spec(default_view: Option<&str>) -> PrinterSpec<Sim> {
    let alpha = Nodes::<Sim>::new().member("raw", "a").node("normalized", |cx, v| {
        let a = member_int(cx.host, v, "a")?;
        Ok(Child::Text(format!("{:.3}", a as f64 / 255.0)))
    });

    let spec = PrinterSpec::new()
        .field_summary(SummaryFormatter::named())
        .view(
            ViewSpec::<Sim>::nested("Components", |v: &SimValue| Components(v.clone()))
                .field_summary(SummaryFormatter::named().with_type(false)),
        )
        .view(ViewSpec::fixed("Alpha", alpha).field_summary(SummaryFormatter::new().with_type(false)))
        .view(ViewSpec::<Sim>::nested("Statistics", |v: &SimValue| Statistics(v.clone())));

    match default_view {
        Some(name) => spec.default_view(name),
        None => spec,
    }
}

fn registry_with(spec: PrinterSpec<Sim>) -> PrinterRegistry<Sim> {
    let mut registry = PrinterRegistry::new();
    registry.add_printer("ColorRGBA", spec);
    registry.finalize();
    registry
}

fn entries(renderer: &dyn Renderer<SimValue>) -> Vec<(String, Child<SimValue>)> {
    renderer.children().collect()
}

fn labels(renderer: &dyn Renderer<SimValue>) -> Vec<String> {
    renderer.children().map(|(label, _)| label).collect()
}

fn entry<'a>(children: &'a [(String, Child<SimValue>)], label: &str) -> &'a Child<SimValue> {
    &children
        .iter()
        .find(|(l, _)| l == label)
        .unwrap_or_else(|| panic!("no child {label}"))
        .1
}

#[test]
fn test_default_view_at_top_level() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(Some("Alpha")));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let top = engine.render(&color).unwrap();
    assert_eq!(
        labels(top.as_ref()),
        ["raw", "normalized", "<Static>", "<Raw>", "<Components>", "<Statistics>"]
    );
    assert_eq!(top.summary(120), "{ 255, 128, 64, 200 }");

    let children = entries(top.as_ref());
    assert_eq!(entry(&children, "normalized"), &Child::Text("0.784".to_string()));
    let Child::Value(raw) = entry(&children, "raw") else {
        panic!("raw is not a value");
    };
    assert_eq!(process.to_integer(raw).unwrap(), 200);
}

#[test]
fn test_static_entry_only_with_class_data() {
    let process = SimProcess::with_samples();
    process.define_struct("Plain", &[("x", "int")]);
    let plain = process.alloc_struct("Plain", &[("x", 1)]);

    let mut registry = PrinterRegistry::new();
    registry.add_printer(
        "Plain",
        PrinterSpec::new()
            .default_view("Only")
            .view(ViewSpec::fixed("Only", Nodes::<Sim>::new().member("x", "x"))),
    );
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);

    let top = engine.render(&plain).unwrap();
    assert_eq!(labels(top.as_ref()), ["x", "<Raw>"]);
}

#[test]
fn test_raw_fields_at_top_level_without_default_view() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(None));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let top = engine.render(&color).unwrap();
    assert_eq!(
        labels(top.as_ref()),
        ["r", "g", "b", "a", "<Static>", "<Raw>", "<Components>", "<Alpha>", "<Statistics>"]
    );
    assert_eq!(top.summary(120), "ColorRGBA { r=255, g=128, b=64, a=200 }");
}

#[test]
fn test_synthetic_children_round_trip() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(Some("Alpha")));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let top = engine.render(&color).unwrap();
    let children = entries(top.as_ref());

    let raw = engine.render_child(entry(&children, "<Raw>")).unwrap();
    assert_eq!(labels(raw.as_ref()), ["r", "g", "b", "a"]);
    assert_eq!(raw.summary(120), "ColorRGBA { r=255, g=128, b=64, a=200 }");

    let statics = engine.render_child(entry(&children, "<Static>")).unwrap();
    let static_children = entries(statics.as_ref());
    assert_eq!(static_children.len(), 1);
    let Child::Value(channels) = entry(&static_children, "channels") else {
        panic!("channels not resolved");
    };
    assert_eq!(process.to_integer(channels).unwrap(), 4);

    let components = engine.render_child(entry(&children, "<Components>")).unwrap();
    assert_eq!(labels(components.as_ref()), ["red", "green", "blue"]);
    assert_eq!(components.summary(120), "{ r=255, g=128, b=64, a=200 }");

    let statistics = engine.render_child(entry(&children, "<Statistics>")).unwrap();
    assert_eq!(statistics.summary(120), "stats");
    assert_eq!(
        entries(statistics.as_ref()),
        [("brightness".to_string(), Child::Text("149.0".to_string()))]
    );
}

#[test]
fn test_view_index_selects_declared_view() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(None));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let expected: [&[&str]; 3] = [
        &["red", "green", "blue"],
        &["raw", "normalized"],
        &["brightness"],
    ];
    for (index, labels_of_view) in expected.iter().enumerate() {
        let request = RenderRequest::new(color.clone(), &ViewTag::View(index));
        let view = engine.render_request(&request);
        assert_eq!(labels(view.as_ref()), *labels_of_view, "view {index}");
    }

    let out_of_range = engine.render_request(&RenderRequest::new(color, &ViewTag::View(3)));
    assert_eq!(out_of_range.summary(120), ERROR_MARKER);
    assert_eq!(out_of_range.children().count(), 0);
}

#[test]
fn test_failing_node_becomes_error_child() {
    let process = SimProcess::with_samples();
    let mut registry = PrinterRegistry::new();
    registry.add_printer(
        "ColorRGBA",
        PrinterSpec::new().default_view("Broken").view(ViewSpec::fixed(
            "Broken",
            Nodes::<Sim>::new()
                .member("red", "r")
                .member("missing", "no_such_member")
                .member("alpha", "a"),
        )),
    );
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let top = engine.render(&color).unwrap();
    let children = entries(top.as_ref());
    assert!(matches!(entry(&children, "red"), Child::Value(_)));
    assert!(entry(&children, "missing").is_error());
    assert_eq!(entry(&children, "missing").display_text(), Some("<error>"));
    assert!(matches!(entry(&children, "alpha"), Child::Value(_)));
}

#[test]
fn test_missing_default_view_placeholder() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(Some("Nope")));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let top = engine.render(&color).unwrap();
    let message = "<default_view \"Nope\" not defined>";
    assert_eq!(top.summary(120), message);

    let children = entries(top.as_ref());
    assert_eq!(children[0].0, message);
    let placeholder = engine.render_child(&children[0].1).unwrap();
    assert_eq!(placeholder.summary(120), message);
    assert_eq!(placeholder.children().count(), 0);

    // all three views stay reachable
    assert_eq!(
        &labels(top.as_ref())[1..],
        ["<Static>", "<Raw>", "<Components>", "<Alpha>", "<Statistics>"]
    );
}

#[test]
fn test_unknown_tag_kind() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(None));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let color = process.global("color").unwrap();

    let request = RenderRequest::from_tuple(color, TagTuple::from_slice(&[9, 1]));
    let renderer = engine.render_request(&request);
    assert_eq!(renderer.summary(120), ERROR_MARKER);
    assert_eq!(renderer.children().count(), 0);
}

#[test]
fn test_type_encoded_children_match_requests() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(Some("Alpha")));
    let request_config = RenderConfig::default();
    let encoded_config = RenderConfig {
        tag_mode: TagMode::TypeEncoded,
        ..RenderConfig::default()
    };
    let by_request = DispatchEngine::new(&process, &registry, &request_config);
    let by_type = DispatchEngine::new(&process, &registry, &encoded_config);
    let color = process.global("color").unwrap();

    let top = by_type.render(&color).unwrap();
    let encoded: Vec<_> = by_type.children(top.as_ref()).collect();
    let plain: Vec<_> = by_request.children(top.as_ref()).collect();
    assert_eq!(encoded.len(), plain.len());

    for ((label, forged), (_, tagged)) in encoded.iter().zip(&plain) {
        let Child::Tagged(_) = tagged else {
            assert_eq!(forged, tagged);
            continue;
        };
        let Child::Value(forged) = forged else {
            panic!("{label} was not forged");
        };
        assert!(crate::tag::is_tagged(&process.type_name(forged).unwrap()));

        let from_type = by_type.render(forged).unwrap();
        let from_request = by_request.render_child(tagged).unwrap();
        assert_eq!(labels(from_type.as_ref()), labels(from_request.as_ref()), "{label}");
        assert_eq!(from_type.summary(120), from_request.summary(120), "{label}");
    }
}

#[test]
fn test_fallbacks_without_printer() {
    let process = SimProcess::with_samples();
    let registry = PrinterRegistry::new();
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);

    let circle = process.global("circle").unwrap();
    let top = engine.render(&circle).unwrap();
    assert_eq!(labels(top.as_ref()), ["Shape (base)", "radius"]);
    assert_eq!(top.summary(120), "");

    let color = process.global("color").unwrap();
    let top = engine.render(&color).unwrap();
    assert_eq!(labels(top.as_ref()), ["r", "g", "b", "a", "<Static>"]);

    process.define_union("Number", &[("i", "int"), ("u", "unsigned int")]);
    let number = process.alloc_struct("Number", &[("i", 5)]);
    assert_eq!(process.type_code(&number).unwrap(), TypeCode::Union);
    let top = engine.render(&number).unwrap();
    assert_eq!(labels(top.as_ref()), ["i", "u"]);

    let table = process.global("table").unwrap();
    let array = engine.render(&table).unwrap();
    assert_eq!(labels(array.as_ref()), ["[0]", "[1]", "[2]", "[3]"]);
    assert_eq!(array.summary(120), "int [4]");

    let values: Vec<i64> = (0..40).collect();
    let long = process.alloc_array("int", &values);
    let array = engine.render(&long).unwrap();
    assert_eq!(labels(array.as_ref()), ["[0..15]", "[16..31]", "[32..39]"]);

    let number = process.alloc_int("int", 3);
    assert!(engine.render(&number).is_none());
}

#[test]
fn test_chunk_node_expands_elements() {
    let process = SimProcess::with_samples();
    let mut registry = PrinterRegistry::new();
    registry
        .add_pattern(
            "std::vector<.*>",
            PrinterSpec::new().summary_text("std::vector").view(ViewSpec::<Sim>::elements(
                "Elements",
                |cx, v| {
                    match container_range(cx.host, v, "_M_start", "_M_finish", None) {
                        Ok(range) => cx.chunked(range),
                        Err(e) => Box::new(std::iter::once(("<error>".to_string(), Child::error(e)))),
                    }
                },
            )),
        )
        .unwrap();
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);
    let numbers = process.global("numbers").unwrap();

    let top = engine.render(&numbers).unwrap();
    assert_eq!(top.summary(120), "std::vector");
    let children = entries(top.as_ref());
    let elements = engine.render_child(entry(&children, "<Elements>")).unwrap();
    let chunks = entries(elements.as_ref());
    assert_eq!(
        chunks.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>(),
        ["[0..15]", "[16..31]", "[32..34]"]
    );

    let last = engine.render_child(&chunks[2].1).unwrap();
    let items = entries(last.as_ref());
    assert_eq!(
        items.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>(),
        ["[32]", "[33]", "[34]"]
    );
    let Child::Value(value) = &items[2].1 else {
        panic!("element failed");
    };
    assert_eq!(process.to_integer(value).unwrap(), 34);
}

#[test]
fn test_resolver_chain_uses_engine() {
    let process = SimProcess::with_samples();
    let registry = registry_with(color_spec(None));
    let config = RenderConfig::default();
    let engine = DispatchEngine::new(&process, &registry, &config);

    let mut chain = ResolverChain::new();
    chain.push(&engine);
    let color = process.global("color").unwrap();
    let number = process.alloc_int("int", 1);

    assert!(chain.resolve(&color).is_some());
    assert!(chain.resolve(&number).is_none());
}
