//! Field summaries
//!
//! Renders a value's instance fields as `{ r=1, g=2, ... }` (or unnamed
//! `{ 1, 2, ... }`) within a length budget. Once the text passes the budget no
//! further fields are read, so huge or deeply nested values stay cheap.

use crate::dispatch::RenderContext;
use crate::host::{Host, HostResult, TypeCode};

/// Configurable field summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryFormatter {
    /// Prefix each field with `name=`
    pub named: bool,
    /// Prefix the braces with the value's type
    pub show_type: bool,
    /// Show single-byte characters as their integer code
    pub char_as_int: bool,
}

impl Default for SummaryFormatter {
    fn default() -> Self {
        Self {
            named: false,
            show_type: true,
            char_as_int: true,
        }
    }
}

impl SummaryFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Named fields, with the type prefix
    pub fn named() -> Self {
        Self {
            named: true,
            ..Self::default()
        }
    }

    pub fn with_named(mut self, named: bool) -> Self {
        self.named = named;
        self
    }

    pub fn with_type(mut self, show_type: bool) -> Self {
        self.show_type = show_type;
        self
    }

    pub fn with_char_as_int(mut self, char_as_int: bool) -> Self {
        self.char_as_int = char_as_int;
        self
    }

    /// Summarize `value` within `max_length` characters of braces content
    ///
    /// The budget covers the braces; the optional type prefix is extra. Text
    /// can overshoot the budget by at most the field that crossed it.
    pub fn format<H: Host>(
        &self,
        cx: RenderContext<'_, H>,
        value: &H::Value,
        max_length: usize,
    ) -> HostResult<String> {
        let host = cx.host;
        let fields: Vec<String> = host
            .fields(value)?
            .into_iter()
            .filter(|f| f.is_instance_data())
            .filter_map(|f| f.name)
            .collect();

        let mut body = String::from("{ ");
        let mut emitted = 0;
        let mut truncated = false;

        for name in &fields {
            if body.len() >= max_length {
                truncated = true;
                break;
            }
            let budget = max_length - body.len();
            let text = self.render_field(cx, value, name, budget);
            let entry = if self.named {
                format!("{}={}", name, text)
            } else {
                text
            };

            if emitted == 0 && body.len() + entry.len() > max_length {
                truncated = true;
                break;
            }
            if emitted > 0 {
                body.push_str(", ");
            }
            body.push_str(&entry);
            emitted += 1;
        }

        let body = match (emitted, truncated) {
            (0, true) => "{...}".to_string(),
            (0, false) => "{}".to_string(),
            (_, true) => format!("{}, ... }}", body),
            (_, false) => format!("{} }}", body),
        };

        if self.show_type {
            Ok(format!("{} {}", host.type_name(value)?, body))
        } else {
            Ok(body)
        }
    }

    /// Text for one field; failures become an inline marker
    fn render_field<H: Host>(
        &self,
        cx: RenderContext<'_, H>,
        value: &H::Value,
        name: &str,
        budget: usize,
    ) -> String {
        let host = cx.host;
        let field = match host.field(value, name) {
            Ok(field) => field,
            Err(e) => {
                tracing::warn!("summary: field {} unreadable: {}", name, e);
                return "<error>".to_string();
            }
        };

        if let Some(nested) = cx.nested_summary(&field, budget) {
            return nested;
        }

        let text = match host.type_code(&field) {
            Ok(TypeCode::Char) if self.char_as_int => host.to_integer(&field).map(|c| c.to_string()),
            Ok(TypeCode::Array) if is_char_array(host, &field) => host
                .read_string(&field, budget.max(1))
                .map(|s| format!("\"{}\"", s)),
            _ => host.format_value(&field),
        };

        text.unwrap_or_else(|e| {
            tracing::warn!("summary: field {} not printable: {}", name, e);
            "<error>".to_string()
        })
    }
}

fn is_char_array<H: Host>(host: &H, value: &H::Value) -> bool {
    match host.array_len(value) {
        Ok(0) | Err(_) => false,
        Ok(_) => host
            .index(value, 0)
            .and_then(|first| host.type_code(&first))
            .is_ok_and(|code| code == TypeCode::Char),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::RenderConfig;
    use crate::printer::{PrinterRegistry, PrinterSpec};
    use crate::sim::SimProcess;

    fn context<'a>(
        process: &'a SimProcess,
        registry: &'a PrinterRegistry<SimProcess>,
        config: &'a RenderConfig,
    ) -> RenderContext<'a, SimProcess> {
        RenderContext::new(process, registry, config)
    }

    #[test]
    fn test_named_and_unnamed() {
        let process = SimProcess::with_samples();
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);
        let color = process.global("color").unwrap();

        let named = SummaryFormatter::named().format(cx, &color, 120).unwrap();
        assert_eq!(named, "ColorRGBA { r=255, g=128, b=64, a=200 }");

        let plain = SummaryFormatter::new()
            .with_type(false)
            .format(cx, &color, 120)
            .unwrap();
        assert_eq!(plain, "{ 255, 128, 64, 200 }");
    }

    #[test]
    fn test_static_fields_are_skipped() {
        let process = SimProcess::with_samples();
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);
        let color = process.global("color").unwrap();

        let text = SummaryFormatter::named().format(cx, &color, 120).unwrap();
        assert!(!text.contains("channels"));
    }

    #[test]
    fn test_truncation() {
        let process = SimProcess::with_samples();
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);
        let wide = process.global("wide").unwrap();

        let text = SummaryFormatter::new().with_type(false).format(cx, &wide, 10).unwrap();
        assert!(text.ends_with(", ... }"), "{text}");
        let content = text.trim_end_matches(", ... }");
        // one field ("{ " + "0, 1, 2, 3" style entries) may overshoot the budget
        assert!(content.len() <= 10 + "1000".len(), "{text}");

        let nothing = SummaryFormatter::new().with_type(false).format(cx, &wide, 0).unwrap();
        assert_eq!(nothing, "{...}");
    }

    #[test]
    fn test_fields_past_the_budget_are_not_read() {
        let process = SimProcess::with_samples();
        let rendered = Rc::new(Cell::new(0));
        let mut registry = PrinterRegistry::new();
        let count = Rc::clone(&rendered);
        registry.add_printer(
            "ColorRGBA",
            PrinterSpec::new().summary(move |_, _, _| {
                count.set(count.get() + 1);
                Ok("#ff8040c8".to_string())
            }),
        );
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);
        let swatch = process.global("swatch").unwrap();

        // "{ id=7" fills the budget exactly
        let text = SummaryFormatter::named().with_type(false).format(cx, &swatch, 6).unwrap();
        assert_eq!(text, "{ id=7, ... }");
        assert_eq!(rendered.get(), 0);

        let text = SummaryFormatter::named().with_type(false).format(cx, &swatch, 120).unwrap();
        assert_eq!(text, "{ id=7, color=#ff8040c8 }");
        assert_eq!(rendered.get(), 1);
    }

    #[test]
    fn test_float_fields() {
        let process = SimProcess::new();
        process.define_struct("Point", &[("x", "double"), ("y", "float")]);
        let x = process.alloc_float("double", 2.5);
        let y = process.alloc_float("float", -0.25);
        let point = process.alloc_object("Point", &[("x", x), ("y", y)]);
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);

        let text = SummaryFormatter::named().format(cx, &point, 120).unwrap();
        assert_eq!(text, "Point { x=2.5, y=-0.25 }");
    }

    #[test]
    fn test_terminates_on_many_fields() {
        let process = SimProcess::new();
        let names: Vec<String> = (0..10_000).map(|i| format!("f{}", i)).collect();
        process.define_struct(
            "Huge",
            names.iter().map(|n| (n.as_str(), "int")).collect::<Vec<_>>().as_slice(),
        );
        let huge = process.alloc_struct("Huge", &[]);
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);

        let text = SummaryFormatter::named().with_type(false).format(cx, &huge, 30).unwrap();
        assert!(text.len() < 60, "{text}");
    }

    #[test]
    fn test_empty_struct() {
        let process = SimProcess::new();
        process.define_struct("Empty", &[]);
        let empty = process.alloc_struct("Empty", &[]);
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);

        assert_eq!(SummaryFormatter::new().format(cx, &empty, 120).unwrap(), "Empty {}");
    }

    #[test]
    fn test_chars_and_strings() {
        let process = SimProcess::with_samples();
        let registry = PrinterRegistry::new();
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);
        let label = process.global("label").unwrap();

        let text = SummaryFormatter::named().with_type(false).format(cx, &label, 120).unwrap();
        assert_eq!(text, "{ tag=65, name=\"widget\" }");

        let glyphs = SummaryFormatter::named()
            .with_type(false)
            .with_char_as_int(false)
            .format(cx, &label, 120)
            .unwrap();
        assert_eq!(glyphs, "{ tag=65 'A', name=\"widget\" }");
    }

    #[test]
    fn test_nested_printer_is_used() {
        let process = SimProcess::with_samples();
        let mut registry = PrinterRegistry::new();
        registry.add_printer("ColorRGBA", PrinterSpec::new().summary_text("#ff8040c8"));
        let config = RenderConfig::default();
        let cx = context(&process, &registry, &config);
        let swatch = process.global("swatch").unwrap();

        let text = SummaryFormatter::named().with_type(false).format(cx, &swatch, 120).unwrap();
        assert_eq!(text, "{ id=7, color=#ff8040c8 }");
    }
}
