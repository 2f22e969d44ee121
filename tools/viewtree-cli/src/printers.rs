//! Printers command - list registered printers and their views

use anyhow::Result;
use viewtree_core::SimProcess;
use viewtree_core::printer::Matcher;

use crate::demo;

/// Execute the printers command
pub fn execute() -> Result<()> {
    let registry = demo::registry::<SimProcess>();

    for (matcher, spec) in registry.matchers() {
        match matcher {
            Matcher::Exact(name) => println!("{}", name),
            Matcher::Pattern(pattern) => println!("{} (pattern)", pattern),
        }

        for (index, view) in spec.views().iter().enumerate() {
            let name = view.display_name(index);
            let marker = if spec.default_view_name() == Some(name.as_str()) {
                " (default)"
            } else {
                ""
            };
            println!("  <{}>{}", name, marker);
        }
    }

    Ok(())
}
