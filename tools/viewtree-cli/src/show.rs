//! Show command - evaluate an expression and print its value tree

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use viewtree_core::{Child, DispatchEngine, Host, RenderConfig, SimProcess, TagMode, expand};

use crate::demo;

/// Arguments for the show command
#[derive(Args)]
pub struct ShowArgs {
    /// Expression to evaluate, e.g. `color`, `numbers` or `*list_begin`
    pub expr: String,

    /// Levels of children to expand
    #[arg(long, default_value_t = 2)]
    pub depth: usize,

    /// How synthetic nodes reach the host (overrides the config file)
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Mode {
    Request,
    TypeEncoded,
}

impl From<Mode> for TagMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Request => TagMode::Request,
            Mode::TypeEncoded => TagMode::TypeEncoded,
        }
    }
}

/// Execute the show command
pub fn execute(args: ShowArgs, mut config: RenderConfig) -> Result<()> {
    if let Some(mode) = args.mode {
        config.tag_mode = mode.into();
    }

    let process = SimProcess::with_samples();
    let registry = demo::registry::<SimProcess>();

    let value = process
        .evaluate(&args.expr)
        .with_context(|| format!("Failed to evaluate `{}`", args.expr))?;
    tracing::debug!("{} evaluated to {:?}", args.expr, value);

    let engine = DispatchEngine::new(&process, &registry, &config);
    let tree = expand(&engine, args.expr.as_str(), &Child::Value(value), args.depth);
    print!("{}", tree);

    Ok(())
}
