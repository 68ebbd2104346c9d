//! Build command: materialize a layout file and report the result

use std::path::PathBuf;

use clap::Args;

use crate::layout::Layout;
use crate::output::{format_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct BuildArgs {
    /// Layout file (TOML)
    pub file: PathBuf,

    /// Remove a named node or context after building (repeatable)
    #[arg(short, long)]
    pub remove: Vec<String>,
}

pub fn run(args: &BuildArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let layout = Layout::from_file(&args.file)?;
    let graph = layout.build()?;
    tracing::info!(
        contexts = graph.contexts.len(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Built layout"
    );

    for name in &args.remove {
        graph.remove(name)?;
    }

    match ctx.format {
        OutputFormat::Text => {
            print!("{}", graph.render_tree());
            let orphaned = graph.edges.iter().filter(|e| e.is_orphaned()).count();
            if orphaned > 0 {
                println!("orphaned edges: {}", orphaned);
            }
        }
        format => println!("{}", format_json(&graph.report(&args.remove), format)?),
    }
    Ok(())
}
