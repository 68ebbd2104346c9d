//! Identifier commands

use clap::{Args, Subcommand};
use serde::Serialize;
use trellis_core::{EntityKind, Identifier};

use crate::output::{format_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct IdArgs {
    #[command(subcommand)]
    pub command: IdCommands,
}

#[derive(Subcommand)]
pub enum IdCommands {
    /// Generate fresh identifiers
    Generate {
        /// Entity kind tag: graph, node, edge (default from config)
        #[arg(short, long)]
        kind: Option<EntityKind>,
        /// How many identifiers to generate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },
    /// Validate and normalize an identifier
    Parse {
        /// 32 hex character identifier
        text: String,
    },
    /// Print the root context identifier
    Root,
}

#[derive(Debug, Serialize)]
struct IdInfo {
    id: Identifier,
    kind: Option<EntityKind>,
    root: bool,
}

impl From<Identifier> for IdInfo {
    fn from(id: Identifier) -> Self {
        Self {
            id,
            kind: id.kind(),
            root: id.is_root(),
        }
    }
}

pub fn run(args: &IdArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        IdCommands::Generate { kind, count } => {
            let kind = match kind {
                Some(kind) => *kind,
                None => ctx.config.default_kind()?,
            };
            let ids: Vec<Identifier> = (0..*count).map(|_| Identifier::generate(kind)).collect();
            tracing::debug!(kind = %kind, count, "Generated identifiers");
            match ctx.format {
                OutputFormat::Text => {
                    for id in &ids {
                        println!("{}", id);
                    }
                }
                format => println!("{}", format_json(&ids, format)?),
            }
        }
        IdCommands::Parse { text } => {
            let info = IdInfo::from(Identifier::from_string(text)?);
            print_info(&info, ctx.format)?;
        }
        IdCommands::Root => print_info(&IdInfo::from(Identifier::root()), ctx.format)?,
    }
    Ok(())
}

fn print_info(info: &IdInfo, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            let kind = match (info.root, info.kind) {
                (true, _) => "root".to_string(),
                (false, Some(kind)) => kind.to_string(),
                (false, None) => "unknown".to_string(),
            };
            println!("{} {}", info.id, kind);
        }
        format => println!("{}", format_json(info, format)?),
    }
    Ok(())
}
