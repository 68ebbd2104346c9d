//! TOML graph layouts built by `trellis build`

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use trellis_core::{
    ContextSnapshot, Edge, EdgeSnapshot, Entity, GraphContext, Identifier, Member, Node,
    NodeSnapshot,
};

/// Name that refers to the root context in a layout
pub const ROOT: &str = "root";

/// Graph description read from a layout file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Layout {
    #[serde(default, rename = "context")]
    pub contexts: Vec<ContextSpec>,
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeSpec>,
    #[serde(default, rename = "edge")]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextSpec {
    pub name: String,
    #[serde(default = "root_name")]
    pub parent: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default = "root_name")]
    pub context: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

fn root_name() -> String {
    ROOT.to_string()
}

impl Layout {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid layout {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Create every context, node and edge in declaration order
    pub fn build(&self) -> anyhow::Result<BuiltGraph> {
        let root = GraphContext::root();
        let mut graph = BuiltGraph {
            contexts: vec![(ROOT.to_string(), root.clone())],
            root,
            nodes: Vec::new(),
            edges: Vec::new(),
        };

        for spec in &self.contexts {
            graph.ensure_unused(&spec.name)?;
            let parent = graph.context(&spec.parent)?;
            let context = match &spec.label {
                Some(label) => GraphContext::nested_with_label(&parent, label.clone())?,
                None => GraphContext::nested(&parent)?,
            };
            tracing::debug!(name = %spec.name, id = %context.id(), "Built context");
            graph.contexts.push((spec.name.clone(), context));
        }

        for spec in &self.nodes {
            graph.ensure_unused(&spec.name)?;
            let context = graph.context(&spec.context)?;
            let node = match &spec.label {
                Some(label) => Node::with_label(&context, label.clone())?,
                None => Node::new(&context)?,
            };
            graph.nodes.push((spec.name.clone(), node));
        }

        for spec in &self.edges {
            let tail = graph.node(&spec.from)?;
            let head = graph.node(&spec.to)?;
            let edge = match &spec.label {
                Some(label) => Edge::with_label(&tail, &head, label.clone())?,
                None => Edge::new(&tail, &head)?,
            };
            graph.edges.push(edge);
        }

        Ok(graph)
    }
}

/// Live graph produced from a [`Layout`], addressable by layout names
pub struct BuiltGraph {
    pub root: GraphContext,
    pub contexts: Vec<(String, GraphContext)>,
    pub nodes: Vec<(String, Node)>,
    pub edges: Vec<Edge>,
}

impl BuiltGraph {
    fn ensure_unused(&self, name: &str) -> anyhow::Result<()> {
        let taken = self.contexts.iter().any(|(n, _)| n == name)
            || self.nodes.iter().any(|(n, _)| n == name);
        if taken {
            anyhow::bail!("Name '{}' is used more than once", name);
        }
        Ok(())
    }

    pub fn context(&self, name: &str) -> anyhow::Result<GraphContext> {
        self.contexts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| anyhow::anyhow!("Unknown context '{}'", name))
    }

    pub fn node(&self, name: &str) -> anyhow::Result<Node> {
        self.nodes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, n)| n.clone())
            .ok_or_else(|| anyhow::anyhow!("Unknown node '{}'", name))
    }

    /// Remove a named node or nested context from wherever it currently lives
    pub fn remove(&self, name: &str) -> anyhow::Result<()> {
        if name == ROOT {
            anyhow::bail!("The root context cannot be removed");
        }
        let (id, owner) = if let Ok(node) = self.node(name) {
            (node.id(), node.require_context()?)
        } else {
            let context = self.context(name)?;
            let parent = context
                .parent()
                .ok_or_else(|| anyhow::anyhow!("Context '{}' is already detached", name))?;
            (context.id(), parent)
        };
        owner.remove(&id)?;
        tracing::info!(name, id = %id, "Removed member");
        Ok(())
    }

    pub fn report(&self, removed: &[String]) -> BuildReport {
        BuildReport {
            contexts: self
                .contexts
                .iter()
                .map(|(name, c)| Named {
                    name: name.clone(),
                    snapshot: c.snapshot(),
                })
                .collect(),
            nodes: self
                .nodes
                .iter()
                .map(|(name, n)| Named {
                    name: name.clone(),
                    snapshot: n.snapshot(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| EdgeReport {
                    snapshot: e.snapshot(),
                    orphaned: e.is_orphaned(),
                })
                .collect(),
            removed: removed.to_vec(),
        }
    }

    /// Indented listing of the live tree below the root
    pub fn render_tree(&self) -> String {
        let names: HashMap<_, _> = self
            .contexts
            .iter()
            .map(|(n, c)| (c.id(), n.as_str()))
            .chain(self.nodes.iter().map(|(n, node)| (node.id(), n.as_str())))
            .collect();
        let mut out = String::new();
        render_context(&self.root, &names, 0, &mut out);
        out
    }
}

fn render_context(
    context: &GraphContext,
    names: &HashMap<Identifier, &str>,
    depth: usize,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    let name = names.get(&context.id()).copied().unwrap_or("?");
    out.push_str(&format!(
        "{}{} [{}] {}\n",
        indent,
        name,
        context.label(),
        context.id()
    ));
    for member in context.members() {
        match member {
            Member::Context(child) => render_context(&child, names, depth + 1, out),
            Member::Node(node) => {
                let name = names.get(&node.id()).copied().unwrap_or("?");
                out.push_str(&format!(
                    "{}  {} [{}] {} edges={}\n",
                    indent,
                    name,
                    node.label(),
                    node.id(),
                    node.edges().len()
                ));
            }
        }
    }
}

/// Snapshot tagged with its layout name
#[derive(Debug, Serialize)]
pub struct Named<T> {
    pub name: String,
    #[serde(flatten)]
    pub snapshot: T,
}

#[derive(Debug, Serialize)]
pub struct EdgeReport {
    #[serde(flatten)]
    pub snapshot: EdgeSnapshot,
    pub orphaned: bool,
}

/// Everything `trellis build` prints
#[derive(Debug, Serialize)]
pub struct BuildReport {
    pub contexts: Vec<Named<ContextSnapshot>>,
    pub nodes: Vec<Named<NodeSnapshot>>,
    pub edges: Vec<EdgeReport>,
    pub removed: Vec<String>,
}
