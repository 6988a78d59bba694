//! cDBG export
//!
//! Writers only see the node store through node iteration and adjacency, so
//! they can run on any snapshot between updates. Nodes are named `u<id>` for
//! unitigs and `d<id>` for decision nodes; linked nodes overlap by k-1 bases.

use crate::cdbg::{Adjacency, NodeRef};
use crate::compactor::StreamingCompactor;
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use anyhow::{anyhow, Result};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Supported output formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphFormat {
    /// GFA version 1
    Gfa1,
    /// GFA version 2
    Gfa2,
    /// One record per node
    Fasta,
    /// GraphML XML
    GraphMl,
    /// Tab-separated node pairs
    EdgeList,
    /// Graph Modelling Language
    Gml,
}

impl GraphFormat {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            GraphFormat::Gfa1 | GraphFormat::Gfa2 => "gfa",
            GraphFormat::Fasta => "fa",
            GraphFormat::GraphMl => "graphml",
            GraphFormat::EdgeList => "tsv",
            GraphFormat::Gml => "gml",
        }
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gfa1" | "gfa" => Ok(GraphFormat::Gfa1),
            "gfa2" => Ok(GraphFormat::Gfa2),
            "fasta" | "fa" => Ok(GraphFormat::Fasta),
            "graphml" => Ok(GraphFormat::GraphMl),
            "edgelist" | "edges" | "tsv" => Ok(GraphFormat::EdgeList),
            "gml" => Ok(GraphFormat::Gml),
            other => Err(format!(
                "unknown graph format '{}' (expected gfa1|gfa2|fasta|graphml|edgelist|gml)",
                other
            )),
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GraphFormat::Gfa1 => "gfa1",
            GraphFormat::Gfa2 => "gfa2",
            GraphFormat::Fasta => "fasta",
            GraphFormat::GraphMl => "graphml",
            GraphFormat::EdgeList => "edgelist",
            GraphFormat::Gml => "gml",
        };
        f.write_str(s)
    }
}

struct Snapshot {
    k: usize,
    nodes: Vec<Node>,
    links: Vec<Adjacency>,
}

struct Node {
    node: NodeRef,
    name: String,
    sequence: String,
    kind: &'static str,
    meta: String,
}

impl Snapshot {
    fn take<S: KmerStore, H: KmerHasher>(compactor: &StreamingCompactor<S, H>) -> Result<Self> {
        let cdbg = compactor.cdbg();
        let mut nodes = Vec::new();
        for node in cdbg.all_nodes() {
            let entry = match node {
                NodeRef::Unitig(id) => {
                    let u = cdbg.unitig(id).ok_or_else(|| anyhow!("unitig {} disappeared", id))?;
                    Node {
                        node,
                        name: format!("u{}", u.node_id),
                        sequence: u.sequence.clone(),
                        kind: "unitig",
                        meta: u.meta.to_string(),
                    }
                }
                NodeRef::Decision(h) => {
                    let d = cdbg.query_dnode(h).ok_or_else(|| anyhow!("decision {} disappeared", h))?;
                    Node {
                        node,
                        name: format!("d{}", d.node_id),
                        sequence: d.sequence.clone(),
                        kind: "decision",
                        meta: "DECISION".to_string(),
                    }
                }
            };
            nodes.push(entry);
        }
        let links = cdbg.adjacencies(compactor.dbg())?;
        Ok(Self {
            k: compactor.k(),
            nodes,
            links,
        })
    }

    fn index_of(&self, node: NodeRef) -> Result<usize> {
        self.nodes
            .binary_search_by(|n| n.node.cmp(&node))
            .map_err(|_| anyhow!("link to unknown node {:?}", node))
    }

    fn name(&self, node: NodeRef) -> Result<&str> {
        Ok(&self.nodes[self.index_of(node)?].name)
    }

    fn len(&self, node: NodeRef) -> Result<usize> {
        Ok(self.nodes[self.index_of(node)?].sequence.len())
    }
}

fn sign(forward: bool) -> char {
    if forward {
        '+'
    } else {
        '-'
    }
}

/// Write the current cDBG of `compactor` in `format`
pub fn write_graph<S, H, W>(compactor: &StreamingCompactor<S, H>, format: GraphFormat, writer: &mut W) -> Result<()>
where
    S: KmerStore,
    H: KmerHasher,
    W: Write,
{
    let snapshot = Snapshot::take(compactor)?;
    match format {
        GraphFormat::Gfa1 => write_gfa1(&snapshot, writer),
        GraphFormat::Gfa2 => write_gfa2(&snapshot, writer),
        GraphFormat::Fasta => write_fasta(&snapshot, writer),
        GraphFormat::GraphMl => write_graphml(&snapshot, writer),
        GraphFormat::EdgeList => write_edge_list(&snapshot, writer),
        GraphFormat::Gml => write_gml(&snapshot, writer),
    }
}

fn write_gfa1<W: Write>(g: &Snapshot, w: &mut W) -> Result<()> {
    writeln!(w, "H\tVN:Z:1.0")?;
    for n in &g.nodes {
        writeln!(w, "S\t{}\t{}\tLN:i:{}", n.name, n.sequence, n.sequence.len())?;
    }
    for l in &g.links {
        writeln!(
            w,
            "L\t{}\t{}\t{}\t{}\t{}M",
            g.name(l.from)?,
            sign(l.from_forward),
            g.name(l.to)?,
            sign(l.to_forward),
            g.k - 1
        )?;
    }
    Ok(())
}

fn write_gfa2<W: Write>(g: &Snapshot, w: &mut W) -> Result<()> {
    let overlap = g.k - 1;
    writeln!(w, "H\tVN:Z:2.0")?;
    for n in &g.nodes {
        writeln!(w, "S\t{}\t{}\t{}", n.name, n.sequence.len(), n.sequence)?;
    }
    for l in &g.links {
        let (from_len, to_len) = (g.len(l.from)?, g.len(l.to)?);
        // the overlap sits at the end of a forward source and the start of a
        // forward target
        let (b1, e1) = if l.from_forward {
            (format!("{}", from_len - overlap), format!("{}$", from_len))
        } else {
            ("0".to_string(), format!("{}", overlap))
        };
        let (b2, e2) = if l.to_forward {
            ("0".to_string(), format!("{}", overlap))
        } else {
            (format!("{}", to_len - overlap), format!("{}$", to_len))
        };
        writeln!(
            w,
            "E\t*\t{}{}\t{}{}\t{}\t{}\t{}\t{}\t*",
            g.name(l.from)?,
            sign(l.from_forward),
            g.name(l.to)?,
            sign(l.to_forward),
            b1,
            e1,
            b2,
            e2
        )?;
    }
    Ok(())
}

fn write_fasta<W: Write>(g: &Snapshot, w: &mut W) -> Result<()> {
    for n in &g.nodes {
        writeln!(w, ">{} {}", n.name, n.meta)?;
        writeln!(w, "{}", n.sequence)?;
    }
    Ok(())
}

fn write_graphml<W: Write>(g: &Snapshot, w: &mut W) -> Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#)?;
    writeln!(w, r#"  <key id="sequence" for="node" attr.name="sequence" attr.type="string"/>"#)?;
    writeln!(w, r#"  <key id="kind" for="node" attr.name="kind" attr.type="string"/>"#)?;
    writeln!(w, r#"  <key id="meta" for="node" attr.name="meta" attr.type="string"/>"#)?;
    writeln!(w, r#"  <key id="orientation" for="edge" attr.name="orientation" attr.type="string"/>"#)?;
    writeln!(w, r#"  <graph id="cdbg" edgedefault="directed">"#)?;
    for n in &g.nodes {
        writeln!(w, r#"    <node id="{}">"#, n.name)?;
        writeln!(w, r#"      <data key="sequence">{}</data>"#, n.sequence)?;
        writeln!(w, r#"      <data key="kind">{}</data>"#, n.kind)?;
        writeln!(w, r#"      <data key="meta">{}</data>"#, n.meta)?;
        writeln!(w, "    </node>")?;
    }
    for l in &g.links {
        writeln!(
            w,
            r#"    <edge source="{}" target="{}"><data key="orientation">{}{}</data></edge>"#,
            g.name(l.from)?,
            g.name(l.to)?,
            sign(l.from_forward),
            sign(l.to_forward)
        )?;
    }
    writeln!(w, "  </graph>")?;
    writeln!(w, "</graphml>")?;
    Ok(())
}

fn write_edge_list<W: Write>(g: &Snapshot, w: &mut W) -> Result<()> {
    for l in &g.links {
        writeln!(w, "{}\t{}", g.name(l.from)?, g.name(l.to)?)?;
    }
    Ok(())
}

fn write_gml<W: Write>(g: &Snapshot, w: &mut W) -> Result<()> {
    writeln!(w, "graph [")?;
    writeln!(w, "  directed 1")?;
    for (i, n) in g.nodes.iter().enumerate() {
        writeln!(w, "  node [")?;
        writeln!(w, "    id {}", i)?;
        writeln!(w, "    label \"{}\"", n.name)?;
        writeln!(w, "    kind \"{}\"", n.kind)?;
        writeln!(w, "    meta \"{}\"", n.meta)?;
        writeln!(w, "    sequence \"{}\"", n.sequence)?;
        writeln!(w, "  ]")?;
    }
    for l in &g.links {
        writeln!(w, "  edge [")?;
        writeln!(w, "    source {}", g.index_of(l.from)?)?;
        writeln!(w, "    target {}", g.index_of(l.to)?)?;
        writeln!(w, "  ]")?;
    }
    writeln!(w, "]")?;
    Ok(())
}
