use crate::cli::{EdgeLabels, GraphArgs};
use crate::error::Result;
use moltopo::core::graph::TopologyGraph;
use moltopo::core::io::backup;
use moltopo::core::settings::Settings;
use moltopo::workflows::load;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;

pub fn run(args: GraphArgs, settings: &Settings) -> Result<()> {
    let loaded = load::read_topology(&args.input, settings)?;
    let graph = loaded.bond_graph(args.labels == EdgeLabels::Typed);
    info!(
        "Bond graph has {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    match &args.output {
        Some(path) => {
            backup::prepare_path(path)?;
            let mut writer = BufWriter::new(File::create(path)?);
            write_edges(&graph, &mut writer)?;
            writer.flush()?;
        }
        None => write_edges(&graph, &mut io::stdout().lock())?,
    }
    Ok(())
}

/// Writes one line per edge, `a b cross type`, with `a < b` and edges in
/// ascending order.
pub fn write_edges(graph: &TopologyGraph, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "# atom_a atom_b cross bond_type")?;
    let mut ids: Vec<_> = graph.graph().node_weights().map(|node| node.id).collect();
    ids.sort_unstable();
    for a in ids {
        for b in graph.neighbors(a).into_iter().filter(|&b| b > a) {
            if let Some(edge) = graph.edge(a, b) {
                writeln!(
                    writer,
                    "{} {} {} {}",
                    a,
                    b,
                    u8::from(edge.cross),
                    edge.bond_type.as_deref().unwrap_or("-")
                )?;
            }
        }
    }
    Ok(())
}
