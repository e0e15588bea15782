//! Bond graph export.
//!
//! A [`TopologyGraph`] turns the bonds of a [`Topology`] into an undirected
//! `petgraph` graph with one node per atom, for connectivity analysis and
//! hand-off to graph tooling.

use crate::core::models::atom::AtomId;
use crate::core::models::terms::{TermClass, TermKind};
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct AtomNode {
    pub id: AtomId,
    pub name: String,
    pub molecule_type: String,
    pub molecule_index: usize,
    pub position: Point3<f64>,
    pub degree: usize, // Non-cross bonds only, filled once every edge is in place
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondEdge {
    pub cross: bool,
    pub bond_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    graph: UnGraph<AtomNode, BondEdge>,
    nodes: HashMap<AtomId, NodeIndex>,
    box_dims: Option<Vector3<f64>>,
}

impl TopologyGraph {
    /// Builds the bond graph of `topology`.
    ///
    /// Bonds from both store layers become plain edges and cross bonds
    /// become edges flagged `cross`. A pair bonded more than once gets a
    /// single edge, which stays plain if any of its bonds is plain. Node
    /// degrees count plain edges only.
    pub fn from_topology(topology: &Topology) -> Self {
        Self::build(topology, false)
    }

    /// Like [`TopologyGraph::from_topology`], labelling each edge with the
    /// bond type stored as the first term parameter and keeping the
    /// simulation box.
    pub fn from_typed_topology(topology: &Topology, box_dims: Vector3<f64>) -> Self {
        let mut graph = Self::build(topology, true);
        graph.box_dims = Some(box_dims);
        graph
    }

    fn build(topology: &Topology, typed: bool) -> Self {
        let mut graph = UnGraph::with_capacity(topology.len(), topology.len());
        let mut nodes = HashMap::with_capacity(topology.len());

        for atom in topology.atoms() {
            let index = graph.add_node(AtomNode {
                id: atom.id(),
                name: atom.atom.name.clone(),
                molecule_type: atom.atom.molecule_type.clone(),
                molecule_index: atom.atom.molecule_index,
                position: atom.atom.position,
                degree: 0,
            });
            nodes.insert(atom.id(), index);
        }

        // Plain bonds go last so they win over a cross bond on the same pair.
        let kinds = [TermKind::cross(TermClass::Bonds), TermKind::new(TermClass::Bonds)];
        for kind in kinds {
            for (key, params) in topology.terms().merged(kind) {
                let ids = key.ids();
                let (Some(&a), Some(&b)) = (nodes.get(&ids[0]), nodes.get(&ids[1])) else {
                    continue;
                };
                let edge = BondEdge {
                    cross: kind.cross,
                    bond_type: if typed { params.first().cloned() } else { None },
                };
                graph.update_edge(a, b, edge);
            }
        }

        let indices: Vec<NodeIndex> = graph.node_indices().collect();
        for index in indices {
            let degree = graph
                .edges(index)
                .filter(|edge| !edge.weight().cross)
                .count();
            graph[index].degree = degree;
        }

        debug!(
            "Built bond graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Self {
            graph,
            nodes,
            box_dims: None,
        }
    }

    pub fn node(&self, id: AtomId) -> Option<&AtomNode> {
        self.nodes.get(&id).map(|&index| &self.graph[index])
    }

    pub fn degree(&self, id: AtomId) -> Option<usize> {
        self.node(id).map(|node| node.degree)
    }

    /// Ids of the atoms bonded to `id`, ascending.
    pub fn neighbors(&self, id: AtomId) -> Vec<AtomId> {
        let Some(&index) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut ids: Vec<AtomId> = self
            .graph
            .neighbors(index)
            .map(|neighbor| self.graph[neighbor].id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn edge(&self, a: AtomId, b: AtomId) -> Option<&BondEdge> {
        let (&a, &b) = (self.nodes.get(&a)?, self.nodes.get(&b)?);
        self.graph
            .find_edge(a, b)
            .map(|edge| &self.graph[edge])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn box_dims(&self) -> Option<Vector3<f64>> {
        self.box_dims
    }

    pub fn graph(&self) -> &UnGraph<AtomNode, BondEdge> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, TopologyAtom};
    use crate::core::models::terms::TermKey;

    fn ring_topology() -> Topology {
        let mut topology = Topology::new();
        for id in 1..=4 {
            let atom = Atom::new(id, &format!("C{}", id), "RING", 1);
            topology.insert_atom(TopologyAtom::new(atom, "CA")).unwrap();
        }
        let bonds = TermKind::new(TermClass::Bonds);
        for (a, b) in [(1, 2), (2, 3), (3, 4), (4, 1)] {
            topology
                .insert_term(bonds, TermKey::pair(a, b), vec!["7".into()])
                .unwrap();
        }
        topology
    }

    #[test]
    fn ring_gives_degree_two_everywhere() {
        let graph = TopologyGraph::from_topology(&ring_topology());

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        for id in 1..=4 {
            assert_eq!(graph.degree(id), Some(2));
        }
        assert_eq!(graph.neighbors(1), vec![2, 4]);
        assert_eq!(graph.node(3).unwrap().name, "C3");
    }

    #[test]
    fn duplicate_and_cross_bonds_collapse_into_one_edge() {
        let mut topology = ring_topology();
        let bonds = TermKind::new(TermClass::Bonds);
        topology
            .insert_overlay_term(bonds, TermKey::pair(2, 1), vec!["7".into()])
            .unwrap();
        topology
            .insert_overlay_term(bonds, TermKey::pair(1, 3), vec!["9".into()])
            .unwrap();
        topology
            .insert_term(TermKind::cross(TermClass::Bonds), TermKey::pair(2, 4), vec![])
            .unwrap();

        let graph = TopologyGraph::from_topology(&topology);

        assert_eq!(graph.edge_count(), 6);
        assert_eq!(graph.degree(1), Some(3));
        assert!(graph.edge(4, 2).unwrap().cross);
        assert!(!graph.edge(1, 3).unwrap().cross);
        assert_eq!(graph.neighbors(2), vec![1, 3, 4]);
        assert_eq!(graph.degree(2), Some(2));
        let total: usize = (1..=4).filter_map(|id| graph.degree(id)).sum();
        assert_eq!(total, 2 * (graph.edge_count() - 1));
    }

    #[test]
    fn bond_listed_as_plain_and_cross_stays_plain() {
        let mut topology = ring_topology();
        topology
            .insert_overlay_term(TermKind::cross(TermClass::Bonds), TermKey::pair(1, 2), vec![])
            .unwrap();

        let graph = TopologyGraph::from_topology(&topology);

        assert_eq!(graph.edge_count(), 4);
        assert!(!graph.edge(1, 2).unwrap().cross);
        assert_eq!(graph.degree(1), Some(2));
    }

    #[test]
    fn typed_graph_labels_edges_and_keeps_box() {
        let graph =
            TopologyGraph::from_typed_topology(&ring_topology(), Vector3::new(2.0, 2.0, 2.0));

        assert_eq!(graph.edge(1, 2).unwrap().bond_type.as_deref(), Some("7"));
        assert_eq!(graph.box_dims(), Some(Vector3::new(2.0, 2.0, 2.0)));
        assert!(TopologyGraph::from_topology(&ring_topology())
            .edge(1, 2)
            .unwrap()
            .bond_type
            .is_none());
    }

    #[test]
    fn unknown_atoms_have_no_node() {
        let graph = TopologyGraph::from_topology(&ring_topology());

        assert!(graph.node(99).is_none());
        assert!(graph.neighbors(99).is_empty());
        assert!(graph.edge(1, 99).is_none());
    }
}
