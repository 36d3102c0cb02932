//! # Column Reference Graph
//!
//! Derived columns (`reference*`, `total`, `discount`) point at other columns
//! by 1-based position. This module turns those numbers into an explicit
//! directed graph so dangling references and cycles can be reported, and so
//! the sample engine can evaluate columns after everything they read.
//!
//! Edges run from the referenced column to the column that reads it, which
//! makes a topological sort the evaluation order.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{PseudoGenError, Result};
use crate::model::RuleFile;

/// A reference to a column position that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingReference {
    /// Column holding the reference.
    pub column: usize,
    /// Position it points at.
    pub target: usize,
}

pub struct ReferenceGraph {
    /// Node weights are 1-based column positions.
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
    dangling: Vec<DanglingReference>,
}

impl ReferenceGraph {
    /// Build the graph over the base columns of a rule file.
    pub fn from_rule_file(rule_file: &RuleFile) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (1..=rule_file.columns.len())
            .map(|position| graph.add_node(position))
            .collect();
        let mut dangling = Vec::new();

        for (idx, column) in rule_file.columns.iter().enumerate() {
            let position = idx + 1;
            let mut seen = Vec::new();
            for target in column.source.references() {
                match target.checked_sub(1).and_then(|i| nodes.get(i)) {
                    Some(&from) => {
                        // `c2 + c2` is one dependency, not two edges.
                        if !seen.contains(&target) {
                            graph.add_edge(from, nodes[idx], ());
                            seen.push(target);
                        }
                    }
                    None => dangling.push(DanglingReference {
                        column: position,
                        target,
                    }),
                }
            }
        }

        Self {
            graph,
            nodes,
            dangling,
        }
    }

    pub fn column_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn dangling(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Positions of columns that `position` reads from.
    pub fn dependencies(&self, position: usize) -> Vec<usize> {
        let Some(&node) = position.checked_sub(1).and_then(|i| self.nodes.get(i)) else {
            return Vec::new();
        };
        let mut deps: Vec<usize> = self
            .graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Groups of columns that reference each other in a loop, including a
    /// column that references itself. Each group is sorted by position.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut positions: Vec<usize> = scc.iter().map(|&n| self.graph[n]).collect();
                positions.sort_unstable();
                positions
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Column positions in an order where every column comes after the
    /// columns it references.
    pub fn evaluation_order(&self) -> Result<Vec<usize>> {
        match toposort(&self.graph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(|n| self.graph[n]).collect()),
            Err(cycle) => {
                let position = self.graph[cycle.node_id()];
                let members = self
                    .cycles()
                    .into_iter()
                    .find(|c| c.contains(&position))
                    .unwrap_or_else(|| vec![position]);
                Err(PseudoGenError::Generation {
                    message: format!(
                        "columns {} reference each other in a cycle",
                        format_positions(&members)
                    ),
                })
            }
        }
    }
}

/// `[1, 3]` as `c1, c3`.
pub fn format_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|p| format!("c{}", p))
        .collect::<Vec<_>>()
        .join(", ")
}
