//! Status transition graph derived from the ladder
//!
//! Used to check the ladder's structural invariants once at startup and to
//! render the workflow for operators (Graphviz DOT).

use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;

use super::rung::Ladder;
use super::status::{AgendaStatus, DecisionType};
use crate::rescue::RescueWindow;

/// Edge label in the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEdge {
    /// A human decision.
    Decision(DecisionType),
    /// The automatic move from a transient rejection into its rescue window.
    OpensRescue,
}

impl fmt::Display for TransitionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decision(decision) => write!(f, "{}", decision),
            Self::OpensRescue => write!(f, "opens_rescue"),
        }
    }
}

/// Structural defects in a ladder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LadderError {
    #[error("ladder contains a cycle")]
    Cyclic,

    #[error("status {status} has a rung but cannot reach a terminal status")]
    DeadEnd { status: AgendaStatus },

    #[error("rescue window {status} must be entered only from {expected}, found {found:?}")]
    UnpairedRescueWindow {
        status: AgendaStatus,
        expected: AgendaStatus,
        found: Vec<AgendaStatus>,
    },
}

/// Directed graph of every status and the edges the ladder allows.
pub struct TransitionGraph {
    graph: DiGraph<AgendaStatus, TransitionEdge>,
    nodes: HashMap<AgendaStatus, NodeIndex>,
}

impl TransitionGraph {
    /// Build the graph from every rung's menu, including resting statuses.
    pub fn from_ladder(ladder: &Ladder) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for status in AgendaStatus::all() {
            nodes.insert(*status, graph.add_node(*status));
        }

        for rung in ladder.rungs() {
            let from = nodes[&rung.status];
            for transition in &rung.transitions {
                let target = nodes[&transition.target];
                graph.add_edge(from, target, TransitionEdge::Decision(transition.decision));
                if let Some(rest) = transition.rescue_target {
                    graph.add_edge(target, nodes[&rest], TransitionEdge::OpensRescue);
                }
            }
        }

        Self { graph, nodes }
    }

    /// Statuses reachable from `status` through one or more edges.
    pub fn reachable_from(&self, status: AgendaStatus) -> Vec<AgendaStatus> {
        let start = self.nodes[&status];
        let mut dfs = Dfs::new(&self.graph, start);
        let mut reached = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                reached.push(self.graph[node]);
            }
        }
        reached
    }

    /// Statuses with an edge into `status`.
    pub fn predecessors(&self, status: AgendaStatus) -> Vec<AgendaStatus> {
        let mut found: Vec<AgendaStatus> = self
            .graph
            .neighbors_directed(self.nodes[&status], Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        found.dedup();
        found
    }

    /// Whether `to` is reachable from `from` in one or more steps.
    pub fn can_reach(&self, from: AgendaStatus, to: AgendaStatus) -> bool {
        has_path_connecting(&self.graph, self.nodes[&from], self.nodes[&to], None)
    }

    /// Check the structural invariants of the ladder.
    pub fn validate(&self, ladder: &Ladder) -> Result<(), LadderError> {
        if is_cyclic_directed(&self.graph) {
            return Err(LadderError::Cyclic);
        }

        for rung in ladder.rungs() {
            let terminal = self
                .reachable_from(rung.status)
                .into_iter()
                .any(AgendaStatus::is_terminal);
            if !terminal {
                return Err(LadderError::DeadEnd {
                    status: rung.status,
                });
            }
        }

        for window in RescueWindow::all() {
            let found = self.predecessors(window.window_status);
            if found != [window.rejected_status] {
                return Err(LadderError::UnpairedRescueWindow {
                    status: window.window_status,
                    expected: window.rejected_status,
                    found,
                });
            }
        }

        Ok(())
    }

    /// Graphviz rendering.
    pub fn to_dot(&self) -> String {
        format!(
            "digraph agenda {{\n{}}}\n",
            Dot::with_config(&self.graph, &[Config::GraphContentOnly])
        )
    }
}
