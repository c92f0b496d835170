//! Readiness-layered execution order.
//!
//! Layer 0 holds every tool without inputs. Each following layer holds the
//! tools touched by the previous layer whose inputs are all already
//! scheduled. Ordering stops at the first empty layer; tools never reached
//! (cycle members and everything downstream of them) are reported as
//! omitted rather than failing the plan.

use crate::{GraphError, ToolId, WorkflowGraph};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    layers: Vec<Vec<ToolId>>,
    omitted: Vec<ToolId>,
    cyclic: Vec<ToolId>,
}

impl ExecutionPlan {
    pub fn build(graph: &WorkflowGraph) -> Result<Self, GraphError> {
        let starting: Vec<ToolId> = graph
            .tools()
            .filter(|t| t.inputs().is_empty())
            .map(|t| t.id())
            .collect();
        if starting.is_empty() {
            return Err(GraphError::NoInputsAvailable);
        }

        let mut scheduled: BTreeSet<ToolId> = starting.iter().copied().collect();
        let mut layers = vec![starting];

        loop {
            let previous: BTreeSet<ToolId> = layers.last().into_iter().flatten().copied().collect();
            let ready: Vec<ToolId> = graph
                .tools()
                .filter(|t| !scheduled.contains(&t.id()))
                .filter(|t| !t.inputs().is_disjoint(&previous))
                .filter(|t| t.inputs().is_subset(&scheduled))
                .map(|t| t.id())
                .collect();

            if ready.is_empty() {
                break;
            }
            scheduled.extend(ready.iter().copied());
            layers.push(ready);
        }

        let omitted: Vec<ToolId> = graph
            .tools()
            .map(|t| t.id())
            .filter(|id| !scheduled.contains(id))
            .collect();
        let cyclic = if omitted.is_empty() {
            Vec::new()
        } else {
            cycle_members(graph, &omitted)
        };

        if !omitted.is_empty() {
            tracing::warn!(
                "Workflow {}: tools {:?} omitted from execution order (cycle members {:?})",
                graph.id(),
                omitted,
                cyclic
            );
        }
        tracing::debug!("Workflow {}: execution layers {:?}", graph.id(), layers);

        Ok(Self {
            layers,
            omitted,
            cyclic,
        })
    }

    pub fn layers(&self) -> &[Vec<ToolId>] {
        &self.layers
    }

    /// Flattened layers.
    pub fn order(&self) -> impl Iterator<Item = ToolId> + '_ {
        self.layers.iter().flatten().copied()
    }

    /// Tools that exist in the graph but are absent from the order.
    pub fn omitted(&self) -> &[ToolId] {
        &self.omitted
    }

    /// Omitted tools that sit on a cycle themselves.
    pub fn cyclic(&self) -> &[ToolId] {
        &self.cyclic
    }

    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty()
    }
}

fn cycle_members(graph: &WorkflowGraph, omitted: &[ToolId]) -> Vec<ToolId> {
    let mut edges = DiGraphMap::<ToolId, ()>::new();
    for &id in omitted {
        edges.add_node(id);
    }
    for &id in omitted {
        let Ok(tool) = graph.tool(id) else {
            continue;
        };
        for &input in tool.inputs() {
            if omitted.contains(&input) {
                edges.add_edge(input, id, ());
            }
        }
    }

    let mut members: Vec<ToolId> = tarjan_scc(&edges)
        .into_iter()
        .filter(|scc| scc.len() > 1 || edges.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();
    members.sort_unstable();
    members
}
