//! The cross-reference graph between bound attributes.
//!
//! A config entry may set `min` or `max` to the *name* of another defined
//! variable instead of a number; the bound then tracks that variable's live
//! value. Validation rejects references to unknown or computed names and
//! self-references, then runs a depth-first search over the variable-level
//! graph to reject cycles before any value can start bouncing.

use std::collections::{BTreeMap, HashSet};

use crate::classify::Classification;
use crate::config::{Bound, VarSpec};
use crate::error::{CircularReferenceError, ReferenceError};

/// Which bound attribute an edge hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundAttr {
    Min,
    Max,
}

impl BoundAttr {
    pub fn name(self) -> &'static str {
        match self {
            BoundAttr::Min => "min",
            BoundAttr::Max => "max",
        }
    }
}

/// Validated reference edges, indexed both ways.
///
/// `outbound` answers "whose value does this entry's bound track?";
/// `inbound` answers "which bounds must move when this variable changes?".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceGraph {
    outbound: BTreeMap<String, Vec<(BoundAttr, String)>>,
    inbound: BTreeMap<String, Vec<(String, BoundAttr)>>,
}

impl ReferenceGraph {
    /// Every `(source, attribute)` whose bound tracks `target`.
    pub fn dependents_of(&self, target: &str) -> &[(String, BoundAttr)] {
        self.inbound.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every `(attribute, target)` the entry for `source` references.
    pub fn references_of(&self, source: &str) -> &[(BoundAttr, String)] {
        self.outbound.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }
}

/// Builds and validates the reference graph for `specs`.
pub fn build(
    specs: &BTreeMap<String, VarSpec>,
    classification: &Classification,
) -> Result<ReferenceGraph, ReferenceError> {
    let mut graph = ReferenceGraph::default();

    for (key, spec) in specs {
        for (attribute, bound) in [(BoundAttr::Min, &spec.min), (BoundAttr::Max, &spec.max)] {
            let Some(Bound::Reference(target)) = bound else {
                continue;
            };
            if classification.is_computed(target) {
                return Err(ReferenceError::ComputedTarget {
                    key: key.clone(),
                    attribute: attribute.name().to_string(),
                    target: target.clone(),
                });
            }
            if !specs.contains_key(target) {
                return Err(ReferenceError::Undefined {
                    key: key.clone(),
                    attribute: attribute.name().to_string(),
                    target: target.clone(),
                });
            }
            if target == key {
                return Err(ReferenceError::SelfReference {
                    key: key.clone(),
                    attribute: attribute.name().to_string(),
                });
            }
            graph
                .outbound
                .entry(key.clone())
                .or_default()
                .push((attribute, target.clone()));
            graph
                .inbound
                .entry(target.clone())
                .or_default()
                .push((key.clone(), attribute));
        }
    }

    Ok(graph)
}

/// Rejects cycles in the variable-level graph.
///
/// The reported path starts at the first variable of the cycle (in DFS
/// order) and repeats it at the end, e.g. `a -> b -> a`.
pub fn check_acyclic(graph: &ReferenceGraph) -> Result<(), CircularReferenceError> {
    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();
    let mut path = Vec::new();

    for start in graph.outbound.keys() {
        if let Some(cycle) = dfs(graph, start, &mut visited, &mut visiting, &mut path) {
            return Err(CircularReferenceError { path: cycle });
        }
    }
    Ok(())
}

fn dfs(
    graph: &ReferenceGraph,
    node: &str,
    visited: &mut HashSet<String>,
    visiting: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    if visited.contains(node) {
        return None;
    }
    if visiting.contains(node) {
        let start = path.iter().position(|name| name == node).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..].to_vec();
        cycle.push(node.to_string());
        return Some(cycle);
    }

    visiting.insert(node.to_string());
    path.push(node.to_string());

    for (_, target) in graph.references_of(node) {
        if let Some(cycle) = dfs(graph, target, visited, visiting, path) {
            return Some(cycle);
        }
    }

    path.pop();
    visiting.remove(node);
    visited.insert(node.to_string());
    None
}
