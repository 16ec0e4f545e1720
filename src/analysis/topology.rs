//! Same-period dependency analysis over the rule list.
//!
//! `calculate` never consults this module: declaration order is always the
//! order of evaluation. These helpers let a caller check or repair that order.

use crate::compute::error::ComputationError;
use crate::model::Model;
use crate::store::Symbol;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Builds the graph of same-period dependencies between rules.
///
/// Node `i` is rule `i`. An edge `j -> i` means rule `i` reads, at offset 0,
/// an account written by rule `j`. Lagged reads (`k < 0`) see a completed
/// period and forward reads (`k > 0`) see an unset slot, so neither orders
/// rules within a period.
pub fn dependency_graph(model: &Model) -> DiGraph<usize, ()> {
    let registry = model.registry();
    let rules = model.rules();
    let mut graph = DiGraph::with_capacity(rules.len(), rules.len());
    let nodes: Vec<NodeIndex> = (0..rules.len()).map(|i| graph.add_node(i)).collect();

    let mut writers: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, rule) in rules.iter().enumerate() {
        writers.entry(rule.target.as_str()).or_default().push(i);
    }

    for (i, rule) in rules.iter().enumerate() {
        for reference in rule.expr.references() {
            if reference.offset != Some(0) {
                continue;
            }
            if !matches!(registry.resolve(&reference.name), Some(Symbol::Variable(_))) {
                continue;
            }
            for &j in writers.get(reference.name.as_str()).into_iter().flatten() {
                if !graph.contains_edge(nodes[j], nodes[i]) {
                    graph.add_edge(nodes[j], nodes[i], ());
                }
            }
        }
    }
    graph
}

/// Returns an evaluation order in which every rule runs after the rules it
/// reads at offset 0. Ties keep declaration order, so an already valid list
/// comes back unchanged.
pub fn rule_order(model: &Model) -> Result<Vec<usize>, ComputationError> {
    let graph = dependency_graph(model);

    // Kahn's algorithm with a min-heap on the declaration index.
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> =
        (0..in_degree.len()).filter(|&i| in_degree[i] == 0).map(Reverse).collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for child in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            let c = child.index();
            in_degree[c] -= 1;
            if in_degree[c] == 0 {
                ready.push(Reverse(c));
            }
        }
    }

    if order.len() != in_degree.len() {
        return Err(ComputationError::CycleDetected(cycle_members(model, &graph)));
    }
    Ok(order)
}

/// Index pairs `(reader, writer)` where a rule reads an account at offset 0
/// before the rule writing it has run in that period.
pub fn order_violations(model: &Model) -> Vec<(usize, usize)> {
    let graph = dependency_graph(model);
    let mut violations: Vec<(usize, usize)> = graph
        .edge_indices()
        .filter_map(|e| graph.edge_endpoints(e))
        .map(|(writer, reader)| (reader.index(), writer.index()))
        .filter(|&(reader, writer)| writer >= reader)
        .collect();
    violations.sort_unstable();
    violations
}

fn cycle_members(model: &Model, graph: &DiGraph<usize, ()>) -> Vec<String> {
    let rules = model.rules();
    let mut names: Vec<String> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(|n| rules[n.index()].target.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(rules: &[(&str, &str)]) -> Model {
        let mut m = Model::new(3).unwrap();
        m.add_variables(["a", "b", "c"]).unwrap();
        m.set_parameters([("k", 2.0)]).unwrap();
        m.set_rules(rules.iter().copied()).unwrap();
        m
    }

    #[test]
    fn test_valid_order_is_unchanged() {
        let m = model(&[("a", ":a[-1] + 1"), ("b", ":a[+0] * :k"), ("c", ":b[+0] - :a[+0]")]);
        assert_eq!(rule_order(&m).unwrap(), vec![0, 1, 2]);
        assert!(order_violations(&m).is_empty());
    }

    #[test]
    fn test_reader_moves_after_writer() {
        let m = model(&[("c", ":b[+0] + 1"), ("b", ":a[+0] * 2"), ("a", ":a[-1] + 1")]);
        assert_eq!(rule_order(&m).unwrap(), vec![2, 1, 0]);
        assert_eq!(order_violations(&m), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_lags_do_not_constrain() {
        let m = model(&[("b", ":a[-1]"), ("a", ":b[-1] + :c[+1]")]);
        assert_eq!(rule_order(&m).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_same_period_cycle() {
        let m = model(&[("a", ":b[+0]"), ("b", ":a[+0]"), ("c", "1")]);
        let err = rule_order(&m).unwrap_err();
        assert_eq!(err, ComputationError::CycleDetected(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_self_reference_at_offset_zero_is_a_cycle() {
        let m = model(&[("a", ":a[+0] + 1")]);
        assert_eq!(rule_order(&m).unwrap_err(), ComputationError::CycleDetected(vec!["a".into()]));
    }
}
