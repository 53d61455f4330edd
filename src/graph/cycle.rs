use crate::id::Identifier;
use std::collections::{HashMap, HashSet};

/// Would adding a node-level edge `from_node -> to_node` create a cycle?
/// Checked before a connection is registered. Equivalent to asking whether
/// `to_node` can already reach `from_node`; a self-loop (`from_node ==
/// to_node`) is always a cycle.
pub(crate) fn would_create_cycle(
    adjacency: &HashMap<Identifier, Vec<Identifier>>,
    from_node: Identifier,
    to_node: Identifier,
) -> bool {
    if from_node == to_node {
        return true;
    }
    let mut stack = vec![to_node];
    let mut visited = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == from_node {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(neighbors) = adjacency.get(&current) {
            stack.extend(neighbors.iter().copied());
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Gray,
    Black,
}

/// Full-graph cycle detection via colored DFS with an explicit recursion
/// stack, used by `Graph::try_validate` for post-hoc validation. Returns
/// the first cycle found, as the sequence of node ids that form it.
pub(crate) fn detect_cycle(
    node_ids: &[Identifier],
    adjacency: &HashMap<Identifier, Vec<Identifier>>,
) -> Option<Vec<Identifier>> {
    let mut marks: HashMap<Identifier, Mark> = HashMap::new();
    let mut path: Vec<Identifier> = Vec::new();

    for &start in node_ids {
        if marks.contains_key(&start) {
            continue;
        }
        if let Some(cycle) = visit(start, adjacency, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit(
    node: Identifier,
    adjacency: &HashMap<Identifier, Vec<Identifier>>,
    marks: &mut HashMap<Identifier, Mark>,
    path: &mut Vec<Identifier>,
) -> Option<Vec<Identifier>> {
    marks.insert(node, Mark::Gray);
    path.push(node);

    if let Some(neighbors) = adjacency.get(&node) {
        for &next in neighbors {
            match marks.get(&next) {
                Some(Mark::Gray) => {
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Some(Mark::Black) => continue,
                None => {
                    if let Some(cycle) = visit(next, adjacency, marks, path) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    path.pop();
    marks.insert(node, Mark::Black);
    None
}
