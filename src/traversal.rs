use crate::error::TraversalError;
use crate::graph::Graph;
use crate::id::Identifier;
use std::collections::{HashMap, HashSet, VecDeque};

/// Read-only graph traversal.
///
/// Every method here takes `&Graph` and never locks or mutates anything —
/// it's pure computation over the adjacency the graph already maintains,
/// kept as a standalone read path rather than something the runner owns,
/// so it can be called independently of a run (e.g. by an editor
/// validating a graph before execution).
impl Graph {
    /// Depth-first walk from `start`, calling `visit` on each node in
    /// discovery order. `visit` returning `false` stops the traversal early
    /// without visiting that node's descendants.
    pub fn depth_first_traversal(
        &self,
        start: Identifier,
        mut visit: impl FnMut(Identifier) -> bool,
    ) -> Vec<Identifier> {
        let adjacency = self.adjacency();
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);
            if !visit(node) {
                break;
            }
            if let Some(neighbors) = adjacency.get(&node) {
                for &next in neighbors.iter().rev() {
                    if !visited.contains(&next) {
                        stack.push(next);
                    }
                }
            }
        }
        order
    }

    /// Breadth-first walk from `start`, calling `visit` on each node in
    /// discovery order; `visit` returning `false` stops the traversal early.
    pub fn breadth_first_traversal(
        &self,
        start: Identifier,
        mut visit: impl FnMut(Identifier) -> bool,
    ) -> Vec<Identifier> {
        let adjacency = self.adjacency();
        let mut visited = HashSet::from([start]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            order.push(node);
            if !visit(node) {
                break;
            }
            if let Some(neighbors) = adjacency.get(&node) {
                for &next in neighbors {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        order
    }

    /// Is `target` reachable from `start`, via breadth-first search?
    pub fn find_node_by_id(&self, start: Identifier, target: Identifier) -> bool {
        if start == target {
            return true;
        }
        let mut found = false;
        self.breadth_first_traversal(start, |node| {
            if node == target {
                found = true;
                false
            } else {
                true
            }
        });
        found
    }

    /// Shortest path from `start` to `target` (by edge count), via BFS.
    pub fn find_shortest_path(
        &self,
        start: Identifier,
        target: Identifier,
    ) -> Option<Vec<Identifier>> {
        if start == target {
            return Some(vec![start]);
        }
        let adjacency = self.adjacency();
        let mut visited = HashSet::from([start]);
        let mut parents: std::collections::HashMap<Identifier, Identifier> =
            std::collections::HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            if let Some(neighbors) = adjacency.get(&node) {
                for &next in neighbors {
                    if visited.insert(next) {
                        parents.insert(next, node);
                        if next == target {
                            return Some(reconstruct_path(&parents, start, target));
                        }
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    /// Every simple path (no repeated node) from `start` to `target`, via
    /// DFS with a per-path visited set so one branch's visits don't block
    /// a sibling branch from revisiting the same node.
    pub fn find_all_simple_paths(&self, start: Identifier, target: Identifier) -> Vec<Vec<Identifier>> {
        let adjacency = self.adjacency();
        let mut paths = Vec::new();
        let mut visited = HashSet::new();
        let mut path = vec![start];
        visited.insert(start);

        walk_simple_paths(&adjacency, start, target, &mut visited, &mut path, &mut paths);
        paths
    }

    /// Topological order of the subgraph reachable from `start`, via
    /// depth-first reverse-postorder over forward (directed) edges only.
    /// Fails if that subgraph contains a cycle. Callers needing the whole
    /// graph's order must sort from each entry point in turn.
    pub fn topological_sort(&self, start: Identifier) -> Result<Vec<Identifier>, TraversalError> {
        let adjacency = self.adjacency();

        #[derive(PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: HashMap<Identifier, Mark> = HashMap::new();
        let mut order = Vec::new();

        fn visit(
            node: Identifier,
            adjacency: &HashMap<Identifier, Vec<Identifier>>,
            marks: &mut HashMap<Identifier, Mark>,
            order: &mut Vec<Identifier>,
        ) -> Result<(), TraversalError> {
            match marks.get(&node) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(TraversalError::CycleDetected),
                None => {}
            }
            marks.insert(node, Mark::Visiting);
            if let Some(neighbors) = adjacency.get(&node) {
                for &next in neighbors {
                    visit(next, adjacency, marks, order)?;
                }
            }
            marks.insert(node, Mark::Done);
            order.push(node);
            Ok(())
        }

        visit(start, &adjacency, &mut marks, &mut order)?;
        order.reverse();
        Ok(order)
    }

    /// Every node reachable from `start` by any edge, in either direction.
    /// Unlike `adjacency`, this treats connections as undirected, so it
    /// enumerates `start`'s whole connected component rather than only the
    /// nodes downstream of it.
    fn reachable_component(&self, start: Identifier) -> HashSet<Identifier> {
        let directed = self.adjacency();
        let mut undirected: HashMap<Identifier, Vec<Identifier>> = HashMap::new();
        for (&node, neighbors) in &directed {
            undirected.entry(node).or_default();
            for &next in neighbors {
                undirected.entry(node).or_default().push(next);
                undirected.entry(next).or_default().push(node);
            }
        }

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            if let Some(neighbors) = undirected.get(&node) {
                for &next in neighbors {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        visited
    }

    /// Nodes reachable from `start` (by any edge) whose every input
    /// connector has no incoming connection.
    pub fn entry_points(&self, start: Identifier) -> Vec<Identifier> {
        self.reachable_component(start)
            .into_iter()
            .filter(|&id| {
                self.get_node_by_id(id)
                    .map(|node| node.inputs().iter().all(|c| c.links().is_empty()))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Nodes reachable from `start` (by any edge) whose every output
    /// connector has no outgoing connection.
    pub fn exit_points(&self, start: Identifier) -> Vec<Identifier> {
        self.reachable_component(start)
            .into_iter()
            .filter(|&id| {
                self.get_node_by_id(id)
                    .map(|node| node.outputs().iter().all(|c| c.links().is_empty()))
                    .unwrap_or(false)
            })
            .collect()
    }
}

fn reconstruct_path(
    parents: &std::collections::HashMap<Identifier, Identifier>,
    start: Identifier,
    target: Identifier,
) -> Vec<Identifier> {
    let mut path = vec![target];
    let mut current = target;
    while current != start {
        current = parents[&current];
        path.push(current);
    }
    path.reverse();
    path
}

fn walk_simple_paths(
    adjacency: &std::collections::HashMap<Identifier, Vec<Identifier>>,
    current: Identifier,
    target: Identifier,
    visited: &mut HashSet<Identifier>,
    path: &mut Vec<Identifier>,
    paths: &mut Vec<Vec<Identifier>>,
) {
    if current == target {
        paths.push(path.clone());
        return;
    }
    let Some(neighbors) = adjacency.get(&current) else {
        return;
    };
    for &next in neighbors {
        if visited.insert(next) {
            path.push(next);
            walk_simple_paths(adjacency, next, target, visited, path, paths);
            path.pop();
            visited.remove(&next);
        }
    }
}
