use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt::{Debug, Formatter},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError<T>
where
    T: Debug,
{
    #[error("Cycle detected in dependency graph, from {:?}", .0)]
    CycleDetected(DepRoute<T>),
    #[error("Duplicate edge detected in dependency graph, from {:?}", .0)]
    DuplicateEdge(DepRoute<T>),
}

impl<T: Debug> TopologyError<T> {
    /// Re-labels the nodes of the offending route, e.g. `TypeId` -> type name.
    pub fn map<U: Debug>(self, f: impl FnMut(T) -> U) -> TopologyError<U> {
        match self {
            Self::CycleDetected(route) => TopologyError::CycleDetected(route.map(f)),
            Self::DuplicateEdge(route) => TopologyError::DuplicateEdge(route.map(f)),
        }
    }
}

pub struct DepRoute<T> {
    // first means the start node, last means the end node
    route: Vec<T>,
}

impl<T> DepRoute<T> {
    pub fn nodes(&self) -> &[T] {
        &self.route
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> DepRoute<U> {
        DepRoute {
            route: self.route.into_iter().map(f).collect(),
        }
    }
}

impl<T> Debug for DepRoute<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some((last, init)) = self.route.split_last() else {
            return write!(f, "[]");
        };
        for item in init {
            write!(f, "{item:?} -> ")?;
        }
        write!(f, "{last:?}")
    }
}

/// Directed dependency graph. An edge `from -> to` means `to` is derived from `from`.
#[derive(Debug)]
pub struct Graph<Node, Edge = ()>
where
    Node: Debug + PartialEq + Copy + Ord,
    Edge: Debug + PartialEq,
{
    nodes: BTreeSet<Node>,

    routes: Vec<(Node, Edge, Node)>,

    route_cache: BTreeMap<Node, BTreeSet<Node>>,
}

impl<Node, Edge> Default for Graph<Node, Edge>
where
    Node: Debug + PartialEq + Copy + Ord,
    Edge: Debug + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Node, Edge> Graph<Node, Edge>
where
    Node: Debug + PartialEq + Copy + Ord,
    Edge: Debug + PartialEq,
{
    pub fn new() -> Self {
        Self {
            nodes: BTreeSet::new(),
            routes: Vec::new(),
            route_cache: BTreeMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: BTreeSet::new(),
            routes: Vec::with_capacity(capacity),
            route_cache: BTreeMap::new(),
        }
    }

    /// Registers a node that may have no edges at all.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node);
    }

    pub fn route_to(&mut self, from: Node, to: Node, via: Edge) {
        self.nodes.insert(from);
        self.nodes.insert(to);
        self.routes.push((from, via, to));
        self.route_cache.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn cal_in_degree(&self) -> BTreeMap<Node, usize> {
        let mut in_degree: BTreeMap<Node, usize> =
            self.nodes.iter().map(|node| (*node, 0)).collect();

        for (_from, _via, to) in &self.routes {
            *in_degree.entry(*to).or_insert(0) += 1;
        }

        in_degree
    }

    /// Kahn's algorithm. Among ready nodes the smallest one goes first, so the
    /// resulting order is stable for a given set of nodes and edges.
    pub fn topology_sort(&self) -> Result<Vec<Node>, TopologyError<Node>> {
        let mut in_degree = self.cal_in_degree();
        let mut order = Vec::with_capacity(in_degree.len());

        while !in_degree.is_empty() {
            let Some(node) = in_degree
                .iter()
                .find(|(_, deg)| **deg == 0)
                .map(|(node, _)| *node)
            else {
                let keys: Vec<Node> = in_degree.keys().copied().collect();
                let route = self.find_cycle(&keys).unwrap_or_default();
                return Err(TopologyError::CycleDetected(DepRoute { route }));
            };

            in_degree.remove(&node);
            order.push(node);

            for connected in self.direct_connected_nodes(node)? {
                if let Some(deg) = in_degree.get_mut(&connected) {
                    *deg -= 1;
                }
            }
        }

        Ok(order)
    }

    fn neighbours_within(&self, node: Node, nodes: &[Node]) -> std::vec::IntoIter<Node> {
        self.direct_connected_nodes(node)
            .unwrap_or_default()
            .into_iter()
            .filter(|n| nodes.contains(n))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn find_cycle(&self, nodes: &[Node]) -> Option<Vec<Node>> {
        // Iterative DFS over the nodes Kahn's algorithm could not drain
        let mut visited = BTreeSet::new();
        let mut path_set = BTreeSet::new();
        let mut path = Vec::new();
        let mut stack: Vec<(Node, std::vec::IntoIter<Node>)> = Vec::new();

        for &start_node in nodes {
            if visited.contains(&start_node) {
                continue;
            }

            stack.push((start_node, self.neighbours_within(start_node, nodes)));
            visited.insert(start_node);
            path_set.insert(start_node);
            path.push(start_node);

            while let Some((current_node, neighbours)) = stack.last_mut() {
                if let Some(neighbour) = neighbours.next() {
                    if path_set.contains(&neighbour) {
                        if let Some(pos) = path.iter().position(|&x| x == neighbour) {
                            let mut cycle = path.split_off(pos);
                            cycle.push(neighbour);
                            return Some(cycle);
                        }
                    } else if !visited.contains(&neighbour) {
                        visited.insert(neighbour);
                        path_set.insert(neighbour);
                        path.push(neighbour);
                        stack.push((neighbour, self.neighbours_within(neighbour, nodes)));
                    }
                } else {
                    let node_to_remove = *current_node;
                    stack.pop();
                    path_set.remove(&node_to_remove);
                    path.pop();
                }
            }
        }
        None
    }

    /// # Connected Nodes, every node that transitively depends on the given node
    pub fn connected(&mut self, node: Node) -> impl Iterator<Item = &Node> {
        if !self.route_cache.contains_key(&node) {
            let collected = self.connected_nodes(node);
            self.route_cache.insert(node, collected);
        }
        self.route_cache.get(&node).into_iter().flatten()
    }

    fn direct_connected_nodes(&self, node: Node) -> Result<BTreeSet<Node>, TopologyError<Node>> {
        let mut collected = BTreeSet::new();

        for (from, _via, to) in &self.routes {
            if from == &node && !collected.insert(*to) {
                return Err(TopologyError::DuplicateEdge(DepRoute {
                    route: vec![node, *to],
                }));
            }
        }

        Ok(collected)
    }

    fn connected_nodes(&self, node: Node) -> BTreeSet<Node> {
        let mut collected = BTreeSet::new();
        let mut queue = VecDeque::new();

        queue.push_back(node);

        while let Some(current) = queue.pop_front() {
            for (from, _via, to) in &self.routes {
                // already-collected check also keeps a cyclic graph from looping forever
                if from == &current && collected.insert(*to) {
                    queue.push_back(*to);
                }
            }
        }

        collected
    }
}
