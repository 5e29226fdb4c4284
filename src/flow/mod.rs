//! A successive-shortest-path minimum-cost-flow solver.
//!
//! The cardinality-aware WCSS bound formulates the assignment of the
//! remaining observations as a transportation problem; this module solves it.
//! Augmenting one unit at a time along Bellman-Ford shortest paths keeps the
//! flow integral throughout, which the residual-graph filtering relies on.

/// The requested amount of flow cannot be routed from source to sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FlowInfeasible;

/// Handle to an edge, valid for the network it was added to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EdgeRef {
    node: usize,
    index: usize,
}

#[derive(Debug, Clone)]
struct Edge {
    to: usize,
    /// Index of the paired reverse edge in `graph[to]`.
    rev: usize,
    capacity: i64,
    cost: f64,
}

/// A directed flow network with per-edge capacities and real-valued costs.
#[derive(Debug)]
pub(crate) struct MinCostFlow {
    graph: Vec<Vec<Edge>>,
}

impl MinCostFlow {
    pub(crate) fn new(num_nodes: usize) -> Self {
        MinCostFlow {
            graph: vec![Vec::new(); num_nodes],
        }
    }

    /// Add an edge with the given capacity and cost; the residual reverse
    /// edge is created automatically.
    pub(crate) fn add_edge(
        &mut self,
        from: usize,
        to: usize,
        capacity: i64,
        cost: f64,
    ) -> EdgeRef {
        debug_assert!(from != to);
        debug_assert!(capacity >= 0);

        let forward_index = self.graph[from].len();
        let reverse_index = self.graph[to].len();
        self.graph[from].push(Edge {
            to,
            rev: reverse_index,
            capacity,
            cost,
        });
        self.graph[to].push(Edge {
            to: from,
            rev: forward_index,
            capacity: 0,
            cost: -cost,
        });

        EdgeRef {
            node: from,
            index: forward_index,
        }
    }

    /// Route `amount` units from `source` to `sink` at minimum total cost.
    pub(crate) fn solve(
        &mut self,
        source: usize,
        sink: usize,
        amount: i64,
    ) -> Result<f64, FlowInfeasible> {
        let num_nodes = self.graph.len();
        let mut total_cost = 0.0;
        let mut remaining = amount;

        while remaining > 0 {
            // Bellman-Ford on the residual network. The reverse edges carry
            // negative costs, so a label-correcting search is required.
            let mut distance = vec![f64::INFINITY; num_nodes];
            let mut predecessor: Vec<Option<(usize, usize)>> = vec![None; num_nodes];
            distance[source] = 0.0;

            let mut improved = true;
            while improved {
                improved = false;
                for node in 0..num_nodes {
                    if distance[node].is_infinite() {
                        continue;
                    }
                    for (index, edge) in self.graph[node].iter().enumerate() {
                        if edge.capacity > 0 && distance[node] + edge.cost < distance[edge.to] {
                            distance[edge.to] = distance[node] + edge.cost;
                            predecessor[edge.to] = Some((node, index));
                            improved = true;
                        }
                    }
                }
            }

            if distance[sink].is_infinite() {
                return Err(FlowInfeasible);
            }

            // Bottleneck along the path, then augment.
            let mut bottleneck = remaining;
            let mut node = sink;
            while node != source {
                let (from, index) = predecessor[node].expect("path reaches the source");
                bottleneck = bottleneck.min(self.graph[from][index].capacity);
                node = from;
            }

            let mut node = sink;
            while node != source {
                let (from, index) = predecessor[node].expect("path reaches the source");
                self.graph[from][index].capacity -= bottleneck;
                let rev = self.graph[from][index].rev;
                self.graph[node][rev].capacity += bottleneck;
                node = from;
            }

            total_cost += bottleneck as f64 * distance[sink];
            remaining -= bottleneck;
        }

        Ok(total_cost)
    }

    /// The amount of flow routed over `edge` by [`MinCostFlow::solve`].
    pub(crate) fn flow(&self, edge: EdgeRef) -> i64 {
        let forward = &self.graph[edge.node][edge.index];
        self.graph[forward.to][forward.rev].capacity
    }
}
