//! Dependency graph of a reaction network: which propensities must be refreshed after a
//! reaction fires
use indexmap::IndexSet;

/// Map from a reaction index to the reactions whose propensity it can change
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    graph: Vec<IndexSet<usize>>,
}

impl DependencyGraph {
    /// Build the graph from the per-reaction write and read sets
    ///
    /// # Parameters
    /// - `affects`: for each reaction, the species positions its firing changes
    /// - `depends_on`: for each reaction, the species positions its propensity reads
    ///
    /// Reaction `j` is a dependent of reaction `i` when `affects[i]` and `depends_on[j]`
    /// intersect. Every reaction is a dependent of itself, its putative time is consumed
    /// when it fires.
    ///
    /// # Examples
    /// ```rust
    /// use popsim_core::network::dependency_graph::DependencyGraph;
    /// let affects = vec![vec![0, 1], vec![1, 2]];
    /// let depends_on = vec![vec![0], vec![2]];
    /// let graph = DependencyGraph::build(&affects, &depends_on);
    /// assert!(graph.dependents(0).contains(&0));
    /// assert!(!graph.dependents(0).contains(&1));
    /// assert!(graph.dependents(1).contains(&1));
    /// ```
    pub fn build(affects: &[Vec<usize>], depends_on: &[Vec<usize>]) -> Self {
        let graph = affects
            .iter()
            .enumerate()
            .map(|(i, written)| {
                depends_on
                    .iter()
                    .enumerate()
                    .filter(|(j, read)| *j == i || read.iter().any(|s| written.contains(s)))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        DependencyGraph { graph }
    }

    /// Reactions to refresh after `reaction` fires, ascending
    pub fn dependents(&self, reaction: usize) -> &IndexSet<usize> {
        &self.graph[reaction]
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &IndexSet<usize>)> {
        self.graph.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_vec(set: &IndexSet<usize>) -> Vec<usize> {
        set.iter().copied().collect()
    }

    #[test]
    fn sir_graph() {
        // x_s + x_i => 2 x_i, x_i => x_r, x_r => x_s
        let affects = vec![vec![0, 1], vec![1, 2], vec![0, 2]];
        let depends_on = vec![vec![0, 1], vec![1], vec![2]];
        let graph = DependencyGraph::build(&affects, &depends_on);
        assert_eq!(graph.len(), 3);
        assert_eq!(as_vec(graph.dependents(0)), vec![0, 1]);
        assert_eq!(as_vec(graph.dependents(1)), vec![0, 1, 2]);
        assert_eq!(as_vec(graph.dependents(2)), vec![0, 2]);
    }

    #[test]
    fn self_is_always_included() {
        // A pure production reaction with a constant rate reads nothing
        let affects = vec![vec![0], vec![1]];
        let depends_on: Vec<Vec<usize>> = vec![vec![], vec![0]];
        let graph = DependencyGraph::build(&affects, &depends_on);
        assert_eq!(as_vec(graph.dependents(0)), vec![0, 1]);
        assert_eq!(as_vec(graph.dependents(1)), vec![1]);
    }

    #[test]
    fn disjoint_subsystems() {
        let affects = vec![vec![0, 1], vec![2, 3]];
        let depends_on = vec![vec![0], vec![2]];
        let graph = DependencyGraph::build(&affects, &depends_on);
        assert_eq!(as_vec(graph.dependents(0)), vec![0]);
        assert_eq!(as_vec(graph.dependents(1)), vec![1]);
        assert!(graph.iter().all(|(i, deps)| deps.contains(&i)));
    }
}
