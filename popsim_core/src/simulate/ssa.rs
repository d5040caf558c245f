//! Gillespie's direct method
use log::debug;
use rand::Rng;

use crate::network::model::ReactionNetwork;
use crate::simulate::{uniform, Status, Termination, Trajectory};

/// Cumulative-sum tree over the propensities, used to pick the next reaction in O(log R)
///
/// The tree is stored as an array of `2R - 1` nodes, internal node `i` has children `2i + 1`
/// and `2i + 2`, and leaf `R - 1 + r` holds the propensity of reaction `r`.
#[derive(Debug, Clone)]
pub struct PropensityTree {
    leaves: usize,
    nodes: Vec<f64>,
}

impl PropensityTree {
    pub fn new(leaves: usize) -> Self {
        PropensityTree {
            leaves,
            nodes: vec![0f64; (2 * leaves).saturating_sub(1)],
        }
    }

    /// Replace every leaf and recompute the partial sums
    pub fn rebuild(&mut self, propensities: &[f64]) {
        if self.leaves == 0 {
            return;
        }
        let cut = self.leaves - 1;
        self.nodes[cut..].copy_from_slice(propensities);
        for node in (0..cut).rev() {
            self.nodes[node] = self.nodes[2 * node + 1] + self.nodes[2 * node + 2];
        }
    }

    /// Sum of all propensities
    #[inline]
    pub fn total(&self) -> f64 {
        self.nodes.first().copied().unwrap_or(0.0)
    }

    /// Pick the reaction whose cumulative interval contains `target`
    ///
    /// `target` must lie in `(0, total]`. Leaves with zero propensity are never chosen.
    pub fn select(&self, mut target: f64) -> usize {
        let cut = self.leaves - 1;
        let mut node = 0;
        while node < cut {
            let left = self.nodes[2 * node + 1];
            if left > 0.0 && target <= left {
                node = 2 * node + 1;
            } else {
                target -= left;
                node = 2 * node + 2;
            }
        }
        if self.nodes[node] > 0.0 {
            node - cut
        } else {
            // Rounding in the partial sums can walk into an empty subtree
            self.nodes[cut..]
                .iter()
                .rposition(|p| *p > 0.0)
                .unwrap_or(node - cut)
        }
    }
}

/// Direct method engine over a borrowed network
pub struct DirectMethod<'n> {
    network: &'n ReactionNetwork,
    population: Vec<f64>,
    time: f64,
    t_max: f64,
    propensities: Vec<f64>,
    tree: PropensityTree,
    uniform_floor: f64,
    status: Status,
    trajectory: Trajectory,
}

impl<'n> DirectMethod<'n> {
    /// Set up a trial, recording the initial population at time 0
    pub fn new(
        network: &'n ReactionNetwork,
        initial_population: &[f64],
        t_max: f64,
        uniform_floor: f64,
    ) -> Self {
        let mut trajectory = Trajectory::new();
        trajectory.push(0.0, initial_population.to_vec());
        DirectMethod {
            network,
            population: initial_population.to_vec(),
            time: 0.0,
            t_max,
            propensities: vec![0f64; network.num_reactions()],
            tree: PropensityTree::new(network.num_reactions()),
            uniform_floor,
            status: Status::Ready,
            trajectory,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn population(&self) -> &[f64] {
        &self.population
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Fire one reaction
    ///
    /// # Returns
    /// The reaction that fired, or `None` once the horizon is reached or the total propensity
    /// is zero
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        if let Status::Done(_) = self.status {
            return None;
        }
        if self.time >= self.t_max {
            self.status = Status::Done(Termination::Horizon);
            return None;
        }
        self.status = Status::Running;

        self.network
            .propensities_into(&self.population, &mut self.propensities);
        self.tree.rebuild(&self.propensities);
        let total = self.tree.total();
        // Also catches NaN
        if !(total > 0.0) {
            debug!("Total propensity is {} at t = {}, stopping", total, self.time);
            self.status = Status::Done(Termination::Absorbed);
            return None;
        }

        let u_select = uniform(rng, self.uniform_floor);
        let u_time = uniform(rng, self.uniform_floor);
        let reaction = self.tree.select(u_select * total);
        self.time -= u_time.ln() / total;
        self.network.fire(reaction, &mut self.population);
        self.trajectory.push(self.time, self.population.clone());
        Some(reaction)
    }

    /// Step until done and hand back the trajectory
    pub fn run<R: Rng>(mut self, rng: &mut R) -> Trajectory {
        while self.step(rng).is_some() {}
        self.into_trajectory()
    }

    pub fn into_trajectory(mut self) -> Trajectory {
        if let Status::Done(termination) = self.status {
            self.trajectory.termination = termination;
        }
        self.trajectory
    }
}
