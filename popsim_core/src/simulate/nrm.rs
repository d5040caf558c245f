//! Gibson and Bruck's next reaction method
//!
//! Each reaction carries an absolute putative firing time. The earliest one fires, then only
//! the reactions in its dependency set get a new propensity, and their putative times are
//! either redrawn or rescaled to the new propensity without consuming randomness.
use log::{debug, trace};
use rand::Rng;

use crate::network::model::ReactionNetwork;
use crate::simulate::ipq::IndexedPriorityQueue;
use crate::simulate::{uniform, Status, Termination, Trajectory};

/// Absolute time of the next firing of a reaction with propensity `propensity`
///
/// Zero propensity gives an infinite time, and `0/0` is mapped to infinity by the queue.
#[inline]
fn putative_time(now: f64, propensity: f64, u: f64) -> f64 {
    now - u.ln() / propensity
}

/// Next reaction method engine over a borrowed network
pub struct NextReactionMethod<'n> {
    network: &'n ReactionNetwork,
    population: Vec<f64>,
    time: f64,
    t_max: f64,
    propensities: Vec<f64>,
    queue: IndexedPriorityQueue,
    uniform_floor: f64,
    status: Status,
    trajectory: Trajectory,
    rescheduled: Vec<usize>,
}

impl<'n> NextReactionMethod<'n> {
    /// Set up a trial, computing every propensity and drawing one putative time per reaction
    pub fn new<R: Rng>(
        network: &'n ReactionNetwork,
        initial_population: &[f64],
        t_max: f64,
        uniform_floor: f64,
        rng: &mut R,
    ) -> Self {
        let propensities = network.propensities(initial_population);
        let times: Vec<f64> = propensities
            .iter()
            .map(|p| putative_time(0.0, *p, uniform(rng, uniform_floor)))
            .collect();
        NextReactionMethod {
            network,
            population: initial_population.to_vec(),
            time: 0.0,
            t_max,
            propensities,
            queue: IndexedPriorityQueue::new(&times),
            uniform_floor,
            status: Status::Ready,
            trajectory: Trajectory::new(),
            rescheduled: Vec::new(),
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

    /// Cached propensity of every reaction
    pub fn propensities(&self) -> &[f64] {
        &self.propensities
    }

    /// Current putative firing time of `reaction`
    pub fn putative_time(&self, reaction: usize) -> f64 {
        self.queue.time_of(reaction)
    }

    /// Reactions whose propensity was recomputed by the last step
    pub fn last_rescheduled(&self) -> &[usize] {
        &self.rescheduled
    }

    /// Fire the reaction with the earliest putative time
    ///
    /// The population is recorded before the firing, so the first step records the initial
    /// population at time 0. When the trial ends the population at the final time is recorded.
    ///
    /// # Returns
    /// The reaction that fired, or `None` once the horizon is reached or no putative time is
    /// finite
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        if let Status::Done(_) = self.status {
            return None;
        }
        if self.time >= self.t_max {
            self.trajectory.push(self.time, self.population.clone());
            self.status = Status::Done(Termination::Horizon);
            return None;
        }
        self.status = Status::Running;
        self.trajectory.push(self.time, self.population.clone());

        let (next, next_time) = match self.queue.peek() {
            Some((reaction, time)) if time.is_finite() => (reaction, time),
            _ => {
                debug!("No reaction can fire at t = {}, stopping", self.time);
                self.status = Status::Done(Termination::Absorbed);
                return None;
            }
        };

        self.time = next_time;
        self.network.fire(next, &mut self.population);

        self.rescheduled.clear();
        for &reaction in self.network.dependency_graph().dependents(next) {
            let old = self.propensities[reaction];
            let new = self.network.propensity(reaction, &self.population);
            let time = if reaction == next || (old == 0.0 && new != 0.0) {
                putative_time(self.time, new, uniform(rng, self.uniform_floor))
            } else {
                old / new * (self.queue.time_of(reaction) - self.time) + self.time
            };
            self.queue.update(reaction, time);
            self.propensities[reaction] = new;
            self.rescheduled.push(reaction);
        }
        trace!(
            "Fired reaction {} at t = {}, rescheduled {:?}",
            next,
            self.time,
            self.rescheduled
        );
        Some(next)
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

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sir() -> ReactionNetwork {
        ReactionNetwork::build(
            &["x_s", "x_i", "x_r"],
            &IndexMap::from([("beta".to_string(), 0.01), ("gamma".to_string(), 0.1)]),
            &["x_s + x_i => 2 x_i", "x_i => x_r"],
            &["beta * x_s * x_i", "gamma * x_i"],
        )
        .unwrap()
    }

    #[test]
    fn initial_times_follow_propensities() {
        let network = ReactionNetwork::build(
            &["A", "B"],
            &IndexMap::new(),
            &["A =>", "B =>"],
            &["A", "B"],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let engine = NextReactionMethod::new(&network, &[5.0, 0.0], 10.0, 1e-12, &mut rng);
        assert_eq!(engine.status(), Status::Ready);
        assert_eq!(engine.propensities(), &[5.0, 0.0]);
        assert!(engine.putative_time(0).is_finite());
        assert!(engine.putative_time(0) > 0.0);
        assert_eq!(engine.putative_time(1), f64::INFINITY);
    }

    #[test]
    fn sir_conserves_population() {
        let network = sir();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut engine = NextReactionMethod::new(&network, &[99.0, 1.0, 0.0], 500.0, 1e-12, &mut rng);
        let mut last_time = 0.0;
        while let Some(fired) = engine.step(&mut rng) {
            assert!(engine.time() >= last_time);
            last_time = engine.time();
            assert_eq!(engine.population().iter().sum::<f64>(), 100.0);
            let dependents: Vec<usize> = network
                .dependency_graph()
                .dependents(fired)
                .iter()
                .copied()
                .collect();
            assert_eq!(engine.last_rescheduled(), dependents.as_slice());
        }
        let trajectory = engine.into_trajectory();
        assert_eq!(trajectory.first().unwrap().population, vec![99.0, 1.0, 0.0]);
        assert!(trajectory
            .iter()
            .all(|s| s.population.iter().sum::<f64>() == 100.0));
    }

    #[test]
    fn only_dependents_are_rescheduled() {
        // Two subsystems sharing no species
        let network = ReactionNetwork::build(
            &["A", "B", "C", "D"],
            &IndexMap::new(),
            &["A => B", "C => D"],
            &["A", "C"],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut engine =
            NextReactionMethod::new(&network, &[50.0, 0.0, 50.0, 0.0], 1e3, 1e-12, &mut rng);
        let mut fired_any = [false, false];
        let mut times = [engine.putative_time(0), engine.putative_time(1)];
        while let Some(fired) = engine.step(&mut rng) {
            let other = 1 - fired;
            assert_eq!(engine.last_rescheduled(), &[fired]);
            // The untouched reaction keeps its putative time
            assert_eq!(engine.putative_time(other), times[other]);
            times[fired] = engine.putative_time(fired);
            fired_any[fired] = true;
        }
        assert_eq!(fired_any, [true, true]);
        assert_eq!(engine.status(), Status::Done(Termination::Absorbed));
        assert_eq!(engine.population(), &[0.0, 50.0, 0.0, 50.0]);
    }

    #[test]
    fn rescaling_keeps_putative_time_when_rate_is_unchanged() {
        // Firing reaction 0 changes B, which reaction 1 reads through its rate function only
        let network = ReactionNetwork::build(
            &["A", "B", "C"],
            &IndexMap::new(),
            &["A => A + B", "C => "],
            &["1", "C * (B + 1) / (B + 1)"],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut engine = NextReactionMethod::new(&network, &[1.0, 0.0, 1.0], 1e3, 1e-12, &mut rng);
        let decay_time = engine.putative_time(1);
        while let Some(fired) = engine.step(&mut rng) {
            if fired == 1 {
                break;
            }
            assert_eq!(engine.last_rescheduled(), &[0, 1]);
            let rescaled = engine.putative_time(1);
            assert!((rescaled - decay_time).abs() <= 1e-9 * decay_time.max(1.0));
        }
    }

    #[test]
    fn zero_rate_stays_infinite() {
        let network = ReactionNetwork::build(
            &["A", "B"],
            &IndexMap::from([("k".to_string(), 0.0)]),
            &["=> A", "A => B"],
            &["1", "k * A"],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let mut engine = NextReactionMethod::new(&network, &[0.0, 0.0], 30.0, 1e-12, &mut rng);
        while let Some(fired) = engine.step(&mut rng) {
            assert_eq!(fired, 0);
            assert_eq!(engine.putative_time(1), f64::INFINITY);
        }
        let trajectory = engine.into_trajectory();
        assert_eq!(trajectory.termination, Termination::Horizon);
        assert!(trajectory.last().unwrap().time >= 30.0);
        assert!(trajectory.iter().all(|s| s.population[1] == 0.0));
    }
}
