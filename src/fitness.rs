//! Fitness strategies for candidate move sequences.

use crate::flood;
use crate::simulator::Simulator;
use crate::types::{Action, Spot};
use serde::{Deserialize, Serialize};

/// Scores one rollout of `genes` for `agent`.
///
/// The simulator is fresh and owned by this evaluation. Scores are normalized
/// so that strategies of the same kind are comparable across sequence lengths.
pub trait Evaluation: Send + Sync {
    fn evaluate(&self, sim: &mut Simulator, agent: Spot, genes: &[Action]) -> f64;
}

/// Fitness strategy selected in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fitness {
    RelaxedLongestSequence,
    LongestSequence,
    FibonacciWeighted,
    FloodFillWeighted,
}

impl Fitness {
    pub fn evaluation(self) -> Box<dyn Evaluation> {
        match self {
            Fitness::RelaxedLongestSequence => Box::new(RelaxedLongestSequence),
            Fitness::LongestSequence => Box::new(LongestSequence),
            Fitness::FibonacciWeighted => Box::new(FibonacciWeighted),
            Fitness::FloodFillWeighted => Box::new(FloodFillWeighted),
        }
    }
}

/// Fraction of genes that succeed, failures included in the rollout.
pub struct RelaxedLongestSequence;

impl Evaluation for RelaxedLongestSequence {
    fn evaluate(&self, sim: &mut Simulator, agent: Spot, genes: &[Action]) -> f64 {
        if genes.is_empty() {
            return 0.0;
        }
        let n_ok = genes
            .iter()
            .filter(|&&action| sim.perform(agent, action))
            .count();
        n_ok as f64 / genes.len() as f64
    }
}

/// Fraction of genes that succeed before the first failure.
pub struct LongestSequence;

impl Evaluation for LongestSequence {
    fn evaluate(&self, sim: &mut Simulator, agent: Spot, genes: &[Action]) -> f64 {
        if genes.is_empty() {
            return 0.0;
        }
        let mut score = 0.0;
        for &action in genes {
            if !sim.perform(agent, action) {
                break;
            }
            score += 1.0;
        }
        score / genes.len() as f64
    }
}

/// Fibonacci-growing reward for unbroken runs of successful moves.
pub struct FibonacciWeighted;

impl FibonacciWeighted {
    /// Sum reached when every one of `len` moves succeeds.
    fn max_weight(len: usize) -> f64 {
        let (mut a, mut b) = (1.0, 0.0);
        let mut sum = 0.0;
        for _ in 0..len {
            (a, b) = (a + b, a);
            sum += b;
        }
        sum
    }
}

impl Evaluation for FibonacciWeighted {
    fn evaluate(&self, sim: &mut Simulator, agent: Spot, genes: &[Action]) -> f64 {
        if genes.is_empty() {
            return 0.0;
        }
        let (mut a, mut b) = (1.0, 0.0);
        let mut sum = 0.0;
        for &action in genes {
            if sim.perform(agent, action) {
                (a, b) = (a + b, a);
                sum += b;
            } else {
                (a, b) = (1.0, 0.0);
            }
        }
        sum / Self::max_weight(genes.len())
    }
}

/// Reachable area after the rollout, discounted by failed steps.
pub struct FloodFillWeighted;

impl Evaluation for FloodFillWeighted {
    fn evaluate(&self, sim: &mut Simulator, agent: Spot, genes: &[Action]) -> f64 {
        if genes.is_empty() {
            return 0.0;
        }
        let penalty = 1.0 / genes.len() as f64;
        let mut weight = 1.0;
        for &action in genes {
            if !sim.perform(agent, action) {
                weight -= penalty;
            }
        }

        let Some(end) = sim.current(agent) else {
            return 0.0;
        };
        let n_available = sim.n_available();
        if n_available == 0 {
            return 0.0;
        }
        let reachable = flood::area(|spot| sim.is_available(spot), sim.size(), end);
        weight * reachable as f64 / n_available as f64
    }
}
