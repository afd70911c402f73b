//! Genetic search over fixed-length move sequences.

use crate::config::check_num;
use crate::field::{BattleField, Snapshot};
use crate::fitness::{Evaluation, Fitness};
use crate::simulator::Simulator;
use crate::types::{Action, Spot};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::Bernoulli;
use serde::{Deserialize, Serialize};

/// Action emitted when no gene of the best plan is a legal move.
pub const FALLBACK_ACTION: Action = Action::Up;

/// Parameters of one genetic AI variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticParams {
    /// Number of moves per chromosome.
    pub gene_len: usize,
    /// Number of chromosomes per generation.
    pub population: usize,
    /// Number of generations evolved per decision.
    pub generations: usize,
    /// Probability that two parents are recombined.
    pub crossover_rate: f64,
    /// Probability that a child gets one random gene replaced.
    pub mutation_rate: f64,
    /// Carry the fittest chromosome into the next generation unchanged.
    #[serde(default)]
    pub elitism: bool,
    pub fitness: Fitness,
}

impl GeneticParams {
    pub fn validate(&self) -> Result<()> {
        check_num(self.gene_len, 1..=1024).context("invalid gene length")?;
        check_num(self.population, 2..=100_000).context("invalid population size")?;
        check_num(self.generations, 0..=10_000).context("invalid number of generations")?;
        check_num(self.crossover_rate, 0.0..=1.0).context("invalid crossover rate")?;
        check_num(self.mutation_rate, 0.0..=1.0).context("invalid mutation rate")?;
        Ok(())
    }
}

/// Candidate plan and its cached fitness.
#[derive(Debug, Clone)]
pub struct Chromosome {
    genes: Vec<Action>,
    fitness: f64,
}

impl Chromosome {
    /// Score `genes` with a fresh rollout of `snapshot`.
    fn evaluate(
        genes: Vec<Action>,
        snapshot: &Snapshot,
        agent: Spot,
        evaluation: &dyn Evaluation,
    ) -> Self {
        let mut sim = Simulator::new(snapshot);
        let fitness = evaluation.evaluate(&mut sim, agent, &genes);
        Self { genes, fitness }
    }

    pub fn genes(&self) -> &[Action] {
        &self.genes
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }
}

/// Evolves move plans for one agent and turns the best plan into a move.
pub struct GeneticSearch {
    params: GeneticParams,
    evaluation: Box<dyn Evaluation>,
    crossover_dist: Bernoulli,
    mutation_dist: Bernoulli,
}

impl GeneticSearch {
    pub fn new(params: GeneticParams) -> Result<Self> {
        params.validate().context("failed to validate genetic params")?;
        let crossover_dist = Bernoulli::new(params.crossover_rate)?;
        let mutation_dist = Bernoulli::new(params.mutation_rate)?;
        let evaluation = params.fitness.evaluation();
        Ok(Self {
            params,
            evaluation,
            crossover_dist,
            mutation_dist,
        })
    }

    /// Evolve a population against `snapshot` and return its fittest chromosome.
    pub fn search<R: Rng + ?Sized>(
        &self,
        snapshot: &Snapshot,
        agent: Spot,
        rng: &mut R,
    ) -> Option<Chromosome> {
        let mut population: Vec<_> = (0..self.params.population)
            .map(|_| {
                let genes = (0..self.params.gene_len)
                    .map(|_| Action::random(rng))
                    .collect();
                Chromosome::evaluate(genes, snapshot, agent, self.evaluation.as_ref())
            })
            .collect();

        for _ in 0..self.params.generations {
            population = self.next_generation(&population, snapshot, agent, rng);
        }

        fittest(&population).cloned()
    }

    /// Pick the move for `agent` on the live field.
    ///
    /// Never fails: if no gene of the best plan leads to a free cell,
    /// [`FALLBACK_ACTION`] is returned.
    pub fn next_action<R: Rng + ?Sized>(
        &self,
        field: &BattleField,
        agent: Spot,
        rng: &mut R,
    ) -> Action {
        let Ok(current) = field.current(agent) else {
            return FALLBACK_ACTION;
        };
        let snapshot = field.snapshot();
        let Some(best) = self.search(&snapshot, agent, rng) else {
            return FALLBACK_ACTION;
        };
        log::debug!("best fitness {:.4} for agent {agent}", best.fitness());

        best.genes()
            .iter()
            .copied()
            .find(|&action| field.is_available(current.next(action)))
            .unwrap_or(FALLBACK_ACTION)
    }

    fn next_generation<R: Rng + ?Sized>(
        &self,
        population: &[Chromosome],
        snapshot: &Snapshot,
        agent: Spot,
        rng: &mut R,
    ) -> Vec<Chromosome> {
        let n_chr = population.len();
        let mut next = Vec::with_capacity(n_chr);

        if self.params.elitism {
            if let Some(best) = fittest(population) {
                next.push(best.clone());
            }
        }

        while next.len() < n_chr {
            let parent_a = tournament(population, rng);
            let parent_b = tournament(population, rng);

            let (mut genes_a, mut genes_b) = (parent_a.genes.clone(), parent_b.genes.clone());
            let mut changed_a = false;
            let mut changed_b = false;

            if self.crossover_dist.sample(rng) {
                let pivot = rng.random_range(0..self.params.gene_len);
                genes_a[pivot..].swap_with_slice(&mut genes_b[pivot..]);
                changed_a = true;
                changed_b = true;
            }
            changed_a |= self.mutate(&mut genes_a, rng);
            changed_b |= self.mutate(&mut genes_b, rng);

            for (genes, changed, parent) in [
                (genes_a, changed_a, parent_a),
                (genes_b, changed_b, parent_b),
            ] {
                if next.len() == n_chr {
                    break;
                }
                let child = if changed {
                    Chromosome::evaluate(genes, snapshot, agent, self.evaluation.as_ref())
                } else {
                    parent.clone()
                };
                next.push(child);
            }
        }

        next
    }

    fn mutate<R: Rng + ?Sized>(&self, genes: &mut [Action], rng: &mut R) -> bool {
        if !self.mutation_dist.sample(rng) {
            return false;
        }
        let i_gene = rng.random_range(0..genes.len());
        genes[i_gene] = Action::random(rng);
        true
    }
}

fn fittest(population: &[Chromosome]) -> Option<&Chromosome> {
    population
        .iter()
        .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
}

/// Binary tournament: sample two chromosomes, keep the fitter one.
fn tournament<'a, R: Rng + ?Sized>(population: &'a [Chromosome], rng: &mut R) -> &'a Chromosome {
    let a = &population[rng.random_range(0..population.len())];
    let b = &population[rng.random_range(0..population.len())];
    if a.fitness >= b.fitness { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridSize;
    use rand_chacha::ChaCha12Rng;

    fn params(fitness: Fitness) -> GeneticParams {
        GeneticParams {
            gene_len: 8,
            population: 64,
            generations: 20,
            crossover_rate: 0.8,
            mutation_rate: 0.2,
            elitism: true,
            fitness,
        }
    }

    fn legal_actions(field: &BattleField, agent: Spot) -> Vec<Action> {
        let current = field.current(agent).unwrap();
        Action::ALL
            .into_iter()
            .filter(|&action| field.is_available(current.next(action)))
            .collect()
    }

    #[test]
    fn rejects_invalid_params() {
        let mut bad = params(Fitness::LongestSequence);
        bad.population = 1;
        assert!(GeneticSearch::new(bad).is_err());

        let mut bad = params(Fitness::LongestSequence);
        bad.mutation_rate = 1.5;
        assert!(GeneticSearch::new(bad).is_err());
    }

    #[test]
    fn evolves_long_runs_on_open_board() {
        let search = GeneticSearch::new(params(Fitness::LongestSequence)).unwrap();
        let mut field = BattleField::new(GridSize::TRON);
        let agent = Spot::new(15, 10);
        field.add_agent_at(agent, agent).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(1);

        let best = search.search(&field.snapshot(), agent, &mut rng).unwrap();
        assert_eq!(best.genes().len(), 8);
        assert!(best.fitness() >= 0.5);
    }

    #[test]
    fn picks_the_only_legal_move() {
        let search = GeneticSearch::new(params(Fitness::RelaxedLongestSequence)).unwrap();
        let mut field = BattleField::new(GridSize::TRON);
        let agent = Spot::new(0, 0);
        field.add_agent_at(agent, agent).unwrap();
        let wall = Spot::new(1, 0);
        field.add_agent_at(wall, Spot::new(1, 1)).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(2);

        for _ in 0..5 {
            assert_eq!(search.next_action(&field, agent, &mut rng), Action::Down);
        }
    }

    #[test]
    fn returns_legal_moves_whenever_one_exists() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for fitness in [
            Fitness::RelaxedLongestSequence,
            Fitness::LongestSequence,
            Fitness::FibonacciWeighted,
            Fitness::FloodFillWeighted,
        ] {
            let search = GeneticSearch::new(params(fitness)).unwrap();
            for trial in 0..10 {
                let mut field = BattleField::new(GridSize::TRON);
                let agent = Spot::new(3 + trial, 7);
                field.add_agent_at(agent, agent).unwrap();
                let walker = Spot::new(20, 10);
                field.add_agent_at(walker, walker).unwrap();
                for _ in 0..40 {
                    let current = field.current(walker).unwrap();
                    let next = current.next(Action::random(&mut rng));
                    if field.is_available(next) {
                        field.move_to(walker, next).unwrap();
                    }
                }

                let legal = legal_actions(&field, agent);
                let action = search.next_action(&field, agent, &mut rng);
                assert!(!legal.is_empty());
                assert!(legal.contains(&action), "{fitness:?} chose {action} from {legal:?}");
            }
        }
    }

    #[test]
    fn boxed_in_agent_gets_fallback() {
        let search = GeneticSearch::new(params(Fitness::FloodFillWeighted)).unwrap();
        let mut field = BattleField::new(GridSize::TRON);
        let agent = Spot::new(0, 0);
        field.add_agent_at(agent, Spot::new(1, 0)).unwrap();
        let wall = Spot::new(0, 1);
        field.add_agent_at(wall, Spot::new(1, 1)).unwrap();
        field.move_to(wall, Spot::new(2, 1)).unwrap();
        field.move_to(wall, Spot::new(2, 0)).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(4);

        assert!(legal_actions(&field, agent).is_empty());
        assert_eq!(search.next_action(&field, agent, &mut rng), FALLBACK_ACTION);
    }

    #[test]
    fn unknown_agent_gets_fallback() {
        let search = GeneticSearch::new(params(Fitness::LongestSequence)).unwrap();
        let field = BattleField::new(GridSize::TRON);
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        assert_eq!(
            search.next_action(&field, Spot::new(4, 4), &mut rng),
            FALLBACK_ACTION
        );
    }
}
