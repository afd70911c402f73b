//! Agents and the factories that build them for each match.

use crate::field::BattleField;
use crate::genetic::{FALLBACK_ACTION, GeneticParams, GeneticSearch};
use crate::protocol::{FieldMirror, InputStream, RoundInput};
use crate::types::{Action, GridSize, Spot};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Decision maker fed with one integer stream per round.
pub trait Agent: Send {
    fn next_action(&mut self, input: &mut InputStream) -> Result<Action>;
}

/// Builds fresh agents; the name identifies the AI in results.
pub trait AgentFactory: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self, size: GridSize, seed: u64) -> Result<Box<dyn Agent>>;
}

/// Configured AI: a unique name and its decision strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    pub name: String,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Genetic(GeneticParams),
    Nearest,
    Random,
}

impl AgentFactory for AiConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, size: GridSize, seed: u64) -> Result<Box<dyn Agent>> {
        let mirror = FieldMirror::new(size);
        let rng = ChaCha12Rng::seed_from_u64(seed);
        let agent: Box<dyn Agent> = match &self.strategy {
            Strategy::Genetic(params) => {
                let search = GeneticSearch::new(params.clone())
                    .with_context(|| format!("failed to build genetic search for {}", self.name))?;
                Box::new(GeneticAgent {
                    mirror,
                    search,
                    rng,
                })
            }
            Strategy::Nearest => Box::new(NearestAgent { mirror }),
            Strategy::Random => Box::new(RandomAgent { mirror, rng }),
        };
        Ok(agent)
    }
}

/// Actions leading `agent` to a free cell, in [`Action::ALL`] order.
pub fn legal_actions(field: &BattleField, agent: Spot) -> Vec<Action> {
    let Ok(current) = field.current(agent) else {
        return Vec::new();
    };
    Action::ALL
        .into_iter()
        .filter(|&action| field.is_available(current.next(action)))
        .collect()
}

fn read_round(mirror: &mut FieldMirror, input: &mut InputStream) -> Result<RoundInput> {
    let round = RoundInput::read(input).context("failed to read round input")?;
    mirror.update(&round).context("failed to update field mirror")?;
    Ok(round)
}

pub struct GeneticAgent {
    mirror: FieldMirror,
    search: GeneticSearch,
    rng: ChaCha12Rng,
}

impl Agent for GeneticAgent {
    fn next_action(&mut self, input: &mut InputStream) -> Result<Action> {
        let round = read_round(&mut self.mirror, input)?;
        Ok(self
            .search
            .next_action(self.mirror.field(), round.me(), &mut self.rng))
    }
}

/// Takes the first free neighbour.
pub struct NearestAgent {
    mirror: FieldMirror,
}

impl Agent for NearestAgent {
    fn next_action(&mut self, input: &mut InputStream) -> Result<Action> {
        let round = read_round(&mut self.mirror, input)?;
        let legal = legal_actions(self.mirror.field(), round.me());
        Ok(legal.first().copied().unwrap_or(FALLBACK_ACTION))
    }
}

/// Takes a uniformly random free neighbour.
pub struct RandomAgent {
    mirror: FieldMirror,
    rng: ChaCha12Rng,
}

impl Agent for RandomAgent {
    fn next_action(&mut self, input: &mut InputStream) -> Result<Action> {
        let round = read_round(&mut self.mirror, input)?;
        let legal = legal_actions(self.mirror.field(), round.me());
        Ok(legal.choose(&mut self.rng).copied().unwrap_or(FALLBACK_ACTION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::Fitness;

    fn stream(vals: &[i32]) -> InputStream {
        InputStream::new(vals.to_vec())
    }

    #[test]
    fn nearest_prefers_up_then_down() {
        let ai = AiConfig {
            name: "nearest".into(),
            strategy: Strategy::Nearest,
        };
        let mut agent = ai.create(GridSize::TRON, 0).unwrap();
        assert_eq!(
            agent.next_action(&mut stream(&[2, 0, 5, 5, 5, 5, 9, 9, 9, 9])).unwrap(),
            Action::Up
        );

        let mut agent = ai.create(GridSize::TRON, 0).unwrap();
        assert_eq!(
            agent.next_action(&mut stream(&[2, 0, 0, 0, 0, 0, 9, 9, 9, 9])).unwrap(),
            Action::Down
        );
        // Own trail now blocks up.
        assert_eq!(
            agent.next_action(&mut stream(&[2, 0, 0, 0, 0, 1, 9, 9, 9, 9])).unwrap(),
            Action::Down
        );
    }

    #[test]
    fn random_stays_on_free_cells() {
        let ai = AiConfig {
            name: "random".into(),
            strategy: Strategy::Random,
        };
        let mut agent = ai.create(GridSize::TRON, 11).unwrap();
        for _ in 0..20 {
            let action = agent
                .next_action(&mut stream(&[2, 1, 5, 5, 5, 5, 0, 0, 0, 0]))
                .unwrap();
            assert!(matches!(action, Action::Down | Action::Right));
        }
    }

    #[test]
    fn genetic_agent_avoids_walls() {
        let ai = AiConfig {
            name: "genetic".into(),
            strategy: Strategy::Genetic(GeneticParams {
                gene_len: 12,
                population: 32,
                generations: 8,
                crossover_rate: 0.9,
                mutation_rate: 0.1,
                elitism: true,
                fitness: Fitness::FloodFillWeighted,
            }),
        };
        let mut agent = ai.create(GridSize::TRON, 3).unwrap();
        let action = agent
            .next_action(&mut stream(&[2, 0, 29, 0, 29, 0, 10, 10, 10, 10]))
            .unwrap();
        assert!(matches!(action, Action::Down | Action::Left));
    }

    #[test]
    fn agents_fail_on_truncated_input() {
        let ai = AiConfig {
            name: "nearest".into(),
            strategy: Strategy::Nearest,
        };
        let mut agent = ai.create(GridSize::TRON, 0).unwrap();
        assert!(agent.next_action(&mut stream(&[2, 0, 5, 5])).is_err());
    }
}
