//! Scored match engine with strict elimination.

use crate::agent::Agent;
use crate::field::{BattleField, Snapshot};
use crate::protocol::{AgentInput, InputStream, RoundInput};
use crate::types::{Action, GridSize, Spot};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Two-agent game played one round at a time.
pub trait Engine: Send {
    /// State the match started from; identifies the board across repetitions.
    fn initial_state(&self) -> &Snapshot;

    /// Play one round; returns the winner's index once the match is decided.
    fn play_round(&mut self, agents: &mut [Box<dyn Agent>; 2]) -> Result<Option<usize>>;

    fn score(&self, i_agent: usize) -> u32;
}

/// Builds a fresh engine for each match.
pub trait EngineFactory: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self) -> Result<Box<dyn Engine>>;
}

/// Named pair of spawn spots; the first spot belongs to the first mover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardVariant {
    pub name: String,
    pub first: Spot,
    pub second: Spot,
}

/// Board variant on a grid of a given size.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub size: GridSize,
    pub variant: BoardVariant,
}

impl EngineFactory for Board {
    fn name(&self) -> &str {
        &self.variant.name
    }

    fn create(&self) -> Result<Box<dyn Engine>> {
        let engine = CollisionEngine::new(self.size, [self.variant.first, self.variant.second])
            .with_context(|| format!("failed to set up board {}", self.variant.name))?;
        Ok(Box::new(engine))
    }
}

/// Strict engine: an illegal move eliminates the agent on the spot.
///
/// Agent 0 moves first each round. When it dies, agent 1 wins without being
/// asked for its move.
pub struct CollisionEngine {
    field: BattleField,
    initial: Snapshot,
    starts: [Spot; 2],
    alive: [bool; 2],
    scores: [u32; 2],
    winner: Option<usize>,
}

impl CollisionEngine {
    pub fn new(size: GridSize, starts: [Spot; 2]) -> Result<Self> {
        let mut field = BattleField::new(size);
        for (i_agent, &start) in starts.iter().enumerate() {
            field
                .add_agent_at(start, start)
                .with_context(|| format!("failed to spawn agent {i_agent} at {start}"))?;
        }
        let initial = field.snapshot();
        Ok(Self {
            field,
            initial,
            starts,
            alive: [true; 2],
            scores: [1; 2],
            winner: None,
        })
    }

    pub fn is_alive(&self, i_agent: usize) -> bool {
        self.alive.get(i_agent).copied().unwrap_or(false)
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    /// Integer stream describing the field from the point of view of `i_agent`.
    pub fn input_for(&self, i_agent: usize) -> Result<Vec<i32>> {
        let mut agents = Vec::with_capacity(self.starts.len());
        for (i, &start) in self.starts.iter().enumerate() {
            let agent = if self.is_alive(i) {
                AgentInput {
                    start,
                    current: self.field.current(start)?,
                }
            } else {
                AgentInput::ELIMINATED
            };
            agents.push(agent);
        }
        let round = RoundInput {
            this_index: i_agent,
            agents,
        };
        Ok(round.encode())
    }

    /// Apply one move; returns `false` if it eliminated the agent.
    pub fn perform(&mut self, i_agent: usize, action: Action) -> Result<bool> {
        let Some(&start) = self.starts.get(i_agent) else {
            bail!("unknown agent {i_agent}");
        };
        if !self.alive[i_agent] {
            bail!("agent {i_agent} is dead and cannot act");
        }

        let next = self.field.current(start)?.next(action);
        if !self.field.is_available(next) {
            self.alive[i_agent] = false;
            self.field.kill_agents(&[start])?;
            return Ok(false);
        }

        self.field.move_to(start, next)?;
        self.scores[i_agent] += 1;
        Ok(true)
    }
}

impl Engine for CollisionEngine {
    fn initial_state(&self) -> &Snapshot {
        &self.initial
    }

    fn play_round(&mut self, agents: &mut [Box<dyn Agent>; 2]) -> Result<Option<usize>> {
        if let Some(winner) = self.winner() {
            return Ok(Some(winner));
        }

        for (i_agent, agent) in agents.iter_mut().enumerate() {
            let input = self.input_for(i_agent)?;
            let action = agent
                .next_action(&mut InputStream::new(input))
                .with_context(|| format!("agent {i_agent} failed to choose an action"))?;
            if !self.perform(i_agent, action)? {
                self.winner = Some(1 - i_agent);
                return Ok(self.winner);
            }
        }

        Ok(None)
    }

    fn score(&self, i_agent: usize) -> u32 {
        self.scores.get(i_agent).copied().unwrap_or(0)
    }
}
