//! Per-round integer stream exchanged with agents.
//!
//! Field order: `agent_count, this_index`, then for every agent
//! `start.x, start.y, current.x, current.y`. Eliminated agents are sent
//! as four `-1` values.

use crate::field::BattleField;
use crate::types::{GridSize, Spot};
use anyhow::{Context, Result, bail};
use std::collections::VecDeque;
use std::io::BufRead;

const MAX_AGENTS: i32 = 8;

/// Integers supplied to an agent for one decision.
pub struct InputStream {
    vals: VecDeque<i32>,
}

impl InputStream {
    pub fn new(vals: Vec<i32>) -> Self {
        Self { vals: vals.into() }
    }

    pub fn next_int(&mut self) -> Result<i32> {
        self.vals
            .pop_front()
            .context("requested more input than was supplied")
    }

    fn next_spot(&mut self) -> Result<Spot> {
        let x = self.next_int()?;
        let y = self.next_int()?;
        Ok(Spot::new(x, y))
    }
}

/// Position report for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentInput {
    pub start: Spot,
    pub current: Spot,
}

impl AgentInput {
    pub const ELIMINATED: AgentInput = AgentInput {
        start: Spot::new(-1, -1),
        current: Spot::new(-1, -1),
    };

    pub fn is_eliminated(&self) -> bool {
        self.start.x < 0 || self.current.x < 0
    }
}

/// Decoded input of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundInput {
    pub this_index: usize,
    pub agents: Vec<AgentInput>,
}

impl RoundInput {
    pub fn read(stream: &mut InputStream) -> Result<Self> {
        let n_agents = stream.next_int().context("failed to read agent count")?;
        if !(1..=MAX_AGENTS).contains(&n_agents) {
            bail!("agent count must be in 1..={MAX_AGENTS}, but is {n_agents}");
        }
        let this_index = stream.next_int().context("failed to read agent index")?;
        if !(0..n_agents).contains(&this_index) {
            bail!("agent index {this_index} is out of range for {n_agents} agents");
        }

        let mut agents = Vec::with_capacity(n_agents as usize);
        for i_agent in 0..n_agents {
            let start = stream
                .next_spot()
                .with_context(|| format!("failed to read start of agent {i_agent}"))?;
            let current = stream
                .next_spot()
                .with_context(|| format!("failed to read position of agent {i_agent}"))?;
            agents.push(AgentInput { start, current });
        }

        Ok(Self {
            this_index: this_index as usize,
            agents,
        })
    }

    pub fn encode(&self) -> Vec<i32> {
        let mut vals = Vec::with_capacity(2 + 4 * self.agents.len());
        vals.push(self.agents.len() as i32);
        vals.push(self.this_index as i32);
        for agent in &self.agents {
            vals.extend([agent.start.x, agent.start.y, agent.current.x, agent.current.y]);
        }
        vals
    }

    /// Spawn spot identifying the receiving agent.
    pub fn me(&self) -> Spot {
        self.agents[self.this_index].start
    }
}

/// Agent-side copy of the battlefield, rebuilt from round inputs.
pub struct FieldMirror {
    field: BattleField,
    starts: Vec<Option<Spot>>,
}

impl FieldMirror {
    pub fn new(size: GridSize) -> Self {
        Self {
            field: BattleField::new(size),
            starts: Vec::new(),
        }
    }

    pub fn field(&self) -> &BattleField {
        &self.field
    }

    /// Apply the positions reported in `round`.
    pub fn update(&mut self, round: &RoundInput) -> Result<()> {
        if self.starts.len() < round.agents.len() {
            self.starts.resize(round.agents.len(), None);
        }

        for (i_agent, agent) in round.agents.iter().enumerate() {
            if agent.is_eliminated() {
                if let Some(start) = self.starts[i_agent].take() {
                    self.field
                        .kill_agents(&[start])
                        .with_context(|| format!("failed to remove agent {i_agent}"))?;
                }
                continue;
            }

            if self.field.has_agent(agent.start) {
                if self.field.current(agent.start)? != agent.current {
                    self.field
                        .move_to(agent.start, agent.current)
                        .with_context(|| format!("failed to move agent {i_agent}"))?;
                }
            } else {
                self.field
                    .add_agent_at(agent.start, agent.current)
                    .with_context(|| format!("failed to add agent {i_agent}"))?;
                self.starts[i_agent] = Some(agent.start);
            }
        }

        Ok(())
    }
}

/// Read one judge round: a line `N P` followed by `N` lines `X0 Y0 X1 Y1`.
///
/// Returns `None` once the input is exhausted.
pub fn read_judge_round<R: BufRead>(reader: &mut R) -> Result<Option<Vec<i32>>> {
    let Some(header) = read_ints(reader).context("failed to read round header")? else {
        return Ok(None);
    };
    if header.len() != 2 {
        bail!("round header must have 2 values, but has {}", header.len());
    }

    let mut vals = header;
    for i_agent in 0..vals[0].max(0) {
        let line = read_ints(reader)
            .with_context(|| format!("failed to read agent line {i_agent}"))?
            .with_context(|| format!("input ended before agent line {i_agent}"))?;
        if line.len() != 4 {
            bail!("agent line must have 4 values, but has {}", line.len());
        }
        vals.extend(line);
    }
    Ok(Some(vals))
}

fn read_ints<R: BufRead>(reader: &mut R) -> Result<Option<Vec<i32>>> {
    let mut line = String::new();
    if reader.read_line(&mut line).context("failed to read line")? == 0 {
        return Ok(None);
    }
    let vals = line
        .split_whitespace()
        .map(|token| {
            token
                .parse::<i32>()
                .with_context(|| format!("invalid integer {token:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(vals))
}
