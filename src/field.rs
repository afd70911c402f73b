//! Canonical occupancy grid.

use crate::types::{GridSize, Spot};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Cells owned by one agent, identified by its spawn spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Trail {
    start: Spot,
    current: Spot,
    cells: Vec<usize>,
}

/// Occupancy arena shared by all agents of a match.
///
/// Cells live in a flat `visited` array indexed by [`GridSize::index`];
/// each agent owns the indices of its trail. A cell is owned by at most one
/// agent, so killing an agent can hand all of its cells back to the free pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleField {
    size: GridSize,
    visited: Vec<bool>,
    agents: Vec<Trail>,
    n_available: usize,
}

impl BattleField {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            visited: vec![false; size.n_cells()],
            agents: Vec::new(),
            n_available: size.n_cells(),
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Number of unvisited cells.
    pub fn n_available(&self) -> usize {
        self.n_available
    }

    /// Check whether `spot` is in bounds and not part of any trail.
    pub fn is_available(&self, spot: Spot) -> bool {
        self.size.index(spot).is_some_and(|idx| !self.visited[idx])
    }

    pub fn has_agent(&self, start: Spot) -> bool {
        self.agents.iter().any(|trail| trail.start == start)
    }

    pub fn current(&self, agent: Spot) -> Result<Spot> {
        Ok(self.trail(agent)?.current)
    }

    /// Register an agent that spawned at `start` and now stands at `current`.
    pub fn add_agent_at(&mut self, start: Spot, current: Spot) -> Result<()> {
        if start != current && !start.is_adjacent(current) {
            bail!("current spot {current} is not adjacent to start spot {start}");
        }
        if self.has_agent(start) {
            bail!("agent already exists at {start}");
        }

        let mut cells = Vec::with_capacity(2);
        for spot in [start, current] {
            let idx = self.size.index(spot).with_context(|| format!("{spot} is out of bounds"))?;
            if self.visited[idx] && !cells.contains(&idx) {
                bail!("{spot} is already visited");
            }
            if !cells.contains(&idx) {
                cells.push(idx);
            }
        }

        for &idx in &cells {
            self.visited[idx] = true;
        }
        self.n_available -= cells.len();
        self.agents.push(Trail {
            start,
            current,
            cells,
        });
        Ok(())
    }

    /// Advance an agent to an adjacent unvisited spot.
    pub fn move_to(&mut self, agent: Spot, next: Spot) -> Result<()> {
        let size = self.size;
        let current = self.trail(agent)?.current;
        if !current.is_adjacent(next) {
            bail!("{next} is not adjacent to current spot {current} of agent {agent}");
        }
        let idx = size.index(next).with_context(|| format!("{next} is out of bounds"))?;
        if self.visited[idx] {
            bail!("{next} is already visited");
        }

        self.visited[idx] = true;
        self.n_available -= 1;
        let trail = self.trail_mut(agent)?;
        trail.current = next;
        trail.cells.push(idx);
        Ok(())
    }

    /// Remove agents and release every cell of their trails.
    pub fn kill_agents(&mut self, agents: &[Spot]) -> Result<()> {
        for &agent in agents {
            let pos = self
                .agents
                .iter()
                .position(|trail| trail.start == agent)
                .with_context(|| format!("unknown agent {agent}"))?;
            let trail = self.agents.remove(pos);
            for &idx in &trail.cells {
                self.visited[idx] = false;
            }
            self.n_available += trail.cells.len();
        }
        Ok(())
    }

    /// Frozen deep copy for rollouts and initial-state references.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }

    fn trail(&self, agent: Spot) -> Result<&Trail> {
        self.agents
            .iter()
            .find(|trail| trail.start == agent)
            .with_context(|| format!("unknown agent {agent}"))
    }

    fn trail_mut(&mut self, agent: Spot) -> Result<&mut Trail> {
        self.agents
            .iter_mut()
            .find(|trail| trail.start == agent)
            .with_context(|| format!("unknown agent {agent}"))
    }
}

/// Read-only copy of a [`BattleField`].
///
/// Only `&self` methods are reachable, so later writes to the canonical field
/// can never be observed through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot(BattleField);

impl Deref for Snapshot {
    type Target = BattleField;

    fn deref(&self) -> &BattleField {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_agent_requires_adjacent_spots() {
        let mut field = BattleField::new(GridSize::TRON);
        assert!(field.add_agent_at(Spot::new(0, 0), Spot::new(2, 0)).is_err());
        assert!(field.add_agent_at(Spot::new(0, 0), Spot::new(1, 1)).is_err());
        field.add_agent_at(Spot::new(0, 0), Spot::new(0, 1)).unwrap();
        assert_eq!(field.n_available(), 598);
        assert!(field.add_agent_at(Spot::new(0, 0), Spot::new(0, 0)).is_err());
    }

    #[test]
    fn add_agent_rejects_visited_cells() {
        let mut field = BattleField::new(GridSize::TRON);
        field.add_agent_at(Spot::new(3, 3), Spot::new(3, 3)).unwrap();
        assert!(field.add_agent_at(Spot::new(3, 4), Spot::new(3, 3)).is_err());
        assert_eq!(field.n_available(), 599);
    }

    #[test]
    fn move_to_tracks_trail() {
        let mut field = BattleField::new(GridSize::TRON);
        let agent = Spot::new(10, 10);
        field.add_agent_at(agent, agent).unwrap();
        field.move_to(agent, Spot::new(11, 10)).unwrap();
        field.move_to(agent, Spot::new(11, 11)).unwrap();

        assert_eq!(field.current(agent).unwrap(), Spot::new(11, 11));
        assert_eq!(field.trail(agent).unwrap().cells.len(), 3);
        assert_eq!(field.n_available(), 597);
        assert!(!field.is_available(Spot::new(11, 10)));

        assert!(field.move_to(agent, Spot::new(13, 11)).is_err());
        assert!(field.move_to(agent, Spot::new(11, 10)).is_err());
        assert!(field.move_to(Spot::new(0, 0), Spot::new(0, 1)).is_err());
    }

    #[test]
    fn killing_all_agents_restores_every_cell() {
        let mut field = BattleField::new(GridSize::TRON);
        let a = Spot::new(1, 1);
        let b = Spot::new(20, 5);
        field.add_agent_at(a, a).unwrap();
        field.add_agent_at(b, b).unwrap();
        for x in 2..8 {
            field.move_to(a, Spot::new(x, 1)).unwrap();
        }
        field.move_to(b, Spot::new(20, 6)).unwrap();

        field.kill_agents(&[a]).unwrap();
        assert_eq!(field.n_available(), 600 - 2);
        assert!(field.is_available(Spot::new(4, 1)));
        assert!(field.current(a).is_err());

        field.kill_agents(&[b]).unwrap();
        assert_eq!(field.n_available(), 600);
        assert!(field.kill_agents(&[b]).is_err());
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let mut field = BattleField::new(GridSize::TRON);
        let agent = Spot::new(5, 5);
        field.add_agent_at(agent, agent).unwrap();
        let snapshot = field.snapshot();

        field.move_to(agent, Spot::new(5, 6)).unwrap();
        assert_eq!(snapshot.current(agent).unwrap(), agent);
        assert!(snapshot.is_available(Spot::new(5, 6)));
        assert_eq!(snapshot.n_available(), 599);
    }
}
