//! Relaxed rollout over a frozen snapshot.

use crate::field::Snapshot;
use crate::types::{Action, GridSize, Spot};

/// Scratch simulation used to score candidate move sequences.
///
/// Moves are recorded in a private overlay, so the snapshot is never touched.
/// A failed step leaves the agent where it was and the rollout carries on.
pub struct Simulator<'a> {
    snapshot: &'a Snapshot,
    overlay: Vec<bool>,
    moved: Vec<(Spot, Spot)>,
    n_available: usize,
}

impl<'a> Simulator<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            overlay: vec![false; snapshot.size().n_cells()],
            moved: Vec::new(),
            n_available: snapshot.n_available(),
        }
    }

    pub fn size(&self) -> GridSize {
        self.snapshot.size()
    }

    pub fn n_available(&self) -> usize {
        self.n_available
    }

    /// Check whether `spot` is in bounds and unvisited in both the snapshot and the overlay.
    pub fn is_available(&self, spot: Spot) -> bool {
        match self.size().index(spot) {
            Some(idx) => !self.overlay[idx] && self.snapshot.is_available(spot),
            None => false,
        }
    }

    /// Position of an agent after the steps performed so far.
    pub fn current(&self, agent: Spot) -> Option<Spot> {
        self.moved
            .iter()
            .find(|(start, _)| *start == agent)
            .map(|&(_, current)| current)
            .or_else(|| self.snapshot.current(agent).ok())
    }

    /// Try one step; returns `false` and changes nothing if the target is blocked.
    pub fn perform(&mut self, agent: Spot, action: Action) -> bool {
        let Some(current) = self.current(agent) else {
            return false;
        };
        let next = current.next(action);
        if !self.is_available(next) {
            return false;
        }
        let Some(idx) = self.size().index(next) else {
            return false;
        };

        self.overlay[idx] = true;
        self.n_available -= 1;
        match self.moved.iter_mut().find(|(start, _)| *start == agent) {
            Some(entry) => entry.1 = next,
            None => self.moved.push((agent, next)),
        }
        true
    }
}
