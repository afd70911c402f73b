//! Grid data types.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer grid coordinate.
///
/// Coordinates may lie outside the grid (e.g. after moving off a border);
/// use [`GridSize::contains`] to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Spot {
    pub x: i32,
    pub y: i32,
}

impl Spot {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Spot reached by taking `action` from this spot.
    pub fn next(self, action: Action) -> Self {
        match action {
            Action::Up => Self::new(self.x, self.y - 1),
            Action::Down => Self::new(self.x, self.y + 1),
            Action::Left => Self::new(self.x - 1, self.y),
            Action::Right => Self::new(self.x + 1, self.y),
        }
    }

    /// Check whether `other` is one of the four orthogonal neighbours.
    pub fn is_adjacent(self, other: Spot) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }

    pub fn neighbours(self) -> [Spot; 4] {
        Action::ALL.map(|action| self.next(action))
    }
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Move token exchanged with agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Draw an action uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn token(self) -> &'static str {
        match self {
            Action::Up => "UP",
            Action::Down => "DOWN",
            Action::Left => "LEFT",
            Action::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Grid bounds: valid spots satisfy `0 <= x < max_x` and `0 <= y < max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub max_x: i32,
    pub max_y: i32,
}

impl GridSize {
    /// Standard light-cycle board.
    pub const TRON: GridSize = GridSize::new(30, 20);

    pub const fn new(max_x: i32, max_y: i32) -> Self {
        Self { max_x, max_y }
    }

    pub fn contains(&self, spot: Spot) -> bool {
        (0..self.max_x).contains(&spot.x) && (0..self.max_y).contains(&spot.y)
    }

    pub fn n_cells(&self) -> usize {
        (self.max_x * self.max_y) as usize
    }

    /// Linear index of an in-bounds spot.
    pub fn index(&self, spot: Spot) -> Option<usize> {
        if !self.contains(spot) {
            return None;
        }
        Some((spot.y * self.max_x + spot.x) as usize)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::TRON
    }
}
