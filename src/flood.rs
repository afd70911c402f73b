//! Reachable-area flood fill.

use crate::types::{GridSize, Spot};

/// Count cells reachable from `seed` through 4-connected free cells.
///
/// The seed itself is always expanded, even when occupied, and counted once;
/// if it fails `is_free` that count is taken back at the end.
pub fn area<F>(is_free: F, size: GridSize, seed: Spot) -> usize
where
    F: Fn(Spot) -> bool,
{
    let Some(seed_idx) = size.index(seed) else {
        return 0;
    };

    let mut marked = vec![false; size.n_cells()];
    let mut stack = Vec::with_capacity(size.n_cells());
    marked[seed_idx] = true;
    stack.push(seed);

    let mut count = 0;
    while let Some(spot) = stack.pop() {
        count += 1;
        for next in spot.neighbours() {
            let Some(idx) = size.index(next) else {
                continue;
            };
            if marked[idx] || !is_free(next) {
                continue;
            }
            marked[idx] = true;
            stack.push(next);
        }
    }

    if !is_free(seed) {
        count -= 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupied_corner_seed_is_excluded() {
        let size = GridSize::new(10, 10);
        let seed = Spot::new(0, 0);
        assert_eq!(area(|spot| spot != seed, size, seed), 99);
    }

    #[test]
    fn free_seed_is_counted() {
        let size = GridSize::new(10, 10);
        assert_eq!(area(|_| true, size, Spot::new(4, 7)), 100);
    }

    #[test]
    fn boxed_in_unavailable_seed_is_zero() {
        let size = GridSize::new(10, 10);
        assert_eq!(area(|_| false, size, Spot::new(3, 3)), 0);
    }

    #[test]
    fn walls_split_regions() {
        let size = GridSize::new(10, 10);
        let wall = |spot: Spot| spot.x != 4;
        assert_eq!(area(wall, size, Spot::new(0, 0)), 40);
        assert_eq!(area(wall, size, Spot::new(9, 9)), 50);
    }

    #[test]
    fn out_of_bounds_seed_is_zero() {
        assert_eq!(area(|_| true, GridSize::new(5, 5), Spot::new(-1, 0)), 0);
    }
}
