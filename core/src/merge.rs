use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::*;

/// Value stored in one grid cell, `0` for empty.
pub type TileValue = u32;

const SIDE: usize = 4;
const TARGET_TILE: TileValue = 2048;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ShiftOutcome {
    NoChange,
    Shifted,
}

impl ShiftOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Shifted => true,
        }
    }
}

/// Sliding-merge puzzle over a fixed 4x4 grid.
#[derive(Clone, Debug)]
pub struct MergeEngine {
    grid: Array2<TileValue>,
    score: u32,
    won: bool,
    finished: bool,
    rng: SmallRng,
}

impl MergeEngine {
    pub fn new(seed: u64) -> Self {
        let mut engine = Self {
            grid: Array2::default((SIDE, SIDE)),
            score: 0,
            won: false,
            finished: false,
            rng: SmallRng::seed_from_u64(seed),
        };
        engine.spawn_tile();
        engine.spawn_tile();
        engine
    }

    pub fn from_grid(grid: Array2<TileValue>, seed: u64) -> Result<Self> {
        if grid.dim() != (SIDE, SIDE) {
            return Err(GameError::InvalidBoardShape);
        }
        if grid
            .iter()
            .any(|&value| value != 0 && (value < 2 || !value.is_power_of_two()))
        {
            return Err(GameError::InvalidTileValue);
        }

        let mut engine = Self {
            grid,
            score: 0,
            won: false,
            finished: false,
            rng: SmallRng::seed_from_u64(seed),
        };
        engine.finished = engine.no_moves_left();
        Ok(engine)
    }

    /// Clears the board and deals a fresh pair of starting tiles. The random
    /// stream continues rather than restarting.
    pub fn reset(&mut self) {
        self.grid.fill(0);
        self.score = 0;
        self.won = false;
        self.finished = false;
        self.spawn_tile();
        self.spawn_tile();
    }

    pub fn shift(&mut self, direction: Direction) -> ShiftOutcome {
        if self.finished {
            return ShiftOutcome::NoChange;
        }

        let mut changed = false;
        for lane in 0..SIDE {
            let coords = lane_coords(direction, lane);
            let before = coords.map(|index| self.grid[index]);
            let after = self.merge_lane(before);
            if after == before {
                continue;
            }
            changed = true;
            for (index, value) in coords.into_iter().zip(after) {
                self.grid[index] = value;
            }
        }

        if !changed {
            return ShiftOutcome::NoChange;
        }

        self.spawn_tile();
        self.finished = self.no_moves_left();
        if self.finished {
            log::debug!("no moves left, final score {}", self.score);
        }
        ShiftOutcome::Shifted
    }

    /// Compacts and merges one lane in travel order. Equal adjacent values
    /// combine once per pass, earliest pair first.
    fn merge_lane(&mut self, lane: [TileValue; SIDE]) -> [TileValue; SIDE] {
        let dense: Vec<TileValue> = lane.into_iter().filter(|&value| value != 0).collect();
        let mut merged = [0; SIDE];
        let mut read = 0;
        let mut write = 0;

        while read < dense.len() {
            let value = dense[read];
            if read + 1 < dense.len() && dense[read + 1] == value {
                merged[write] = value * 2;
                self.score += value * 2;
                if value * 2 == TARGET_TILE && !self.won {
                    self.won = true;
                    log::debug!("target tile reached, score {}", self.score);
                }
                read += 2;
            } else {
                merged[write] = value;
                read += 1;
            }
            write += 1;
        }

        merged
    }

    /// Places a `2` (or, one time in ten, a `4`) on a uniformly chosen empty
    /// cell. A full grid spawns nothing.
    fn spawn_tile(&mut self) {
        let empty: Vec<[usize; 2]> = self
            .grid
            .indexed_iter()
            .filter(|&(_, &value)| value == 0)
            .map(|((x, y), _)| [x, y])
            .collect();

        if empty.is_empty() {
            return;
        }

        let slot = empty[self.rng.random_range(0..empty.len())];
        let value = if self.rng.random::<f32>() < 0.9 { 2 } else { 4 };
        self.grid[slot] = value;
        log::trace!("spawned {} at {:?}", value, slot);
    }

    fn no_moves_left(&self) -> bool {
        for ((x, y), &value) in self.grid.indexed_iter() {
            if value == 0 {
                return false;
            }
            if x + 1 < SIDE && self.grid[[x + 1, y]] == value {
                return false;
            }
            if y + 1 < SIDE && self.grid[[x, y + 1]] == value {
                return false;
            }
        }
        true
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.grid.dim();
        (dim.0.try_into().unwrap(), dim.1.try_into().unwrap())
    }

    pub fn tile_at(&self, coords: Coord2) -> TileValue {
        self.grid[coords.to_nd_index()]
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn has_won(&self) -> bool {
        self.won
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn empty_count(&self) -> usize {
        self.grid.iter().filter(|&&value| value == 0).count()
    }
}

/// Cell indices of one row or column, ordered so that index 0 is the edge
/// tiles slide toward.
fn lane_coords(direction: Direction, lane: usize) -> [[usize; 2]; SIDE] {
    let mut coords = [[0; 2]; SIDE];
    for (step, slot) in coords.iter_mut().enumerate() {
        *slot = match direction {
            Direction::Left => [step, lane],
            Direction::Right => [SIDE - 1 - step, lane],
            Direction::Up => [lane, step],
            Direction::Down => [lane, SIDE - 1 - step],
        };
    }
    coords
}
