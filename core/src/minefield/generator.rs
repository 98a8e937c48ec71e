use ndarray::Array2;

use crate::*;

/// Strategy for placing mines on a fresh board.
pub trait MinefieldGenerator {
    fn generate(self, config: GameConfig) -> MineLayout;
}

/// Uniform random placement from a fixed seed. The same seed and config
/// always produce the same layout.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RandomMinefieldGenerator {
    seed: u64,
}

impl RandomMinefieldGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl MinefieldGenerator for RandomMinefieldGenerator {
    fn generate(self, config: GameConfig) -> MineLayout {
        use rand::prelude::*;

        let total_cells = config.total_cells();

        // full boards skip sampling, which also keeps the loop below finite
        if config.mines >= total_cells {
            if config.mines > total_cells {
                log::warn!(
                    "requested {} mines but the board only fits {}",
                    config.mines,
                    total_cells
                );
            }
            return MineLayout::from_mine_mask(Array2::from_elem(config.size.to_nd_index(), true));
        }

        let (size_x, size_y) = config.size;
        let mut mine_mask: Array2<bool> = Array2::default(config.size.to_nd_index());
        let mut placed: CellCount = 0;

        let mut rng = SmallRng::seed_from_u64(self.seed);
        while placed < config.mines {
            let coords: Coord2 = (rng.random_range(0..size_x), rng.random_range(0..size_y));
            if !mine_mask[coords.to_nd_index()] {
                mine_mask[coords.to_nd_index()] = true;
                placed += 1;
            }
        }

        log::debug!("placed {} mines on a {}x{} board", placed, size_x, size_y);
        MineLayout::from_mine_mask(mine_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_mines(layout: &MineLayout) -> usize {
        let (size_x, size_y) = layout.size();
        let mut count = 0;
        for x in 0..size_x {
            for y in 0..size_y {
                if layout.contains_mine((x, y)) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn places_exactly_the_requested_mine_count() {
        for difficulty in Difficulty::ALL {
            let config = difficulty.config();
            let layout = RandomMinefieldGenerator::new(42).generate(config);

            assert_eq!(layout.game_config(), config);
            assert_eq!(count_mines(&layout), usize::from(config.mines));
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_layout() {
        let config = Difficulty::Medium.config();

        let a = RandomMinefieldGenerator::new(7).generate(config);
        let b = RandomMinefieldGenerator::new(7).generate(config);

        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_layouts() {
        let config = Difficulty::Hard.config();

        let a = RandomMinefieldGenerator::new(1).generate(config);
        let b = RandomMinefieldGenerator::new(2).generate(config);

        assert_ne!(a, b);
    }

    #[test]
    fn overfull_request_mines_every_cell() {
        let layout =
            RandomMinefieldGenerator::new(0).generate(GameConfig::new_unchecked((3, 2), 9));

        assert_eq!(count_mines(&layout), 6);
        assert_eq!(layout.mine_count(), 6);
    }
}
