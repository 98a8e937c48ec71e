use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::num::Saturating;
use std::time::Duration;
use web_time::Instant;

use crate::*;

pub use generator::*;
pub use layout::*;

mod generator;
mod layout;

/// Player-visible state of one board cell.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellState {
    Hidden,
    Revealed(u8),
    Flagged,
}

impl CellState {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed(_))
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::Hidden
    }
}

/// Valid transitions:
/// - InProgress -> Won
/// - InProgress -> Lost
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameState {
    InProgress,
    Won,
    Lost,
}

impl GameState {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::InProgress
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FlagOutcome {
    NoChange,
    Changed,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MinefieldEngine {
    layout: MineLayout,
    board: Array2<CellState>,
    revealed_count: Saturating<CellCount>,
    flagged_count: Saturating<CellCount>,
    state: GameState,
    triggered_mine: Option<Coord2>,
    started_at: Instant,
}

impl MinefieldEngine {
    pub fn new(layout: MineLayout) -> Self {
        let size = layout.size();
        Self {
            layout,
            board: Array2::default(size.to_nd_index()),
            revealed_count: Saturating(0),
            flagged_count: Saturating(0),
            state: Default::default(),
            triggered_mine: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_difficulty(difficulty: Difficulty, seed: u64) -> Self {
        Self::new(RandomMinefieldGenerator::new(seed).generate(difficulty.config()))
    }

    pub fn reveal(&mut self, coords: Coord2) -> RevealOutcome {
        let Ok(coords) = self.layout.validate_coords(coords) else {
            return RevealOutcome::NoChange;
        };

        if self.state.is_finished() {
            return RevealOutcome::NoChange;
        }

        match self.board[coords.to_nd_index()] {
            CellState::Hidden => self.reveal_hidden(coords),
            CellState::Revealed(_) | CellState::Flagged => RevealOutcome::NoChange,
        }
    }

    fn reveal_hidden(&mut self, coords: Coord2) -> RevealOutcome {
        if self.layout.contains_mine(coords) {
            self.triggered_mine = Some(coords);
            self.state = GameState::Lost;
            log::debug!("mine hit at {:?}", coords);
            return RevealOutcome::HitMine;
        }

        self.open_cell(coords);
        if self.layout.adjacent_mine_count(coords) == 0 {
            self.flood_fill(coords);
        }

        if self.revealed_count == Saturating(self.layout.safe_cell_count()) {
            self.state = GameState::Won;
            log::debug!("all safe cells revealed, elapsed {:?}", self.elapsed());
            RevealOutcome::Won
        } else {
            RevealOutcome::Revealed
        }
    }

    fn open_cell(&mut self, coords: Coord2) {
        let adjacent_mines = self.layout.adjacent_mine_count(coords);
        self.board[coords.to_nd_index()] = CellState::Revealed(adjacent_mines);
        self.revealed_count += 1;
    }

    fn flood_fill(&mut self, start: Coord2) {
        let mut visited = HashSet::from([start]);
        let mut to_visit: VecDeque<_> = self
            .layout
            .iter_neighbors(start)
            .filter(|&pos| matches!(self.board[pos.to_nd_index()], CellState::Hidden))
            .collect();
        log::trace!("flood fill from {:?}, frontier {:?}", start, to_visit);

        while let Some(visit_coords) = to_visit.pop_front() {
            if !visited.insert(visit_coords) {
                continue;
            }

            // flagged cells stay put, revealed cells are already counted
            if !matches!(self.board[visit_coords.to_nd_index()], CellState::Hidden) {
                continue;
            }

            self.open_cell(visit_coords);

            if self.layout.adjacent_mine_count(visit_coords) == 0 {
                to_visit.extend(
                    self.layout
                        .iter_neighbors(visit_coords)
                        .filter(|&pos| matches!(self.board[pos.to_nd_index()], CellState::Hidden))
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> FlagOutcome {
        let Ok(coords) = self.layout.validate_coords(coords) else {
            return FlagOutcome::NoChange;
        };

        if self.state.is_finished() {
            return FlagOutcome::NoChange;
        }

        match self.board[coords.to_nd_index()] {
            CellState::Hidden => {
                self.board[coords.to_nd_index()] = CellState::Flagged;
                self.flagged_count += 1;
                FlagOutcome::Changed
            }
            CellState::Flagged => {
                self.board[coords.to_nd_index()] = CellState::Hidden;
                self.flagged_count -= 1;
                FlagOutcome::Changed
            }
            CellState::Revealed(_) => FlagOutcome::NoChange,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn has_won(&self) -> bool {
        matches!(self.state, GameState::Won)
    }

    pub fn size(&self) -> Coord2 {
        self.layout.size()
    }

    pub fn total_mines(&self) -> CellCount {
        self.layout.mine_count()
    }

    /// How many mines have not been flagged yet, negative when over-flagged.
    pub fn mines_left(&self) -> isize {
        (self.layout.mine_count() as isize) - (self.flagged_count.0 as isize)
    }

    pub fn flag_count(&self) -> CellCount {
        self.flagged_count.0
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count.0
    }

    pub fn cell_at(&self, coords: Coord2) -> CellState {
        self.board[coords.to_nd_index()]
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.layout.contains_mine(coords)
    }

    /// Adjacency for end-of-game disclosure of still-hidden cells. Not
    /// meaningful for mine cells.
    pub fn adjacent_mines_at(&self, coords: Coord2) -> u8 {
        self.layout.adjacent_mine_count(coords)
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    /// Wall-clock time since the engine was constructed.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> MineLayout {
        MineLayout::from_mine_coords(size, mines).unwrap()
    }

    #[test]
    fn reveal_hits_mine_and_sets_triggered_cell() {
        let mut engine = MinefieldEngine::new(layout((2, 2), &[(0, 0)]));

        let outcome = engine.reveal((0, 0));

        assert_eq!(outcome, RevealOutcome::HitMine);
        assert_eq!(engine.state(), GameState::Lost);
        assert_eq!(engine.triggered_mine(), Some((0, 0)));
        assert_eq!(engine.revealed_count(), 0);
        assert!(engine.is_finished());
        assert!(!engine.has_won());
    }

    #[test]
    fn reveal_flood_fill_opens_zero_region() {
        let mut engine = MinefieldEngine::new(layout((3, 3), &[(2, 2)]));

        let outcome = engine.reveal((0, 0));

        assert_eq!(outcome, RevealOutcome::Won);
        assert_eq!(engine.cell_at((0, 0)), CellState::Revealed(0));
        assert_eq!(engine.cell_at((1, 1)), CellState::Revealed(1));
        assert_eq!(engine.cell_at((2, 2)), CellState::Hidden);
        for x in 0..3 {
            for y in 0..3 {
                assert_eq!(engine.cell_at((x, y)).is_revealed(), (x, y) != (2, 2));
            }
        }
        assert_eq!(engine.revealed_count(), 8);
        assert!(engine.has_won());
    }

    #[test]
    fn winning_board_transitions_to_won_state() {
        let mut engine = MinefieldEngine::new(layout((2, 1), &[(0, 0)]));

        assert_eq!(engine.reveal((1, 0)), RevealOutcome::Won);
        assert_eq!(engine.state(), GameState::Won);
        assert!(engine.is_finished());
    }

    #[test]
    fn flood_fill_leaves_flagged_cells_alone() {
        let mut engine = MinefieldEngine::new(layout((3, 3), &[(2, 2)]));
        engine.toggle_flag((1, 1));

        let outcome = engine.reveal((0, 0));

        assert_eq!(outcome, RevealOutcome::Revealed);
        assert_eq!(engine.cell_at((1, 1)), CellState::Flagged);
        assert_eq!(engine.revealed_count(), 7);
        assert_eq!(engine.state(), GameState::InProgress);

        engine.toggle_flag((1, 1));
        assert_eq!(engine.reveal((1, 1)), RevealOutcome::Won);
    }

    #[test]
    fn strip_is_won_in_two_reveals() {
        let mut engine = MinefieldEngine::new(layout((5, 1), &[(2, 0)]));

        assert_eq!(engine.reveal((0, 0)), RevealOutcome::Revealed);
        assert_eq!(engine.cell_at((1, 0)), CellState::Revealed(1));
        assert_eq!(engine.revealed_count(), 2);

        assert_eq!(engine.reveal((4, 0)), RevealOutcome::Won);
        assert_eq!(engine.cell_at((3, 0)), CellState::Revealed(1));
        assert_eq!(engine.revealed_count(), 4);
    }

    #[test]
    fn toggle_flag_roundtrip_updates_counts() {
        let mut engine = MinefieldEngine::new(layout((2, 2), &[(0, 0)]));

        assert_eq!(engine.toggle_flag((1, 1)), FlagOutcome::Changed);
        assert_eq!(engine.flag_count(), 1);
        assert_eq!(engine.mines_left(), 0);

        assert_eq!(engine.toggle_flag((1, 1)), FlagOutcome::Changed);
        assert_eq!(engine.flag_count(), 0);
        assert_eq!(engine.mines_left(), 1);
        assert_eq!(engine.cell_at((1, 1)), CellState::Hidden);
    }

    #[test]
    fn flagged_mine_cannot_be_revealed() {
        let mut engine = MinefieldEngine::new(layout((2, 2), &[(0, 0)]));
        engine.toggle_flag((0, 0));

        assert_eq!(engine.reveal((0, 0)), RevealOutcome::NoChange);
        assert!(!engine.cell_at((0, 0)).is_revealed());
        assert_eq!(engine.state(), GameState::InProgress);
        assert_eq!(engine.triggered_mine(), None);
    }

    #[test]
    fn revealed_cell_cannot_be_flagged_or_reopened() {
        let mut engine = MinefieldEngine::new(layout((3, 3), &[(0, 0), (2, 0)]));

        assert_eq!(engine.reveal((1, 2)), RevealOutcome::Revealed);
        assert_eq!(engine.cell_at((1, 1)), CellState::Revealed(2));

        assert_eq!(engine.toggle_flag((1, 1)), FlagOutcome::NoChange);
        assert_eq!(engine.flag_count(), 0);
        assert_eq!(engine.reveal((1, 1)), RevealOutcome::NoChange);

        assert_eq!(engine.reveal((1, 0)), RevealOutcome::Won);
    }

    #[test]
    fn finished_game_ignores_further_input() {
        let mut engine = MinefieldEngine::new(layout((2, 2), &[(0, 0)]));
        assert_eq!(engine.reveal((0, 0)), RevealOutcome::HitMine);

        assert_eq!(engine.reveal((1, 1)), RevealOutcome::NoChange);
        assert_eq!(engine.toggle_flag((1, 0)), FlagOutcome::NoChange);
        assert_eq!(engine.cell_at((1, 1)), CellState::Hidden);
        assert_eq!(engine.revealed_count(), 0);
        assert_eq!(engine.flag_count(), 0);
    }

    #[test]
    fn out_of_range_input_is_a_no_op() {
        let mut engine = MinefieldEngine::new(layout((3, 3), &[(1, 1)]));

        assert_eq!(engine.reveal((5, 5)), RevealOutcome::NoChange);
        assert_eq!(engine.toggle_flag((0, 9)), FlagOutcome::NoChange);
        assert_eq!(engine.state(), GameState::InProgress);
        assert_eq!(engine.revealed_count(), 0);
    }

    #[test]
    fn only_no_change_reports_no_update() {
        assert!(!RevealOutcome::NoChange.has_update());
        assert!(RevealOutcome::Revealed.has_update());
        assert!(RevealOutcome::HitMine.has_update());
        assert!(RevealOutcome::Won.has_update());

        assert!(!FlagOutcome::NoChange.has_update());
        assert!(FlagOutcome::Changed.has_update());
    }

    #[test]
    fn mines_left_goes_negative_when_over_flagged() {
        let mut engine = MinefieldEngine::new(layout((2, 2), &[(0, 0)]));

        engine.toggle_flag((0, 1));
        engine.toggle_flag((1, 0));
        engine.toggle_flag((1, 1));

        assert_eq!(engine.mines_left(), -2);
    }

    #[test]
    fn elapsed_never_runs_backwards() {
        let engine = MinefieldEngine::new(layout((2, 2), &[(0, 0)]));

        let first = engine.elapsed();
        let second = engine.elapsed();

        assert!(second >= first);
    }

    #[test]
    fn with_difficulty_builds_the_preset_board() {
        let engine = MinefieldEngine::with_difficulty(Difficulty::Easy, 7);

        assert_eq!(engine.size(), (9, 9));
        assert_eq!(engine.total_mines(), 10);
        assert_eq!(engine.state(), GameState::InProgress);
        assert_eq!(engine.revealed_count(), 0);

        let mut mines = 0;
        for x in 0..9 {
            for y in 0..9 {
                if engine.has_mine_at((x, y)) {
                    mines += 1;
                }
            }
        }
        assert_eq!(mines, 10);
    }
}
