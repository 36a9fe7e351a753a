//! Portfolio ledger for the current round.

use sim_core::{Position, Sector, Startup};
use sim_econ::shocked;

/// Ordered positions taken during the current round.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    positions: Vec<Position>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position. Names are not deduplicated.
    pub fn add_position(&mut self, startup: Startup, invested_amount: i64) -> &Position {
        self.positions.push(Position::new(startup, invested_amount));
        &self.positions[self.positions.len() - 1]
    }

    /// Apply `financials += financials * change` to every position in
    /// `sector`. Returns how many positions were touched.
    pub fn apply_sector_shock(&mut self, sector: Sector, change: f64) -> usize {
        let mut touched = 0;
        for p in self.positions.iter_mut().filter(|p| p.startup.sector == sector) {
            p.startup.financials = shocked(p.startup.financials, change);
            touched += 1;
        }
        touched
    }

    /// True iff every position has `financials <= 0`.
    ///
    /// Vacuously true on an empty ledger; callers must tell "took no
    /// positions" apart from "every position failed".
    pub fn all_failed(&self) -> bool {
        self.positions.iter().all(|p| p.startup.financials <= 0.0)
    }

    /// True iff any position has reached its goal.
    pub fn has_reached_goal(&self) -> bool {
        self.positions.iter().any(|p| p.startup.is_successful())
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub(crate) fn positions_mut(&mut self) -> &mut [Position] {
        &mut self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn total_invested(&self) -> i64 {
        self.positions.iter().map(|p| p.invested_amount).sum()
    }
}
