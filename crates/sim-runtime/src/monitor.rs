//! Monitoring phase: tick-by-tick evolution of held positions.

use crate::ledger::Ledger;
use rand::Rng;
use sim_core::{MonitorConfig, Payout, PayoutReason, Position, Settlement};
use sim_econ::{growth_factor, meets_success_ratio, resolve_at_exhaustion, to_currency, Resolution};
use tracing::{debug, info};

/// Progress through one monitoring budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorRun {
    elapsed: u32,
    budget: u32,
    checkpoint: u32,
}

impl MonitorRun {
    pub fn new(cfg: &MonitorConfig) -> Self {
        Self {
            elapsed: 0,
            budget: cfg.tick_budget,
            checkpoint: cfg.checkpoint_tick(),
        }
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.elapsed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.elapsed >= self.budget
    }

    /// Run one evolution tick and return the payouts it produced.
    ///
    /// Open positions strictly between zero and their unicorn threshold grow
    /// by one growth draw. Reaching the threshold settles the position as a
    /// unicorn paying its current financials. From the checkpoint tick on,
    /// open positions at the success ratio are paid their goal.
    pub fn step<R: Rng>(&mut self, ledger: &mut Ledger, cfg: &MonitorConfig, rng: &mut R) -> Vec<Payout> {
        if self.is_exhausted() {
            return Vec::new();
        }
        self.elapsed += 1;
        let mut payouts = Vec::new();
        for p in ledger
            .positions_mut()
            .iter_mut()
            .filter(|p| p.settlement.is_open())
        {
            let threshold = p.unicorn_threshold(cfg.unicorn_multiple);
            if p.startup.financials > 0.0 && p.startup.financials < threshold {
                let experience = p.startup.team_experience.clamp(1, 10);
                p.startup.financials += growth_factor(rng, experience).unwrap_or(0.0);
            }
            if p.startup.financials >= threshold {
                p.settlement = Settlement::Unicorn;
                info!(name = %p.startup.name, financials = p.startup.financials, "unicorn");
                payouts.push(payout(p, to_currency(p.startup.financials), PayoutReason::Unicorn));
            }
        }
        if self.elapsed >= self.checkpoint {
            for p in ledger
                .positions_mut()
                .iter_mut()
                .filter(|p| p.settlement.is_open())
            {
                if meets_success_ratio(p.startup.financials, p.startup.goal, cfg.early_success_ratio)
                    .unwrap_or(false)
                {
                    p.startup.financials = p.startup.goal as f64;
                    p.settlement = Settlement::EarlyExit;
                    debug!(name = %p.startup.name, tick = self.elapsed, "early success");
                    payouts.push(payout(p, p.startup.goal, PayoutReason::EarlySuccess));
                }
            }
        }
        payouts
    }

    /// Resolve every still-open position once and close the run.
    ///
    /// Each one ends at exactly its goal (paid) or zero (not paid).
    pub fn finish<R: Rng>(&mut self, ledger: &mut Ledger, cfg: &MonitorConfig, rng: &mut R) -> Vec<Payout> {
        self.elapsed = self.budget;
        let mut payouts = Vec::new();
        for p in ledger
            .positions_mut()
            .iter_mut()
            .filter(|p| p.settlement.is_open())
        {
            let resolution = resolve_at_exhaustion(rng, p.startup.financials, p.startup.goal, cfg)
                .unwrap_or(Resolution::Loss);
            match resolution {
                Resolution::Goal => {
                    p.startup.financials = p.startup.goal as f64;
                    p.settlement = Settlement::Matured;
                    payouts.push(payout(p, p.startup.goal, PayoutReason::Matured));
                }
                Resolution::Loss => {
                    p.startup.financials = 0.0;
                    p.settlement = Settlement::WrittenOff;
                }
            }
        }
        payouts
    }
}

fn payout(p: &Position, amount: i64, reason: PayoutReason) -> Payout {
    Payout {
        name: p.startup.name.clone(),
        amount,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{Sector, Startup};

    fn startup(financials: f64, goal: i64, experience: u8) -> Startup {
        Startup {
            name: "Orion Labs".to_string(),
            sector: Sector::Healthcare,
            investment_required: 1_000,
            market_size: 300,
            team_experience: experience,
            financials,
            goal,
        }
    }

    fn run_to_end(ledger: &mut Ledger, cfg: &MonitorConfig, seed: u64) -> Vec<Payout> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut run = MonitorRun::new(cfg);
        let mut payouts = Vec::new();
        while !run.is_exhausted() {
            payouts.extend(run.step(ledger, cfg, &mut rng));
        }
        payouts.extend(run.finish(ledger, cfg, &mut rng));
        payouts
    }

    #[test]
    fn resolves_to_goal_or_zero_and_pays_once() {
        let cfg = MonitorConfig::default();
        for seed in 0..50 {
            let mut ledger = Ledger::new();
            ledger.add_position(startup(999.0, 10_000, 5), 1_000);
            let payouts = run_to_end(&mut ledger, &cfg, seed);
            let p = &ledger.positions()[0];
            let f = p.startup.financials;
            assert!(f == 0.0 || f == 10_000.0, "seed {seed}: {f}");
            assert!(payouts.len() <= 1);
            let credited: i64 = payouts.iter().map(|p| p.amount).sum();
            if f == 0.0 {
                assert_eq!(credited, 0);
                assert_eq!(p.settlement, Settlement::WrittenOff);
            } else {
                assert_eq!(credited, 10_000);
            }
        }
    }

    #[test]
    fn unicorn_pays_current_financials_and_stops_growing() {
        let cfg = MonitorConfig::default();
        let mut ledger = Ledger::new();
        // Already sitting on the 1 x 100 threshold when monitoring starts.
        ledger.add_position(startup(100.0, 1_000_000, 10), 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut run = MonitorRun::new(&cfg);
        let payouts = run.step(&mut ledger, &cfg, &mut rng);
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].reason, PayoutReason::Unicorn);
        assert_eq!(payouts[0].amount, 100);
        assert_eq!(ledger.positions()[0].settlement, Settlement::Unicorn);
        let after = run.step(&mut ledger, &cfg, &mut rng);
        assert!(after.is_empty());
        assert_eq!(ledger.positions()[0].startup.financials, 100.0);
        assert!(run.finish(&mut ledger, &cfg, &mut rng).is_empty());
    }

    #[test]
    fn early_success_fires_at_checkpoint() {
        let cfg = MonitorConfig::default();
        let mut ledger = Ledger::new();
        // 5000 / 10000 stays far above 0.10 whatever the growth draws.
        ledger.add_position(startup(5_000.0, 10_000, 5), 1_000);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut run = MonitorRun::new(&cfg);
        for _ in 1..cfg.checkpoint_tick() {
            assert!(run.step(&mut ledger, &cfg, &mut rng).is_empty());
        }
        let payouts = run.step(&mut ledger, &cfg, &mut rng);
        assert_eq!(run.elapsed(), cfg.checkpoint_tick());
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].reason, PayoutReason::EarlySuccess);
        assert_eq!(payouts[0].amount, 10_000);
        assert_eq!(ledger.positions()[0].settlement, Settlement::EarlyExit);
    }

    #[test]
    fn non_positive_financials_do_not_grow() {
        let cfg = MonitorConfig::default();
        let mut ledger = Ledger::new();
        ledger.add_position(startup(-20.0, 10_000, 10), 1_000);
        ledger.add_position(startup(0.0, 10_000, 10), 1_000);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut run = MonitorRun::new(&cfg);
        while !run.is_exhausted() {
            run.step(&mut ledger, &cfg, &mut rng);
        }
        assert_eq!(run.remaining(), 0);
        assert_eq!(ledger.positions()[0].startup.financials, -20.0);
        assert_eq!(ledger.positions()[1].startup.financials, 0.0);
        assert!(run.step(&mut ledger, &cfg, &mut rng).is_empty());
    }

    #[test]
    fn fast_budget_has_same_window() {
        let cfg = MonitorConfig {
            tick_budget: 1000,
            tick_period_ms: 30,
            ..MonitorConfig::default()
        };
        let mut ledger = Ledger::new();
        ledger.add_position(startup(10.0, 10_000, 6), 1_000);
        run_to_end(&mut ledger, &cfg, 17);
        let f = ledger.positions()[0].startup.financials;
        assert!(f == 0.0 || f == 10_000.0);
    }
}
