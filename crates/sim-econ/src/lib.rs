#![deny(warnings)]

//! Stochastic outcome model for Venture Tycoon.
//!
//! This module provides the random draws and arithmetic behind:
//! - Per-tick growth of a monitored position, biased by team experience
//! - Multiplicative sector shocks from news headlines
//! - The early-success test and the forced resolution at budget exhaustion
//!
//! Every function takes the caller's RNG so a seeded session stays
//! reproducible end to end.

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use sim_core::{MonitorConfig, NewsTemplate};
use thiserror::Error;

/// Errors produced by outcome helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Team experience must be within [1, 10].
    #[error("team experience {0} outside [1, 10]")]
    InvalidExperience(u8),
    /// Goals must be strictly positive.
    #[error("goal must be > 0, got {0}")]
    NonPositiveGoal(i64),
}

/// Half-width of the base growth draw.
const BASE_SWING: f64 = 5.0;
/// Magnitude of the experience-biased adjustment.
const BIAS_SWING: f64 = 5.0;

/// Draw one tick of growth for a position.
///
/// `U(-5, 5)` plus either `U(0, 5)` (with probability `experience / 10`) or
/// `U(-5, 0)`. The result always lies in `[-10, 10)`.
///
/// Example:
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
/// let g = growth_factor(&mut rng, 9).unwrap();
/// assert!((-10.0..10.0).contains(&g));
pub fn growth_factor<R: Rng>(rng: &mut R, team_experience: u8) -> Result<f64, EconError> {
    if !(1..=10).contains(&team_experience) {
        return Err(EconError::InvalidExperience(team_experience));
    }
    let base = rng.gen_range(-BASE_SWING..BASE_SWING);
    let success_chance = f64::from(team_experience) / 10.0;
    let adjustment = if rng.gen::<f64>() < success_chance {
        rng.gen_range(0.0..BIAS_SWING)
    } else {
        -rng.gen_range(0.0..BIAS_SWING)
    };
    Ok(base + adjustment)
}

/// Financials after a multiplicative shock of `change`.
///
/// Example:
/// assert_eq!(shocked(-10.0, 0.5), -15.0);
pub fn shocked(financials: f64, change: f64) -> f64 {
    financials + financials * change
}

/// Whether a position has made enough progress to be paid its goal early.
pub fn meets_success_ratio(financials: f64, goal: i64, ratio: f64) -> Result<bool, EconError> {
    if goal <= 0 {
        return Err(EconError::NonPositiveGoal(goal));
    }
    Ok(financials / goal as f64 >= ratio)
}

/// Final fate of a position still open when the monitoring budget runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Financials snap to the goal and the goal is paid.
    Goal,
    /// Financials drop to zero; nothing is paid.
    Loss,
}

/// Resolve a position at budget exhaustion.
///
/// Positions at or above the success ratio always reach their goal; the rest
/// succeed with `resolution_success_probability`.
pub fn resolve_at_exhaustion<R: Rng>(
    rng: &mut R,
    financials: f64,
    goal: i64,
    cfg: &MonitorConfig,
) -> Result<Resolution, EconError> {
    if meets_success_ratio(financials, goal, cfg.early_success_ratio)? {
        return Ok(Resolution::Goal);
    }
    if rng.gen_bool(cfg.resolution_success_probability) {
        Ok(Resolution::Goal)
    } else {
        Ok(Resolution::Loss)
    }
}

/// Pick a news headline uniformly. Returns None when there are none.
pub fn draw_news<'a, R: Rng>(
    rng: &mut R,
    templates: &'a [NewsTemplate],
) -> Option<&'a NewsTemplate> {
    templates.choose(rng)
}

/// Convert financials to whole currency for a payout, rounding half away
/// from zero.
///
/// Non-finite values pay nothing; values outside `i64` saturate.
pub fn to_currency(financials: f64) -> i64 {
    if !financials.is_finite() {
        return 0;
    }
    Decimal::from_f64(financials)
        .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_i64())
        .unwrap_or(if financials > 0.0 { i64::MAX } else { i64::MIN })
}
