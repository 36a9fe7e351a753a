#![deny(warnings)]

//! Autopilot investor used by the CLI to play unattended.
//!
//! A pitch is scored by [`utility`] in `[0, 1]`; [`decide`] compares the
//! score against a [`Policy`] to invest, pass, or let the countdown run out.

use serde::{Deserialize, Serialize};
use sim_core::Startup;
use tracing::debug;

/// What the autopilot does with the pitch in front of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Invest,
    Pass,
    /// Do nothing and let the countdown expire.
    Wait,
}

/// Autopilot tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Minimum utility to invest.
    pub threshold: f32,
    /// Pitches scoring within this distance below `threshold` are left to
    /// time out instead of being passed.
    pub hesitation: f32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            threshold: 0.55,
            hesitation: 0.05,
        }
    }
}

/// Weighted score of a pitch.
///
/// Team experience weighs 0.4, market size 0.3 and starting financials 0.3,
/// each normalized to `[0, 1]` over the ranges the factory draws from.
/// Example: experience 10, market 999, financials 49 scores just under 1.0.
pub fn utility(pitch: &Startup) -> f32 {
    let experience = f32::from(pitch.team_experience.clamp(1, 10)) / 10.0;
    let market = (pitch.market_size.min(1000) as f32) / 1000.0;
    let financials = ((pitch.financials as f32 + 50.0) / 100.0).clamp(0.0, 1.0);
    (experience * 0.4) + (market * 0.3) + (financials * 0.3)
}

/// Decide on `pitch` given the capital still available this round.
///
/// A pitch the remaining capital only partly covers has its score scaled
/// by the covered share, floored at one half.
pub fn decide(pitch: &Startup, capital: i64, policy: &Policy) -> Decision {
    if capital <= 0 || pitch.investment_required <= 0 {
        return Decision::Pass;
    }
    let coverage = (capital as f64 / pitch.investment_required as f64).min(1.0) as f32;
    let score = utility(pitch) * (0.5 + 0.5 * coverage);
    let decision = if score >= policy.threshold {
        Decision::Invest
    } else if score >= policy.threshold - policy.hesitation {
        Decision::Wait
    } else {
        Decision::Pass
    };
    debug!(name = %pitch.name, score, ?decision, "autopilot");
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::Sector;

    fn pitch(experience: u8, market: u32, financials: f64) -> Startup {
        Startup {
            name: "Nova Systems".to_string(),
            sector: Sector::Energy,
            investment_required: 100_000,
            market_size: market,
            team_experience: experience,
            financials,
            goal: 1_000_000,
        }
    }

    #[test]
    fn strong_pitch_is_taken_weak_one_passed() {
        let policy = Policy::default();
        assert_eq!(decide(&pitch(10, 900, 40.0), 500_000, &policy), Decision::Invest);
        assert_eq!(decide(&pitch(1, 10, -45.0), 500_000, &policy), Decision::Pass);
    }

    #[test]
    fn borderline_pitch_waits() {
        let policy = Policy {
            threshold: 0.5,
            hesitation: 0.1,
        };
        // 0.4 * 0.5 + 0.3 * 0.5 + 0.3 * 0.4 = 0.47
        let p = pitch(5, 500, -10.0);
        assert!((utility(&p) - 0.47).abs() < 1e-6);
        assert_eq!(decide(&p, 500_000, &policy), Decision::Wait);
    }

    #[test]
    fn no_capital_always_passes() {
        let policy = Policy {
            threshold: 0.0,
            hesitation: 0.0,
        };
        assert_eq!(decide(&pitch(10, 999, 49.0), 0, &policy), Decision::Pass);
    }

    #[test]
    fn thin_coverage_lowers_the_score() {
        let policy = Policy {
            threshold: 0.8,
            hesitation: 0.0,
        };
        let p = pitch(10, 900, 40.0);
        assert_eq!(decide(&p, 100_000, &policy), Decision::Invest);
        assert_eq!(decide(&p, 10_000, &policy), Decision::Pass);
    }

    #[test]
    fn policy_reads_partial_json() {
        let p: Policy = serde_json::from_str(r#"{"threshold": 0.7}"#).unwrap();
        assert_eq!(p.threshold, 0.7);
        assert_eq!(p.hesitation, Policy::default().hesitation);
    }

    proptest! {
        #[test]
        fn utility_is_bounded(exp in 0u8..=20, market in 0u32..5000, f in -200.0f64..200.0) {
            let u = utility(&pitch(exp, market, f));
            prop_assert!((0.0..=1.0).contains(&u));
        }

        #[test]
        fn more_experience_never_scores_lower(exp in 1u8..10, market in 0u32..1000, f in -50.0f64..50.0) {
            prop_assert!(utility(&pitch(exp, market, f)) <= utility(&pitch(exp + 1, market, f)));
        }
    }
}
