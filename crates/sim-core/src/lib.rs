#![deny(warnings)]

//! Core domain models and invariants for Venture Tycoon.
//!
//! This crate defines serializable types shared by the outcome model, the
//! round state machine and the presentation layer, together with the game
//! configuration and the validation helpers that guard it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Length of one monitoring window in milliseconds (budget x period).
pub const MONITOR_WINDOW_MS: u64 = 30_000;

/// Industry sector of a startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sector {
    Tech,
    Healthcare,
    Energy,
    Finance,
    Retail,
}

impl Sector {
    /// Every sector, in draw order.
    pub const ALL: [Sector; 5] = [
        Sector::Tech,
        Sector::Healthcare,
        Sector::Energy,
        Sector::Finance,
        Sector::Retail,
    ];
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sector::Tech => "Tech",
            Sector::Healthcare => "Healthcare",
            Sector::Energy => "Energy",
            Sector::Finance => "Finance",
            Sector::Retail => "Retail",
        };
        f.write_str(s)
    }
}

/// Funding tier for one round (Series A/B/C).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTier {
    /// Display name, e.g. "Series-A".
    pub name: String,
    /// Inclusive lower bound of a pitch's investment ask.
    pub min_investment: i64,
    /// Exclusive upper bound of a pitch's investment ask.
    pub max_investment: i64,
    /// Goal = investment ask x multiplier.
    pub target_multiplier: i64,
}

impl RoundTier {
    pub fn new(name: &str, min_investment: i64, max_investment: i64, target_multiplier: i64) -> Self {
        Self {
            name: name.to_string(),
            min_investment,
            max_investment,
            target_multiplier,
        }
    }
}

/// What happens once the round counter moves past the last configured tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeyondFinalRound {
    /// The next pitch fails with [`GameError::InvalidRoundTier`].
    Fail,
    /// Keep pitching with the last tier's ranges.
    #[default]
    ReuseFinalTier,
    /// Surviving the last tier ends the game as a win.
    DeclareWin,
}

/// A sector-wide news headline and its multiplicative effect on financials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsTemplate {
    pub message: String,
    pub sector: Sector,
    /// Fractional change, e.g. 0.2 = +20%.
    pub change: f64,
}

impl NewsTemplate {
    pub fn new(message: &str, sector: Sector, change: f64) -> Self {
        Self {
            message: message.to_string(),
            sector,
            change,
        }
    }
}

/// A freshly generated investment opportunity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Startup {
    pub name: String,
    pub sector: Sector,
    /// Amount the founders ask for.
    pub investment_required: i64,
    /// Addressable market, in [0, 1000).
    pub market_size: u32,
    /// Team experience score, in [1, 10].
    pub team_experience: u8,
    /// Valuation proxy; the only field that changes after the pitch.
    pub financials: f64,
    /// Success threshold.
    pub goal: i64,
}

impl Startup {
    /// Whether financials have reached the goal.
    pub fn is_successful(&self) -> bool {
        self.financials >= self.goal as f64
    }

    /// Ratio of current financials to the goal.
    pub fn goal_progress(&self) -> f64 {
        if self.goal == 0 {
            return 0.0;
        }
        self.financials / self.goal as f64
    }
}

/// How a position left (or has not yet left) the monitoring phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    #[default]
    Open,
    /// Reached the unicorn multiple during monitoring; paid its financials.
    Unicorn,
    /// Paid its goal at the early-success checkpoint.
    EarlyExit,
    /// Paid its goal when the monitoring budget ran out.
    Matured,
    /// Resolved to zero, nothing paid.
    WrittenOff,
}

impl Settlement {
    pub fn is_open(self) -> bool {
        matches!(self, Settlement::Open)
    }
}

/// A startup the player has invested in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub startup: Startup,
    pub invested_amount: i64,
    pub settlement: Settlement,
}

impl Position {
    pub fn new(startup: Startup, invested_amount: i64) -> Self {
        Self {
            startup,
            invested_amount,
            settlement: Settlement::Open,
        }
    }

    /// True when capital ran short of the ask.
    pub fn is_partial(&self) -> bool {
        self.invested_amount < self.startup.investment_required
    }

    /// Financials at which the position counts as a unicorn.
    pub fn unicorn_threshold(&self, multiple: i64) -> f64 {
        self.invested_amount.saturating_mul(multiple) as f64
    }
}

/// Reason a payout was credited to capital.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutReason {
    Unicorn,
    EarlySuccess,
    Matured,
}

/// Capital credited from a single position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub name: String,
    pub amount: i64,
    pub reason: PayoutReason,
}

/// Phase of the round state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Pitching,
    AwaitingDecision,
    Monitoring,
    Resolving,
    Won,
    Lost,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Won | Phase::Lost)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of evaluating a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Win,
    Lose,
    Continue,
}

/// Monitoring-phase tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Number of evolution ticks before forced resolution.
    pub tick_budget: u32,
    /// Wall-clock period of one tick.
    pub tick_period_ms: u64,
    /// Fraction of the budget after which the early-success checkpoint runs.
    pub early_success_checkpoint: f64,
    /// Minimum financials/goal ratio that counts as success at a checkpoint.
    pub early_success_ratio: f64,
    /// Chance that a position below the ratio still succeeds at resolution.
    pub resolution_success_probability: f64,
    /// Multiple of the invested amount that makes a unicorn.
    pub unicorn_multiple: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_budget: 30,
            tick_period_ms: 1_000,
            early_success_checkpoint: 0.6,
            early_success_ratio: 0.10,
            resolution_success_probability: 0.30,
            unicorn_multiple: 100,
        }
    }
}

impl MonitorConfig {
    /// Tick (1-based) at which the early-success checkpoint fires.
    pub fn checkpoint_tick(&self) -> u32 {
        let t = (self.tick_budget as f64 * self.early_success_checkpoint).ceil();
        (t as u32).clamp(1, self.tick_budget.max(1))
    }
}

/// Full game configuration. Defaults reproduce the classic three-round game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub initial_capital: i64,
    /// Tier for round `n` is `tiers[n - 1]`.
    pub tiers: Vec<RoundTier>,
    pub beyond_final_round: BeyondFinalRound,
    /// Logical countdown length for each pitch.
    pub countdown_ticks: u32,
    pub countdown_period_ms: u64,
    pub monitor: MonitorConfig,
    pub news: Vec<NewsTemplate>,
    pub name_prefixes: Vec<String>,
    pub name_suffixes: Vec<String>,
    /// Seed for the session RNG.
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_capital: 500_000,
            tiers: vec![
                RoundTier::new("Series-A", 50_000, 250_000, 10),
                RoundTier::new("Series-B", 200_000, 1_000_000, 10),
                RoundTier::new("Series-C", 1_000_000, 5_000_000, 100),
            ],
            beyond_final_round: BeyondFinalRound::default(),
            countdown_ticks: 30,
            countdown_period_ms: 1_000,
            monitor: MonitorConfig::default(),
            news: vec![
                NewsTemplate::new(
                    "Tech boom! Positive news in the tech sector boosts financials by 20%",
                    Sector::Tech,
                    0.2,
                ),
                NewsTemplate::new(
                    "Healthcare breakthrough! A big win for healthcare companies.",
                    Sector::Healthcare,
                    0.15,
                ),
                NewsTemplate::new(
                    "Energy crisis! Energy sector companies hit by rising costs.",
                    Sector::Energy,
                    -0.2,
                ),
                NewsTemplate::new(
                    "Finance shake-up! Regulation changes hurt finance sector companies.",
                    Sector::Finance,
                    -0.15,
                ),
                NewsTemplate::new(
                    "Retail renaissance! Retail is back with strong consumer spending.",
                    Sector::Retail,
                    0.1,
                ),
            ],
            name_prefixes: ["Acme", "Zephyr", "Solara", "Nimbus", "Orion"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            name_suffixes: ["Industries", "Labs", "Ventures", "Enterprises", "Solutions"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rng_seed: 42,
        }
    }
}

impl GameConfig {
    /// Tier configured for exactly this round, ignoring the beyond-final policy.
    pub fn tier(&self, round: u32) -> Option<&RoundTier> {
        let idx = usize::try_from(round).ok()?.checked_sub(1)?;
        self.tiers.get(idx)
    }

    /// Tier in effect for `round`, applying [`BeyondFinalRound::ReuseFinalTier`].
    pub fn effective_tier(&self, round: u32) -> Option<&RoundTier> {
        if round == 0 {
            return None;
        }
        match self.tier(round) {
            Some(t) => Some(t),
            None => match self.beyond_final_round {
                BeyondFinalRound::ReuseFinalTier => self.tiers.last(),
                BeyondFinalRound::Fail | BeyondFinalRound::DeclareWin => None,
            },
        }
    }

    /// Last round with its own tier.
    pub fn final_round(&self) -> u32 {
        u32::try_from(self.tiers.len()).unwrap_or(u32::MAX)
    }

    /// Number of distinct names the vocabularies can produce.
    pub fn name_space(&self) -> usize {
        let prefixes: BTreeSet<&str> = self.name_prefixes.iter().map(String::as_str).collect();
        let suffixes: BTreeSet<&str> = self.name_suffixes.iter().map(String::as_str).collect();
        prefixes.len() * suffixes.len()
    }
}

/// Broad category of a [`GameError`], as reported to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidRoundTier,
    NameSpaceExhausted,
    InvalidTransition,
    RenderingFailure,
}

/// Errors raised by the game core.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameError {
    /// No tier configured for the requested round.
    #[error("no funding tier configured for round {round}")]
    InvalidRoundTier { round: u32 },
    /// Every prefix/suffix combination has already been handed out.
    #[error("all {combinations} startup names are already in use")]
    NameSpaceExhausted { combinations: usize },
    /// Action requested in a phase that does not accept it.
    #[error("cannot {action} while {phase}")]
    InvalidTransition { action: String, phase: Phase },
    /// The presentation layer rejected an update.
    #[error("rendering failed: {0}")]
    RenderingFailure(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidRoundTier { .. } => ErrorKind::InvalidRoundTier,
            GameError::NameSpaceExhausted { .. } => ErrorKind::NameSpaceExhausted,
            GameError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            GameError::RenderingFailure(_) => ErrorKind::RenderingFailure,
        }
    }

    /// Fatal errors abort the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GameError::InvalidRoundTier { .. } | GameError::NameSpaceExhausted { .. }
        )
    }
}

/// Validation errors for configuration invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("at least one funding tier is required")]
    NoTiers,
    /// Investment bounds must satisfy 0 < min < max.
    #[error("tier {0} has an invalid investment range")]
    InvalidRange(String),
    #[error("tier {0} must have a positive target multiplier")]
    NonPositiveMultiplier(String),
    #[error("initial capital must be > 0")]
    NonPositiveCapital,
    #[error("countdown must be at least one tick")]
    EmptyCountdown,
    /// Budget x period must equal the monitoring window.
    #[error("monitoring window is {0} ms, expected {} ms", MONITOR_WINDOW_MS)]
    MonitorWindow(u64),
    #[error("{0} must be within [0,1]")]
    OutOfUnitRange(&'static str),
    #[error("unicorn multiple must be > 0")]
    NonPositiveUnicornMultiple,
    #[error("name vocabulary is empty")]
    EmptyVocabulary,
    #[error("non-finite numeric value encountered")]
    NonFinite,
}

/// Validate a single tier.
pub fn validate_tier(tier: &RoundTier) -> Result<(), ValidationError> {
    if tier.min_investment <= 0 || tier.max_investment <= tier.min_investment {
        return Err(ValidationError::InvalidRange(tier.name.clone()));
    }
    if tier.target_multiplier <= 0 {
        return Err(ValidationError::NonPositiveMultiplier(tier.name.clone()));
    }
    Ok(())
}

fn unit(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfUnitRange(field));
    }
    Ok(())
}

/// Validate monitoring parameters.
pub fn validate_monitor(m: &MonitorConfig) -> Result<(), ValidationError> {
    let window = u64::from(m.tick_budget).saturating_mul(m.tick_period_ms);
    if m.tick_budget == 0 || window != MONITOR_WINDOW_MS {
        return Err(ValidationError::MonitorWindow(window));
    }
    unit(m.early_success_checkpoint, "early_success_checkpoint")?;
    unit(m.early_success_ratio, "early_success_ratio")?;
    unit(
        m.resolution_success_probability,
        "resolution_success_probability",
    )?;
    if m.unicorn_multiple <= 0 {
        return Err(ValidationError::NonPositiveUnicornMultiple);
    }
    Ok(())
}

/// Validate the whole configuration.
pub fn validate_config(cfg: &GameConfig) -> Result<(), ValidationError> {
    if cfg.tiers.is_empty() {
        return Err(ValidationError::NoTiers);
    }
    for t in &cfg.tiers {
        validate_tier(t)?;
    }
    if cfg.initial_capital <= 0 {
        return Err(ValidationError::NonPositiveCapital);
    }
    if cfg.countdown_ticks == 0 {
        return Err(ValidationError::EmptyCountdown);
    }
    validate_monitor(&cfg.monitor)?;
    if cfg.name_space() == 0 {
        return Err(ValidationError::EmptyVocabulary);
    }
    if cfg.news.iter().any(|n| !n.change.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    Ok(())
}
