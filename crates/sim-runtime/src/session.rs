//! Round state machine.
//!
//! `Idle -> Pitching -> AwaitingDecision -> (Pitching | Monitoring) ->
//! Resolving -> (Pitching | Won | Lost)`. `Pitching` and `Resolving` are
//! transient: they are entered and left inside a single call.
//!
//! Every transition bumps `version` and cancels both timers; the phase being
//! entered re-arms what it needs. Timer tickets and versioned decisions that
//! carry an older version are ignored.

use crate::clock::{Clock, TimerKind, TimerTicket};
use crate::factory::{NameRegistry, StartupFactory};
use crate::ledger::Ledger;
use crate::monitor::MonitorRun;
use crate::sink::{PresentationSink, RenderError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sim_core::{
    validate_config, BeyondFinalRound, ErrorKind, GameConfig, GameError, Payout, Phase, Position,
    RoundOutcome, Startup, ValidationError,
};
use sim_econ::draw_news;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Whether an input changed the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    Applied,
    /// Wrong phase or stale version; nothing changed.
    Ignored,
}

/// Read-only view of the session for diagnostics and hosts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub round: u32,
    pub capital: i64,
    pub countdown: u32,
    pub version: u64,
    pub pitch: Option<Startup>,
    pub positions: Vec<Position>,
    pub names_used: usize,
    pub last_outcome: Option<RoundOutcome>,
    pub last_error: Option<GameError>,
    pub render_failures: u64,
}

/// One player's game: capital, round, ledger, timers and RNG.
pub struct GameSession<C: Clock, S: PresentationSink> {
    config: GameConfig,
    rng: ChaCha8Rng,
    clock: C,
    sink: S,
    factory: StartupFactory,
    ledger: Ledger,
    phase: Phase,
    version: u64,
    capital: i64,
    round: u32,
    pitch: Option<Startup>,
    countdown: u32,
    monitor: Option<MonitorRun>,
    last_outcome: Option<RoundOutcome>,
    last_error: Option<GameError>,
    render_failures: u64,
}

impl<C: Clock, S: PresentationSink> GameSession<C, S> {
    pub fn new(config: GameConfig, clock: C, sink: S) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            factory: StartupFactory::new(NameRegistry::from_config(&config)),
            capital: config.initial_capital,
            config,
            clock,
            sink,
            ledger: Ledger::new(),
            phase: Phase::Idle,
            version: 0,
            round: 1,
            pitch: None,
            countdown: 0,
            monitor: None,
            last_outcome: None,
            last_error: None,
            render_failures: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn capital(&self) -> i64 {
        self.capital
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Monotonic counter bumped on every phase transition.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pitch(&self) -> Option<&Startup> {
        self.pitch.as_ref()
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn last_error(&self) -> Option<&GameError> {
        self.last_error.as_ref()
    }

    pub fn last_outcome(&self) -> Option<RoundOutcome> {
        self.last_outcome
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            round: self.round,
            capital: self.capital,
            countdown: self.countdown,
            version: self.version,
            pitch: self.pitch.clone(),
            positions: self.ledger.positions().to_vec(),
            names_used: self.factory.names().used_count(),
            last_outcome: self.last_outcome,
            last_error: self.last_error.clone(),
            render_failures: self.render_failures,
        }
    }

    // ---- player inputs ----

    /// Start a game from `Idle`. Names already handed out stay used until
    /// [`GameSession::reset_game`].
    pub fn start_game(&mut self) -> Ack {
        if self.phase != Phase::Idle {
            return self.ignored("start");
        }
        self.capital = self.config.initial_capital;
        self.round = 1;
        self.ledger.clear();
        self.pitch = None;
        self.monitor = None;
        self.last_outcome = None;
        self.last_error = None;
        info!(capital = self.capital, "game started");
        self.show_capital();
        self.show_portfolio();
        self.begin_pitch();
        Ack::Applied
    }

    /// Drop everything, including used names, and return to `Idle`.
    pub fn reset_game(&mut self) -> Ack {
        self.set_phase(Phase::Idle);
        self.capital = self.config.initial_capital;
        self.round = 1;
        self.ledger.clear();
        self.factory.reset_names();
        self.pitch = None;
        self.countdown = 0;
        self.monitor = None;
        self.last_outcome = None;
        self.last_error = None;
        info!("game reset");
        self.show_controls(false);
        self.show_capital();
        self.show_portfolio();
        Ack::Applied
    }

    /// Invest in the current pitch, clipped to remaining capital.
    pub fn invest(&mut self) -> Ack {
        if self.phase != Phase::AwaitingDecision {
            return self.ignored("invest");
        }
        let Some(pitch) = self.pitch.take() else {
            return self.ignored("invest");
        };
        let amount = self.capital.min(pitch.investment_required);
        self.capital -= amount;
        let position = self.ledger.add_position(pitch, amount).clone();
        info!(
            name = %position.startup.name,
            amount,
            partial = position.is_partial(),
            capital = self.capital,
            "invested"
        );
        let r = self.sink.on_investment(&position);
        self.check_render("investment", r);
        self.show_portfolio();
        self.show_capital();
        if self.capital <= 0 {
            self.enter_monitoring();
        } else {
            self.begin_pitch();
        }
        Ack::Applied
    }

    /// Decline the current pitch.
    pub fn pass(&mut self) -> Ack {
        if self.phase != Phase::AwaitingDecision {
            return self.ignored("pass");
        }
        debug!(round = self.round, "passed");
        self.begin_pitch();
        Ack::Applied
    }

    /// Skip to another pitch; same effect as [`GameSession::pass`].
    pub fn request_next_pitch(&mut self) -> Ack {
        if self.phase != Phase::AwaitingDecision {
            return self.ignored("request next pitch");
        }
        self.begin_pitch();
        Ack::Applied
    }

    /// [`GameSession::invest`], but only if nothing changed since `version`.
    pub fn invest_for(&mut self, version: u64) -> Ack {
        if version != self.version {
            return self.stale("invest", version);
        }
        self.invest()
    }

    /// [`GameSession::pass`], but only if nothing changed since `version`.
    pub fn pass_for(&mut self, version: u64) -> Ack {
        if version != self.version {
            return self.stale("pass", version);
        }
        self.pass()
    }

    // ---- scheduler input ----

    /// Deliver a timer tick armed earlier on the clock.
    pub fn on_tick(&mut self, ticket: TimerTicket) -> Ack {
        if ticket.version != self.version {
            return self.stale("tick", ticket.version);
        }
        match (ticket.kind, self.phase) {
            (TimerKind::Countdown, Phase::AwaitingDecision) => {
                self.countdown_tick();
                Ack::Applied
            }
            (TimerKind::Monitor, Phase::Monitoring) => self.monitor_tick(),
            _ => self.ignored("tick"),
        }
    }

    fn countdown_tick(&mut self) {
        self.countdown = self.countdown.saturating_sub(1);
        let r = self.sink.on_countdown_tick(self.countdown);
        self.check_render("countdown", r);
        if self.countdown == 0 {
            info!(round = self.round, "decision timed out");
            self.begin_pitch();
        }
    }

    fn monitor_tick(&mut self) -> Ack {
        let Some(run) = self.monitor.as_mut() else {
            return self.ignored("tick");
        };
        let payouts = run.step(&mut self.ledger, &self.config.monitor, &mut self.rng);
        let exhausted = run.is_exhausted();
        self.credit(payouts);
        self.show_portfolio();
        if exhausted {
            self.finish_monitoring();
        }
        Ack::Applied
    }

    // ---- transitions ----

    fn set_phase(&mut self, next: Phase) {
        self.clock.cancel(TimerKind::Countdown);
        self.clock.cancel(TimerKind::Monitor);
        self.version += 1;
        debug!(from = %self.phase, to = %next, version = self.version, "phase");
        self.phase = next;
    }

    fn ticket(&self, kind: TimerKind) -> TimerTicket {
        TimerTicket {
            kind,
            version: self.version,
        }
    }

    fn begin_pitch(&mut self) {
        self.set_phase(Phase::Pitching);
        self.pitch = None;
        if self.capital <= 0 {
            info!(capital = self.capital, "no capital left for a pitch");
            self.resolve_round();
            return;
        }
        let pitch = match self
            .factory
            .create_pitch(&self.config, self.round, &mut self.rng)
        {
            Ok(p) => p,
            Err(e) => {
                self.abort(e);
                return;
            }
        };
        self.countdown = self.config.countdown_ticks;
        self.set_phase(Phase::AwaitingDecision);
        let period = Duration::from_millis(self.config.countdown_period_ms);
        let ticket = self.ticket(TimerKind::Countdown);
        self.clock.arm(ticket, period);

        let r = self.sink.on_pitch_ready(&pitch, self.countdown, self.version);
        self.check_render("pitch", r);
        self.pitch = Some(pitch);
        self.show_controls(true);
        self.apply_news();
    }

    fn apply_news(&mut self) {
        let Some(news) = draw_news(&mut self.rng, &self.config.news).cloned() else {
            return;
        };
        let touched = self.ledger.apply_sector_shock(news.sector, news.change);
        debug!(sector = %news.sector, change = news.change, touched, "news");
        let r = self.sink.on_news_event(&news);
        self.check_render("news", r);
        self.show_portfolio();
    }

    fn enter_monitoring(&mut self) {
        self.set_phase(Phase::Monitoring);
        self.pitch = None;
        self.countdown = 0;
        self.monitor = Some(MonitorRun::new(&self.config.monitor));
        let period = Duration::from_millis(self.config.monitor.tick_period_ms);
        let ticket = self.ticket(TimerKind::Monitor);
        self.clock.arm(ticket, period);
        info!(
            round = self.round,
            positions = self.ledger.len(),
            budget = self.config.monitor.tick_budget,
            "monitoring portfolio"
        );
        self.show_controls(false);
    }

    fn finish_monitoring(&mut self) {
        let payouts = match self.monitor.take() {
            Some(mut run) => run.finish(&mut self.ledger, &self.config.monitor, &mut self.rng),
            None => Vec::new(),
        };
        self.credit(payouts);
        self.show_portfolio();
        self.resolve_round();
    }

    fn credit(&mut self, payouts: Vec<Payout>) {
        if payouts.is_empty() {
            return;
        }
        for p in &payouts {
            self.capital = self.capital.saturating_add(p.amount);
            info!(name = %p.name, amount = p.amount, reason = ?p.reason, "payout");
            let r = self.sink.on_payout(p);
            self.check_render("payout", r);
        }
        self.show_capital();
    }

    fn evaluate(&self) -> RoundOutcome {
        if self.capital <= 0 && self.ledger.all_failed() && !self.ledger.is_empty() {
            return RoundOutcome::Lose;
        }
        if self.ledger.has_reached_goal() {
            return RoundOutcome::Win;
        }
        // A pitch request with no capital: continuing would request the next
        // pitch with no capital again.
        if self.capital <= 0 {
            return RoundOutcome::Lose;
        }
        if self.round >= self.config.final_round()
            && self.config.beyond_final_round == BeyondFinalRound::DeclareWin
        {
            return RoundOutcome::Win;
        }
        RoundOutcome::Continue
    }

    fn resolve_round(&mut self) {
        self.set_phase(Phase::Resolving);
        let outcome = self.evaluate();
        self.last_outcome = Some(outcome);
        info!(round = self.round, capital = self.capital, ?outcome, "round resolved");
        let r = self.sink.on_round_resolved(outcome, self.round);
        self.check_render("round", r);
        match outcome {
            RoundOutcome::Win => {
                self.set_phase(Phase::Won);
                self.show_controls(false);
            }
            RoundOutcome::Lose => {
                self.set_phase(Phase::Lost);
                self.show_controls(false);
            }
            RoundOutcome::Continue => {
                self.round += 1;
                self.ledger.clear();
                self.show_portfolio();
                self.begin_pitch();
            }
        }
    }

    fn abort(&mut self, e: GameError) {
        error!(error = %e, round = self.round, capital = self.capital, "session aborted");
        self.set_phase(Phase::Idle);
        self.pitch = None;
        self.monitor = None;
        if let Err(re) = self.sink.on_fatal_error(e.kind(), &e.to_string()) {
            warn!(error = %re, "could not report fatal error");
        }
        self.last_error = Some(e);
        self.show_controls(false);
    }

    fn ignored(&self, action: &str) -> Ack {
        let e = GameError::InvalidTransition {
            action: action.to_string(),
            phase: self.phase,
        };
        debug!(error = %e, "ignored");
        Ack::Ignored
    }

    fn stale(&self, action: &str, version: u64) -> Ack {
        debug!(action, version, current = self.version, "stale input ignored");
        Ack::Ignored
    }

    // ---- presentation ----

    fn check_render(&mut self, what: &str, result: Result<(), RenderError>) {
        let Err(e) = result else {
            return;
        };
        self.render_failures += 1;
        warn!(what, error = %e, "presentation update failed");
        let details = GameError::RenderingFailure(e.0).to_string();
        if let Err(e) = self.sink.on_fatal_error(ErrorKind::RenderingFailure, &details) {
            warn!(error = %e, "could not report rendering failure");
        }
    }

    fn show_capital(&mut self) {
        let r = self.sink.on_capital_changed(self.capital);
        self.check_render("capital", r);
    }

    fn show_portfolio(&mut self) {
        let r = self.sink.on_portfolio_changed(self.ledger.positions());
        self.check_render("portfolio", r);
    }

    fn show_controls(&mut self, enabled: bool) {
        let r = self.sink.on_controls_enabled(enabled);
        self.check_render("controls", r);
    }
}
