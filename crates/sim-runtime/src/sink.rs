//! Presentation boundary.
//!
//! The session pushes read-only snapshots through [`PresentationSink`]. A sink
//! error never changes game state; the session logs it and reports it back
//! through [`PresentationSink::on_fatal_error`] on a best-effort basis.

use sim_core::{ErrorKind, NewsTemplate, Payout, Position, RoundOutcome, Startup};
use thiserror::Error;

/// Failure reported by a presentation layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Receiver of everything the player should see.
pub trait PresentationSink {
    /// A new pitch is on the table with a fresh countdown.
    ///
    /// Decisions on this pitch go back through
    /// [`crate::GameSession::invest_for`] and [`crate::GameSession::pass_for`]
    /// with `version`, so a click that lands after a timeout is ignored.
    fn on_pitch_ready(
        &mut self,
        pitch: &Startup,
        countdown: u32,
        version: u64,
    ) -> Result<(), RenderError>;
    fn on_countdown_tick(&mut self, seconds_remaining: u32) -> Result<(), RenderError>;
    fn on_news_event(&mut self, news: &NewsTemplate) -> Result<(), RenderError>;
    fn on_portfolio_changed(&mut self, positions: &[Position]) -> Result<(), RenderError>;
    fn on_capital_changed(&mut self, capital: i64) -> Result<(), RenderError>;
    fn on_round_resolved(&mut self, outcome: RoundOutcome, round: u32) -> Result<(), RenderError>;
    fn on_fatal_error(&mut self, kind: ErrorKind, details: &str) -> Result<(), RenderError>;

    /// Enable or disable the invest/pass controls.
    fn on_controls_enabled(&mut self, _enabled: bool) -> Result<(), RenderError> {
        Ok(())
    }

    /// A position was just opened; `position.is_partial()` flags a clipped
    /// investment.
    fn on_investment(&mut self, _position: &Position) -> Result<(), RenderError> {
        Ok(())
    }

    fn on_payout(&mut self, _payout: &Payout) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Everything a [`RecordingSink`] has seen, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    PitchReady {
        name: String,
        countdown: u32,
        version: u64,
    },
    CountdownTick(u32),
    News(NewsTemplate),
    Portfolio(Vec<Position>),
    Capital(i64),
    RoundResolved { outcome: RoundOutcome, round: u32 },
    FatalError { kind: ErrorKind, details: String },
    Controls(bool),
    Investment { name: String, amount: i64, partial: bool },
    Payout(Payout),
}

/// Sink that records every call, optionally failing on demand.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    /// When set, every update except `on_fatal_error` fails with this message.
    pub fail_with: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose updates all fail.
    pub fn failing(message: &str) -> Self {
        Self {
            events: Vec::new(),
            fail_with: Some(message.to_string()),
        }
    }

    /// Version of the most recently shown pitch.
    pub fn shown_version(&self) -> Option<u64> {
        self.events.iter().rev().find_map(|e| match e {
            SinkEvent::PitchReady { version, .. } => Some(*version),
            _ => None,
        })
    }

    pub fn last_capital(&self) -> Option<i64> {
        self.events.iter().rev().find_map(|e| match e {
            SinkEvent::Capital(c) => Some(*c),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    fn record(&mut self, event: SinkEvent) -> Result<(), RenderError> {
        if let Some(msg) = &self.fail_with {
            return Err(RenderError(msg.clone()));
        }
        self.events.push(event);
        Ok(())
    }
}

impl PresentationSink for RecordingSink {
    fn on_pitch_ready(
        &mut self,
        pitch: &Startup,
        countdown: u32,
        version: u64,
    ) -> Result<(), RenderError> {
        self.record(SinkEvent::PitchReady {
            name: pitch.name.clone(),
            countdown,
            version,
        })
    }

    fn on_countdown_tick(&mut self, seconds_remaining: u32) -> Result<(), RenderError> {
        self.record(SinkEvent::CountdownTick(seconds_remaining))
    }

    fn on_news_event(&mut self, news: &NewsTemplate) -> Result<(), RenderError> {
        self.record(SinkEvent::News(news.clone()))
    }

    fn on_portfolio_changed(&mut self, positions: &[Position]) -> Result<(), RenderError> {
        self.record(SinkEvent::Portfolio(positions.to_vec()))
    }

    fn on_capital_changed(&mut self, capital: i64) -> Result<(), RenderError> {
        self.record(SinkEvent::Capital(capital))
    }

    fn on_round_resolved(&mut self, outcome: RoundOutcome, round: u32) -> Result<(), RenderError> {
        self.record(SinkEvent::RoundResolved { outcome, round })
    }

    fn on_fatal_error(&mut self, kind: ErrorKind, details: &str) -> Result<(), RenderError> {
        self.events.push(SinkEvent::FatalError {
            kind,
            details: details.to_string(),
        });
        Ok(())
    }

    fn on_controls_enabled(&mut self, enabled: bool) -> Result<(), RenderError> {
        self.record(SinkEvent::Controls(enabled))
    }

    fn on_investment(&mut self, position: &Position) -> Result<(), RenderError> {
        self.record(SinkEvent::Investment {
            name: position.startup.name.clone(),
            amount: position.invested_amount,
            partial: position.is_partial(),
        })
    }

    fn on_payout(&mut self, payout: &Payout) -> Result<(), RenderError> {
        self.record(SinkEvent::Payout(payout.clone()))
    }
}
