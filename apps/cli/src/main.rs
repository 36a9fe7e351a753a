#![deny(warnings)]

//! Headless CLI that plays one seeded game on autopilot and prints a summary.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sim_ai::{decide, Decision, Policy};
use sim_core::{
    validate_config, ErrorKind, GameConfig, NewsTemplate, Payout, Phase, Position, RoundOutcome,
    Startup,
};
use sim_runtime::{GameSession, GameSnapshot, ManualClock, PresentationSink, RenderError};
use std::path::Path;
use tracing::{debug, error, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    seed: Option<u64>,
    threshold: Option<f32>,
    realtime: bool,
    json: bool,
    max_steps: Option<u64>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => out.config = it.next(),
            "--seed" => out.seed = it.next().and_then(|s| s.parse().ok()),
            "--threshold" => out.threshold = it.next().and_then(|s| s.parse().ok()),
            "--max-steps" => out.max_steps = it.next().and_then(|s| s.parse().ok()),
            "--realtime" => out.realtime = true,
            "--json" => out.json = true,
            _ => {}
        }
    }
    out
}

/// Parse a config as JSON when `json` is set, YAML otherwise.
fn parse_config(text: &str, json: bool) -> Result<GameConfig> {
    let cfg = if json {
        serde_json::from_str(text)?
    } else {
        serde_yaml::from_str(text)?
    };
    Ok(cfg)
}

fn load_config(path: &str) -> Result<GameConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let json = Path::new(path)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    parse_config(&text, json).with_context(|| format!("parsing {path}"))
}

/// Sink that narrates the game through the log.
#[derive(Debug, Default)]
struct ConsoleSink {
    /// Version of the pitch on screen; decisions are made against it.
    shown: u64,
    pitches: u64,
    news: u64,
    payouts: u64,
}

impl PresentationSink for ConsoleSink {
    fn on_pitch_ready(
        &mut self,
        pitch: &Startup,
        countdown: u32,
        version: u64,
    ) -> Result<(), RenderError> {
        self.shown = version;
        self.pitches += 1;
        info!(
            name = %pitch.name,
            sector = %pitch.sector,
            ask = pitch.investment_required,
            market = pitch.market_size,
            team = pitch.team_experience,
            financials = pitch.financials,
            goal = pitch.goal,
            countdown,
            "pitch"
        );
        Ok(())
    }

    fn on_countdown_tick(&mut self, seconds_remaining: u32) -> Result<(), RenderError> {
        debug!(seconds_remaining, "countdown");
        Ok(())
    }

    fn on_news_event(&mut self, news: &NewsTemplate) -> Result<(), RenderError> {
        self.news += 1;
        info!(sector = %news.sector, change = news.change, "news: {}", news.message);
        Ok(())
    }

    fn on_portfolio_changed(&mut self, positions: &[Position]) -> Result<(), RenderError> {
        for p in positions {
            debug!(
                name = %p.startup.name,
                invested = p.invested_amount,
                financials = p.startup.financials,
                progress = p.startup.goal_progress(),
                settlement = ?p.settlement,
                "position"
            );
        }
        Ok(())
    }

    fn on_capital_changed(&mut self, capital: i64) -> Result<(), RenderError> {
        info!(capital, "capital");
        Ok(())
    }

    fn on_round_resolved(&mut self, outcome: RoundOutcome, round: u32) -> Result<(), RenderError> {
        info!(round, ?outcome, "round resolved");
        Ok(())
    }

    fn on_fatal_error(&mut self, kind: ErrorKind, details: &str) -> Result<(), RenderError> {
        error!(?kind, "{details}");
        Ok(())
    }

    fn on_payout(&mut self, payout: &Payout) -> Result<(), RenderError> {
        self.payouts += 1;
        info!(name = %payout.name, amount = payout.amount, reason = ?payout.reason, "payout");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    git_sha: &'static str,
    build_date: &'static str,
    seed: u64,
    steps: u64,
    pitches: u64,
    news: u64,
    payouts: u64,
    #[serde(flatten)]
    snapshot: GameSnapshot,
}

/// Deliver every due timer tick, sleeping one period first in realtime mode.
fn tick(session: &mut GameSession<ManualClock, ConsoleSink>, realtime: bool) {
    let due = session.clock().due();
    if realtime {
        if let Some(period) = due
            .first()
            .and_then(|t| session.clock().armed(t.kind))
            .map(|a| a.period)
        {
            std::thread::sleep(period);
        }
    }
    for ticket in due {
        session.on_tick(ticket);
    }
}

/// Advance the game by one autopilot decision or one timer tick.
fn step(session: &mut GameSession<ManualClock, ConsoleSink>, policy: &Policy, realtime: bool) {
    let decision = match session.pitch() {
        Some(p) if session.phase() == Phase::AwaitingDecision => {
            decide(p, session.capital(), policy)
        }
        _ => Decision::Wait,
    };
    let shown = session.sink().shown;
    match decision {
        Decision::Invest => {
            session.invest_for(shown);
        }
        Decision::Pass => {
            session.pass_for(shown);
        }
        Decision::Wait => tick(session, realtime),
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .init();

    let args = parse_args(std::env::args().skip(1));
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    validate_config(&cfg)?;
    let mut policy = Policy::default();
    if let Some(threshold) = args.threshold {
        policy.threshold = threshold;
    }
    let max_steps = args.max_steps.unwrap_or(100_000);
    let seed = cfg.rng_seed;
    info!(
        git_sha = env!("GIT_SHA"),
        build_date = env!("BUILD_DATE"),
        seed,
        threshold = policy.threshold,
        realtime = args.realtime,
        "starting CLI"
    );

    let mut session = GameSession::new(cfg, ManualClock::new(), ConsoleSink::default())?;
    session.start_game();
    let mut steps = 0;
    while session.phase() != Phase::Idle && !session.phase().is_terminal() && steps < max_steps {
        steps += 1;
        step(&mut session, &policy, args.realtime);
    }

    let summary = Summary {
        git_sha: env!("GIT_SHA"),
        build_date: env!("BUILD_DATE"),
        seed,
        steps,
        pitches: session.sink().pitches,
        news: session.sink().news,
        payouts: session.sink().payouts,
        snapshot: session.snapshot(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Game {:?} | round: {} | capital: ${} | positions: {} | pitches: {} | payouts: {} | steps: {}",
            summary.snapshot.phase,
            summary.snapshot.round,
            summary.snapshot.capital,
            summary.snapshot.positions.len(),
            summary.pitches,
            summary.payouts,
            summary.steps
        );
    }
    if let Some(e) = &summary.snapshot.last_error {
        bail!("game aborted: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_runtime::Ack;

    fn args(list: &[&str]) -> Args {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags() {
        let a = args(&[
            "--config", "game.yaml", "--seed", "7", "--threshold", "0.6", "--json", "--realtime",
            "--max-steps", "500",
        ]);
        assert_eq!(a.config.as_deref(), Some("game.yaml"));
        assert_eq!(a.seed, Some(7));
        assert_eq!(a.threshold, Some(0.6));
        assert!(a.json && a.realtime);
        assert_eq!(a.max_steps, Some(500));
        assert_eq!(args(&["--seed", "x", "--bogus"]), Args::default());
    }

    #[test]
    fn yaml_and_json_configs_fill_defaults() {
        let y = parse_config("initial_capital: 1000\nrng_seed: 9\n", false).unwrap();
        assert_eq!(y.initial_capital, 1000);
        assert_eq!(y.rng_seed, 9);
        assert_eq!(y.tiers, GameConfig::default().tiers);

        let j = parse_config(r#"{"monitor": {"tick_budget": 1000, "tick_period_ms": 30}}"#, true)
            .unwrap();
        assert_eq!(j.monitor.tick_budget, 1000);
        assert!(validate_config(&j).is_ok());
    }

    #[test]
    fn autopilot_game_terminates() {
        let policy = Policy::default();
        let mut session =
            GameSession::new(GameConfig::default(), ManualClock::new(), ConsoleSink::default())
                .unwrap();
        session.start_game();
        let mut steps = 0;
        while session.phase() != Phase::Idle && !session.phase().is_terminal() && steps < 100_000 {
            steps += 1;
            step(&mut session, &policy, false);
        }
        assert!(steps < 100_000);
        assert!(session.sink().pitches > 0);
    }

    #[test]
    fn console_sink_tracks_the_pitch_on_screen() {
        let mut session =
            GameSession::new(GameConfig::default(), ManualClock::new(), ConsoleSink::default())
                .unwrap();
        session.start_game();
        let shown = session.sink().shown;
        assert_eq!(shown, session.version());
        for _ in 0..30 {
            tick(&mut session, false);
        }
        assert_ne!(session.sink().shown, shown);
        assert_eq!(session.invest_for(shown), Ack::Ignored);
        assert!(session.ledger().is_empty());
    }
}
