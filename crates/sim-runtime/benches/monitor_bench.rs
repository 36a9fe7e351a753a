use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{GameConfig, Phase, RoundTier};
use sim_runtime::{GameSession, ManualClock, RecordingSink};

fn fill_and_monitor(config: &GameConfig) -> Phase {
    let mut s = match GameSession::new(config.clone(), ManualClock::new(), RecordingSink::new()) {
        Ok(s) => s,
        Err(e) => panic!("bench config rejected: {e}"),
    };
    s.start_game();
    while s.phase() == Phase::AwaitingDecision {
        let shown = s.sink().shown_version().unwrap_or_default();
        s.invest_for(shown);
    }
    while s.phase() == Phase::Monitoring {
        for ticket in s.clock().due() {
            s.on_tick(ticket);
        }
    }
    s.phase()
}

fn bench_monitoring(c: &mut Criterion) {
    let default = GameConfig::default();
    c.bench_function("round_default", |b| b.iter(|| fill_and_monitor(&default)));

    // Thirty-millisecond ticks over the same window and many small positions.
    let mut fast = GameConfig {
        initial_capital: 1_000_000,
        tiers: vec![RoundTier::new("Seed", 40_000, 50_000, 10)],
        ..GameConfig::default()
    };
    fast.monitor.tick_budget = 1000;
    fast.monitor.tick_period_ms = 30;
    c.bench_function("round_fast_ticks", |b| b.iter(|| fill_and_monitor(&fast)));
}

criterion_group!(benches, bench_monitoring);
criterion_main!(benches);
