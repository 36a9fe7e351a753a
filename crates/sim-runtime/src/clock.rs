//! Scheduler abstraction for the countdown and monitoring timers.
//!
//! The session never sleeps. It arms periodic timers on a [`Clock`] and the
//! host calls back into [`crate::GameSession::on_tick`] with the ticket it was
//! handed. A ticket carries the session version current when it was armed,
//! so a tick that arrives after its phase was left is recognized as stale.

use std::collections::BTreeMap;
use std::time::Duration;

/// Which of the two session timers a ticket belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Per-pitch decision countdown.
    Countdown,
    /// Portfolio evolution during monitoring.
    Monitor,
}

/// Identity of one armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerTicket {
    pub kind: TimerKind,
    pub version: u64,
}

/// Host-provided periodic scheduler.
pub trait Clock {
    /// Arm a periodic timer, replacing any timer of the same kind.
    fn arm(&mut self, ticket: TimerTicket, period: Duration);
    /// Cancel the timer of this kind, if any.
    fn cancel(&mut self, kind: TimerKind);
}

/// A timer as recorded by [`ManualClock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmedTimer {
    pub ticket: TimerTicket,
    pub period: Duration,
}

/// Clock that only records what is armed; the host (or a test) decides when
/// ticks happen.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    armed: BTreeMap<TimerKind, ArmedTimer>,
    arms: u64,
    cancels: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self, kind: TimerKind) -> Option<ArmedTimer> {
        self.armed.get(&kind).copied()
    }

    /// Tickets of every armed timer, countdown first.
    pub fn due(&self) -> Vec<TimerTicket> {
        self.armed.values().map(|t| t.ticket).collect()
    }

    pub fn is_idle(&self) -> bool {
        self.armed.is_empty()
    }

    /// Number of `arm` calls seen so far.
    pub fn arm_count(&self) -> u64 {
        self.arms
    }

    /// Number of `cancel` calls that removed a timer.
    pub fn cancel_count(&self) -> u64 {
        self.cancels
    }
}

impl Clock for ManualClock {
    fn arm(&mut self, ticket: TimerTicket, period: Duration) {
        self.arms += 1;
        self.armed.insert(ticket.kind, ArmedTimer { ticket, period });
    }

    fn cancel(&mut self, kind: TimerKind) {
        if self.armed.remove(&kind).is_some() {
            self.cancels += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(kind: TimerKind, version: u64) -> TimerTicket {
        TimerTicket { kind, version }
    }

    #[test]
    fn arming_replaces_same_kind() {
        let mut c = ManualClock::new();
        c.arm(ticket(TimerKind::Countdown, 1), Duration::from_secs(1));
        c.arm(ticket(TimerKind::Countdown, 2), Duration::from_secs(1));
        assert_eq!(c.due(), vec![ticket(TimerKind::Countdown, 2)]);
        assert_eq!(c.arm_count(), 2);
    }

    #[test]
    fn due_orders_countdown_before_monitor() {
        let mut c = ManualClock::new();
        c.arm(ticket(TimerKind::Monitor, 3), Duration::from_millis(30));
        c.arm(ticket(TimerKind::Countdown, 3), Duration::from_secs(1));
        let kinds: Vec<TimerKind> = c.due().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TimerKind::Countdown, TimerKind::Monitor]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut c = ManualClock::new();
        c.arm(ticket(TimerKind::Monitor, 1), Duration::from_secs(1));
        c.cancel(TimerKind::Monitor);
        c.cancel(TimerKind::Monitor);
        assert!(c.is_idle());
        assert_eq!(c.cancel_count(), 1);
        assert!(c.armed(TimerKind::Monitor).is_none());
    }
}
