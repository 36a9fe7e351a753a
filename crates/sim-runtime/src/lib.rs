#![deny(warnings)]

//! Game runtime: startup factory, portfolio ledger, monitoring loop and the
//! round state machine that drives them.
//!
//! The runtime is single-threaded and host-driven. A host owns a
//! [`GameSession`], forwards player inputs to it, and delivers timer ticks
//! armed on its [`Clock`]. Everything the player sees leaves through a
//! [`PresentationSink`].

mod clock;
mod factory;
mod ledger;
mod monitor;
mod session;
mod sink;

pub use clock::{ArmedTimer, Clock, ManualClock, TimerKind, TimerTicket};
pub use factory::{NameRegistry, StartupFactory};
pub use ledger::Ledger;
pub use monitor::MonitorRun;
pub use session::{Ack, GameSession, GameSnapshot};
pub use sink::{PresentationSink, RecordingSink, RenderError, SinkEvent};
