//! Command link for Tello quadcopters
//!
//! Typed commands are sent over a UDP session to the drone's SDK port, one at
//! a time, each paired with its textual reply. Plans run lists of commands at
//! a fixed pace, and every outcome is published on a result stream.

pub mod command;
pub mod config;
pub mod console;
pub mod transport;

pub use command::{CommandDispatcher, CommandReport, Plan, PlanSequencer};
pub use config::{DispatchConfig, SessionConfig, TelloConfig};
pub use tello_shared::{Command, CommandError, CommandOutcome, Direction, SessionState};
pub use transport::TransportSession;
