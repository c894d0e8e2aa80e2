//! Tello Shared Protocol Types
//!
//! This crate provides the command model, the reply codec and the session
//! lifecycle shared by everything that talks to a Tello over its UDP
//! command port.

pub mod codec;
pub mod command;
pub mod error;
pub mod state_machine;

pub use command::{Command, Direction};
pub use error::{CommandError, CommandOutcome, ReceiveFailure};
pub use state_machine::{SessionEvent, SessionState, SessionStateMachine, TransitionResult};

/// Protocol parameters for the command link
pub mod protocol {
    /// Default address of the drone on its own access point
    pub const DEFAULT_PEER_IP: &str = "192.168.10.1";

    /// UDP port the drone listens on for SDK commands
    pub const COMMAND_PORT: u16 = 8889;

    /// Smallest accepted movement distance in centimeters
    pub const MIN_DISTANCE_CM: u32 = 20;

    /// Largest accepted movement distance in centimeters
    pub const MAX_DISTANCE_CM: u32 = 500;

    /// Smallest accepted rotation in degrees
    pub const MIN_ROTATION_DEG: u32 = 1;

    /// Largest accepted rotation in degrees
    pub const MAX_ROTATION_DEG: u32 = 360;

    /// Largest payload a single UDP datagram can carry over IPv4
    pub const MAX_DATAGRAM_SIZE: usize = 65_507;

    /// Reply sent by the drone when a command was accepted
    pub const REPLY_OK: &str = "ok";

    /// Prefix of a reply reporting a rejected or failed command
    pub const REPLY_ERROR_PREFIX: &str = "error";
}
