//! Typed Tello SDK commands and their ASCII encoding
//!
//! Every command maps to exactly one line of the drone's text grammar:
//! ```text
//! command | takeoff | land | emergency
//! left X | right X | forward X | back X | up X | down X     (X in cm)
//! cw D | ccw D                                              (D in degrees)
//! flip l|r|f|b
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::CommandError;
use crate::protocol::{MAX_DISTANCE_CM, MAX_ROTATION_DEG, MIN_DISTANCE_CM, MIN_ROTATION_DEG};

/// Flip direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Forward,
    Back,
}

impl Direction {
    /// Single-letter code used by the `flip` command
    pub fn code(self) -> &'static str {
        match self {
            Direction::Left => "l",
            Direction::Right => "r",
            Direction::Forward => "f",
            Direction::Back => "b",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "l" => Some(Direction::Left),
            "r" => Some(Direction::Right),
            "f" => Some(Direction::Forward),
            "b" => Some(Direction::Back),
            _ => None,
        }
    }
}

/// A single flight command
///
/// Distances are centimeters in `[20, 500]`, rotations are degrees in
/// `[1, 360]`. The range is checked by [`Command::validate`], not by
/// construction, so out-of-range values can still be forwarded on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enter SDK mode
    Start,
    TakeOff,
    Land,
    /// Stop all motors immediately
    Emergency,
    Left(u32),
    Right(u32),
    Forward(u32),
    Back(u32),
    Up(u32),
    Down(u32),
    /// Rotate clockwise
    RotateRight(u32),
    /// Rotate counter-clockwise
    RotateLeft(u32),
    Flip(Direction),
}

impl Command {
    /// Encode into the ASCII line understood by the drone
    pub fn encode(&self) -> String {
        match self {
            Command::Start => "command".to_string(),
            Command::TakeOff => "takeoff".to_string(),
            Command::Land => "land".to_string(),
            Command::Emergency => "emergency".to_string(),
            Command::Left(x) => format!("left {x}"),
            Command::Right(x) => format!("right {x}"),
            Command::Forward(x) => format!("forward {x}"),
            Command::Back(x) => format!("back {x}"),
            Command::Up(x) => format!("up {x}"),
            Command::Down(x) => format!("down {x}"),
            Command::RotateRight(x) => format!("cw {x}"),
            Command::RotateLeft(x) => format!("ccw {x}"),
            Command::Flip(direction) => format!("flip {}", direction.code()),
        }
    }

    /// Leading keyword of the encoded command
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Start => "command",
            Command::TakeOff => "takeoff",
            Command::Land => "land",
            Command::Emergency => "emergency",
            Command::Left(_) => "left",
            Command::Right(_) => "right",
            Command::Forward(_) => "forward",
            Command::Back(_) => "back",
            Command::Up(_) => "up",
            Command::Down(_) => "down",
            Command::RotateRight(_) => "cw",
            Command::RotateLeft(_) => "ccw",
            Command::Flip(_) => "flip",
        }
    }

    /// Check the parameter against the documented range
    pub fn validate(&self) -> Result<(), CommandError> {
        let (value, min, max, unit) = match *self {
            Command::Left(x)
            | Command::Right(x)
            | Command::Forward(x)
            | Command::Back(x)
            | Command::Up(x)
            | Command::Down(x) => (x, MIN_DISTANCE_CM, MAX_DISTANCE_CM, "cm"),
            Command::RotateRight(d) | Command::RotateLeft(d) => {
                (d, MIN_ROTATION_DEG, MAX_ROTATION_DEG, "degrees")
            }
            _ => return Ok(()),
        };

        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(CommandError::InvalidCommand(format!(
                "{} {} out of range [{}, {}] {}",
                self.verb(),
                value,
                min,
                max,
                unit
            )))
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Errors from parsing a command line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownVerb(String),

    #[error("Command '{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("Command '{0}' takes no further arguments")]
    UnexpectedArgument(&'static str),

    #[error("Invalid value for '{verb}': {value}")]
    InvalidValue { verb: &'static str, value: String },
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().ok_or(ParseCommandError::Empty)?;

        let command = match verb {
            "command" => Command::Start,
            "takeoff" => Command::TakeOff,
            "land" => Command::Land,
            "emergency" => Command::Emergency,
            "left" => Command::Left(number("left", parts.next())?),
            "right" => Command::Right(number("right", parts.next())?),
            "forward" => Command::Forward(number("forward", parts.next())?),
            "back" => Command::Back(number("back", parts.next())?),
            "up" => Command::Up(number("up", parts.next())?),
            "down" => Command::Down(number("down", parts.next())?),
            "cw" => Command::RotateRight(number("cw", parts.next())?),
            "ccw" => Command::RotateLeft(number("ccw", parts.next())?),
            "flip" => {
                let code = parts.next().ok_or(ParseCommandError::MissingArgument("flip"))?;
                let direction =
                    Direction::from_code(code).ok_or_else(|| ParseCommandError::InvalidValue {
                        verb: "flip",
                        value: code.to_string(),
                    })?;
                Command::Flip(direction)
            }
            other => return Err(ParseCommandError::UnknownVerb(other.to_string())),
        };

        if parts.next().is_some() {
            return Err(ParseCommandError::UnexpectedArgument(command.verb()));
        }

        Ok(command)
    }
}

fn number(verb: &'static str, arg: Option<&str>) -> Result<u32, ParseCommandError> {
    let arg = arg.ok_or(ParseCommandError::MissingArgument(verb))?;
    let invalid = || ParseCommandError::InvalidValue {
        verb,
        value: arg.to_string(),
    };

    // Only the form `encode` produces: plain decimal digits, no sign or padding
    if !arg.bytes().all(|b| b.is_ascii_digit()) || (arg.len() > 1 && arg.starts_with('0')) {
        return Err(invalid());
    }
    arg.parse().map_err(|_| invalid())
}
