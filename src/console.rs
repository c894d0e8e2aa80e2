//! Line-oriented console controls
//!
//! Keywords stand in for the buttons of a handheld controller; anything else
//! is read as a raw SDK command line such as `cw 90`.

use crate::command::Plan;
use std::collections::HashMap;
use std::time::Duration;
use tello_shared::command::ParseCommandError;
use tello_shared::{Command, Direction};
use tokio::time::Instant;

/// Ignore repeats of the same control within this window
const THROTTLE_WINDOW: Duration = Duration::from_secs(1);

/// Plans take longer to start, so their control is throttled harder
const PLAN_THROTTLE_WINDOW: Duration = Duration::from_secs(2);

/// What a console line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    Submit(Command),
    RunPlan(Plan),
    Cancel,
    Quit,
}

/// A parsed line plus the key used for throttling repeats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInput {
    pub key: String,
    pub action: ConsoleAction,
}

impl ConsoleInput {
    fn throttle_window(&self) -> Duration {
        match self.action {
            ConsoleAction::RunPlan(_) => PLAN_THROTTLE_WINDOW,
            _ => THROTTLE_WINDOW,
        }
    }
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(
    line: &str,
    plan_delay: Duration,
) -> Result<Option<ConsoleInput>, ParseCommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let action = match line {
        "setup" => ConsoleAction::Submit(Command::Start),
        "flip" => ConsoleAction::Submit(Command::Flip(Direction::Forward)),
        "left" => ConsoleAction::Submit(Command::Left(100)),
        "right" => ConsoleAction::Submit(Command::Right(100)),
        "pattern1" => {
            let demo = Plan::pattern_demo();
            ConsoleAction::RunPlan(Plan::with_commands(demo.commands().to_vec(), plan_delay))
        }
        "pattern2" => ConsoleAction::Submit(Command::Up(100)),
        "cancel" => ConsoleAction::Cancel,
        "quit" | "exit" => ConsoleAction::Quit,
        // takeoff, land, emergency and every raw command line
        other => ConsoleAction::Submit(other.parse()?),
    };

    Ok(Some(ConsoleInput {
        key: line.to_string(),
        action,
    }))
}

/// Drops repeated presses of the same control
#[derive(Debug, Default)]
pub struct Throttle {
    last_accepted: HashMap<String, Instant>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the input should go through at `now`
    pub fn allow(&mut self, input: &ConsoleInput, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(&input.key) {
            if now.saturating_duration_since(*last) < input.throttle_window() {
                return false;
            }
        }
        self.last_accepted.insert(input.key.clone(), now);
        true
    }
}
