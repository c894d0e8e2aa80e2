//! Plan sequencer - runs a list of commands at a fixed pace

use super::dispatcher::CommandDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tello_shared::{Command, CommandOutcome, Direction};
use tracing::{debug, info};

/// Ordered commands with a fixed delay between successive submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    commands: Vec<Command>,
    delay: Duration,
}

impl Plan {
    /// Create an empty plan
    pub fn new(delay: Duration) -> Self {
        Self {
            commands: Vec::new(),
            delay,
        }
    }

    pub fn with_commands(commands: impl IntoIterator<Item = Command>, delay: Duration) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            delay,
        }
    }

    /// Append a command
    pub fn then(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Short demonstration flight: climb, dip, sidestep both ways, two flips, land
    pub fn pattern_demo() -> Self {
        Self::with_commands(
            [
                Command::TakeOff,
                Command::Up(30),
                Command::Down(30),
                Command::Left(100),
                Command::Right(100),
                Command::Flip(Direction::Forward),
                Command::Flip(Direction::Back),
                Command::Land,
            ],
            Duration::from_secs(1),
        )
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Executes plans through a dispatcher
pub struct PlanSequencer {
    dispatcher: Arc<CommandDispatcher>,
}

impl PlanSequencer {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run a plan, returning one outcome per submitted command in plan order
    ///
    /// A failed command does not stop the plan. If the session is cancelled,
    /// the pending delay is abandoned and the remaining commands are never
    /// submitted, so the result is shorter than the plan.
    pub async fn run(&self, plan: &Plan) -> Vec<CommandOutcome> {
        let session = self.dispatcher.session();
        let mut outcomes = Vec::with_capacity(plan.len());

        info!(
            "[PLAN] Running {} commands, {:?} apart",
            plan.len(),
            plan.delay()
        );

        for (index, command) in plan.commands().iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    biased;
                    _ = session.cancelled() => {}
                    _ = tokio::time::sleep(plan.delay()) => {}
                }
            }

            if session.is_cancelled() {
                info!(
                    "[PLAN] Session cancelled, {} of {} commands not sent",
                    plan.len() - index,
                    plan.len()
                );
                break;
            }

            debug!("[PLAN] Step {}/{}: {}", index + 1, plan.len(), command);
            outcomes.push(self.dispatcher.submit(*command).await);
        }

        outcomes
    }
}
