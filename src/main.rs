use std::sync::Arc;
use tello_edge::console::{self, ConsoleAction, Throttle};
use tello_edge::{
    CommandDispatcher, CommandReport, PlanSequencer, SessionState, TelloConfig, TransportSession,
};
use tello_shared::codec::Reply;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = TelloConfig::from_env()?;

    info!("Tello link starting");
    info!("  peer: {}", config.session.peer);
    info!("  receive timeout: {:?}", config.session.receive_timeout);

    let session = Arc::new(TransportSession::udp(config.session.clone()));
    tokio::spawn(log_state_changes(session.subscribe()));
    session.start()?;

    let dispatcher = Arc::new(CommandDispatcher::new(
        session.clone(),
        config.dispatch.clone(),
    ));
    let sequencer = Arc::new(PlanSequencer::new(dispatcher.clone()));
    tokio::spawn(print_results(dispatcher.subscribe()));

    info!("Controls: setup takeoff land flip left right emergency pattern1 pattern2 cancel quit");
    info!("Any other line is sent as a raw SDK command, e.g. 'cw 90'");

    let mut throttle = Throttle::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = match console::parse_line(&line, config.plan_delay) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        if !throttle.allow(&input, tokio::time::Instant::now()) {
            debug!("Ignoring repeated '{}'", input.key);
            continue;
        }

        // Submissions run in their own tasks so 'cancel' stays responsive
        match input.action {
            ConsoleAction::Submit(command) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let _ = dispatcher.submit(command).await;
                });
            }
            ConsoleAction::RunPlan(plan) => {
                let sequencer = sequencer.clone();
                tokio::spawn(async move {
                    let outcomes = sequencer.run(&plan).await;
                    let errors: Vec<_> =
                        outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
                    let timed_out = errors.iter().filter(|e| e.is_timeout()).count();
                    if errors.iter().any(|e| e.is_cancelled()) {
                        info!(
                            "Plan cancelled after {} of {} steps",
                            outcomes.len(),
                            plan.len()
                        );
                    }
                    info!(
                        "Plan finished: {} sent, {} failed ({} timed out)",
                        outcomes.len(),
                        errors.len(),
                        timed_out
                    );
                });
            }
            ConsoleAction::Cancel => session.cancel(),
            ConsoleAction::Quit => break,
        }
    }

    session.cancel();
    info!("Tello link stopped");
    Ok(())
}

/// Log every lifecycle transition of the session
async fn log_state_changes(mut state_rx: watch::Receiver<SessionState>) {
    loop {
        let state = state_rx.borrow_and_update().clone();
        match &state {
            SessionState::Waiting { cause } => warn!("[LINK] Waiting: {}", cause),
            SessionState::Failed { cause } => error!("[LINK] Failed: {}", cause),
            other => info!("[LINK] {}", other),
        }
        if state.is_terminal() || state_rx.changed().await.is_err() {
            break;
        }
    }
}

/// Print every command outcome from the result stream
async fn print_results(mut results: broadcast::Receiver<CommandReport>) {
    loop {
        match results.recv().await {
            Ok(CommandReport {
                command,
                outcome: Ok(reply),
            }) => match Reply::classify(&reply) {
                Reply::Error(reason) => warn!("Message: {} -> error {}", command, reason),
                classified if classified.is_ok() => info!("Message: {} -> ok", command),
                _ => info!("Message: {} -> {}", command, reply.trim_end()),
            },
            Ok(CommandReport {
                command,
                outcome: Err(e),
            }) => {
                error!("Error: {} -> {}", command, e);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Result stream lagged, {} results skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
