//! Command dispatcher - one command at a time over the session

use crate::config::DispatchConfig;
use crate::transport::TransportSession;
use std::sync::Arc;
use tello_shared::{codec, Command, CommandError, CommandOutcome};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Published for every resolved submission
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub command: Command,
    pub outcome: CommandOutcome,
}

/// Sends commands to the drone and pairs each with its reply
///
/// The protocol has no correlation id, so replies are matched to commands by
/// allowing a single outstanding submission per session. Concurrent callers
/// queue on the slot in arrival order.
pub struct CommandDispatcher {
    session: Arc<TransportSession>,
    config: DispatchConfig,
    slot: Mutex<()>,
    results: broadcast::Sender<CommandReport>,
}

impl CommandDispatcher {
    /// Create a dispatcher over an owned session
    pub fn new(session: Arc<TransportSession>, config: DispatchConfig) -> Self {
        let (results, _) = broadcast::channel(config.result_buffer.max(1));
        Self {
            session,
            config,
            slot: Mutex::new(()),
            results,
        }
    }

    pub fn session(&self) -> &Arc<TransportSession> {
        &self.session
    }

    /// Stream of every resolved submission, in resolution order
    pub fn subscribe(&self) -> broadcast::Receiver<CommandReport> {
        self.results.subscribe()
    }

    /// Send a command and wait for its single reply
    ///
    /// Submissions made after the session was cancelled fail with
    /// [`CommandError::Cancelled`] and are not published.
    pub async fn submit(&self, command: Command) -> CommandOutcome {
        if self.session.is_cancelled() {
            debug!("[CMD] '{}' dropped, session cancelled", command);
            return Err(CommandError::Cancelled);
        }

        let outcome = self.dispatch(command).await;

        match &outcome {
            Ok(reply) => info!("[CMD] '{}' -> {}", command, reply.trim_end()),
            Err(e) => warn!("[CMD] '{}' failed: {}", command, e),
        }

        // No subscribers is fine
        let _ = self.results.send(CommandReport {
            command,
            outcome: outcome.clone(),
        });

        outcome
    }

    async fn dispatch(&self, command: Command) -> CommandOutcome {
        if self.config.validate_commands {
            command.validate()?;
        }

        let _slot = self.slot.lock().await;

        self.session.wait_ready(self.config.ready_timeout).await?;

        let payload = codec::encode(&command);
        debug!("[CMD] Sending '{}' to {}", command, self.session.peer());

        exchange(&self.session, &payload).await
    }
}

/// Drive the send and the reply wait together until one of them settles the outcome.
///
/// Replies left over from an earlier command that timed out are discarded
/// first, so the next datagram read belongs to this command. The receive is
/// registered alongside the send so a fast reply is never missed. The first
/// completion observed wins; when both are ready in the same poll the send is
/// examined first, so a local send failure takes precedence over a reply.
/// Returning drops the other future.
async fn exchange(session: &TransportSession, payload: &[u8]) -> CommandOutcome {
    session.discard_stale()?;

    let send = session.send(payload);
    let receive = session.receive();
    tokio::pin!(send, receive);

    let mut sent = false;
    loop {
        tokio::select! {
            biased;
            result = &mut send, if !sent => match result {
                Ok(()) => sent = true,
                Err(e) => return Err(e),
            },
            reply = &mut receive => return reply,
        }
    }
}
