//! Transport session with an explicit lifecycle
//!
//! Owns one datagram link to a fixed peer. Setup runs in a background task;
//! lifecycle changes are published on a watch channel so that every pending
//! send or receive wakes up as soon as the session is cancelled.

use crate::config::SessionConfig;
use crate::transport::traits::{DatagramConnector, DatagramLink};
use crate::transport::udp::UdpConnector;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tello_shared::codec;
use tello_shared::{
    CommandError, ReceiveFailure, SessionEvent, SessionState, SessionStateMachine,
    TransitionResult,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// State guarded together so a transition and the link it affects change atomically
struct Inner {
    fsm: SessionStateMachine,
    link: Option<Arc<dyn DatagramLink>>,
}

/// Lifecycle shared between the session handle and its setup task
struct Lifecycle {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
}

impl Lifecycle {
    fn new() -> Self {
        let fsm = SessionStateMachine::new();
        let (state_tx, _) = watch::channel(fsm.state().clone());
        Self {
            inner: Mutex::new(Inner { fsm, link: None }),
            state_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an event, publishing the new state. Returns false if it was rejected.
    fn transition(&self, event: SessionEvent) -> bool {
        let mut inner = self.lock();
        self.apply(&mut inner, event)
    }

    /// Store the link and move to `Ready`, unless the session ended meanwhile
    fn install_link(&self, link: Arc<dyn DatagramLink>) -> bool {
        let mut inner = self.lock();
        if !self.apply(&mut inner, SessionEvent::Connected) {
            return false;
        }
        inner.link = Some(link);
        true
    }

    fn apply(&self, inner: &mut Inner, event: SessionEvent) -> bool {
        match inner.fsm.process_event(event) {
            TransitionResult::Success(state) => {
                if state.is_terminal() {
                    // Dropping the last handle closes the socket
                    inner.link = None;
                }
                debug!("[SESSION] State -> {}", state);
                self.state_tx.send_replace(state);
                true
            }
            TransitionResult::Invalid { from, event } => {
                debug!("[SESSION] Ignored {:?} in state {}", event, from);
                false
            }
        }
    }
}

/// A single datagram association to the drone
pub struct TransportSession {
    config: SessionConfig,
    connector: Arc<dyn DatagramConnector>,
    lifecycle: Arc<Lifecycle>,
    setup_task: Mutex<Option<JoinHandle<()>>>,
}

impl TransportSession {
    /// Create a session in `Setup` state; nothing happens until [`start`](Self::start)
    pub fn new(config: SessionConfig, connector: impl DatagramConnector) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            lifecycle: Arc::new(Lifecycle::new()),
            setup_task: Mutex::new(None),
        }
    }

    /// Create a session over UDP using the configured bind and peer addresses
    pub fn udp(config: SessionConfig) -> Self {
        let connector = UdpConnector::new(config.bind, config.peer);
        Self::new(config, connector)
    }

    /// Begin the asynchronous setup. Must be called from within a tokio runtime, once.
    pub fn start(&self) -> Result<(), CommandError> {
        if !self.lifecycle.transition(SessionEvent::Start) {
            return Err(CommandError::TransportSetup(format!(
                "Session cannot be started in state {}",
                self.state()
            )));
        }

        info!(
            "[SESSION] Starting {} session to {}",
            self.connector.name(),
            self.config.peer
        );

        let handle = tokio::spawn(setup_loop(
            self.config.clone(),
            self.connector.clone(),
            self.lifecycle.clone(),
        ));
        *self.setup_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.lifecycle.state_tx.borrow().clone()
    }

    /// Watch lifecycle changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.lifecycle.state_tx.subscribe()
    }

    pub fn peer(&self) -> SocketAddr {
        self.config.peer
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state(), SessionState::Cancelled)
    }

    /// Resolve once the session has been cancelled
    pub async fn cancelled(&self) {
        let mut state_rx = self.subscribe();
        // The sender lives as long as `self`, so an error cannot happen here
        let _ = state_rx
            .wait_for(|state| matches!(state, SessionState::Cancelled))
            .await;
    }

    /// Wait until the session is `Ready`
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), CommandError> {
        let mut state_rx = self.subscribe();
        let waited = tokio::time::timeout(
            timeout,
            state_rx.wait_for(|state| state.is_ready() || state.is_terminal()),
        )
        .await;

        let state = match waited {
            Ok(Ok(state)) => state.clone(),
            Ok(Err(_)) => SessionState::Cancelled,
            Err(_) => {
                return Err(CommandError::TransportSetup(format!(
                    "Not ready after {:?} (state: {})",
                    timeout,
                    self.state()
                )))
            }
        };

        match state {
            SessionState::Ready => Ok(()),
            SessionState::Cancelled => Err(CommandError::Cancelled),
            other => Err(CommandError::TransportSetup(other.to_string())),
        }
    }

    /// Send one datagram. Fails immediately unless the session is `Ready`.
    pub async fn send(&self, payload: &[u8]) -> Result<(), CommandError> {
        let link = self.ready_link()?;
        let mut state_rx = self.subscribe();

        tokio::select! {
            biased;
            state = wait_terminal(&mut state_rx) => Err(match state {
                SessionState::Cancelled => CommandError::Cancelled,
                other => CommandError::Send(other.to_string()),
            }),
            sent = link.send(payload) => {
                sent.map_err(|e| CommandError::Send(e.to_string()))
            }
        }
    }

    /// Wait for the next reply datagram and decode it as text
    pub async fn receive(&self) -> Result<String, CommandError> {
        let link = self.ready_link()?;
        let mut state_rx = self.subscribe();
        let timeout = self.config.receive_timeout;

        tokio::select! {
            biased;
            state = wait_terminal(&mut state_rx) => Err(match state {
                SessionState::Cancelled => CommandError::Cancelled,
                other => CommandError::Receive(ReceiveFailure::Transport(other.to_string())),
            }),
            received = tokio::time::timeout(timeout, link.recv()) => match received {
                Err(_) => Err(CommandError::Receive(ReceiveFailure::Timeout(timeout))),
                Ok(Err(e)) => Err(CommandError::Receive(ReceiveFailure::Transport(e.to_string()))),
                Ok(Ok(payload)) => Ok(codec::decode_reply(&payload)?),
            }
        }
    }

    /// Drop replies that arrived after their command already resolved
    ///
    /// Returns how many datagrams were discarded. A failure to read the queue
    /// is logged and otherwise ignored, since the next receive reports it.
    pub fn discard_stale(&self) -> Result<usize, CommandError> {
        let link = self.ready_link()?;
        match link.drain() {
            Ok(stale) => {
                for datagram in &stale {
                    warn!(
                        "[SESSION] Dropping stale reply: {:?}",
                        String::from_utf8_lossy(datagram)
                    );
                }
                Ok(stale.len())
            }
            Err(e) => {
                warn!("[SESSION] Could not drain stale replies: {}", e);
                Ok(0)
            }
        }
    }

    /// Cancel the session, release the socket and wake every pending operation
    pub fn cancel(&self) {
        if self.lifecycle.transition(SessionEvent::Cancel) {
            info!("[SESSION] Cancelled");
        }
        if let Some(task) = self
            .setup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    fn ready_link(&self) -> Result<Arc<dyn DatagramLink>, CommandError> {
        let inner = self.lifecycle.lock();
        match (inner.fsm.state(), &inner.link) {
            (SessionState::Ready, Some(link)) => Ok(link.clone()),
            (SessionState::Cancelled, _) => Err(CommandError::Cancelled),
            (state, _) => Err(CommandError::TransportSetup(format!(
                "Session not ready (state: {})",
                state
            ))),
        }
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Some(task) = self
            .setup_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

/// Resolve with the terminal state once the session reaches one
async fn wait_terminal(state_rx: &mut watch::Receiver<SessionState>) -> SessionState {
    match state_rx.wait_for(|state| state.is_terminal()).await {
        Ok(state) => state.clone(),
        Err(_) => SessionState::Cancelled,
    }
}

/// Background setup: connect, waiting out temporary network outages
async fn setup_loop(
    config: SessionConfig,
    connector: Arc<dyn DatagramConnector>,
    lifecycle: Arc<Lifecycle>,
) {
    let mut attempt = 1;

    loop {
        debug!(
            "[SESSION] Connecting via {} (attempt {}/{})",
            connector.name(),
            attempt,
            config.max_setup_attempts
        );

        match connector.connect().await {
            Ok(link) => {
                let peer = link.peer();
                if lifecycle.install_link(Arc::from(link)) {
                    info!("[SESSION] Ready, peer {}", peer);
                }
                return;
            }
            Err(e) if is_network_unavailable(&e) && attempt < config.max_setup_attempts => {
                warn!("[SESSION] Network unavailable: {}", e);
                lifecycle.transition(SessionEvent::NetworkUnavailable {
                    cause: e.to_string(),
                });

                tokio::time::sleep(config.retry_delay).await;

                if !lifecycle.transition(SessionEvent::Retry) {
                    return;
                }
                attempt += 1;
            }
            Err(e) => {
                error!("[SESSION] Setup failed: {}", e);
                lifecycle.transition(SessionEvent::Fatal {
                    cause: e.to_string(),
                });
                return;
            }
        }
    }
}

/// Whether a setup error is a temporary outage worth waiting out
fn is_network_unavailable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>().is_some_and(|e| {
        matches!(
            e.kind(),
            io::ErrorKind::NetworkUnreachable
                | io::ErrorKind::HostUnreachable
                | io::ErrorKind::NetworkDown
                | io::ErrorKind::AddrNotAvailable
        )
    })
}
