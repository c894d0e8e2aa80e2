//! Session Lifecycle State Machine
//!
//! Defines the valid lifecycle transitions of a transport session:
//! ```text
//! Setup -> Preparing -> Ready
//!             |  ^
//!             v  |
//!           Waiting
//! any non-terminal -> Failed | Cancelled   (both terminal)
//! ```

use std::fmt;

/// Lifecycle state of a transport session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not started
    Setup,
    /// Binding and connecting the socket
    Preparing,
    /// Socket usable for send and receive
    Ready,
    /// Temporarily unable to reach the peer, setup will be retried
    Waiting { cause: String },
    /// Setup gave up
    Failed { cause: String },
    /// Closed by its owner
    Cancelled,
}

impl SessionState {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Failed { .. } | SessionState::Cancelled)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Setup => write!(f, "setup"),
            SessionState::Preparing => write!(f, "preparing"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Waiting { cause } => write!(f, "waiting ({})", cause),
            SessionState::Failed { cause } => write!(f, "failed ({})", cause),
            SessionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events that can trigger lifecycle transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Owner started the session
    Start,
    /// Socket bound and associated with the peer
    Connected,
    /// Peer temporarily unreachable
    NetworkUnavailable { cause: String },
    /// Setup attempt is being repeated after a wait
    Retry,
    /// Setup cannot succeed
    Fatal { cause: String },
    /// Owner cancelled the session
    Cancel,
}

/// Result of a transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(SessionState),
    /// Transition was invalid from current state
    Invalid { from: SessionState, event: SessionEvent },
}

/// The lifecycle state machine of one session
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Create a new state machine in Setup state
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Setup,
        }
    }

    /// Get current state
    pub fn state(&self) -> &SessionState {
        &self.current_state
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: SessionEvent) -> TransitionResult {
        match self.next_state(&event) {
            Some(state) => {
                self.current_state = state.clone();
                TransitionResult::Success(state)
            }
            None => TransitionResult::Invalid {
                from: self.current_state.clone(),
                event,
            },
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn next_state(&self, event: &SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        use SessionState::*;

        if self.current_state.is_terminal() {
            return None;
        }

        match (&self.current_state, event) {
            // Terminal transitions are accepted from every live state
            (_, Cancel) => Some(Cancelled),
            (_, Fatal { cause }) => Some(Failed {
                cause: cause.clone(),
            }),

            (Setup, Start) => Some(Preparing),

            (Preparing, Connected) => Some(Ready),
            (Preparing, NetworkUnavailable { cause }) => Some(Waiting {
                cause: cause.clone(),
            }),

            (Waiting { .. }, Retry) => Some(Preparing),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let fsm = SessionStateMachine::new();
        assert_eq!(fsm.state(), &SessionState::Setup);
    }

    #[test]
    fn test_happy_path() {
        let mut fsm = SessionStateMachine::new();
        assert_eq!(
            fsm.process_event(SessionEvent::Start),
            TransitionResult::Success(SessionState::Preparing)
        );
        assert_eq!(
            fsm.process_event(SessionEvent::Connected),
            TransitionResult::Success(SessionState::Ready)
        );
        assert!(fsm.state().is_ready());
    }

    #[test]
    fn test_waiting_recovers() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(SessionEvent::Start);
        fsm.process_event(SessionEvent::NetworkUnavailable {
            cause: "Network is unreachable".into(),
        });
        assert!(matches!(fsm.state(), SessionState::Waiting { .. }));

        assert_eq!(
            fsm.process_event(SessionEvent::Retry),
            TransitionResult::Success(SessionState::Preparing)
        );
        fsm.process_event(SessionEvent::Connected);
        assert_eq!(fsm.state(), &SessionState::Ready);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(SessionEvent::Start);
        fsm.process_event(SessionEvent::Cancel);
        assert_eq!(fsm.state(), &SessionState::Cancelled);

        let result = fsm.process_event(SessionEvent::Connected);
        assert!(matches!(result, TransitionResult::Invalid { .. }));

        let mut fsm = SessionStateMachine::new();
        fsm.process_event(SessionEvent::Fatal {
            cause: "bind failed".into(),
        });
        assert!(fsm.state().is_terminal());
        assert!(matches!(
            fsm.process_event(SessionEvent::Cancel),
            TransitionResult::Invalid { .. }
        ));
    }

    #[test]
    fn test_invalid_transition() {
        let mut fsm = SessionStateMachine::new();
        let result = fsm.process_event(SessionEvent::Connected);
        assert_eq!(
            result,
            TransitionResult::Invalid {
                from: SessionState::Setup,
                event: SessionEvent::Connected,
            }
        );
        assert_eq!(fsm.state(), &SessionState::Setup);
    }

    #[test]
    fn test_ready_and_waiting_only_move_through_setup() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(SessionEvent::Start);
        fsm.process_event(SessionEvent::Connected);
        assert!(matches!(
            fsm.process_event(SessionEvent::NetworkUnavailable {
                cause: "Network is unreachable".into(),
            }),
            TransitionResult::Invalid { .. }
        ));
        assert_eq!(fsm.state(), &SessionState::Ready);

        let mut fsm = SessionStateMachine::new();
        fsm.process_event(SessionEvent::Start);
        fsm.process_event(SessionEvent::NetworkUnavailable {
            cause: "Network is unreachable".into(),
        });
        assert!(matches!(
            fsm.process_event(SessionEvent::Connected),
            TransitionResult::Invalid { .. }
        ));
    }

    #[test]
    fn test_start_only_once() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(SessionEvent::Start);
        assert!(matches!(
            fsm.process_event(SessionEvent::Start),
            TransitionResult::Invalid { .. }
        ));
    }
}
