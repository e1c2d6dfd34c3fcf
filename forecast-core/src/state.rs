//! Connection state machine for forecast sync.
//!
//! This module provides a pure, side-effect-free state machine for the
//! transport connection lifecycle. The state machine takes events as input
//! and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (connecting, closing, notifying observers) is performed by
//! forecast-client, not by this module.
//!
//! ```text
//!                 connect()                 success
//! Disconnected ──────────────► Connecting ──────────────► Connected
//!      ▲                          │  ▲                     │     ▲
//!      │                  failure │  │ connect()  interrupt│     │recovered
//!      │                          ▼  │                     ▼     │
//!      └──── disconnect() ───── Failed ◄────── lost ───── Suspended
//! ```
//!
//! `disconnect()` reaches `Disconnected` from every state.

use crate::{ConnectionFailure, SuspendCause};

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Connected; publish and subscribe are permitted.
    Connected,
    /// Interrupted after being connected; may recover.
    Suspended {
        /// Why the connection was interrupted.
        cause: SuspendCause,
    },
    /// The attempt failed or a suspension was given up.
    Failed {
        /// Why the connection failed.
        failure: ConnectionFailure,
    },
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller is responsible
    /// for executing the returned actions in order.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Connection attempts (retry from Failed is caller-driven)
            (Self::Disconnected | Self::Failed { .. }, Event::ConnectRequested) => {
                (Self::Connecting, vec![Action::Connect])
            }

            // From Connecting
            (Self::Connecting, Event::ConnectSucceeded) => (
                Self::Connected,
                vec![
                    Action::OpenSubscriptions,
                    Action::Notify(ConnectionEvent::Connected),
                ],
            ),
            (Self::Connecting, Event::ConnectFailed { failure }) => (
                Self::Failed {
                    failure: failure.clone(),
                },
                vec![Action::Notify(ConnectionEvent::Failed { failure })],
            ),

            // From Connected
            (Self::Connected, Event::Interrupted { cause }) => (
                Self::Suspended { cause },
                vec![
                    Action::ReleaseSubscriptions,
                    Action::Notify(ConnectionEvent::Suspended { cause }),
                ],
            ),

            // From Suspended
            (Self::Suspended { .. }, Event::Recovered) => (
                Self::Connected,
                vec![
                    Action::OpenSubscriptions,
                    Action::Notify(ConnectionEvent::Connected),
                ],
            ),
            (Self::Connected | Self::Suspended { .. }, Event::Lost { failure }) => (
                Self::Failed {
                    failure: failure.clone(),
                },
                vec![
                    Action::ReleaseSubscriptions,
                    Action::Notify(ConnectionEvent::Failed { failure }),
                ],
            ),

            // Disconnect from anywhere
            (Self::Disconnected, Event::DisconnectRequested) => (Self::Disconnected, vec![]),
            (Self::Connecting, Event::DisconnectRequested) => {
                (Self::Disconnected, vec![Action::Disconnect])
            }
            (_, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![Action::ReleaseSubscriptions, Action::Disconnect],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller requested a connection.
    ConnectRequested,
    /// Transport connection succeeded.
    ConnectSucceeded,
    /// Transport connection failed.
    ConnectFailed {
        /// Why the attempt failed.
        failure: ConnectionFailure,
    },
    /// A connected transport was interrupted.
    Interrupted {
        /// Why the transport was interrupted.
        cause: SuspendCause,
    },
    /// An interrupted transport came back.
    Recovered,
    /// The transport gave up (timeout or fatal error).
    Lost {
        /// Why the transport gave up.
        failure: ConnectionFailure,
    },
    /// Caller requested a disconnect.
    DisconnectRequested,
}

/// Actions to be executed by forecast-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start a transport connection attempt.
    Connect,
    /// Close the transport.
    Disconnect,
    /// Allow subscriptions to be registered.
    OpenSubscriptions,
    /// Drop every subscription and refuse new ones.
    ReleaseSubscriptions,
    /// Tell connection observers what happened.
    Notify(ConnectionEvent),
}

/// Lifecycle notifications delivered to connection observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connected (first time or after recovery).
    Connected,
    /// Connection interrupted.
    Suspended {
        /// Why the connection was interrupted.
        cause: SuspendCause,
    },
    /// Connection failed.
    Failed {
        /// Why the connection failed.
        failure: ConnectionFailure,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureCode;

    fn failure() -> ConnectionFailure {
        ConnectionFailure::new(FailureCode::Unreachable, "peer offline")
    }

    fn all_states() -> Vec<ConnectionState> {
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Suspended {
                cause: SuspendCause::NetworkLost,
            },
            ConnectionState::Failed { failure: failure() },
        ]
    }

    #[test]
    fn starts_disconnected() {
        let state = ConnectionState::new();
        assert!(matches!(state, ConnectionState::Disconnected));
    }

    #[test]
    fn connect_request_transitions_to_connecting() {
        let (new_state, actions) = ConnectionState::Disconnected.on_event(Event::ConnectRequested);

        assert_eq!(new_state, ConnectionState::Connecting);
        assert_eq!(actions, vec![Action::Connect]);
    }

    #[test]
    fn connect_request_never_yields_connected_directly() {
        for state in all_states() {
            if state.is_connected() {
                continue;
            }
            let (new_state, _) = state.on_event(Event::ConnectRequested);
            assert!(!new_state.is_connected());
        }
    }

    #[test]
    fn connect_is_idempotent_while_connecting_or_connected() {
        for state in [ConnectionState::Connecting, ConnectionState::Connected] {
            let (new_state, actions) = state.clone().on_event(Event::ConnectRequested);
            assert_eq!(new_state, state);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn connect_success_opens_subscriptions_before_notifying() {
        let (new_state, actions) = ConnectionState::Connecting.on_event(Event::ConnectSucceeded);

        assert_eq!(new_state, ConnectionState::Connected);
        assert_eq!(
            actions,
            vec![
                Action::OpenSubscriptions,
                Action::Notify(ConnectionEvent::Connected)
            ]
        );
    }

    #[test]
    fn connect_failure_transitions_to_failed_without_retry() {
        let (new_state, actions) =
            ConnectionState::Connecting.on_event(Event::ConnectFailed { failure: failure() });

        assert_eq!(new_state, ConnectionState::Failed { failure: failure() });
        assert_eq!(
            actions,
            vec![Action::Notify(ConnectionEvent::Failed { failure: failure() })]
        );
        assert!(!actions.contains(&Action::Connect));
    }

    #[test]
    fn retry_from_failed_goes_through_connecting() {
        let state = ConnectionState::Failed { failure: failure() };
        let (new_state, actions) = state.on_event(Event::ConnectRequested);

        assert_eq!(new_state, ConnectionState::Connecting);
        assert_eq!(actions, vec![Action::Connect]);
    }

    #[test]
    fn interruption_suspends_and_releases_subscriptions() {
        let (new_state, actions) = ConnectionState::Connected.on_event(Event::Interrupted {
            cause: SuspendCause::ServiceDisconnected,
        });

        assert_eq!(
            new_state,
            ConnectionState::Suspended {
                cause: SuspendCause::ServiceDisconnected
            }
        );
        assert_eq!(actions[0], Action::ReleaseSubscriptions);
        assert!(actions.contains(&Action::Notify(ConnectionEvent::Suspended {
            cause: SuspendCause::ServiceDisconnected
        })));
    }

    #[test]
    fn recovery_reconnects_and_reopens_subscriptions() {
        let state = ConnectionState::Suspended {
            cause: SuspendCause::NetworkLost,
        };
        let (new_state, actions) = state.on_event(Event::Recovered);

        assert_eq!(new_state, ConnectionState::Connected);
        assert!(actions.contains(&Action::OpenSubscriptions));
        assert!(actions.contains(&Action::Notify(ConnectionEvent::Connected)));
    }

    #[test]
    fn lost_while_suspended_fails() {
        let state = ConnectionState::Suspended {
            cause: SuspendCause::NetworkLost,
        };
        let (new_state, actions) = state.on_event(Event::Lost { failure: failure() });

        assert_eq!(new_state, ConnectionState::Failed { failure: failure() });
        assert!(actions.contains(&Action::Notify(ConnectionEvent::Failed { failure: failure() })));
    }

    #[test]
    fn disconnect_from_any_state_yields_disconnected() {
        for state in all_states() {
            let (new_state, _) = state.on_event(Event::DisconnectRequested);
            assert_eq!(new_state, ConnectionState::Disconnected);
        }
    }

    #[test]
    fn disconnect_releases_subscriptions_when_they_may_exist() {
        for state in [
            ConnectionState::Connected,
            ConnectionState::Suspended {
                cause: SuspendCause::NetworkLost,
            },
            ConnectionState::Failed { failure: failure() },
        ] {
            let (_, actions) = state.on_event(Event::DisconnectRequested);
            assert!(actions.contains(&Action::ReleaseSubscriptions));
            assert!(actions.contains(&Action::Disconnect));
        }
    }

    #[test]
    fn disconnect_while_connecting_closes_transport() {
        let (_, actions) = ConnectionState::Connecting.on_event(Event::DisconnectRequested);
        assert_eq!(actions, vec![Action::Disconnect]);
    }

    #[test]
    fn disconnect_when_disconnected_is_noop() {
        let (new_state, actions) =
            ConnectionState::Disconnected.on_event(Event::DisconnectRequested);
        assert_eq!(new_state, ConnectionState::Disconnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn late_connect_result_after_disconnect_is_ignored() {
        let (new_state, actions) = ConnectionState::Disconnected.on_event(Event::ConnectSucceeded);
        assert_eq!(new_state, ConnectionState::Disconnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn transport_events_ignored_when_not_applicable() {
        let (state, actions) = ConnectionState::Disconnected.on_event(Event::Recovered);
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(actions.is_empty());

        let (state, actions) = ConnectionState::Connecting.on_event(Event::Interrupted {
            cause: SuspendCause::NetworkLost,
        });
        assert_eq!(state, ConnectionState::Connecting);
        assert!(actions.is_empty());
    }

    #[test]
    fn is_connected_helper() {
        for state in all_states() {
            assert_eq!(
                state.is_connected(),
                matches!(state, ConnectionState::Connected)
            );
        }
    }
}
