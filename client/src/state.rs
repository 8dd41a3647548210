//! [`State`] of the client session.

use std::time::Instant;

use common::Role;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::api::User;

/// Status of the client session.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum Status {
    /// Nothing is known about the session yet.
    #[default]
    #[display("uninitialized")]
    Uninitialized,

    /// The very first verification is in flight.
    #[display("initializing")]
    Initializing,

    /// The server confirmed the session.
    #[display("authenticated")]
    Authenticated,

    /// There is no usable session.
    #[display("unauthenticated")]
    Unauthenticated,

    /// A verification of an already known session is in flight.
    #[display("rechecking")]
    Rechecking,
}

/// Event moving the client session from one [`Status`] to another.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// Verification request is sent.
    CheckStarted,

    /// Server confirmed the session.
    Verified,

    /// Server refused the session or couldn't be reached.
    Rejected,

    /// Server is temporarily unable to verify the session.
    Unavailable {
        /// Whether a [`User`] is cached from an earlier verification.
        cached: bool,
    },

    /// Credentials were accepted.
    SignedIn,

    /// Session was ended locally.
    SignedOut,
}

impl Status {
    /// Returns the [`Status`] following this one on the provided [`Event`].
    ///
    /// No [`Event`] ever leads back to [`Status::Uninitialized`].
    #[must_use]
    pub const fn next(self, event: Event) -> Self {
        use Event as E;

        match (self, event) {
            (Self::Uninitialized, E::CheckStarted) => Self::Initializing,
            (Self::Authenticated | Self::Unauthenticated, E::CheckStarted) => {
                Self::Rechecking
            }
            (Self::Initializing | Self::Rechecking, E::CheckStarted) => self,
            (
                _,
                E::Verified | E::SignedIn | E::Unavailable { cached: true },
            ) => Self::Authenticated,
            (
                _,
                E::Rejected | E::SignedOut | E::Unavailable { cached: false },
            ) => Self::Unauthenticated,
        }
    }

    /// Indicates whether a verification is in flight.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Initializing | Self::Rechecking)
    }
}

/// State of the client session.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// [`User`] owning the session, if known.
    pub user: Option<User>,

    /// Current [`Status`].
    pub status: Status,

    /// Human-readable description of the last failure.
    pub error: Option<String>,

    /// [`Instant`] of the last completed verification.
    pub last_checked: Option<Instant>,

    /// Number of verification requests sent.
    pub auth_check_count: u64,
}

impl State {
    /// Indicates whether the session is confirmed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == Status::Authenticated
    }

    /// Indicates whether a verification is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// Indicates whether the first verification has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !matches!(self.status, Status::Uninitialized | Status::Initializing)
    }

    /// Returns the [`Role`] of the authenticated [`User`], if any.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.is_authenticated()
            .then(|| self.user.as_ref().map(|u| u.role))
            .flatten()
    }

    /// Applies the provided [`Event`] to the [`Status`].
    pub(crate) fn apply(&mut self, event: Event) {
        let next = self.status.next(event);
        if next != self.status {
            tracing::debug!(from = %self.status, to = %next, "session status");
        }
        self.status = next;
    }
}

/// Persistable part of a [`State`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    /// Cached [`User`].
    pub user: Option<User>,

    /// Whether the session was confirmed when the [`Snapshot`] was taken.
    pub is_authenticated: bool,
}

impl From<&State> for Snapshot {
    fn from(state: &State) -> Self {
        Self {
            user: state.user.clone(),
            is_authenticated: state.is_authenticated(),
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{Event, Status};

    const ALL: [Status; 5] = [
        Status::Uninitialized,
        Status::Initializing,
        Status::Authenticated,
        Status::Unauthenticated,
        Status::Rechecking,
    ];

    const EVENTS: [Event; 7] = [
        Event::CheckStarted,
        Event::Verified,
        Event::Rejected,
        Event::Unavailable { cached: true },
        Event::Unavailable { cached: false },
        Event::SignedIn,
        Event::SignedOut,
    ];

    #[test]
    fn first_check_initializes() {
        assert_eq!(
            Status::Uninitialized.next(Event::CheckStarted),
            Status::Initializing,
        );
        assert_eq!(
            Status::Initializing.next(Event::Verified),
            Status::Authenticated,
        );
        assert_eq!(
            Status::Initializing.next(Event::Rejected),
            Status::Unauthenticated,
        );
    }

    #[test]
    fn later_checks_recheck() {
        for from in [Status::Authenticated, Status::Unauthenticated] {
            assert_eq!(from.next(Event::CheckStarted), Status::Rechecking);
        }
    }

    #[test]
    fn unavailability_keeps_cached_session() {
        assert_eq!(
            Status::Rechecking.next(Event::Unavailable { cached: true }),
            Status::Authenticated,
        );
        assert_eq!(
            Status::Initializing.next(Event::Unavailable { cached: false }),
            Status::Unauthenticated,
        );
    }

    #[test]
    fn never_returns_to_uninitialized() {
        for from in ALL {
            for event in EVENTS {
                assert_ne!(
                    from.next(event),
                    Status::Uninitialized,
                    "{from} on {event:?}",
                );
            }
        }
    }
}
