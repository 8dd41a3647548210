//! [`Store`] of the client session.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use crate::{
    api::{Api, ApiError, Login, Logout, Me, Register, User},
    clock::{Clock, SystemClock},
    state::{Event, Snapshot, State, Status},
};

/// Age after which a confirmed session is verified with the server again.
pub const RECHECK_THRESHOLD: Duration = Duration::from_secs(30 * 60);

/// Rolling window of the verification [`BURST_LIMIT`].
pub const BURST_WINDOW: Duration = Duration::from_secs(3);

/// Maximum number of verification requests sent within a [`BURST_WINDOW`].
pub const BURST_LIMIT: usize = 3;

/// Injectable container of the client session [`State`].
///
/// Each instance is isolated, so any number of them may coexist.
#[derive(Debug)]
pub struct Store<A, C = SystemClock> {
    /// [`Api`] of the authentication server.
    api: A,

    /// [`Clock`] measuring verification age.
    clock: C,

    /// Current [`State`].
    state: State,

    /// [`BurstLimiter`] of verification requests.
    limiter: BurstLimiter,
}

impl<A, C> Store<A, C> {
    /// Creates a new [`Store`] knowing nothing about the session yet.
    #[must_use]
    pub fn new(api: A, clock: C) -> Self {
        Self {
            api,
            clock,
            state: State::default(),
            limiter: BurstLimiter::new(BURST_WINDOW, BURST_LIMIT),
        }
    }

    /// Creates a new [`Store`] out of a previously persisted [`Snapshot`].
    ///
    /// The restored [`User`] is only a hint: the session stays
    /// [`Status::Uninitialized`] until [`Store::initialize()`] verifies it.
    #[must_use]
    pub fn restore(api: A, clock: C, snapshot: Snapshot) -> Self {
        let mut store = Self::new(api, clock);
        store.state.user =
            snapshot.user.filter(|_| snapshot.is_authenticated);
        store
    }

    /// Returns the current [`State`].
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Takes a persistable [`Snapshot`] of the current [`State`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        (&self.state).into()
    }

    /// Forgets the last failure.
    pub fn clear_error(&mut self) {
        self.state.error = None;
    }
}

impl<A, C> Store<A, C>
where
    A: Api<Me, Ok = User, Err = ApiError>,
    C: Clock,
{
    /// Verifies the session with the server, unless it has been done
    /// already.
    pub async fn initialize(&mut self) {
        if self.state.status == Status::Uninitialized {
            _ = self.check_auth().await;
        }
    }

    /// Returns whether the session is authenticated, asking the server only
    /// when the cached answer can't be trusted.
    ///
    /// A confirmed session younger than [`RECHECK_THRESHOLD`] is trusted as
    /// is. Requests beyond [`BURST_LIMIT`] within a [`BURST_WINDOW`] are
    /// suppressed and answered from the cached [`State`].
    #[tracing::instrument(skip_all, fields(status = %self.state.status))]
    pub async fn check_auth(&mut self) -> bool {
        let now = self.clock.now();

        let fresh = self
            .state
            .last_checked
            .is_some_and(|at| now.duration_since(at) < RECHECK_THRESHOLD);
        if self.state.is_authenticated() && fresh {
            return true;
        }

        if !self.limiter.try_acquire(now) {
            tracing::debug!("verification suppressed by burst limit");
            return self.state.is_authenticated();
        }

        self.state.auth_check_count += 1;
        self.state.apply(Event::CheckStarted);

        match self.api.execute(Me).await {
            Ok(user) => {
                self.state.user = Some(user);
                self.state.error = None;
                self.state.last_checked = Some(now);
                self.state.apply(Event::Verified);
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!("server unavailable, keeping cached session");
                self.state.error = Some(e.to_string());
                let cached = self.state.user.is_some();
                self.state.apply(Event::Unavailable { cached });
            }
            Err(e) => {
                tracing::debug!("session rejected: {e}");
                self.state.error = match e {
                    ApiError::Unauthorized(_) | ApiError::NotFound => None,
                    ApiError::Network(_)
                    | ApiError::Rejected(_)
                    | ApiError::Unavailable
                    | ApiError::Unexpected(_) => Some(e.to_string()),
                };
                self.state.user = None;
                self.state.last_checked = Some(now);
                self.state.apply(Event::Rejected);
            }
        }

        self.state.is_authenticated()
    }

    /// Records a successful sign-in of the provided [`User`].
    fn signed_in(&mut self, user: User) {
        tracing::info!(user_id = %user.id, "signed in");
        self.state.user = Some(user);
        self.state.error = None;
        self.state.last_checked = Some(self.clock.now());
        self.state.apply(Event::SignedIn);
    }
}

impl<A, C> Store<A, C>
where
    A: Api<Me, Ok = User, Err = ApiError>
        + Api<Login, Ok = User, Err = ApiError>,
    C: Clock,
{
    /// Starts a session with the provided credentials.
    ///
    /// # Errors
    ///
    /// If the server refuses the credentials or can't be reached. The
    /// [`State`] is left intact then, apart from its `error`.
    #[tracing::instrument(skip_all)]
    pub async fn login(
        &mut self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), ApiError> {
        let req = Login {
            email: email.into(),
            password: password.into(),
        };
        match <A as Api<Login>>::execute(&self.api, req).await {
            Ok(user) => {
                self.signed_in(user);
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl<A, C> Store<A, C>
where
    A: Api<Me, Ok = User, Err = ApiError>
        + Api<Register, Ok = User, Err = ApiError>,
    C: Clock,
{
    /// Registers a new [`User`] and starts its session.
    ///
    /// # Errors
    ///
    /// If the server rejects the registration or can't be reached. The
    /// [`State`] is left intact then, apart from its `error`.
    #[tracing::instrument(skip_all)]
    pub async fn register(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), ApiError> {
        let req = Register {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        };
        match <A as Api<Register>>::execute(&self.api, req).await {
            Ok(user) => {
                self.signed_in(user);
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl<A, C> Store<A, C>
where
    A: Api<Logout, Ok = (), Err = ApiError>,
{
    /// Ends the session.
    ///
    /// The [`State`] becomes [`Status::Unauthenticated`] even if the server
    /// can't be reached.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&mut self) {
        if let Err(e) = self.api.execute(Logout).await {
            tracing::warn!("failed to end session on server: {e}");
        }
        self.state.user = None;
        self.state.error = None;
        self.state.last_checked = None;
        self.state.apply(Event::SignedOut);
    }
}

/// Limiter of requests within a rolling time window.
#[derive(Clone, Debug)]
struct BurstLimiter {
    /// Duration of the rolling window.
    window: Duration,

    /// Maximum number of requests within the `window`.
    limit: usize,

    /// [`Instant`]s of the requests within the `window`.
    sent: VecDeque<Instant>,
}

impl BurstLimiter {
    /// Creates a new [`BurstLimiter`] allowing `limit` requests per `window`.
    fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit,
            sent: VecDeque::with_capacity(limit),
        }
    }

    /// Registers a request at the provided [`Instant`], unless the limit is
    /// reached.
    fn try_acquire(&mut self, now: Instant) -> bool {
        while self
            .sent
            .front()
            .is_some_and(|at| now.duration_since(*at) >= self.window)
        {
            _ = self.sent.pop_front();
        }
        if self.sent.len() >= self.limit {
            return false;
        }
        self.sent.push_back(now);
        true
    }
}
