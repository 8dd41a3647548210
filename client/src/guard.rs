//! [`Guard`] redirecting navigation according to the session [`State`].

use std::time::{Duration, Instant};

use common::{
    route::{self, Class},
    Role,
};

use crate::{
    clock::{Clock, SystemClock},
    state::State,
};

/// Duration a dispatched redirect blocks the following ones.
pub const REDIRECT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Consumer of a session [`State`] deciding where navigation should be
/// redirected to.
#[derive(Clone, Debug, Default)]
pub struct Guard<C = SystemClock> {
    /// [`Clock`] measuring the [`REDIRECT_DEBOUNCE`].
    clock: C,

    /// [`Instant`] until which a dispatched redirect is in progress.
    pending_until: Option<Instant>,
}

impl<C: Clock> Guard<C> {
    /// Creates a new [`Guard`] with no redirect in progress.
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            pending_until: None,
        }
    }

    /// Indicates whether a dispatched redirect is still in progress.
    #[must_use]
    pub fn is_redirecting(&self) -> bool {
        let now = self.clock.now();
        self.pending_until.is_some_and(|until| now < until)
    }

    /// Decides where navigation to the provided `path` should be redirected
    /// to, if anywhere.
    ///
    /// Nothing is decided while the session is being verified, or while a
    /// previously dispatched redirect is in progress.
    pub fn redirect(
        &mut self,
        path: &str,
        state: &State,
    ) -> Option<&'static str> {
        if !state.is_initialized()
            || state.is_loading()
            || self.is_redirecting()
        {
            return None;
        }

        let target = target(path, state.role())?;
        tracing::debug!(from = path, to = target, "redirecting");
        self.pending_until = Some(self.clock.now() + REDIRECT_DEBOUNCE);
        Some(target)
    }
}

/// Resolves the redirect target of navigating to the provided `path` with the
/// provided authenticated [`Role`] (if any).
fn target(path: &str, role: Option<Role>) -> Option<&'static str> {
    match (role, route::classify(path)) {
        (Some(role), _) if route::is_auth_page(path) => {
            Some(route::home_of(role))
        }
        (None, Class::Authenticated | Class::Admin) => Some(route::LOGIN),
        (Some(role), Class::Admin) if !role.grants(Role::Admin) => {
            Some(route::HOME)
        }
        (_, Class::Public | Class::Authenticated | Class::Admin) => None,
    }
}
