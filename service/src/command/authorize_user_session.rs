//! [`Command`] for authorizing a [`User`].

use common::DateTime;
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::user::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a raw [`session::Token`].
///
/// Only the [`session::Token`] itself is checked: no [`Database`] lookup is
/// made, so a [`Session`] of a deleted [`User`] stays valid until it
/// expires.
///
/// [`Database`]: crate::infra::Database
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// Raw [`session::Token`] to authorize.
    pub token: String,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        self.config()
            .session_codec
            .verify(&token, DateTime::now())
            .map_err(E::InvalidToken)
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Provided [`session::Token`] grants nothing.
    #[display("Invalid `Session` token: {_0}")]
    InvalidToken(session::DecodeError),
}
