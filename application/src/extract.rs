//! Extractors exposing the verified [`Session`] to handlers behind the gate.

use axum::{async_trait, extract::FromRequestParts};
use derive_more::Deref;
use service::domain::user::{Role, Session};

use crate::{define_error, Error};

/// [`Session`] verified by the gate for the current request.
///
/// Handlers must not verify the token themselves.
#[derive(Clone, Copy, Debug, Deref)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .copied()
            .map(Self)
            .ok_or_else(|| SessionError::Missing.into())
    }
}

/// [`Session`] of a [`Role::Admin`] principal.
///
/// Used by handlers performing admin-only operations, regardless of how the
/// gate classifies their path.
#[derive(Clone, Copy, Debug, Deref)]
pub struct AdminSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) =
            CurrentSession::from_request_parts(parts, state).await?;
        session.require_role(Role::Admin).map_err(|e| {
            tracing::debug!(user_id = %session.user_id, "{e}");
            Error::from(SessionError::Forbidden)
        })?;
        Ok(Self(session))
    }
}

define_error! {
    enum SessionError {
        #[code = "no_token"]
        #[status = UNAUTHORIZED]
        #[message = "Authentication required"]
        Missing,

        #[code = "forbidden"]
        #[status = FORBIDDEN]
        #[message = "Insufficient privileges"]
        Forbidden,
    }
}
