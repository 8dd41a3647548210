//! Per-request gate deciding whether a request reaches its handler.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse as _, Redirect, Response},
    Extension,
};
use axum_extra::extract::CookieJar;
use common::{route, DateTime};
use service::domain::user::{session, Role, Session};

use crate::{
    transport::{Presented, Transport},
    Service,
};

/// Outcome of the gate for a single request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Request proceeds, with the verified [`Session`] if the path required
    /// one.
    Allow(Option<Session>),

    /// Request is not authenticated and is sent to the login page.
    RedirectLogin {
        /// Indicator whether a dead token was presented in the cookie, so the
        /// cookie must be dropped.
        clear_cookie: bool,
    },

    /// Request is authenticated, but lacks privileges for the path.
    RedirectHome,
}

/// Decides the fate of a request to the provided `path`.
///
/// The `token` is only extracted for non-public paths.
pub fn decide(
    path: &str,
    token: impl FnOnce() -> Option<Presented>,
    codec: &session::Codec,
    now: DateTime,
) -> Decision {
    let class = route::classify(path);
    if class == route::Class::Public {
        return Decision::Allow(None);
    }

    let Some(token) = token() else {
        tracing::debug!(%path, %class, "no token presented");
        return Decision::RedirectLogin {
            clear_cookie: false,
        };
    };

    let session = match codec.verify(&token.token, now) {
        Ok(s) => s,
        Err(e) => {
            match e {
                session::DecodeError::InvalidSignature => {
                    tracing::warn!(
                        %path,
                        source = ?token.source,
                        reason = %e,
                        "token rejected",
                    );
                }
                session::DecodeError::Malformed
                | session::DecodeError::Expired
                | session::DecodeError::MissingClaims => {
                    tracing::debug!(
                        %path,
                        source = ?token.source,
                        reason = %e,
                        "token rejected",
                    );
                }
            }
            return Decision::RedirectLogin {
                clear_cookie: token.clears_cookie(),
            };
        }
    };

    if class == route::Class::Admin && session.require_role(Role::Admin).is_err()
    {
        tracing::debug!(
            %path,
            user_id = %session.user_id,
            role = %session.role,
            "insufficient role",
        );
        return Decision::RedirectHome;
    }

    Decision::Allow(Some(session))
}

/// [`axum`] middleware applying [`decide()`] to every request.
///
/// Allowed requests carry the verified [`Session`] in their extensions.
pub async fn middleware(
    Extension(service): Extension<Service>,
    Extension(transport): Extension<Transport>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let decision = decide(
        req.uri().path(),
        || Transport::extract(req.headers()),
        &service.config().session_codec,
        DateTime::now(),
    );

    match decision {
        Decision::Allow(session) => {
            if let Some(s) = session {
                _ = req.extensions_mut().insert(s);
            }
            next.run(req).await
        }
        Decision::RedirectLogin { clear_cookie } => {
            let jar = if clear_cookie {
                transport.clear(jar)
            } else {
                jar
            };
            (jar, Redirect::to(route::LOGIN)).into_response()
        }
        Decision::RedirectHome => Redirect::to(route::HOME).into_response(),
    }
}
