//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_user;
pub mod create_user_session;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_user::CreateUser,
    create_user_session::CreateUserSession,
};

#[cfg(test)]
pub(crate) mod fixture {
    //! Shared fixtures for [`Command`] tests.

    use secrecy::SecretBox;

    use crate::{
        domain::{user, User},
        infra::Memory,
        Config, Service,
    };

    use super::{Command as _, CreateUser};

    /// Secret the [`Service`] fixture signs tokens with.
    pub(crate) const SECRET: &[u8] = b"test-secret";

    /// Creates a new [`Service`] backed by an empty [`Memory`] database.
    pub(crate) fn service() -> Service<Memory> {
        Service::new(
            Config {
                session_codec: user::session::Codec::new(
                    SECRET,
                    user::Session::LIFETIME,
                ),
            },
            Memory::default(),
        )
    }

    /// Registers a new [`User`] with the provided credentials.
    pub(crate) async fn register(
        service: &Service<Memory>,
        email: &str,
        password: &str,
        role: user::Role,
    ) -> User {
        service
            .execute(CreateUser {
                name: user::Name::new("Jane Doe").unwrap(),
                email: user::Email::new(email).unwrap(),
                password: SecretBox::new(Box::new(
                    user::Password::new(password).unwrap(),
                )),
                role,
            })
            .await
            .unwrap()
    }
}
