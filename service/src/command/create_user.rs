//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`user::Role`] of a new [`User`].
    pub role: user::Role,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    #[tracing::instrument(skip_all, fields(role = %cmd.role))]
    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            role,
        } = cmd;

        let u = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash: user::PasswordHash::new(password.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?,
            role,
            created_at: DateTime::now().coerce(),
        };

        // A concurrent registration may have taken the `Email` meanwhile.
        if let Err(e) = self.database().execute(Insert(user.clone())).await {
            let occupied = e
                .as_ref()
                .is_unique_violation(Some(database::USERS_EMAIL_KEY));
            return Err(if occupied {
                tracerr::new!(E::EmailOccupied(user.email))
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            });
        }

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Email`] is already registered.
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// Failed to hash the [`user::Password`].
    #[display("Failed to hash password: {_0}")]
    PasswordHash(user::HashError),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{fixture, Command as _},
        domain::user,
    };

    use super::{CreateUser, ExecutionError};

    fn cmd(email: &str) -> CreateUser {
        CreateUser {
            name: user::Name::new("John Roe").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("hunter22").unwrap(),
            )),
            role: user::Role::User,
        }
    }

    #[tokio::test]
    async fn creates_user_with_hashed_password() {
        let service = fixture::service();

        let user = service.execute(cmd("john@example.com")).await.unwrap();

        assert_eq!(user.email.to_string(), "john@example.com");
        assert_eq!(user.role, user::Role::User);
        assert!(!user.password_hash.to_string().contains("hunter22"));
        assert!(user
            .password_hash
            .verify(&user::Password::new("hunter22").unwrap()));
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let service = fixture::service();
        drop(service.execute(cmd("john@example.com")).await.unwrap());

        let err = service
            .execute(cmd("john@example.com"))
            .await
            .unwrap_err()
            .into_inner();

        assert!(
            matches!(err, ExecutionError::EmailOccupied(_)),
            "unexpected error: {err}",
        );
    }

    #[tokio::test]
    async fn emails_are_compared_exactly() {
        let service = fixture::service();
        drop(service.execute(cmd("john@example.com")).await.unwrap());

        assert!(service.execute(cmd("John@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn fails_on_unavailable_database() {
        let service = fixture::service();
        service.database().set_available(false);

        let err = service
            .execute(cmd("john@example.com"))
            .await
            .unwrap_err()
            .into_inner();

        assert!(matches!(err, ExecutionError::Db(_)), "unexpected: {err}");
    }
}
