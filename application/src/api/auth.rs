//! Authentication endpoints.

use axum::{extract::rejection::JsonRejection, Extension, Json};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{user, User},
    query,
};

use crate::{
    define_error, error::InputError, transport::Transport, AsError, Error,
    Service,
};

/// Credentials of a [`User`] logging in.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email of the [`User`].
    pub email: String,

    /// Password of the [`User`].
    pub password: String,
}

/// Data of a [`User`] registering.
#[derive(Debug, Deserialize)]
pub struct Registration {
    /// Name of the [`User`].
    pub name: String,

    /// Email of the [`User`].
    pub email: String,

    /// Password of the [`User`].
    pub password: String,
}

/// Publicly visible data of a [`User`].
#[derive(Debug, Deserialize, Serialize)]
pub struct UserView {
    /// ID of the [`User`].
    pub id: user::Id,

    /// Name of the [`User`].
    pub name: String,

    /// Email of the [`User`].
    pub email: String,

    /// Role of the [`User`].
    pub role: user::Role,

    /// RFC 3339 moment the [`User`] registered at.
    pub created_at: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name.to_string(),
            email: user.email.to_string(),
            role: user.role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Body of a successful response carrying a [`User`].
#[derive(Debug, Deserialize, Serialize)]
pub struct UserBody {
    /// Always `true`.
    pub success: bool,

    /// [`User`] the response is about.
    pub user: UserView,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            success: true,
            user: user.into(),
        }
    }
}

/// Body of a successful response carrying nothing but a message.
#[derive(Debug, Deserialize, Serialize)]
pub struct MessageBody {
    /// Always `true`.
    pub success: bool,

    /// Human-readable message.
    pub message: String,
}

/// Authenticates a [`User`] by its credentials and starts a session.
///
/// # Errors
///
/// Possible error codes:
/// - `invalid_input` - malformed request body;
/// - `invalid_credentials` - no [`User`] matches the credentials;
/// - `database_connection_failed` - database is unreachable.
#[tracing::instrument(skip_all, fields(email = tracing::field::Empty))]
pub async fn login(
    Extension(service): Extension<Service>,
    Extension(transport): Extension<Transport>,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, Json<UserBody>), Error> {
    let Json(Credentials { email, password }) =
        body.map_err(AsError::into_error)?;
    if password.is_empty() {
        return Err(InputError::Invalid.into());
    }
    let email = user::Email::new(email.trim())
        .ok_or_else(|| Error::from(InputError::Invalid))?;
    _ = tracing::Span::current()
        .record("email", tracing::field::display(&email));

    let output = service
        .execute(command::CreateUserSession::ByCredentials {
            email,
            password: secrecy::SecretBox::init_with(move || password.into()),
        })
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(user_id = %output.user.id, "logged in");

    Ok((
        transport.attach(jar, &output.token),
        Json(output.user.into()),
    ))
}

/// Registers a new [`User`] with [`user::Role::User`] and starts a session.
///
/// # Errors
///
/// Possible error codes:
/// - `invalid_input` - malformed request body or invalid field values;
/// - `email_registered` - the email is taken by another [`User`];
/// - `database_connection_failed` - database is unreachable.
#[tracing::instrument(skip_all, fields(email = tracing::field::Empty))]
pub async fn register(
    Extension(service): Extension<Service>,
    Extension(transport): Extension<Transport>,
    jar: CookieJar,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<(http::StatusCode, CookieJar, Json<UserBody>), Error> {
    let Json(Registration {
        name,
        email,
        password,
    }) = body.map_err(AsError::into_error)?;

    let invalid = || Error::from(InputError::Invalid);
    let name = user::Name::new(name.trim()).ok_or_else(invalid)?;
    let email = user::Email::new(email.trim()).ok_or_else(invalid)?;
    let password = user::Password::new(password).ok_or_else(invalid)?;
    _ = tracing::Span::current()
        .record("email", tracing::field::display(&email));

    let user = service
        .execute(command::CreateUser {
            name,
            email,
            password: secrecy::SecretBox::new(Box::new(password)),
            role: user::Role::User,
        })
        .await
        .map_err(AsError::into_error)?;
    let output = service
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok((
        http::StatusCode::CREATED,
        transport.attach(jar, &output.token),
        Json(output.user.into()),
    ))
}

/// Returns the [`User`] owning the presented session token.
///
/// Dead tokens presented in the cookie get the cookie cleared, while database
/// failures leave it untouched.
///
/// # Errors
///
/// Possible error codes:
/// - `no_token` - no token is presented;
/// - `invalid_token` - the presented token grants nothing;
/// - `user_not_found` - the token owner no longer exists;
/// - `database_connection_failed` - database is unreachable.
#[tracing::instrument(skip_all)]
pub async fn me(
    Extension(service): Extension<Service>,
    Extension(transport): Extension<Transport>,
    jar: CookieJar,
    headers: http::HeaderMap,
) -> Result<Json<UserBody>, (CookieJar, Error)> {
    let Some(presented) = Transport::extract(&headers) else {
        return Err((jar, MeError::NoToken.into()));
    };
    let clears_cookie = presented.clears_cookie();
    let dead = move |jar| {
        if clears_cookie {
            transport.clear(jar)
        } else {
            jar
        }
    };

    let session = match service
        .execute(command::AuthorizeUserSession {
            token: presented.token,
        })
        .await
    {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(source = ?presented.source, "{e}");
            return Err((dead(jar), e.into_error()));
        }
    };

    match service.execute(query::user::ById::by(session.user_id)).await {
        Ok(Some(user)) => Ok(Json(user.into())),
        Ok(None) => Err((dead(jar), MeError::UserNotFound.into())),
        Err(e) => Err((jar, e.into_error())),
    }
}

/// Ends the current session by clearing its cookie.
///
/// Always succeeds, even without any session.
#[tracing::instrument(skip_all)]
pub async fn logout(
    Extension(transport): Extension<Transport>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageBody>) {
    (
        transport.clear(jar),
        Json(MessageBody {
            success: true,
            message: "Logged out".to_owned(),
        }),
    )
}

define_error! {
    enum MeError {
        #[code = "no_token"]
        #[status = UNAUTHORIZED]
        #[message = "Authentication required"]
        NoToken,

        #[code = "user_not_found"]
        #[status = NOT_FOUND]
        #[message = "User not found"]
        UserNotFound,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "email_registered"]
                #[status = BAD_REQUEST]
                #[message = "Email is already registered"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::PasswordHash(_) => None,
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "invalid_credentials"]
                #[status = UNAUTHORIZED]
                #[message = "Invalid email or password"]
                WrongCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) | Self::UserNotExists(_) => None,
            Self::WrongCredentials => Some(Error::WrongCredentials.into()),
        }
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "invalid_token"]
                #[status = UNAUTHORIZED]
                #[message = "Invalid or expired token"]
                InvalidToken,
            }
        }

        match self {
            Self::InvalidToken(_) => Some(Error::InvalidToken.into()),
        }
    }
}
