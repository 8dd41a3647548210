//! [`Api`] of the authentication server.

use common::{route, Role};
use derive_more::{Debug, Display, Error};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Request to the authentication server.
pub use common::Handler as Api;

/// [`User`] as exposed by the authentication server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: Uuid,

    /// Name of this [`User`].
    pub name: String,

    /// Email of this [`User`].
    pub email: String,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// RFC 3339 moment this [`User`] registered at.
    pub created_at: String,
}

/// Request for the [`User`] owning the current session.
#[derive(Clone, Copy, Debug)]
pub struct Me;

/// Request starting a session by credentials.
#[derive(Clone, Debug, Serialize)]
pub struct Login {
    /// Email of the [`User`].
    pub email: String,

    /// Password of the [`User`].
    #[debug(skip)]
    pub password: String,
}

/// Request registering a new [`User`] and starting its session.
#[derive(Clone, Debug, Serialize)]
pub struct Register {
    /// Name of the new [`User`].
    pub name: String,

    /// Email of the new [`User`].
    pub email: String,

    /// Password of the new [`User`].
    #[debug(skip)]
    pub password: String,
}

/// Request ending the current session.
#[derive(Clone, Copy, Debug)]
pub struct Logout;

/// Error of an [`Api`] request.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    /// Server is not reachable.
    #[display("Unable to reach the server: {_0}")]
    Network(reqwest::Error),

    /// Server refused to authenticate.
    #[display("Not authenticated (`{_0}`)")]
    Unauthorized(#[error(not(source))] String),

    /// Server rejected the request data.
    #[display("Request rejected (`{_0}`)")]
    Rejected(#[error(not(source))] String),

    /// Requested [`User`] doesn't exist.
    #[display("User not found")]
    NotFound,

    /// Server is temporarily unable to serve the request.
    #[display("Service temporarily unavailable")]
    Unavailable,

    /// Server responded with an unexpected status code.
    #[display("Unexpected server response: {_0}")]
    Unexpected(#[error(not(source))] u16),
}

impl ApiError {
    /// Indicates whether this [`ApiError`] is an infrastructure failure,
    /// rather than an authentication one.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// [`Api`] over HTTP.
///
/// Keeps cookies between requests, so the HTTP-only session cookie set by the
/// server is carried along.
#[derive(Clone, Debug)]
pub struct Http {
    /// Base URL of the server, without a trailing slash.
    base: String,

    /// Underlying [`reqwest::Client`].
    client: reqwest::Client,
}

impl Http {
    /// Creates a new [`Http`] [`Api`] talking to the server at the provided
    /// `base` URL.
    ///
    /// # Errors
    ///
    /// If the underlying [`reqwest::Client`] fails to initialize.
    pub fn new(base: impl Into<String>) -> Result<Self, reqwest::Error> {
        let mut base = base.into();
        while base.ends_with('/') {
            _ = base.pop();
        }
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { base, client })
    }

    /// Returns the absolute URL of the provided `path`.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

impl Api<Me> for Http {
    type Ok = User;
    type Err = ApiError;

    async fn execute(&self, _: Me) -> Result<Self::Ok, Self::Err> {
        let resp = self
            .client
            .get(self.url(route::ME))
            .send()
            .await
            .map_err(ApiError::Network)?;
        respond::<UserBody>(resp).await.map(|b| b.user)
    }
}

impl Api<Login> for Http {
    type Ok = User;
    type Err = ApiError;

    async fn execute(&self, req: Login) -> Result<Self::Ok, Self::Err> {
        let resp = self
            .client
            .post(self.url(route::LOGIN))
            .json(&req)
            .send()
            .await
            .map_err(ApiError::Network)?;
        respond::<UserBody>(resp).await.map(|b| b.user)
    }
}

impl Api<Register> for Http {
    type Ok = User;
    type Err = ApiError;

    async fn execute(&self, req: Register) -> Result<Self::Ok, Self::Err> {
        let resp = self
            .client
            .post(self.url(route::REGISTER))
            .json(&req)
            .send()
            .await
            .map_err(ApiError::Network)?;
        respond::<UserBody>(resp).await.map(|b| b.user)
    }
}

impl Api<Logout> for Http {
    type Ok = ();
    type Err = ApiError;

    async fn execute(&self, _: Logout) -> Result<Self::Ok, Self::Err> {
        let resp = self
            .client
            .post(self.url(route::LOGOUT))
            .send()
            .await
            .map_err(ApiError::Network)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(failure(resp).await)
        }
    }
}

/// Body of a successful response carrying a [`User`].
#[derive(Debug, Deserialize)]
struct UserBody {
    /// [`User`] the response is about.
    user: User,
}

/// Body of a failed response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    /// Machine-readable error code.
    error: String,
}

/// Decodes the provided [`reqwest::Response`] into a `T`ype, or categorizes
/// its failure.
async fn respond<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ApiError> {
    if resp.status().is_success() {
        resp.json().await.map_err(ApiError::Network)
    } else {
        Err(failure(resp).await)
    }
}

/// Categorizes the provided failed [`reqwest::Response`].
async fn failure(resp: reqwest::Response) -> ApiError {
    let status = resp.status();
    let code = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_default();
    categorize(status, code)
}

/// Categorizes a failed response by its `status` and error `code`.
fn categorize(status: reqwest::StatusCode, code: String) -> ApiError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED => ApiError::Unauthorized(code),
        reqwest::StatusCode::BAD_REQUEST => ApiError::Rejected(code),
        reqwest::StatusCode::NOT_FOUND => ApiError::NotFound,
        reqwest::StatusCode::SERVICE_UNAVAILABLE => ApiError::Unavailable,
        s => ApiError::Unexpected(s.as_u16()),
    }
}
