//! Application provides HTTP API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod transport;

use axum::{middleware, Extension, Router};
// Used in binary.
use axum_client_ip as _;
use refinery as _;
use tokio as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    error::{AsError, Error},
    extract::{AdminSession, CurrentSession},
    transport::Transport,
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
#[cfg(not(test))]
pub type Service = service::Service<service::infra::Postgres>;

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
#[cfg(test)]
pub type Service = service::Service<service::infra::Memory>;

/// Builds the application [`Router`] out of the authentication endpoints and
/// the provided `collaborators` routes.
///
/// Every route, including unknown ones, is guarded by [`gate::middleware`].
pub fn app(
    collaborators: Router,
    service: Service,
    transport: Transport,
) -> Router {
    api::routes()
        .merge(collaborators)
        .layer(middleware::from_fn(gate::middleware))
        .layer(Extension(transport))
        .layer(Extension(service))
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use axum::{body::Body, routing::get, Json, Router};
    use common::DateTime;
    use http_body_util::BodyExt as _;
    use secrecy::SecretBox;
    use service::{
        command::{self, Command as _},
        domain::{
            user::{self, session, Role},
            User,
        },
        infra::Memory,
    };
    use tower::ServiceExt as _;

    use super::{app, AdminSession, CurrentSession, Service, Transport};

    const SECRET: &[u8] = b"app-secret";

    /// Application under test along with its database.
    struct App {
        /// [`Service`] the [`Router`] is built over.
        service: Service,

        /// [`Memory`] database shared with the [`Service`].
        db: Memory,
    }

    impl App {
        fn new() -> Self {
            let db = Memory::default();
            let service = Service::new(
                service::Config {
                    session_codec: session::Codec::new(
                        SECRET,
                        user::Session::LIFETIME,
                    ),
                },
                db.clone(),
            );
            Self { service, db }
        }

        /// Builds an [`App`] whose database refuses every operation.
        fn unavailable() -> Self {
            let app = Self::new();
            app.db.set_available(false);
            app
        }

        fn router(&self) -> Router {
            let collaborators = Router::new()
                .route(
                    "/profile",
                    get(|CurrentSession(s): CurrentSession| async move {
                        Json(s.user_id)
                    }),
                )
                .route(
                    "/admin/medicines",
                    get(|AdminSession(s): AdminSession| async move {
                        Json(s.user_id)
                    }),
                )
                .route("/medicines", get(|| async { "catalog" }));
            app(
                collaborators,
                self.service.clone(),
                Transport::new(false, Duration::from_secs(604_800)),
            )
        }

        async fn register(&self, email: &str, password: &str) -> User {
            self.service
                .execute(command::CreateUser {
                    name: user::Name::new("Jane Doe").unwrap(),
                    email: user::Email::new(email).unwrap(),
                    password: SecretBox::new(Box::new(password.into())),
                    role: Role::User,
                })
                .await
                .unwrap()
        }

        async fn request(
            &self,
            req: http::request::Builder,
            body: Option<serde_json::Value>,
        ) -> http::Response<Body> {
            let req = match body {
                Some(json) => req
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();
            self.router().oneshot(req).await.unwrap()
        }

        async fn send(
            &self,
            method: http::Method,
            path: &str,
            cookie: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> http::Response<Body> {
            let mut req = http::Request::builder().method(method).uri(path);
            if let Some(token) = cookie {
                req =
                    req.header(http::header::COOKIE, format!("token={token}"));
            }
            self.request(req, body).await
        }
    }

    async fn send(
        method: http::Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> http::Response<Body> {
        App::new().send(method, path, cookie, body).await
    }

    fn token_for(id: user::Id, role: Role) -> String {
        session::Codec::new(SECRET, user::Session::LIFETIME)
            .issue(id, role, DateTime::now())
            .unwrap()
            .0
            .to_string()
    }

    fn token(role: Role) -> String {
        token_for(user::Id::new(), role)
    }

    fn expired_token() -> String {
        session::Codec::new(SECRET, user::Session::LIFETIME)
            .issue(
                user::Id::new(),
                Role::User,
                DateTime::now() - Duration::from_secs(8 * 24 * 60 * 60),
            )
            .unwrap()
            .0
            .to_string()
    }

    async fn json(resp: http::Response<Body>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(resp: &http::Response<Body>) -> Option<&str> {
        resp.headers()
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    fn set_cookie(resp: &http::Response<Body>) -> Option<&str> {
        resp.headers()
            .get(http::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the token value of the `token` cookie set by the `resp`.
    fn issued_token(resp: &http::Response<Body>) -> Option<String> {
        let value = set_cookie(resp)?.strip_prefix("token=")?;
        let token = value.split(';').next()?;
        (!token.is_empty()).then(|| token.to_owned())
    }

    #[tokio::test]
    async fn public_path_is_served_without_token() {
        let resp = send(http::Method::GET, "/medicines", None, None).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_path_redirects_to_login() {
        let resp = send(http::Method::GET, "/profile", None, None).await;

        assert!(resp.status().is_redirection());
        assert_eq!(location(&resp), Some("/auth/login"));
        assert_eq!(set_cookie(&resp), None);
    }

    #[tokio::test]
    async fn unknown_path_is_protected() {
        let resp = send(http::Method::GET, "/orders/7", None, None).await;

        assert_eq!(location(&resp), Some("/auth/login"));
    }

    #[tokio::test]
    async fn expired_token_is_cleared() {
        let token = expired_token();

        let resp =
            send(http::Method::GET, "/profile", Some(&token), None).await;

        assert_eq!(location(&resp), Some("/auth/login"));
        assert!(set_cookie(&resp).is_some_and(|c| c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn session_reaches_collaborators() {
        let token = token(Role::User);

        let resp =
            send(http::Method::GET, "/profile", Some(&token), None).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn placeholder_bearer_falls_back_to_cookie() {
        let app = App::new();
        let user = app.register("jane@example.com", "secret1").await;
        let token = token_for(user.id, Role::User);

        for path in ["/profile", "/auth/me"] {
            let req = http::Request::builder()
                .uri(path)
                .header(http::header::AUTHORIZATION, "Bearer null")
                .header(http::header::COOKIE, format!("token={token}"));

            let resp = app.request(req, None).await;

            assert_eq!(resp.status(), http::StatusCode::OK, "{path}");
            assert_eq!(set_cookie(&resp), None, "{path}");
        }
    }

    #[tokio::test]
    async fn rejected_bearer_keeps_valid_cookie() {
        let token = token(Role::User);
        let app = App::new();

        let req = http::Request::builder()
            .uri("/profile")
            .header(http::header::AUTHORIZATION, "Bearer a.b")
            .header(http::header::COOKIE, format!("token={token}"));
        let resp = app.request(req, None).await;

        assert_eq!(location(&resp), Some("/auth/login"));
        assert_eq!(set_cookie(&resp), None);

        let req = http::Request::builder()
            .uri("/auth/me")
            .header(http::header::AUTHORIZATION, "Bearer a.b")
            .header(http::header::COOKIE, format!("token={token}"));
        let resp = app.request(req, None).await;

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(set_cookie(&resp), None);
        assert_eq!(json(resp).await["error"], "invalid_token");
    }

    #[tokio::test]
    async fn admin_path_sends_users_home() {
        let token = token(Role::User);

        let resp =
            send(http::Method::GET, "/admin/medicines", Some(&token), None)
                .await;

        assert_eq!(location(&resp), Some("/"));
        assert_eq!(set_cookie(&resp), None);
    }

    #[tokio::test]
    async fn admin_path_serves_admins() {
        let token = token(Role::Admin);

        let resp =
            send(http::Method::GET, "/admin/medicines", Some(&token), None)
                .await;

        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_extractor_checks_role_on_its_own() {
        let token = token(Role::User);
        let req = http::Request::builder()
            .uri("/catalog/edit")
            .header(http::header::COOKIE, format!("token={token}"))
            .body(Body::empty())
            .unwrap();
        let router = app(
            Router::new().route(
                "/catalog/edit",
                get(|_: AdminSession| async { "edited" }),
            ),
            App::new().service,
            Transport::new(false, Duration::from_secs(604_800)),
        );

        let resp = router.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);
        assert_eq!(json(resp).await["error"], "forbidden");
    }

    #[tokio::test]
    async fn me_without_token() {
        let resp = send(http::Method::GET, "/auth/me", None, None).await;

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(json(resp).await["error"], "no_token");
    }

    #[tokio::test]
    async fn me_with_placeholder_token_has_no_token() {
        let resp =
            send(http::Method::GET, "/auth/me", Some("undefined"), None).await;

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(json(resp).await["error"], "no_token");
    }

    #[tokio::test]
    async fn me_with_invalid_token_clears_cookie() {
        let resp = send(http::Method::GET, "/auth/me", Some("a.b"), None).await;

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&resp).is_some_and(|c| c.contains("Max-Age=0")));
        assert_eq!(json(resp).await["error"], "invalid_token");
    }

    #[tokio::test]
    async fn me_returns_session_owner() {
        let app = App::new();
        let user = app.register("jane@example.com", "secret1").await;
        let token = token_for(user.id, Role::User);

        let resp = app
            .send(http::Method::GET, "/auth/me", Some(&token), None)
            .await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(set_cookie(&resp), None);
        let body = json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], user.id.to_string());
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert_eq!(body["user"]["name"], "Jane Doe");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn me_for_removed_user_clears_cookie() {
        let token = token(Role::User);

        let resp =
            send(http::Method::GET, "/auth/me", Some(&token), None).await;

        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert!(set_cookie(&resp).is_some_and(|c| c.contains("Max-Age=0")));
        assert_eq!(json(resp).await["error"], "user_not_found");
    }

    #[tokio::test]
    async fn me_with_unreachable_database_is_unavailable() {
        let token = token(Role::User);

        let resp = App::unavailable()
            .send(http::Method::GET, "/auth/me", Some(&token), None)
            .await;

        assert_eq!(resp.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(set_cookie(&resp), None);
        let body = json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "database_connection_failed");
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let app = App::new();
        let user = app.register("jane@example.com", "secret1").await;

        let resp = app
            .send(
                http::Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({
                    "email": "jane@example.com",
                    "password": "secret1",
                })),
            )
            .await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        let cookie = set_cookie(&resp).unwrap().to_owned();
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("Max-Age=604800"), "{cookie}");
        let token = issued_token(&resp).unwrap();
        let body = json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], user.id.to_string());

        let resp = app
            .send(http::Method::GET, "/profile", Some(&token), None)
            .await;
        assert_eq!(resp.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = App::new();
        drop(app.register("jane@example.com", "secret1").await);

        for email in ["jane@example.com", "john@example.com"] {
            let resp = app
                .send(
                    http::Method::POST,
                    "/auth/login",
                    None,
                    Some(serde_json::json!({
                        "email": email,
                        "password": "secret2",
                    })),
                )
                .await;

            assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
            assert_eq!(set_cookie(&resp), None);
            assert_eq!(json(resp).await["error"], "invalid_credentials");
        }
    }

    #[tokio::test]
    async fn login_validates_input_before_database() {
        let resp = send(
            http::Method::POST,
            "/auth/login",
            None,
            Some(serde_json::json!({"email": "not-an-email", "password": "x"})),
        )
        .await;

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["error"], "invalid_input");
    }

    #[tokio::test]
    async fn login_with_missing_field_is_invalid_input() {
        let resp = send(
            http::Method::POST,
            "/auth/login",
            None,
            Some(serde_json::json!({"email": "jane@example.com"})),
        )
        .await;

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["error"], "invalid_input");
    }

    #[tokio::test]
    async fn login_with_unreachable_database_is_unavailable() {
        let resp = App::unavailable()
            .send(
                http::Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({
                    "email": "jane@example.com",
                    "password": "secret1",
                })),
            )
            .await;

        assert_eq!(resp.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(resp).await["error"], "database_connection_failed");
    }

    #[tokio::test]
    async fn register_creates_user_with_session() {
        let app = App::new();

        let resp = app
            .send(
                http::Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "name": "Jane Doe",
                    "email": "jane@example.com",
                    "password": "secret1",
                })),
            )
            .await;

        assert_eq!(resp.status(), http::StatusCode::CREATED);
        let token = issued_token(&resp).unwrap();
        let body = json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert_eq!(body["user"]["role"], "user");

        let resp = app
            .send(http::Method::GET, "/auth/me", Some(&token), None)
            .await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(json(resp).await["user"]["name"], "Jane Doe");
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let app = App::new();
        drop(app.register("jane@example.com", "secret1").await);

        let resp = app
            .send(
                http::Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "name": "Jane Roe",
                    "email": "jane@example.com",
                    "password": "secret2",
                })),
            )
            .await;

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(set_cookie(&resp), None);
        assert_eq!(json(resp).await["error"], "email_registered");
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let resp = send(
            http::Method::POST,
            "/auth/register",
            None,
            Some(serde_json::json!({
                "name": "Jane",
                "email": "jane@example.com",
                "password": "123",
            })),
        )
        .await;

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["error"], "invalid_input");
    }

    #[tokio::test]
    async fn logout_always_clears_cookie() {
        for _ in 0..2 {
            let resp =
                send(http::Method::POST, "/auth/logout", None, None).await;

            assert_eq!(resp.status(), http::StatusCode::OK);
            assert!(
                set_cookie(&resp).is_some_and(|c| c.starts_with("token=;"))
            );
        }
    }
}
