//! Classification of application routes.
//!
//! Both the server-side gate and the client-side guard consult
//! [`classify()`], so there is exactly one policy deciding which routes are
//! public, which require authentication, and which are reserved for
//! administrators.

use derive_more::Display;

use crate::Role;

/// Path of the login page.
pub const LOGIN: &str = "/auth/login";

/// Path of the registration page.
pub const REGISTER: &str = "/auth/register";

/// Path of the endpoint returning the current user.
pub const ME: &str = "/auth/me";

/// Path of the endpoint ending the current session.
pub const LOGOUT: &str = "/auth/logout";

/// Path of the generic home page.
pub const HOME: &str = "/";

/// Path of the administrator home page.
pub const ADMIN_HOME: &str = "/admin/dashboard";

/// Class of a route.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Class {
    /// Accessible by anyone.
    #[display("public")]
    Public,

    /// Accessible by any authenticated principal.
    #[display("authenticated")]
    Authenticated,

    /// Accessible by [`Role::Admin`] principals only.
    #[display("admin")]
    Admin,
}

/// Rule matching a route path.
#[derive(Clone, Copy, Debug)]
enum Rule {
    /// Matches the path exactly.
    Exact(&'static str),

    /// Matches the path itself and everything below it.
    Prefix(&'static str),

    /// Matches static assets (paths whose last segment has an extension).
    Asset,
}

impl Rule {
    /// Checks whether this [`Rule`] matches the provided `path`.
    fn matches(self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => path
                .strip_prefix(p)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
            Self::Asset => path
                .rsplit('/')
                .next()
                .is_some_and(|segment| segment.contains('.')),
        }
    }
}

/// Ordered classification table, the first matching [`Rule`] wins.
///
/// Routes matched by no [`Rule`] require authentication.
const RULES: &[(Rule, Class)] = &[
    (Rule::Exact(HOME), Class::Public),
    (Rule::Prefix("/auth"), Class::Public),
    (Rule::Prefix("/api/auth"), Class::Public),
    (Rule::Prefix("/medicines"), Class::Public),
    (Rule::Prefix("/categories"), Class::Public),
    (Rule::Prefix("/api/medicines"), Class::Public),
    (Rule::Prefix("/api/categories"), Class::Public),
    (Rule::Prefix("/about"), Class::Public),
    (Rule::Prefix("/help"), Class::Public),
    (Rule::Prefix("/services"), Class::Public),
    (Rule::Prefix("/privacy-policy"), Class::Public),
    (Rule::Prefix("/terms"), Class::Public),
    (Rule::Prefix("/cookies"), Class::Public),
    (Rule::Prefix("/admin"), Class::Admin),
    (Rule::Prefix("/api/admin"), Class::Admin),
    (Rule::Asset, Class::Public),
];

/// Classifies the provided route `path`.
///
/// Query string and fragment (if any) are ignored.
#[must_use]
pub fn classify(path: &str) -> Class {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    RULES
        .iter()
        .find_map(|(rule, class)| rule.matches(path).then_some(*class))
        .unwrap_or(Class::Authenticated)
}

/// Checks whether the provided `path` is the login or registration page.
#[must_use]
pub fn is_auth_page(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path == LOGIN || path == REGISTER
}

/// Returns the home page path of the provided [`Role`].
#[must_use]
pub const fn home_of(role: Role) -> &'static str {
    match role {
        Role::User => HOME,
        Role::Admin => ADMIN_HOME,
    }
}
