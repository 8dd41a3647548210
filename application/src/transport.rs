//! [`Transport`] of [`Session`] tokens over HTTP.
//!
//! [`Session`]: service::domain::user::Session

use std::time::Duration;

use axum_extra::{
    extract::{
        cookie::{Cookie, SameSite},
        CookieJar,
    },
    headers::{authorization::Bearer, Authorization, HeaderMapExt as _},
};
use service::domain::user::session::Token;

/// Name of the cookie carrying a [`Token`].
pub const COOKIE_NAME: &str = "token";

/// Raw values standing for "no token" in clients storing an absent token as
/// a string.
const PLACEHOLDERS: &[&str] = &["", "undefined", "null"];

/// Place of a request a raw token was found in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    /// `Authorization: Bearer` header.
    Header,

    /// Cookie named [`COOKIE_NAME`].
    Cookie,
}

/// Raw token presented by a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Presented {
    /// Raw token value, not verified yet.
    pub token: String,

    /// [`Source`] the token was found in.
    pub source: Source,
}

impl Presented {
    /// Indicates whether rejecting this token must drop the cookie.
    ///
    /// Only a cookie can be dropped, and a rejected header says nothing about
    /// the cookie next to it.
    #[must_use]
    pub fn clears_cookie(&self) -> bool {
        self.source == Source::Cookie
    }

    /// Returns a [`Presented`] token, unless the `raw` value is a
    /// placeholder.
    fn usable(raw: &str, source: Source) -> Option<Self> {
        let raw = raw.trim();
        (!PLACEHOLDERS.contains(&raw)).then(|| Self {
            token: raw.to_owned(),
            source,
        })
    }
}

/// Carrier of [`Token`]s between clients and the server.
#[derive(Clone, Copy, Debug)]
pub struct Transport {
    /// Indicator whether the cookie is restricted to HTTPS.
    secure: bool,

    /// [`Duration`] the cookie is kept by clients for.
    max_age: Duration,
}

impl Transport {
    /// Creates a new [`Transport`].
    ///
    /// `max_age` should match the validity window of issued [`Token`]s.
    #[must_use]
    pub const fn new(secure: bool, max_age: Duration) -> Self {
        Self { secure, max_age }
    }

    /// Extracts a raw token from the provided request `headers`.
    ///
    /// An `Authorization: Bearer` header takes precedence over the cookie.
    /// Placeholder values (`""`, `"undefined"`, `"null"`) count as absent.
    /// Absence of both is not an error.
    #[must_use]
    pub fn extract(headers: &http::HeaderMap) -> Option<Presented> {
        headers
            .typed_get::<Authorization<Bearer>>()
            .and_then(|Authorization(bearer)| {
                Presented::usable(bearer.token(), Source::Header)
            })
            .or_else(|| {
                CookieJar::from_headers(headers)
                    .get(COOKIE_NAME)
                    .and_then(|c| Presented::usable(c.value(), Source::Cookie))
            })
    }

    /// Adds the cookie carrying the provided [`Token`] to the `jar`.
    #[must_use]
    pub fn attach(&self, jar: CookieJar, token: &Token) -> CookieJar {
        let max_age =
            i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        jar.add(
            Cookie::build((COOKIE_NAME, token.to_string()))
                .http_only(true)
                .same_site(SameSite::Strict)
                .secure(self.secure)
                .path("/")
                .max_age(time::Duration::seconds(max_age)),
        )
    }

    /// Adds an expired cookie to the `jar`, making clients drop the one
    /// carrying a [`Token`].
    ///
    /// Emitted even if the request carried no such cookie.
    #[must_use]
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = Cookie::build((COOKIE_NAME, ""))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .path("/")
            .build();
        cookie.make_removal();
        jar.add(cookie)
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use axum::response::IntoResponse as _;
    use axum_extra::extract::CookieJar;
    use service::domain::user::session::Token;

    use super::{Presented, Source, Transport};

    fn set_cookie(jar: CookieJar) -> String {
        jar.into_response()
            .headers()
            .get(http::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned()
    }

    fn headers(pairs: &[(http::HeaderName, &str)]) -> http::HeaderMap {
        pairs
            .iter()
            .map(|(n, v)| (n.clone(), v.parse().unwrap()))
            .collect()
    }

    #[test]
    fn extracts_nothing_from_bare_request() {
        assert_eq!(Transport::extract(&http::HeaderMap::new()), None);
    }

    #[test]
    fn prefers_bearer_over_cookie() {
        let h = headers(&[
            (http::header::AUTHORIZATION, "Bearer from.bearer.header"),
            (http::header::COOKIE, "token=from.the.cookie"),
        ]);

        assert_eq!(
            Transport::extract(&h),
            Some(Presented {
                token: "from.bearer.header".to_owned(),
                source: Source::Header,
            }),
        );
    }

    #[test]
    fn falls_back_to_cookie() {
        let h = headers(&[(
            http::header::COOKIE,
            "theme=dark; token=from.the.cookie",
        )]);

        let presented = Transport::extract(&h).unwrap();

        assert_eq!(presented.token, "from.the.cookie");
        assert!(presented.clears_cookie());
    }

    #[test]
    fn placeholder_bearer_falls_back_to_cookie() {
        for placeholder in ["Bearer null", "Bearer undefined"] {
            let h = headers(&[
                (http::header::AUTHORIZATION, placeholder),
                (http::header::COOKIE, "token=from.the.cookie"),
            ]);

            assert_eq!(
                Transport::extract(&h),
                Some(Presented {
                    token: "from.the.cookie".to_owned(),
                    source: Source::Cookie,
                }),
                "{placeholder}",
            );
        }
    }

    #[test]
    fn placeholders_count_as_absent() {
        for value in ["token=", "token=undefined", "token=null"] {
            let h = headers(&[(http::header::COOKIE, value)]);

            assert_eq!(Transport::extract(&h), None, "{value}");
        }
        let h = headers(&[(http::header::AUTHORIZATION, "Bearer null")]);
        assert_eq!(Transport::extract(&h), None);
    }

    #[test]
    fn rejected_header_keeps_cookie() {
        let h = headers(&[
            (http::header::AUTHORIZATION, "Bearer not.a.token"),
            (http::header::COOKIE, "token=from.the.cookie"),
        ]);

        assert!(!Transport::extract(&h).unwrap().clears_cookie());
    }

    #[test]
    fn attaches_hardened_cookie() {
        let transport = Transport::new(true, Duration::from_secs(604_800));
        let token = Token::new("aaa.bbb.ccc").unwrap();

        let cookie = set_cookie(transport.attach(CookieJar::new(), &token));

        assert!(cookie.starts_with("token=aaa.bbb.ccc"), "{cookie}");
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Strict"), "{cookie}");
        assert!(cookie.contains("Secure"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
        assert!(cookie.contains("Max-Age=604800"), "{cookie}");
    }

    #[test]
    fn omits_secure_flag_in_development() {
        let transport = Transport::new(false, Duration::from_secs(604_800));
        let token = Token::new("aaa.bbb.ccc").unwrap();

        let cookie = set_cookie(transport.attach(CookieJar::new(), &token));

        assert!(!cookie.contains("Secure"), "{cookie}");
    }

    #[test]
    fn clears_cookie() {
        let transport = Transport::new(true, Duration::from_secs(604_800));

        let cookie = set_cookie(transport.clear(CookieJar::new()));

        assert!(cookie.starts_with("token=;"), "{cookie}");
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
    }
}
