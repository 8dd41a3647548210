//! [`Session`] definitions.

use std::{collections::HashSet, str::FromStr, time::Duration};

use common::{unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Debug, Display, Error};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user::{self, Role};

/// Authenticated session of a [`User`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Session {
    /// ID of the [`User`] this [`Session`] belongs to.
    pub user_id: user::Id,

    /// [`Role`] the [`User`] had when this [`Session`] was issued.
    pub role: Role,

    /// [`DateTime`] when this [`Session`] was issued.
    pub issued_at: IssueDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Default [`Duration`] a [`Session`] stays valid for.
    pub const LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Checks whether this [`Session`] is expired at the provided moment.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        now >= self.expires_at.coerce()
    }

    /// Checks whether this [`Session`] grants the provided [`Role`].
    ///
    /// [`Role::Admin`] is granted everything [`Role::User`] is.
    ///
    /// # Errors
    ///
    /// If this [`Session`]'s [`Role`] is insufficient.
    pub fn require_role(&self, role: Role) -> Result<(), InsufficientRole> {
        if self.role.grants(role) {
            Ok(())
        } else {
            Err(InsufficientRole {
                required: role,
                actual: self.role,
            })
        }
    }
}

/// Error of a [`Session`] not granting the required [`Role`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`{required}` role required, but `{actual}` is granted")]
pub struct InsufficientRole {
    /// Required [`Role`].
    pub required: Role,

    /// [`Role`] granted by the [`Session`].
    pub actual: Role,
}

/// Access token of a [`Session`].
///
/// Guaranteed to be a structurally well-formed [JWT] in a compact
/// serialization: three non-empty base64url segments separated by dots.
///
/// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[debug("Token(..)")]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }

    /// Creates a new [`Token`] if the given `token` is well-formed.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        Self::check(&token).then_some(Self(token))
    }

    /// Checks whether the given `token` is a well-formed [`Token`].
    fn check(token: impl AsRef<str>) -> bool {
        let token = token.as_ref();
        if matches!(token, "" | "undefined" | "null") {
            return false;
        }

        let mut segments = 0;
        token.split('.').all(|segment| {
            segments += 1;
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        }) && segments == 3
    }
}

impl FromStr for Token {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Token`")
    }
}

/// Codec issuing and verifying signed [`Session`] [`Token`]s.
#[derive(Clone, Debug)]
pub struct Codec {
    /// Key signing issued [`Token`]s.
    #[debug(skip)]
    encoding_key: EncodingKey,

    /// Key verifying signatures of presented [`Token`]s.
    #[debug(skip)]
    decoding_key: DecodingKey,

    /// [`Validation`] rules applied by [`jsonwebtoken`].
    validation: Validation,

    /// [`Duration`] issued [`Session`]s stay valid for.
    lifetime: Duration,
}

impl Codec {
    /// Creates a new [`Codec`] signing with the provided HMAC `secret`.
    ///
    /// The `secret` is expected to be validated by the caller already.
    #[must_use]
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiration is checked against an explicit clock in `verify()`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    /// Returns the [`Duration`] issued [`Session`]s stay valid for.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a new [`Session`] for the provided [`User`] at the provided
    /// moment, returning it along with its signed [`Token`].
    ///
    /// # Errors
    ///
    /// If signing fails, which indicates a misconfigured key.
    pub fn issue(
        &self,
        user_id: user::Id,
        role: Role,
        now: DateTime,
    ) -> Result<(Token, Session), jsonwebtoken::errors::Error> {
        // Claims carry whole seconds only.
        let issued_at =
            DateTime::from_unix_timestamp(now.unix_timestamp()).unwrap_or(now);
        let session = Session {
            user_id,
            role,
            issued_at: issued_at.coerce(),
            expires_at: (issued_at + self.lifetime).coerce(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Claims::from(session),
            &self.encoding_key,
        )?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { Token::new_unchecked(token) };

        Ok((token, session))
    }

    /// Verifies the provided raw `token` at the provided moment.
    ///
    /// Structural checks are performed before any cryptographic work.
    ///
    /// # Errors
    ///
    /// If the `token` is malformed, its signature is invalid, it misses
    /// required claims, or it is expired.
    pub fn verify(
        &self,
        token: &str,
        now: DateTime,
    ) -> Result<Session, DecodeError> {
        use DecodeError as E;

        let token = Token::new(token).ok_or(E::Malformed)?;
        let Claims {
            sub,
            role,
            iat,
            exp,
        } = jsonwebtoken::decode::<Claims>(
            token.as_ref(),
            &self.decoding_key,
            &self.validation,
        )?
        .claims;

        let (Some(sub), Some(role), Some(iat), Some(exp)) = (sub, role, iat, exp)
        else {
            return Err(E::MissingClaims);
        };
        let session = Session {
            user_id: sub.parse().map_err(|_| E::MissingClaims)?,
            role: role.parse().map_err(|_| E::MissingClaims)?,
            issued_at: DateTimeOf::from_unix_timestamp(iat)
                .ok_or(E::MissingClaims)?,
            expires_at: DateTimeOf::from_unix_timestamp(exp)
                .ok_or(E::MissingClaims)?,
        };

        if session.is_expired_at(now) {
            return Err(E::Expired);
        }
        Ok(session)
    }
}

/// Error of verifying a [`Token`].
///
/// Variants exist for diagnostics only: every one of them means the
/// [`Token`] grants nothing.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum DecodeError {
    /// [`Token`] is empty, a placeholder, or not a compact [JWT].
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[display("malformed")]
    Malformed,

    /// [`Token`] signature doesn't match.
    #[display("invalid_signature")]
    InvalidSignature,

    /// [`Token`] is expired.
    #[display("expired")]
    Expired,

    /// [`Token`] misses required claims, or they are unrecognized.
    #[display("missing_claims")]
    MissingClaims,
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                Self::InvalidSignature
            }
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::MissingRequiredClaim(_) => Self::MissingClaims,
            _ => Self::Malformed,
        }
    }
}

/// Wire representation of [`Session`] claims.
#[derive(Debug, Default, Deserialize, Serialize)]
struct Claims {
    /// ID of the [`User`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,

    /// [`Role`] of the [`User`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,

    /// Unix timestamp of issuing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,

    /// Unix timestamp of expiration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

impl From<Session> for Claims {
    fn from(session: Session) -> Self {
        Self {
            sub: Some(session.user_id.to_string()),
            role: Some(session.role.to_string()),
            iat: Some(session.issued_at.unix_timestamp()),
            exp: Some(session.expires_at.unix_timestamp()),
        }
    }
}

/// [`DateTime`] of a [`Session`] issuing.
pub type IssueDateTime = DateTimeOf<(Session, unit::Issue)>;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;
