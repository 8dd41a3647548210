//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

use argon2::{
    password_hash::{self, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2,
};
#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use common::Role;

pub use self::session::Session;

/// Authenticated principal of the platform.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`]
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address of a [`User`].
///
/// Compared exactly: no case folding is applied.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\S+@\S+\.\S+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let len = password.as_ref().chars().count();
        (6..=128).contains(&len)
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Salted [Argon2] hash of a [`User`]'s [`Password`] in a [PHC] format.
///
/// [Argon2]: https://en.wikipedia.org/wiki/Argon2
/// [PHC]: https://github.com/P-H-C/phc-string-format
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Length of a random salt, in bytes.
    const SALT_LEN: usize = 16;

    /// Hashes the provided [`Password`] with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Errors if no entropy is available or hashing fails.
    pub fn new(password: &Password) -> Result<Self, HashError> {
        let mut salt = [0; Self::SALT_LEN];
        getrandom::getrandom(&mut salt)?;
        Self::with_salt(password, &salt)
    }

    /// Hashes the provided [`Password`] with the provided `salt`.
    fn with_salt(password: &Password, salt: &[u8]) -> Result<Self, HashError> {
        let salt = SaltString::encode_b64(salt)?;
        let hash = Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)?
            .to_string();
        Ok(Self(hash))
    }

    /// Returns a [`PasswordHash`] matching no real [`Password`].
    ///
    /// Verifying against it costs the same as verifying against a real one,
    /// so unknown accounts cannot be told apart by response time.
    #[must_use]
    pub fn dummy() -> &'static Self {
        /// Lazily computed [`PasswordHash::dummy()`].
        static DUMMY: LazyLock<PasswordHash> = LazyLock::new(|| {
            let password = Password::from("dummy-password");
            PasswordHash::with_salt(&password, &[0; PasswordHash::SALT_LEN])
                .expect("valid dummy hash")
        });

        &DUMMY
    }

    /// Verifies the provided [`Password`] against this [`PasswordHash`].
    ///
    /// Comparison is performed by [`argon2`] itself, in constant time.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.0.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

/// Error of hashing a [`Password`].
#[derive(Debug, Display, Error, From)]
pub enum HashError {
    /// Failed to gather random salt.
    #[display("Failed to generate salt: {_0}")]
    Entropy(getrandom::Error),

    /// [`argon2`] failed to hash.
    #[display("Failed to hash password: {_0}")]
    Argon2(password_hash::Error),
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Email, Name, Password, PasswordHash};

    #[test]
    fn validates_email() {
        assert!(Email::new("jane@example.com").is_some());
        assert!(Email::new("jane.doe+meds@mail.example.org").is_some());

        assert!(Email::new("").is_none());
        assert!(Email::new("jane").is_none());
        assert!(Email::new("jane@example").is_none());
        assert!(Email::new("jane doe@example.com").is_none());
    }

    #[test]
    fn validates_name() {
        assert!(Name::new("Jane Doe").is_some());

        assert!(Name::new("").is_none());
        assert!(Name::new(" Jane").is_none());
        assert!(Name::new("a".repeat(513)).is_none());
    }

    #[test]
    fn validates_password() {
        assert!(Password::new("secret").is_some());

        assert!(Password::new("short").is_none());
        assert!(Password::new("x".repeat(129)).is_none());
    }

    #[test]
    fn hashes_with_random_salt() {
        let password = Password::new("correct horse").unwrap();

        let first = PasswordHash::new(&password).unwrap();
        let second = PasswordHash::new(&password).unwrap();

        assert_ne!(first, second);
        assert!(first.to_string().starts_with("$argon2"));
        assert!(!first.to_string().contains("correct horse"));
    }

    #[test]
    fn verifies_password() {
        let password = Password::new("correct horse").unwrap();
        let hash = PasswordHash::new(&password).unwrap();

        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new("battery staple").unwrap()));
    }

    #[test]
    fn dummy_matches_nothing_real() {
        let password = Password::new("correct horse").unwrap();

        assert!(!PasswordHash::dummy().verify(&password));
    }

    #[test]
    fn rejects_garbage_hash() {
        let password = Password::new("correct horse").unwrap();

        assert!(!PasswordHash("plaintext".into()).verify(&password));
    }
}
