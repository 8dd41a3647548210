//! In-memory [`Database`] implementation.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error as StdError};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
};

/// In-memory [`Database`].
///
/// Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct Memory(Arc<Inner>);

/// Inner storage of a [`Memory`] [`Database`].
#[derive(Debug, Default)]
struct Inner {
    /// Stored [`User`]s.
    users: RwLock<HashMap<user::Id, User>>,

    /// Indicator whether this [`Memory`] [`Database`] refuses to serve.
    unavailable: AtomicBool,
}

impl Memory {
    /// Makes this [`Memory`] [`Database`] (and all its clones) fail every
    /// operation, simulating an unreachable database.
    pub fn set_available(&self, available: bool) {
        self.0.unavailable.store(!available, Ordering::Relaxed);
    }

    /// Fails if this [`Memory`] [`Database`] is unavailable.
    fn ensure_available(&self) -> Result<(), Traced<database::Error>> {
        if self.0.unavailable.load(Ordering::Relaxed) {
            Err(tracerr::new!(database::Error::from(Error::Unavailable)))
        } else {
            Ok(())
        }
    }
}

/// [`Memory`] database error.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// [`Memory`] [`Database`] is switched to be unavailable.
    #[display("`Memory` database is unavailable")]
    Unavailable,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.is_none_or(|x| x == *c),
            Self::Unavailable => false,
        }
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available().map_err(tracerr::wrap!())?;

        let id = by.into_inner();
        Ok(self.0.users.read().await.get(&id).cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available().map_err(tracerr::wrap!())?;

        let email = by.into_inner();
        Ok(self
            .0
            .users
            .read()
            .await
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.ensure_available().map_err(tracerr::wrap!())?;

        let mut users = self.0.users.write().await;
        if users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(database::USERS_EMAIL_KEY)
            )));
        }
        drop(users.insert(user.id, user));
        Ok(())
    }
}
