//! [`Query`] collection related to a single [`User`].

use common::operations::By;

use crate::domain::{user, User};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`User`] by its [`user::Id`].
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

#[cfg(test)]
mod spec {
    use crate::{
        command::fixture,
        domain::user::{self, Role},
        Query as _,
    };

    use super::ById;

    #[tokio::test]
    async fn finds_registered_user() {
        let service = fixture::service();
        let user = fixture::register(
            &service,
            "jane@example.com",
            "secret1",
            Role::User,
        )
        .await;

        let found = service.execute(ById::by(user.id)).await.unwrap();

        assert_eq!(found.map(|u| u.email), Some(user.email));
    }

    #[tokio::test]
    async fn misses_unknown_user() {
        let service = fixture::service();

        let found = service.execute(ById::by(user::Id::new())).await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn fails_on_unavailable_database() {
        let service = fixture::service();
        service.database().set_available(false);

        assert!(service.execute(ById::by(user::Id::new())).await.is_err());
    }
}
