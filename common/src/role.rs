//! [`Role`] definitions.

use crate::define_kind;

define_kind! {
    #[doc = "Role of an authenticated principal."]
    enum Role {
        #[doc = "Regular user browsing the catalog."]
        User = 1,

        #[doc = "Administrator managing the catalog."]
        Admin = 2,
    }
}

impl Role {
    /// Checks whether this [`Role`] grants everything the `required` one does.
    ///
    /// [`Role::Admin`] grants everything [`Role::User`] does.
    #[must_use]
    pub const fn grants(self, required: Self) -> bool {
        match (self, required) {
            (Self::Admin, _) | (Self::User, Self::User) => true,
            (Self::User, Self::Admin) => false,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

#[cfg(test)]
mod spec {
    use super::Role;

    #[test]
    fn parses_and_displays_lowercase() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("ADMIN".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn admin_grants_user() {
        assert!(Role::Admin.grants(Role::Admin));
        assert!(Role::Admin.grants(Role::User));
        assert!(Role::User.grants(Role::User));
        assert!(!Role::User.grants(Role::Admin));
    }

    #[test]
    fn defaults_to_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
