use std::collections::HashMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{Coll, Id};

/// Core user data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash cannot match anything.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl User {
    /// Find a user by their (already normalised) username.
    pub async fn find_by_username(users: &Coll<User>, username: &str) -> Result<Option<User>> {
        let with_username = doc! {
            "username": username,
        };
        Ok(users.find_one(with_username, None).await?)
    }

    /// Look up the usernames of the given users. Unknown IDs are left out.
    pub async fn usernames(users: &Coll<User>, ids: Vec<Id>) -> Result<HashMap<Id, String>> {
        let filter = doc! {
            "_id": { "$in": ids },
        };
        let usernames = users
            .find(filter, None)
            .await?
            .map_ok(|user| (user.id, user.user.username))
            .try_collect()
            .await?;
        Ok(usernames)
    }
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::api::auth::UserCredentials;

    impl UserCore {
        /// The stored form of `UserCredentials::example()`.
        pub fn example() -> Self {
            UserCredentials::example().try_into().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::api::auth::UserCredentials;

    #[test]
    fn verify_hashed_password() {
        let user = NewUser::example();
        assert_eq!(user.username, UserCredentials::example().username);
        assert!(user.verify_password(UserCredentials::example().password));
        assert!(!user.verify_password("wrong password"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let mut user = NewUser::example();
        user.password_hash = "not a hash".to_string();
        assert!(!user.verify_password("anything"));
    }
}
