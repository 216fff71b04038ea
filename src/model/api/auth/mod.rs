mod credentials;
mod token;

use serde::{Deserialize, Serialize};

pub use credentials::{UserCredentials, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH};
pub use token::AuthToken;

use crate::model::{api::id::ApiId, db::user::User};

/// The public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    pub id: ApiId,
    pub username: String,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            username: user.user.username,
        }
    }
}

/// Returned on successful registration or login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed JWT, to be sent back as `Authorization: Bearer <token>`.
    pub token: String,
    pub user: UserDescription,
}
