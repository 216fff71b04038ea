use argon2::Config;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::db::user::NewUser;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_USERNAME_LENGTH: usize = 30;

/// Raw user credentials, received from a client. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct UserCredentials {
    pub username: String,
    pub password: String,
}

impl UserCredentials {
    /// The username as it is stored and looked up.
    pub fn normalised_username(&self) -> &str {
        self.username.trim()
    }
}

impl TryFrom<UserCredentials> for NewUser {
    type Error = Error;

    /// Convert [`UserCredentials`] to a new [`NewUser`] by hashing the password.
    /// This enforces that the username is present and short enough, and that the
    /// password meets the minimum length.
    fn try_from(cred: UserCredentials) -> Result<Self, Self::Error> {
        let username = cred.normalised_username();
        if username.is_empty() {
            return Err(Error::validation("Please provide a username"));
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(Error::validation(format!(
                "Username cannot be more than {MAX_USERNAME_LENGTH} characters"
            )));
        }
        if cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        // 16 bytes is recommended for password hashing salts.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl UserCredentials {
        pub fn example() -> Self {
            Self {
                username: "alice112".into(),
                password: "poll4lyfe".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "bobthevoter".into(),
                password: "totallysecurepassword".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }
    }
}
