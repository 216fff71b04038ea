use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::Caller;
use crate::model::{
    api::id::ApiId,
    db::user::User,
    mongodb::{Coll, Id},
};

/// Prefix of the `Authorization` header value carrying a token.
const BEARER_PREFIX: &str = "Bearer ";

/// An authentication token representing a specific user.
///
/// As a request guard, this is the verified identity of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthToken {
    pub id: Id,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user.
    pub fn new(user: &User) -> Self {
        Self { id: user.id }
    }

    /// The authenticated user's ID.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Sign this token into a JWT that expires after the configured TTL.
    pub fn encode(self, config: &Config) -> Result<String> {
        let claims = Claims {
            subject: self.id.into(),
            expire_at: Utc::now() + config.auth_ttl(),
        };
        let jwt = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(jwt)
    }

    /// Verify and decode a JWT.
    pub fn decode(jwt: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| Self {
            id: *data.claims.subject,
        })?;
        Ok(token)
    }

    /// Extract and verify the token from an `Authorization: Bearer <jwt>` header value.
    pub fn from_bearer(header: &str, config: &Config) -> Result<Self> {
        let jwt = header
            .strip_prefix(BEARER_PREFIX)
            .map(str::trim)
            .filter(|jwt| !jwt.is_empty())
            .ok_or_else(|| Error::unauthorized("Malformed authorization header"))?;
        Self::decode(jwt, config)
    }

    /// The `Authorization` header value for this token.
    pub fn bearer(jwt: &str) -> String {
        format!("{BEARER_PREFIX}{jwt}")
    }
}

/// Registered JWT claims: the user's hex ID as `sub`, plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "sub")]
    subject: ApiId,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Why the [`AuthToken`] guard turned a request away, kept for the 401 catcher.
#[derive(Debug, Default)]
struct Rejection(Option<String>);

impl AuthToken {
    /// The reason this request failed authentication, if it did.
    pub fn rejection<'r>(req: &'r Request<'_>) -> Option<&'r str> {
        req.local_cache(Rejection::default).0.as_deref()
    }

    fn reject(req: &Request<'_>, error: Error) -> Outcome<Self, Error> {
        debug!("Rejected request: {error}");
        req.local_cache(|| Rejection(Some(error.to_string())));
        Outcome::Failure((Status::Unauthorized, error))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the `Authorization` header and check the user still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwraps are safe as `Config` and the `Database` are always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let header = match req.headers().get_one("Authorization") {
            Some(header) => header,
            None => {
                return Self::reject(
                    req,
                    Error::unauthorized("Not authorized to access this route"),
                )
            }
        };

        let token = match Self::from_bearer(header, config) {
            Ok(token) => token,
            Err(e) => return Self::reject(req, e),
        };

        let db = req.guard::<&State<mongodb::Database>>().await.unwrap();
        match Coll::<User>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(_)) => {
                Caller::record(req, token.id);
                Outcome::Success(token)
            }
            Ok(None) => Self::reject(req, Error::unauthorized("User no longer exists")),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn round_trip() {
        let config = Config::example();
        let token = AuthToken { id: Id::new() };

        let jwt = token.encode(&config).unwrap();
        assert_eq!(AuthToken::decode(&jwt, &config).unwrap(), token);
        assert_eq!(
            AuthToken::from_bearer(&AuthToken::bearer(&jwt), &config).unwrap(),
            token
        );
    }

    #[test]
    fn subject_is_hex_id() {
        let config = Config::example();
        let id = Id::new();
        let jwt = AuthToken { id }.encode(&config).unwrap();

        let claims = jsonwebtoken::decode::<serde_json::Value>(
            &jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .unwrap()
        .claims;
        assert_eq!(claims["sub"], id.to_hex());
        assert!(claims["exp"].is_i64());
    }

    #[test]
    fn rejects_malformed_header() {
        let config = Config::example();
        let jwt = AuthToken { id: Id::new() }.encode(&config).unwrap();

        for header in [jwt.as_str(), "Bearer ", "Basic abc", ""] {
            assert!(matches!(
                AuthToken::from_bearer(header, &config),
                Err(Error::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn rejects_tampered_token() {
        let config = Config::example();
        let mut jwt = AuthToken { id: Id::new() }.encode(&config).unwrap();
        jwt.push('x');

        let err = AuthToken::decode(&jwt, &config).unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);
    }

    #[test]
    fn rejects_expired_token() {
        let config = Config::example();
        let claims = Claims {
            subject: Id::new().into(),
            expire_at: Utc::now() - chrono::Duration::hours(1),
        };
        let jwt = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap();

        let err = AuthToken::decode(&jwt, &config).unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);
    }
}
