use jsonwebtoken::errors::Error as JwtError;
use mongodb::{bson::oid::Error as OidError, error::Error as DbError};
use rocket::{
    http::{Status, StatusClass},
    response::{self, status, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::model::api::response::ApiResponse;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Invalid token: {0}")]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
    #[error("Invalid id: {0}")]
    OidParse(#[from] OidError),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("You have already voted on this poll")]
    AlreadyVoted,
    #[error("Invalid option selected")]
    InvalidOption,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            // Signing with an HMAC secret cannot fail, so these all come from bad tokens.
            Self::Jwt(_) => Status::Unauthorized,
            Self::OidParse(_) | Self::Validation(_) | Self::AlreadyVoted | Self::InvalidOption => {
                Status::BadRequest
            }
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        // Internal details stay in the logs.
        let message = if status.class() == StatusClass::ServerError {
            error!("{self:?}");
            "Internal server error".to_string()
        } else {
            debug!("{self}");
            self.to_string()
        };
        status::Custom(status, Json(ApiResponse::<()>::failure(message))).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_distinct() {
        assert_eq!(Error::validation("bad").status(), Status::BadRequest);
        assert_eq!(Error::AlreadyVoted.status(), Status::BadRequest);
        assert_eq!(Error::InvalidOption.status(), Status::BadRequest);
        assert_eq!(Error::not_found("Poll").status(), Status::NotFound);
        assert_eq!(Error::unauthorized("no").status(), Status::Unauthorized);
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(Error::not_found("Poll").to_string(), "Poll not found");
        assert_eq!(
            Error::AlreadyVoted.to_string(),
            "You have already voted on this poll"
        );
        assert_eq!(Error::InvalidOption.to_string(), "Invalid option selected");
        assert_eq!(
            Error::validation("Please provide a title for the poll").to_string(),
            "Please provide a title for the poll"
        );
    }

    #[test]
    fn expired_tokens_are_unauthorized() {
        let err: Error =
            JwtError::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature).into();
        assert_eq!(err.status(), Status::Unauthorized);
    }
}
