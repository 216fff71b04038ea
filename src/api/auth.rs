use rocket::{http::Status, response::status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthResponse, AuthToken, UserCredentials, UserDescription},
            response::ApiResponse,
        },
        db::user::{NewUser, User},
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, me]
}

#[post("/auth/register", data = "<credentials>", format = "json")]
pub async fn register(
    credentials: Json<UserCredentials>,
    new_users: Coll<NewUser>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<status::Custom<Json<ApiResponse<AuthResponse>>>> {
    let user: NewUser = credentials.0.try_into()?;

    // The unique index on usernames settles concurrent registrations.
    let new_id: Id = match new_users.insert_one(&user, None).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    "Database returned a non-ObjectId user ID".to_string(),
                )
            })?
            .into(),
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::validation("Username already taken"));
        }
        Err(e) => return Err(e.into()),
    };
    let db_user = users
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {new_id}")))?;
    info!("Registered user {} ({})", db_user.username, db_user.id);

    let response = auth_response(db_user, config)?;
    Ok(status::Custom(
        Status::Created,
        Json(ApiResponse::success(response)),
    ))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<UserCredentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    let user = User::find_by_username(&users, credentials.normalised_username())
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid credentials"))?;

    let response = auth_response(user, config)?;
    Ok(Json(ApiResponse::success(response)))
}

#[get("/auth/me")]
pub async fn me(token: AuthToken, users: Coll<User>) -> Result<Json<ApiResponse<UserDescription>>> {
    let user = users
        .find_one(token.id().as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", token.id())))?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// Issue a token for the given user.
fn auth_response(user: User, config: &Config) -> Result<AuthResponse> {
    let token = AuthToken::new(&user).encode(config)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// Shared helpers for tests that need an authenticated client.
#[cfg(test)]
pub(crate) mod testing {
    use rocket::{
        http::{ContentType, Header},
        local::asynchronous::Client,
        serde::json::{serde_json, serde_json::json},
    };

    use super::*;

    /// Register the given user, returning their details and an `Authorization` header.
    pub async fn register_user(
        client: &Client,
        credentials: UserCredentials,
    ) -> (UserDescription, Header<'static>) {
        let response = client
            .post(uri!("/api", register))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let raw_response = response.into_string().await.unwrap();
        let body: ApiResponse<AuthResponse> = serde_json::from_str(&raw_response).unwrap();
        let auth = body.data.unwrap();
        let header = Header::new("Authorization", AuthToken::bearer(&auth.token));
        (auth.user, header)
    }
}
