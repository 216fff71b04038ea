use rocket::{http::Status, response::status, serde::json::Json, Catcher, Request, Route};

use crate::model::api::{auth::AuthToken, response::ApiResponse};

pub(crate) mod auth;
mod polls;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(polls::routes());
    routes
}

/// Error catchers, so that failures outside a handler still get a JSON body.
pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, not_found, unprocessable, default_catcher]
}

type CaughtResponse = status::Custom<Json<ApiResponse<()>>>;

fn caught(status: Status, message: &str) -> CaughtResponse {
    status::Custom(status, Json(ApiResponse::failure(message)))
}

#[catch(401)]
fn unauthorized(req: &Request) -> CaughtResponse {
    let reason = AuthToken::rejection(req).unwrap_or("Not authorized to access this route");
    caught(Status::Unauthorized, reason)
}

#[catch(404)]
fn not_found(req: &Request) -> CaughtResponse {
    caught(Status::NotFound, &format!("No route for {}", req.uri()))
}

#[catch(422)]
fn unprocessable() -> CaughtResponse {
    caught(Status::UnprocessableEntity, "Malformed request body")
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> CaughtResponse {
    caught(status, status.reason().unwrap_or("Request failed"))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, StatusClass},
        local::asynchronous::Client,
        serde::json::{serde_json, serde_json::Value},
    };

    use super::*;

    #[backend_test]
    async fn unknown_route_is_json(client: Client) {
        let response = client.get("/api/nothing-here").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }

    #[backend_test]
    async fn malformed_body_is_json(client: Client) {
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body("{ this is not json")
            .dispatch()
            .await;
        assert_eq!(response.status().class(), StatusClass::ClientError);

        let body: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], false);
    }
}
