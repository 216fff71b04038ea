use mongodb::bson::oid::Error as OidError;
use rocket::{http::Status, response::status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AuthToken,
        lenient::Lenient,
        poll::{PollDescription, PollSpec, VoteRequest},
        response::ApiResponse,
    },
    db::{poll::Poll, user::User},
    mongodb::{Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![create_poll, get_polls, get_poll, vote_poll]
}

#[post("/polls", data = "<spec>", format = "json")]
async fn create_poll(
    token: AuthToken,
    spec: Json<PollSpec>,
    polls: Coll<Poll>,
    users: Coll<User>,
) -> Result<status::Custom<Json<ApiResponse<PollDescription>>>> {
    let new_poll = spec.0.into_new_poll(token.id())?;
    let poll = Poll::create(&polls, new_poll).await?;
    info!("User {} created poll {}", token.id(), poll.id);

    let creator = users.find_one(token.id().as_doc(), None).await?;
    let description = PollDescription::with_creator(poll, creator.as_ref());
    Ok(status::Custom(
        Status::Created,
        Json(ApiResponse::success(description)),
    ))
}

#[get("/polls")]
async fn get_polls(
    polls: Coll<Poll>,
    users: Coll<User>,
) -> Result<Json<ApiResponse<Vec<PollDescription>>>> {
    let polls = Poll::list(&polls).await?;

    let mut creator_ids = polls.iter().map(|poll| poll.creator_id).collect::<Vec<_>>();
    creator_ids.sort();
    creator_ids.dedup();
    let usernames = User::usernames(&users, creator_ids).await?;

    let descriptions = polls
        .into_iter()
        .map(|poll| PollDescription::new(poll, &usernames))
        .collect();
    Ok(Json(ApiResponse::list(descriptions)))
}

#[get("/polls/<poll_id>")]
async fn get_poll(
    poll_id: std::result::Result<Id, OidError>,
    polls: Coll<Poll>,
    users: Coll<User>,
) -> Result<Json<ApiResponse<PollDescription>>> {
    let poll = Poll::find(&polls, poll_id?).await?;
    let creator = users.find_one(poll.creator_id.as_doc(), None).await?;
    Ok(Json(ApiResponse::success(PollDescription::with_creator(
        poll,
        creator.as_ref(),
    ))))
}

#[post("/polls/<poll_id>/vote", data = "<vote>", format = "json")]
async fn vote_poll(
    token: AuthToken,
    poll_id: std::result::Result<Id, OidError>,
    vote: Json<VoteRequest>,
    polls: Coll<Poll>,
    users: Coll<User>,
) -> Result<Json<ApiResponse<PollDescription>>> {
    let option_index = match vote.into_inner().option_index {
        Some(Lenient::Valid(index)) => index,
        Some(Lenient::Invalid(_)) => return Err(Error::InvalidOption),
        None => return Err(Error::validation("Please provide an option to vote for")),
    };
    let poll = Poll::cast_vote(&polls, poll_id?, option_index, token.id()).await?;

    let creator = users.find_one(poll.creator_id.as_doc(), None).await?;
    Ok(Json(ApiResponse::success(PollDescription::with_creator(
        poll,
        creator.as_ref(),
    ))))
}
