use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use rocket::http::Status;

use crate::error::{Error, Result};
use crate::model::mongodb::{Coll, Id};

use super::Poll;

impl Poll {
    /// Record a vote by `voter` for the option at `option_index` of the poll `poll_id`,
    /// returning the updated poll.
    ///
    /// The tally increment and the voter append happen in a single conditional
    /// update, so a voter can never be counted twice, even by concurrent requests.
    pub async fn cast_vote(
        polls: &Coll<Poll>,
        poll_id: Id,
        option_index: i64,
        voter: Id,
    ) -> Result<Poll> {
        let poll = Self::find(polls, poll_id).await?;
        let index = poll.check_vote(voter, option_index)?;

        let mut filter = doc! {
            "_id": poll_id,
            "voter_ids": { "$ne": voter },
        };
        filter.insert(format!("options.{index}"), doc! { "$exists": true });
        let mut increment = Document::new();
        increment.insert(format!("options.{index}.votes"), 1);
        let update = doc! {
            "$inc": increment,
            "$push": { "voter_ids": voter },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        match polls.find_one_and_update(filter, update, options).await? {
            Some(updated) => {
                debug!("Recorded vote by {voter} for option {index} of poll {poll_id}");
                Ok(updated)
            }
            None => {
                // Someone changed the poll between our read and our update; the
                // only change that can make the filter miss is this voter voting.
                let poll = Self::find(polls, poll_id).await?;
                poll.check_vote(voter, option_index)?;
                Err(Error::Status(
                    Status::InternalServerError,
                    format!("Vote on poll {poll_id} matched no document"),
                ))
            }
        }
    }
}
