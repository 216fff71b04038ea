use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, http::Status};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{Coll, Id};

/// Bounds on the number of options a poll may offer.
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;

/// Maximum title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 100;

/// A single answer to a poll, with its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u32,
}

impl PollOption {
    /// A fresh option with no votes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            votes: 0,
        }
    }
}

/// Core poll data, as stored in the database.
///
/// Every vote both increments exactly one option and appends exactly one voter,
/// so the option tallies always sum to `voter_ids.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCore {
    pub title: String,
    pub options: Vec<PollOption>,
    pub creator_id: Id,
    pub voter_ids: Vec<Id>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PollCore {
    /// Total number of votes cast.
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| u64::from(option.votes)).sum()
    }

    /// Has the given user already voted?
    pub fn has_voted(&self, voter: Id) -> bool {
        self.voter_ids.contains(&voter)
    }

    /// Check that `voter` may vote for the option at `option_index`, returning
    /// the index as a `usize` if so.
    ///
    /// A repeat voter is rejected before the index is even looked at.
    pub fn check_vote(&self, voter: Id, option_index: i64) -> Result<usize> {
        if self.has_voted(voter) {
            return Err(Error::AlreadyVoted);
        }
        usize::try_from(option_index)
            .ok()
            .filter(|index| *index < self.options.len())
            .ok_or(Error::InvalidOption)
    }
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Poll {
    /// Insert a new poll, then read it back as stored.
    pub async fn create(polls: &Coll<Poll>, new_poll: NewPoll) -> Result<Poll> {
        let id: Id = polls
            .clone_with_type::<NewPoll>()
            .insert_one(&new_poll, None)
            .await?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    "Database returned a non-ObjectId poll ID".to_string(),
                )
            })?
            .into();
        Self::find(polls, id).await
    }

    /// Find a poll by ID.
    pub async fn find(polls: &Coll<Poll>, id: Id) -> Result<Poll> {
        polls
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found("Poll"))
    }

    /// All polls, newest first.
    pub async fn list(polls: &Coll<Poll>) -> Result<Vec<Poll>> {
        let newest_first = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let polls = polls
            .find(None, newest_first)
            .await?
            .try_collect()
            .await?;
        Ok(polls)
    }
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_vote_accepts_valid_index() {
        let poll = NewPoll::example(Id::new());
        assert_eq!(poll.check_vote(Id::new(), 0).unwrap(), 0);
        assert_eq!(poll.check_vote(Id::new(), 1).unwrap(), 1);
    }

    #[test]
    fn check_vote_rejects_out_of_bounds() {
        let poll = NewPoll::example(Id::new());
        for index in [-1, 2, 3, i64::MAX, i64::MIN] {
            assert!(matches!(
                poll.check_vote(Id::new(), index),
                Err(Error::InvalidOption)
            ));
        }
    }

    #[test]
    fn check_vote_rejects_repeat_voter_first() {
        let voter = Id::new();
        let mut poll = NewPoll::example(Id::new());
        poll.options[0].votes = 1;
        poll.voter_ids.push(voter);

        assert!(matches!(poll.check_vote(voter, 0), Err(Error::AlreadyVoted)));
        // Even with a bad index, the repeat vote is what gets reported.
        assert!(matches!(poll.check_vote(voter, 7), Err(Error::AlreadyVoted)));
    }

    #[test]
    fn total_votes_sums_options() {
        let mut poll = NewPoll::example_five_options(Id::new());
        assert_eq!(poll.total_votes(), 0);
        poll.options[1].votes = 3;
        poll.options[4].votes = 2;
        assert_eq!(poll.total_votes(), 5);
    }
}
