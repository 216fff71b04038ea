use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{
        poll::{Poll, PollOption},
        user::User,
    },
    mongodb::Id,
};

/// An API-friendly poll description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDescription {
    pub id: ApiId,
    pub title: String,
    pub options: Vec<PollOption>,
    pub creator: CreatorDescription,
    pub voters: Vec<ApiId>,
    pub total_votes: u64,
    pub created_at: DateTime<Utc>,
}

/// The creator of a poll. The username is absent if the user can't be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorDescription {
    pub id: ApiId,
    pub username: Option<String>,
}

impl PollDescription {
    /// Describe a poll, resolving its creator's username from `usernames`.
    pub fn new(poll: Poll, usernames: &HashMap<Id, String>) -> Self {
        let total_votes = poll.total_votes();
        let creator = CreatorDescription {
            id: poll.creator_id.into(),
            username: usernames.get(&poll.creator_id).cloned(),
        };
        Self {
            id: poll.id.into(),
            title: poll.poll.title,
            options: poll.poll.options,
            creator,
            voters: poll.poll.voter_ids.into_iter().map(Into::into).collect(),
            total_votes,
            created_at: poll.poll.created_at,
        }
    }

    /// Describe a poll whose creator has already been looked up.
    pub fn with_creator(poll: Poll, creator: Option<&User>) -> Self {
        let usernames: HashMap<Id, String> = creator
            .map(|user| (user.id, user.username.clone()))
            .into_iter()
            .collect();
        Self::new(poll, &usernames)
    }
}
