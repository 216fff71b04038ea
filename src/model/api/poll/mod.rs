mod desc;
mod spec;

use serde::{Deserialize, Serialize};

use crate::model::api::lenient::Lenient;

pub use desc::{CreatorDescription, PollDescription};
pub use spec::PollSpec;

/// A vote, as submitted by a voter.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Zero-based index of the chosen option.
    #[serde(default)]
    pub option_index: Option<Lenient<i64>>,
}
