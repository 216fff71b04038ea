mod base;
mod vote;

pub use base::{NewPoll, Poll, PollCore, PollOption, MAX_OPTIONS, MAX_TITLE_LENGTH, MIN_OPTIONS};
