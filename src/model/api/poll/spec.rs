use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::lenient::Lenient,
    db::poll::{NewPoll, PollOption, MAX_OPTIONS, MAX_TITLE_LENGTH, MIN_OPTIONS},
    mongodb::Id,
};

/// A new poll, as submitted by its creator.
///
/// Fields that are missing or of the wrong JSON type are only rejected by
/// [`PollSpec::into_new_poll`], with a proper validation message.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PollSpec {
    #[serde(default)]
    pub title: Option<Lenient<String>>,
    #[serde(default)]
    pub options: Option<Lenient<Vec<String>>>,
}

impl PollSpec {
    /// Validate this spec and turn it into a fresh poll owned by `creator`,
    /// with every tally at zero and nobody having voted.
    pub fn into_new_poll(self, creator: Id) -> Result<NewPoll> {
        let title = self.title.and_then(Lenient::valid);
        let title = title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or_else(|| Error::validation("Please provide a title for the poll"))?;
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::validation(format!(
                "Title cannot be more than {MAX_TITLE_LENGTH} characters"
            )));
        }

        let options = self
            .options
            .and_then(Lenient::valid)
            .filter(|options| (MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Please provide between {MIN_OPTIONS} and {MAX_OPTIONS} options for the poll"
                ))
            })?;
        let options = options
            .iter()
            .map(|text| text.trim())
            .map(|text| {
                if text.is_empty() {
                    Err(Error::validation("Poll options cannot be empty"))
                } else {
                    Ok(PollOption::new(text))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(NewPoll {
            title: title.to_string(),
            options,
            creator_id: creator,
            voter_ids: Vec::new(),
            created_at: Utc::now(),
        })
    }
}


#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    fn validation_message(spec: PollSpec) -> String {
        match spec.into_new_poll(Id::new()) {
            Err(Error::Validation(msg)) => msg,
            other => panic!("Expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn lunch_example() {
        let creator = Id::new();
        let poll = PollSpec::example().into_new_poll(creator).unwrap();

        assert_eq!(poll.title, "Lunch?");
        assert_eq!(
            poll.options,
            vec![PollOption::new("Pizza"), PollOption::new("Sushi")]
        );
        assert!(poll.options.iter().all(|o| o.votes == 0));
        assert_eq!(poll.creator_id, creator);
        assert!(poll.voter_ids.is_empty());
    }

    #[test]
    fn option_count_bounds() {
        for count in [2, 3, 4, 5] {
            let options = (0..count).map(|i| format!("Option {i}")).collect::<Vec<_>>();
            let spec = PollSpec {
                title: Some("Count".to_string().into()),
                options: Some(options.into()),
            };
            assert_eq!(spec.into_new_poll(Id::new()).unwrap().options.len(), count);
        }
        for count in [0, 1, 6, 10] {
            let options = (0..count).map(|i| format!("Option {i}")).collect::<Vec<_>>();
            let spec = PollSpec {
                title: Some("Count".to_string().into()),
                options: Some(options.into()),
            };
            assert_eq!(
                validation_message(spec),
                "Please provide between 2 and 5 options for the poll"
            );
        }
    }

    #[test]
    fn missing_fields() {
        assert_eq!(
            validation_message(PollSpec::default()),
            "Please provide a title for the poll"
        );
        let no_options = PollSpec {
            title: Some("Lunch?".to_string().into()),
            options: None,
        };
        assert_eq!(
            validation_message(no_options),
            "Please provide between 2 and 5 options for the poll"
        );
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        let poll = PollSpec::new("  Lunch?  ", &["Pizza", "Sushi"])
            .into_new_poll(Id::new())
            .unwrap();
        assert_eq!(poll.title, "Lunch?");

        assert_eq!(
            validation_message(PollSpec::new("   ", &["Pizza", "Sushi"])),
            "Please provide a title for the poll"
        );

        let longest = "é".repeat(MAX_TITLE_LENGTH);
        assert!(PollSpec::new(&longest, &["a", "b"])
            .into_new_poll(Id::new())
            .is_ok());

        let too_long = format!("  {}x  ", longest);
        assert_eq!(
            validation_message(PollSpec::new(&too_long, &["a", "b"])),
            "Title cannot be more than 100 characters"
        );
    }

    #[test]
    fn mistyped_fields_are_validation_errors() {
        let spec: PollSpec =
            serde_json::from_str(r#"{"title": "Lunch?", "options": "Pizza"}"#).unwrap();
        assert_eq!(
            validation_message(spec),
            "Please provide between 2 and 5 options for the poll"
        );

        let spec: PollSpec =
            serde_json::from_str(r#"{"title": 42, "options": ["Pizza", "Sushi"]}"#).unwrap();
        assert_eq!(validation_message(spec), "Please provide a title for the poll");

        let spec: PollSpec =
            serde_json::from_str(r#"{"title": "Lunch?", "options": [1, 2]}"#).unwrap();
        assert_eq!(
            validation_message(spec),
            "Please provide between 2 and 5 options for the poll"
        );
    }

    #[test]
    fn blank_options_rejected() {
        assert_eq!(
            validation_message(PollSpec::new("Lunch?", &["Pizza", "  "])),
            "Poll options cannot be empty"
        );
        let poll = PollSpec::new("Lunch?", &[" Pizza ", "Sushi"])
            .into_new_poll(Id::new())
            .unwrap();
        assert_eq!(poll.options[0].text, "Pizza");
    }
}
