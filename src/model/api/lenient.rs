use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

/// A request field that still parses when the client sent the wrong JSON type,
/// so the mistake reaches validation rather than failing the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Valid(T),
    Invalid(Value),
}

impl<T> Lenient<T> {
    /// The value, if it had the expected type.
    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }
}

impl<T> From<T> for Lenient<T> {
    fn from(value: T) -> Self {
        Self::Valid(value)
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{serde_json, serde_json::json};

    use super::*;

    #[test]
    fn keeps_mistyped_values() {
        let strings: Lenient<Vec<String>> = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(strings.valid(), Some(vec!["a".to_string(), "b".to_string()]));

        let mistyped: Lenient<Vec<String>> = serde_json::from_str(r#""Pizza""#).unwrap();
        assert_eq!(mistyped, Lenient::Invalid(json!("Pizza")));
        assert_eq!(mistyped.valid(), None);

        let index: Lenient<i64> = serde_json::from_str(r#""0""#).unwrap();
        assert_eq!(index.valid(), None);
    }
}
