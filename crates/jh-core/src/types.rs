//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The value contained a character outside the allowed set.
    #[error("{field} contains invalid character {found:?}")]
    InvalidCharacter { field: &'static str, found: char },
}

/// Generates a validated string key newtype with common trait implementations.
macro_rules! define_string_key {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal, $validate:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new key after validation.
            pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
                let key = key.into();
                if key.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                let validate: fn(char) -> bool = $validate;
                if let Some(found) = key.chars().find(|c| !validate(*c)) {
                    return Err(ValidationError::InvalidCharacter {
                        field: $field_name,
                        found,
                    });
                }
                Ok(Self(key))
            }

            /// Returns the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_string_key!(
    /// A validated issue key (e.g. `ABC-123`).
    ///
    /// Issue keys must be non-empty and free of whitespace and control
    /// characters. Uniqueness is guaranteed by the tracker.
    IssueKey, "issue key", |c| !c.is_whitespace() && !c.is_control()
);

define_string_key!(
    /// A validated project key (e.g. `ABC`).
    ///
    /// Project keys are interpolated into JQL queries and export filenames,
    /// so only ASCII letters, digits, `_` and `-` are accepted.
    ProjectKey, "project key", |c| c.is_ascii_alphanumeric() || c == '_' || c == '-'
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_key_rejects_empty() {
        assert_eq!(
            IssueKey::new(""),
            Err(ValidationError::Empty { field: "issue key" })
        );
        assert!(IssueKey::new("ABC-1").is_ok());
    }

    #[test]
    fn issue_key_rejects_whitespace() {
        assert!(IssueKey::new("ABC 1").is_err());
        assert!(IssueKey::new("ABC-1\n").is_err());
    }

    #[test]
    fn project_key_accepts_jira_style_keys() {
        for key in ["ABC", "ABC2", "MY_PROJ", "web-app"] {
            assert!(ProjectKey::new(key).is_ok(), "{key} should be valid");
        }
    }

    #[test]
    fn project_key_rejects_jql_and_path_characters() {
        let err = ProjectKey::new("ABC OR project=XYZ").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidCharacter {
                field: "project key",
                found: ' '
            }
        );
        assert!(ProjectKey::new("../etc").is_err());
        assert!(ProjectKey::new("A\"B").is_err());
    }

    #[test]
    fn project_key_error_message_names_field() {
        let err = ProjectKey::new("").unwrap_err();
        assert_eq!(err.to_string(), "project key cannot be empty");
    }

    #[test]
    fn issue_key_serde_roundtrip() {
        let key = IssueKey::new("ABC-42").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"ABC-42\"");
        let parsed: IssueKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn issue_key_serde_rejects_empty() {
        let result: Result<IssueKey, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn project_key_from_str() {
        let key: ProjectKey = "ABC".parse().unwrap();
        assert_eq!(key.as_str(), "ABC");
        assert_eq!(key.to_string(), "ABC");
    }
}
