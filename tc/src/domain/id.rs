//! Typed identifiers
//!
//! All IDs use the format: `{prefix}-{32 hex chars}`
//! Example: `task-01934a6f0c2e7b3d9a1f4c5e6d7b8a90`
//!
//! The prefix guarantees an ID is never a bare digit string, so an ID can
//! never be mistaken for a list position.

use thiserror::Error;

/// Error returned when a string is not a well-formed ID
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id: '{value}'")]
pub struct IdError {
    pub kind: &'static str,
    pub value: String,
}

const HEX_LEN: usize = 32;

/// Generate a fresh time-ordered ID with the given prefix
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::now_v7().simple())
}

fn is_well_formed(prefix: &str, value: &str) -> bool {
    value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| hex.len() == HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new unique ID
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            /// Parse and validate an ID string
            pub fn parse(value: &str) -> Result<Self, IdError> {
                let value = value.trim();
                if is_well_formed($prefix, value) {
                    Ok(Self(value.to_ascii_lowercase()))
                } else {
                    Err(IdError {
                        kind: $kind,
                        value: value.to_string(),
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(
    /// Identifier of a task
    TaskId,
    "task",
    "task"
);

typed_id!(
    /// Identifier of a conversation
    ConversationId,
    "conv",
    "conversation"
);

typed_id!(
    /// Identifier of a persisted chat message
    MessageId,
    "msg",
    "message"
);
