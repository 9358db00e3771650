use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier (UUID v4)
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of one game session (one market)
    SessionId
);

string_id!(
    /// Identifier of a trading agent (bot)
    ///
    /// The personality scalar is derived from this string, so it must stay
    /// stable across persistence round trips.
    AgentId
);

string_id!(
    /// Identifier of a human player
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(AgentId::generate(), AgentId::generate());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = SessionId::new("game-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"game-1\"");
        assert_eq!(id.to_string(), "game-1");
    }
}
