//! Entity identifiers
//!
//! Records are owned by an external store and refer to each other by id.
//! Ids are plain integers so they can appear inside format strings
//! (`{12-7-i}`) and JSON payloads unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(WorldId);
define_id!(CalendarId);
define_id!(TimeUnitId);
define_id!(EventId);
define_id!(DateFormatId);
define_id!(DateBookmarkId);
define_id!(DisplayConfigId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parses_with_whitespace() {
        let id: TimeUnitId = " 42 ".parse().unwrap();
        assert_eq!(id, TimeUnitId::new(42));
        assert!("x1".parse::<TimeUnitId>().is_err());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&CalendarId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
