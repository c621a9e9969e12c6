//! Calendar records
//!
//! Plain data owned by whatever persists it. Records point at each other by
//! id only; the hierarchy is walked through a `CalendarStore`, never through
//! embedded references.

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::ids::*;
use crate::LengthCycle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: CalendarId,
    #[serde(default)]
    pub world: Option<WorldId>,
    pub name: String,
    /// Bottom unit iteration that lines up with the other linked calendars of the world
    #[serde(default)]
    pub world_link_iteration: Option<i64>,
    #[serde(default)]
    pub default_display_config: Option<DisplayConfigId>,
}

impl Calendar {
    pub fn new(id: CalendarId, name: impl Into<String>) -> Self {
        Self {
            id,
            world: None,
            name: name.into(),
            world_link_iteration: None,
            default_display_config: None,
        }
    }

    pub fn in_world(mut self, world: WorldId) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_world_link(mut self, iteration: i64) -> Self {
        self.world_link_iteration = Some(iteration);
        self
    }

    pub fn with_default_display_config(mut self, config: DisplayConfigId) -> Self {
        self.default_display_config = Some(config);
        self
    }

    pub fn is_linked(&self) -> bool {
        self.world.is_some() && self.world_link_iteration.is_some()
    }
}

/// One level of a calendar's unit tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeUnit {
    pub id: TimeUnitId,
    pub calendar: CalendarId,
    pub name: String,
    /// `None` for the bottom level unit
    #[serde(default)]
    pub base_unit: Option<TimeUnitId>,
    #[serde(default)]
    pub length_cycle: LengthCycle,
    /// Names of the first base instances inside each instance
    #[serde(default, deserialize_with = "names_from_text_or_list")]
    pub instance_names: Vec<String>,
    #[serde(default)]
    pub default_date_format: Option<DateFormatId>,
    #[serde(default)]
    pub secondary_date_format: Option<DateFormatId>,
}

impl TimeUnit {
    pub fn new(id: TimeUnitId, calendar: CalendarId, name: impl Into<String>) -> Self {
        Self {
            id,
            calendar,
            name: name.into(),
            base_unit: None,
            length_cycle: LengthCycle::default(),
            instance_names: Vec::new(),
            default_date_format: None,
            secondary_date_format: None,
        }
    }

    pub fn with_base(mut self, base: TimeUnitId, cycle: LengthCycle) -> Self {
        self.base_unit = Some(base);
        self.length_cycle = cycle;
        self
    }

    pub fn with_instance_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_format(mut self, format: DateFormatId) -> Self {
        self.default_date_format = Some(format);
        self
    }

    pub fn with_secondary_format(mut self, format: DateFormatId) -> Self {
        self.secondary_date_format = Some(format);
        self
    }

    /// Custom name of the base instance at 0-based `position`, if one was given
    pub fn instance_name(&self, position: usize) -> Option<&str> {
        self.instance_names.get(position).map(String::as_str)
    }

    pub fn has_duplicate_instance_names(&self) -> bool {
        let mut seen = HashSet::new();
        !self.instance_names.iter().all(|n| seen.insert(n.as_str()))
    }
}

/// Accepts `["Jan", "Feb"]` or the stored form `"Jan Feb"`
fn names_from_text_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    struct NamesVisitor;

    impl<'de> Visitor<'de> for NamesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of names or a space-separated string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<String>, E> {
            Ok(v.split_whitespace().map(str::to_string).collect())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Vec<String>, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<String>, A::Error> {
            let mut names = Vec::new();
            while let Some(name) = seq.next_element::<String>()? {
                names.push(name);
            }
            Ok(names)
        }
    }

    deserializer.deserialize_any(NamesVisitor)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub calendar: CalendarId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub bottom_level_iteration: i64,
    #[serde(default)]
    pub display_order: i64,
}

impl Event {
    pub fn new(id: EventId, calendar: CalendarId, name: impl Into<String>, bottom_level_iteration: i64) -> Self {
        Self {
            id,
            calendar,
            name: name.into(),
            description: String::new(),
            bottom_level_iteration,
            display_order: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_display_order(mut self, order: i64) -> Self {
        self.display_order = order;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFormat {
    pub id: DateFormatId,
    pub calendar: CalendarId,
    pub time_unit: TimeUnitId,
    pub name: String,
    pub format_string: String,
}

impl DateFormat {
    pub fn new(
        id: DateFormatId,
        calendar: CalendarId,
        time_unit: TimeUnitId,
        name: impl Into<String>,
        format_string: impl Into<String>,
    ) -> Self {
        Self {
            id,
            calendar,
            time_unit,
            name: name.into(),
            format_string: format_string.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateBookmark {
    pub id: DateBookmarkId,
    pub calendar: CalendarId,
    #[serde(default)]
    pub name: Option<String>,
    pub bookmark_unit: TimeUnitId,
    pub bookmark_iteration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub id: DisplayConfigId,
    pub calendar: CalendarId,
    pub name: String,
    #[serde(default)]
    pub display_unit: Option<TimeUnitId>,
    #[serde(default)]
    pub nest_level: u32,
    #[serde(default)]
    pub default_date_bookmark: Option<DateBookmarkId>,
}
