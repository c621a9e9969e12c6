//! Cross-calendar linking
//!
//! Calendars of one world that set `world_link_iteration` share a timeline:
//! bottom level iteration `i` here is `i - own_link + other_link` there.
//! Translated positions below 1 fall before the other calendar begins and
//! are dropped.

use almanac_core::{CalendarError, CalendarId, Event, TimeUnitId};
use serde::{Deserialize, Serialize};

use crate::UnitHandle;

/// The same moment on another linked calendar's bottom level unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIteration {
    pub calendar: CalendarId,
    pub time_unit: TimeUnitId,
    pub iteration: i64,
}

impl<'s> UnitHandle<'s> {
    /// (calendar, offset) of every other linked calendar in the world
    fn link_offsets(&self) -> Result<Vec<(CalendarId, i64)>, CalendarError> {
        let calendar = self.store().require_calendar(self.calendar())?;
        let (world, own_link) = match (calendar.world, calendar.world_link_iteration) {
            (Some(world), Some(link)) => (world, link),
            _ => return Ok(Vec::new()),
        };

        let mut offsets = Vec::new();
        for other in self.store().calendars_in_world(world) {
            let Some(link) = other.world_link_iteration.filter(|_| other.id != calendar.id) else {
                continue;
            };
            let offset = link.checked_sub(own_link).ok_or(CalendarError::IterationOverflow(link))?;
            offsets.push((other.id, offset));
        }
        Ok(offsets)
    }

    /// Where the start of `iteration` falls on each other linked calendar
    pub fn linked_iterations(&self, iteration: i64) -> Result<Vec<LinkedIteration>, CalendarError> {
        let overflow = || CalendarError::IterationOverflow(iteration);
        let bottom = self.first_bottom_level_iteration(iteration)?;
        let mut linked = Vec::new();
        for (calendar, offset) in self.link_offsets()? {
            let target = bottom.checked_add(offset).ok_or_else(overflow)?;
            if target < 1 {
                continue;
            }
            let unit = match self.hierarchy().bottom_level_unit(calendar) {
                Ok(unit) => unit,
                Err(CalendarError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            linked.push(LinkedIteration {
                calendar,
                time_unit: unit.id(),
                iteration: target,
            });
        }
        Ok(linked)
    }

    /// Events of other linked calendars inside the span of `iteration`
    pub fn linked_events(&self, iteration: i64) -> Result<Vec<&'s Event>, CalendarError> {
        let overflow = || CalendarError::IterationOverflow(iteration);
        let first = self.first_bottom_level_iteration(iteration)?;
        let last = first
            .checked_add(self.bottom_level_length(iteration)? - 1)
            .ok_or_else(overflow)?;

        let mut events = Vec::new();
        for (calendar, offset) in self.link_offsets()? {
            let high = last.checked_add(offset).ok_or_else(overflow)?;
            if high < 1 {
                continue;
            }
            let low = first.checked_add(offset).ok_or_else(overflow)?.max(1);
            events.extend(self.store().events_in_range(calendar, low, high));
        }
        Ok(events)
    }
}
