//! Record storage
//!
//! The arithmetic reads records through `CalendarStore`; persistence is the
//! caller's business. `MemoryStore` is the in-process implementation and
//! refuses data the arithmetic cannot work with: base units from another
//! calendar, base unit cycles, and a second bottom level unit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::ids::*;
use crate::model::*;
use crate::CalendarError;

/// Read access to calendar records
pub trait CalendarStore: Send + Sync {
    fn world(&self, id: WorldId) -> Option<&World>;
    fn calendar(&self, id: CalendarId) -> Option<&Calendar>;
    fn time_unit(&self, id: TimeUnitId) -> Option<&TimeUnit>;
    fn event(&self, id: EventId) -> Option<&Event>;
    fn date_format(&self, id: DateFormatId) -> Option<&DateFormat>;
    fn date_bookmark(&self, id: DateBookmarkId) -> Option<&DateBookmark>;
    fn display_config(&self, id: DisplayConfigId) -> Option<&DisplayConfig>;

    fn calendars_in_world(&self, world: WorldId) -> Vec<&Calendar>;
    fn units_in_calendar(&self, calendar: CalendarId) -> Vec<&TimeUnit>;
    fn events_in_calendar(&self, calendar: CalendarId) -> Vec<&Event>;
    fn formats_in_calendar(&self, calendar: CalendarId) -> Vec<&DateFormat>;
    fn bookmarks_in_calendar(&self, calendar: CalendarId) -> Vec<&DateBookmark>;

    // ========== Derived Queries ==========

    /// Units whose base unit is `base`
    fn units_with_base(&self, base: TimeUnitId) -> Vec<&TimeUnit> {
        match self.time_unit(base) {
            Some(unit) => self
                .units_in_calendar(unit.calendar)
                .into_iter()
                .filter(|u| u.base_unit == Some(base))
                .collect(),
            None => Vec::new(),
        }
    }

    fn formats_of_unit(&self, unit: TimeUnitId) -> Vec<&DateFormat> {
        match self.time_unit(unit) {
            Some(u) => self
                .formats_in_calendar(u.calendar)
                .into_iter()
                .filter(|f| f.time_unit == unit)
                .collect(),
            None => Vec::new(),
        }
    }

    fn bookmarks_of_unit(&self, unit: TimeUnitId) -> Vec<&DateBookmark> {
        match self.time_unit(unit) {
            Some(u) => self
                .bookmarks_in_calendar(u.calendar)
                .into_iter()
                .filter(|b| b.bookmark_unit == unit)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Events of a calendar anchored in `[first, last]`, by display order
    fn events_in_range(&self, calendar: CalendarId, first: i64, last: i64) -> Vec<&Event> {
        let mut events: Vec<&Event> = self
            .events_in_calendar(calendar)
            .into_iter()
            .filter(|e| (first..=last).contains(&e.bottom_level_iteration))
            .collect();
        events.sort_by_key(|e| (e.display_order, e.id));
        events
    }

    // ========== Required Lookups ==========

    fn require_world(&self, id: WorldId) -> Result<&World, CalendarError> {
        self.world(id).ok_or_else(|| CalendarError::not_found("world", id))
    }

    fn require_calendar(&self, id: CalendarId) -> Result<&Calendar, CalendarError> {
        self.calendar(id).ok_or_else(|| CalendarError::not_found("calendar", id))
    }

    fn require_time_unit(&self, id: TimeUnitId) -> Result<&TimeUnit, CalendarError> {
        self.time_unit(id).ok_or_else(|| CalendarError::not_found("time unit", id))
    }

    fn require_event(&self, id: EventId) -> Result<&Event, CalendarError> {
        self.event(id).ok_or_else(|| CalendarError::not_found("event", id))
    }

    fn require_date_format(&self, id: DateFormatId) -> Result<&DateFormat, CalendarError> {
        self.date_format(id).ok_or_else(|| CalendarError::not_found("date format", id))
    }

    fn require_date_bookmark(&self, id: DateBookmarkId) -> Result<&DateBookmark, CalendarError> {
        self.date_bookmark(id).ok_or_else(|| CalendarError::not_found("date bookmark", id))
    }

    fn require_display_config(&self, id: DisplayConfigId) -> Result<&DisplayConfig, CalendarError> {
        self.display_config(id).ok_or_else(|| CalendarError::not_found("display config", id))
    }
}

/// Every record of a store, for loading fixtures and exports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub worlds: Vec<World>,
    #[serde(default)]
    pub calendars: Vec<Calendar>,
    #[serde(default)]
    pub time_units: Vec<TimeUnit>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub date_formats: Vec<DateFormat>,
    #[serde(default)]
    pub date_bookmarks: Vec<DateBookmark>,
    #[serde(default)]
    pub display_configs: Vec<DisplayConfig>,
}

/// Validating in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    worlds: BTreeMap<WorldId, World>,
    calendars: BTreeMap<CalendarId, Calendar>,
    time_units: BTreeMap<TimeUnitId, TimeUnit>,
    events: BTreeMap<EventId, Event>,
    date_formats: BTreeMap<DateFormatId, DateFormat>,
    date_bookmarks: BTreeMap<DateBookmarkId, DateBookmark>,
    display_configs: BTreeMap<DisplayConfigId, DisplayConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot, inserting units base-first whatever their order
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, CalendarError> {
        let mut store = Self::new();
        for world in snapshot.worlds {
            store.insert_world(world)?;
        }
        for calendar in snapshot.calendars {
            store.insert_calendar(calendar)?;
        }

        let mut pending = snapshot.time_units;
        while !pending.is_empty() {
            let (ready, waiting): (Vec<TimeUnit>, Vec<TimeUnit>) = pending.into_iter().partition(|u| {
                u.base_unit.map_or(true, |base| store.time_units.contains_key(&base))
            });
            if ready.is_empty() {
                // Every remaining unit waits on a base that is missing or part of a loop
                let ids: Vec<TimeUnitId> = waiting.iter().map(|u| u.id).collect();
                return Err(match waiting.iter().find_map(|u| {
                    u.base_unit.filter(|base| !ids.contains(base))
                }) {
                    Some(missing) => CalendarError::not_found("time unit", missing),
                    None => CalendarError::CyclicHierarchy(ids[0]),
                });
            }
            for unit in ready {
                store.insert_time_unit(unit)?;
            }
            pending = waiting;
        }

        for event in snapshot.events {
            store.insert_event(event)?;
        }
        for format in snapshot.date_formats {
            store.insert_date_format(format)?;
        }
        for bookmark in snapshot.date_bookmarks {
            store.insert_date_bookmark(bookmark)?;
        }
        for config in snapshot.display_configs {
            store.insert_display_config(config)?;
        }

        debug!(
            calendars = store.calendars.len(),
            time_units = store.time_units.len(),
            events = store.events.len(),
            "loaded calendar snapshot"
        );
        Ok(store)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            worlds: self.worlds.values().cloned().collect(),
            calendars: self.calendars.values().cloned().collect(),
            time_units: self.time_units.values().cloned().collect(),
            events: self.events.values().cloned().collect(),
            date_formats: self.date_formats.values().cloned().collect(),
            date_bookmarks: self.date_bookmarks.values().cloned().collect(),
            display_configs: self.display_configs.values().cloned().collect(),
        }
    }

    // ========== Inserts ==========

    pub fn insert_world(&mut self, world: World) -> Result<(), CalendarError> {
        self.worlds.insert(world.id, world);
        Ok(())
    }

    pub fn insert_calendar(&mut self, calendar: Calendar) -> Result<(), CalendarError> {
        if let Some(world) = calendar.world {
            self.require_world(world)?;
        }
        self.calendars.insert(calendar.id, calendar);
        Ok(())
    }

    pub fn insert_time_unit(&mut self, unit: TimeUnit) -> Result<(), CalendarError> {
        self.require_calendar(unit.calendar)?;

        match unit.base_unit {
            Some(base_id) => {
                let base = self.require_time_unit(base_id)?;
                self.check_same_calendar("time unit", base_id.get(), unit.calendar, base.calendar)?;

                // Only a replaced unit can close a loop: follow the bases back to it
                let mut current = Some(base_id);
                let mut steps = 0;
                while let Some(id) = current {
                    if id == unit.id || steps > self.time_units.len() {
                        return Err(CalendarError::CyclicHierarchy(unit.id));
                    }
                    current = self.time_units.get(&id).and_then(|u| u.base_unit);
                    steps += 1;
                }
            }
            None => {
                let existing = self
                    .time_units
                    .values()
                    .find(|u| u.calendar == unit.calendar && u.base_unit.is_none() && u.id != unit.id);
                if let Some(existing) = existing {
                    return Err(CalendarError::MultipleBottomUnits {
                        calendar: unit.calendar,
                        existing: existing.id,
                    });
                }
            }
        }

        self.time_units.insert(unit.id, unit);
        Ok(())
    }

    pub fn insert_event(&mut self, event: Event) -> Result<(), CalendarError> {
        self.require_calendar(event.calendar)?;
        self.events.insert(event.id, event);
        Ok(())
    }

    pub fn insert_date_format(&mut self, format: DateFormat) -> Result<(), CalendarError> {
        self.require_calendar(format.calendar)?;
        let unit = self.require_time_unit(format.time_unit)?;
        self.check_same_calendar("time unit", format.time_unit.get(), format.calendar, unit.calendar)?;
        self.date_formats.insert(format.id, format);
        Ok(())
    }

    pub fn insert_date_bookmark(&mut self, bookmark: DateBookmark) -> Result<(), CalendarError> {
        self.require_calendar(bookmark.calendar)?;
        let unit = self.require_time_unit(bookmark.bookmark_unit)?;
        self.check_same_calendar("time unit", bookmark.bookmark_unit.get(), bookmark.calendar, unit.calendar)?;
        self.date_bookmarks.insert(bookmark.id, bookmark);
        Ok(())
    }

    pub fn insert_display_config(&mut self, config: DisplayConfig) -> Result<(), CalendarError> {
        self.require_calendar(config.calendar)?;
        if let Some(unit_id) = config.display_unit {
            let unit = self.require_time_unit(unit_id)?;
            self.check_same_calendar("time unit", unit_id.get(), config.calendar, unit.calendar)?;
        }
        if let Some(bookmark_id) = config.default_date_bookmark {
            let bookmark = self.require_date_bookmark(bookmark_id)?;
            self.check_same_calendar("date bookmark", bookmark_id.get(), config.calendar, bookmark.calendar)?;
        }
        self.display_configs.insert(config.id, config);
        Ok(())
    }

    fn check_same_calendar(
        &self,
        kind: &'static str,
        id: u64,
        expected: CalendarId,
        found: CalendarId,
    ) -> Result<(), CalendarError> {
        if expected == found {
            Ok(())
        } else {
            Err(CalendarError::CrossCalendarReference { kind, id, expected, found })
        }
    }
}

impl CalendarStore for MemoryStore {
    fn world(&self, id: WorldId) -> Option<&World> {
        self.worlds.get(&id)
    }

    fn calendar(&self, id: CalendarId) -> Option<&Calendar> {
        self.calendars.get(&id)
    }

    fn time_unit(&self, id: TimeUnitId) -> Option<&TimeUnit> {
        self.time_units.get(&id)
    }

    fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    fn date_format(&self, id: DateFormatId) -> Option<&DateFormat> {
        self.date_formats.get(&id)
    }

    fn date_bookmark(&self, id: DateBookmarkId) -> Option<&DateBookmark> {
        self.date_bookmarks.get(&id)
    }

    fn display_config(&self, id: DisplayConfigId) -> Option<&DisplayConfig> {
        self.display_configs.get(&id)
    }

    fn calendars_in_world(&self, world: WorldId) -> Vec<&Calendar> {
        self.calendars.values().filter(|c| c.world == Some(world)).collect()
    }

    fn units_in_calendar(&self, calendar: CalendarId) -> Vec<&TimeUnit> {
        self.time_units.values().filter(|u| u.calendar == calendar).collect()
    }

    fn events_in_calendar(&self, calendar: CalendarId) -> Vec<&Event> {
        self.events.values().filter(|e| e.calendar == calendar).collect()
    }

    fn formats_in_calendar(&self, calendar: CalendarId) -> Vec<&DateFormat> {
        self.date_formats.values().filter(|f| f.calendar == calendar).collect()
    }

    fn bookmarks_in_calendar(&self, calendar: CalendarId) -> Vec<&DateBookmark> {
        self.date_bookmarks.values().filter(|b| b.calendar == calendar).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LengthCycle;

    fn cal() -> CalendarId {
        CalendarId::new(1)
    }

    fn base_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_calendar(Calendar::new(cal(), "Test")).unwrap();
        store.insert_time_unit(TimeUnit::new(TimeUnitId::new(1), cal(), "Day")).unwrap();
        store
            .insert_time_unit(
                TimeUnit::new(TimeUnitId::new(2), cal(), "Month")
                    .with_base(TimeUnitId::new(1), LengthCycle::from_integers(&[30]).unwrap()),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_second_bottom_unit_rejected() {
        let mut store = base_store();
        let err = store
            .insert_time_unit(TimeUnit::new(TimeUnitId::new(3), cal(), "Hour"))
            .unwrap_err();
        assert_eq!(
            err,
            CalendarError::MultipleBottomUnits { calendar: cal(), existing: TimeUnitId::new(1) }
        );
    }

    #[test]
    fn test_replacing_bottom_unit_allowed() {
        let mut store = base_store();
        store
            .insert_time_unit(TimeUnit::new(TimeUnitId::new(1), cal(), "Dawn"))
            .unwrap();
        assert_eq!(store.require_time_unit(TimeUnitId::new(1)).unwrap().name, "Dawn");
    }

    #[test]
    fn test_base_cycle_rejected() {
        let mut store = base_store();
        // Day -> Month -> Day
        let err = store
            .insert_time_unit(
                TimeUnit::new(TimeUnitId::new(1), cal(), "Day").with_base(TimeUnitId::new(2), LengthCycle::default()),
            )
            .unwrap_err();
        assert_eq!(err, CalendarError::CyclicHierarchy(TimeUnitId::new(1)));
    }

    #[test]
    fn test_base_from_other_calendar_rejected() {
        let mut store = base_store();
        store.insert_calendar(Calendar::new(CalendarId::new(2), "Other")).unwrap();
        let err = store
            .insert_time_unit(
                TimeUnit::new(TimeUnitId::new(9), CalendarId::new(2), "Week")
                    .with_base(TimeUnitId::new(1), LengthCycle::default()),
            )
            .unwrap_err();
        assert!(matches!(err, CalendarError::CrossCalendarReference { .. }));
    }

    #[test]
    fn test_missing_base_is_not_found() {
        let mut store = base_store();
        let err = store
            .insert_time_unit(
                TimeUnit::new(TimeUnitId::new(5), cal(), "Year").with_base(TimeUnitId::new(77), LengthCycle::default()),
            )
            .unwrap_err();
        assert_eq!(err, CalendarError::not_found("time unit", TimeUnitId::new(77)));
    }

    #[test]
    fn test_snapshot_orders_units() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "calendars": [{"id": 1, "name": "Test"}],
                "time_units": [
                    {"id": 3, "calendar": 1, "name": "Year", "base_unit": 2, "length_cycle": "12"},
                    {"id": 2, "calendar": 1, "name": "Month", "base_unit": 1, "length_cycle": [30]},
                    {"id": 1, "calendar": 1, "name": "Day"}
                ],
                "events": [{"id": 1, "calendar": 1, "name": "Feast", "bottom_level_iteration": 10}]
            }"#,
        )
        .unwrap();
        let store = MemoryStore::from_snapshot(snapshot).unwrap();
        assert_eq!(store.units_in_calendar(cal()).len(), 3);
        assert_eq!(store.units_with_base(TimeUnitId::new(2))[0].name, "Year");
        assert_eq!(store.snapshot().time_units.len(), 3);
    }

    #[test]
    fn test_snapshot_detects_loops() {
        let snapshot = Snapshot {
            calendars: vec![Calendar::new(cal(), "Test")],
            time_units: vec![
                TimeUnit::new(TimeUnitId::new(1), cal(), "A").with_base(TimeUnitId::new(2), LengthCycle::default()),
                TimeUnit::new(TimeUnitId::new(2), cal(), "B").with_base(TimeUnitId::new(1), LengthCycle::default()),
            ],
            ..Snapshot::default()
        };
        assert!(matches!(
            MemoryStore::from_snapshot(snapshot),
            Err(CalendarError::CyclicHierarchy(_))
        ));
    }

    #[test]
    fn test_events_in_range_sorted_by_display_order() {
        let mut store = base_store();
        store.insert_event(Event::new(EventId::new(1), cal(), "Late", 5).with_display_order(2)).unwrap();
        store.insert_event(Event::new(EventId::new(2), cal(), "Early", 6).with_display_order(1)).unwrap();
        store.insert_event(Event::new(EventId::new(3), cal(), "Outside", 40)).unwrap();

        let names: Vec<&str> = store.events_in_range(cal(), 1, 30).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Early", "Late"]);
    }

    #[test]
    fn test_format_must_match_calendar() {
        let mut store = base_store();
        store.insert_calendar(Calendar::new(CalendarId::new(2), "Other")).unwrap();
        let err = store
            .insert_date_format(DateFormat::new(
                DateFormatId::new(1),
                CalendarId::new(2),
                TimeUnitId::new(1),
                "Bad",
                "{1-1-i}",
            ))
            .unwrap_err();
        assert!(matches!(err, CalendarError::CrossCalendarReference { .. }));
    }
}
