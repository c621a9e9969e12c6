//! Calendar pages
//!
//! A page shows one instance of a display unit broken into its base unit
//! instances, optionally nested one level further, with the events of each.
//! Anything the request leaves unset comes from the calendar's default
//! display config.

use almanac_core::{CalendarError, CalendarId, DateBookmark, Event, TimeUnitId};
use almanac_format::instance_display_name;
use almanac_units::{Hierarchy, UnitHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page overrides; `None` falls back to the default display config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub display_unit: Option<TimeUnitId>,
    #[serde(default)]
    pub nest_level: Option<u32>,
    #[serde(default)]
    pub iteration: Option<i64>,
}

impl ViewRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_unit(mut self, unit: TimeUnitId) -> Self {
        self.display_unit = Some(unit);
        self
    }

    pub fn with_nest_level(mut self, level: u32) -> Self {
        self.nest_level = Some(level);
        self
    }

    pub fn at_iteration(mut self, iteration: i64) -> Self {
        self.iteration = Some(iteration);
        self
    }
}

/// One instance shown on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewCell {
    pub name: String,
    pub iteration: i64,
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarView {
    pub calendar: CalendarId,
    pub display_unit: TimeUnitId,
    pub nest_level: u32,
    pub iteration: i64,
    /// Display name of the shown instance
    pub title: String,
    /// Cells carry children one level down
    pub nested: bool,
    /// Unit of the innermost cells
    pub smallest_unit: TimeUnitId,
    pub cells: Vec<ViewCell>,
}

impl CalendarView {
    pub fn resolve(h: Hierarchy<'_>, calendar: CalendarId, request: &ViewRequest) -> Result<Self, CalendarError> {
        let store = h.store();
        let config = match store.require_calendar(calendar)?.default_display_config {
            Some(id) => Some(store.require_display_config(id)?),
            None => None,
        };

        let unit = match request.display_unit.or_else(|| config.and_then(|c| c.display_unit)) {
            Some(id) => h.unit(id)?,
            None => h.bottom_level_unit(calendar)?,
        };
        if unit.calendar() != calendar {
            return Err(CalendarError::CrossCalendarReference {
                kind: "time unit",
                id: unit.id().get(),
                expected: calendar,
                found: unit.calendar(),
            });
        }

        let nest_level = request.nest_level.or(config.map(|c| c.nest_level)).unwrap_or(0);
        let iteration = match request.iteration {
            Some(iteration) => iteration,
            None => match config.and_then(|c| c.default_date_bookmark) {
                Some(id) => bookmarked_iteration(unit, store.require_date_bookmark(id)?)?,
                None => 1,
            },
        };

        let title = instance_display_name(unit, iteration, None, false, true)?;
        let mut cells = cells_of(unit, iteration)?;

        let middle = unit.base()?;
        let bottom = match middle {
            Some(m) => m.base()?,
            None => None,
        };
        let (nested, smallest_unit) = match (middle, bottom) {
            (Some(middle), Some(bottom)) if nest_level > 0 => {
                for cell in &mut cells {
                    cell.children = cells_of(middle, cell.iteration)?;
                }
                (true, bottom.id())
            }
            (Some(middle), _) => (false, middle.id()),
            (None, _) => (false, unit.id()),
        };

        debug!(
            calendar = %calendar,
            unit = %unit.id(),
            iteration,
            nested,
            cells = cells.len(),
            "resolved calendar page"
        );
        Ok(Self {
            calendar,
            display_unit: unit.id(),
            nest_level,
            iteration,
            title,
            nested,
            smallest_unit,
            cells,
        })
    }
}

/// Bookmarks on another unit land on the display unit instance containing them
fn bookmarked_iteration(unit: UnitHandle<'_>, bookmark: &DateBookmark) -> Result<i64, CalendarError> {
    if bookmark.bookmark_unit == unit.id() {
        return Ok(bookmark.bookmark_iteration);
    }
    let marked = unit.hierarchy().unit(bookmark.bookmark_unit)?;
    let bottom = marked.first_bottom_level_iteration(bookmark.bookmark_iteration)?;
    unit.iteration_at_bottom_level_iteration(bottom)
}

/// Base instances of `iteration`, or the instance itself for a bottom level unit
fn cells_of(unit: UnitHandle<'_>, iteration: i64) -> Result<Vec<ViewCell>, CalendarError> {
    let base = match unit.base()? {
        Some(base) => base,
        None => {
            return Ok(vec![ViewCell {
                name: format!("{} {}", unit.name(), iteration),
                iteration,
                events: owned(unit.events_at(iteration)?),
                children: Vec::new(),
            }])
        }
    };

    let instances = unit.instances_at(iteration)?;
    let first = unit.first_base_instance_iteration(iteration)?;
    let iterations: Vec<i64> = (first..).take(instances.len()).collect();
    let events = base.events_at_iterations(&iterations)?;

    Ok(instances
        .into_iter()
        .zip(iterations)
        .zip(events)
        .map(|((instance, iteration), events)| ViewCell {
            name: instance.name,
            iteration,
            events: owned(events),
            children: Vec::new(),
        })
        .collect())
}

fn owned(events: Vec<&Event>) -> Vec<Event> {
    events.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use almanac_core::prelude::*;

    fn view(store: &MemoryStore, request: ViewRequest) -> CalendarView {
        CalendarView::resolve(Hierarchy::new(store), CAL, &request).unwrap()
    }

    fn names(cells: &[ViewCell]) -> Vec<&str> {
        cells.iter().map(|c| c.name.as_str()).collect()
    }

    fn with_config(mut store: MemoryStore, config: DisplayConfig) -> MemoryStore {
        store.insert_display_config(config.clone()).unwrap();
        let calendar = store.calendar(CAL).cloned().unwrap().with_default_display_config(config.id);
        store.insert_calendar(calendar).unwrap();
        store
    }

    fn config(display_unit: Option<TimeUnitId>, nest_level: u32, bookmark: Option<DateBookmarkId>) -> DisplayConfig {
        DisplayConfig {
            id: DisplayConfigId::new(1),
            calendar: CAL,
            name: "Default".to_string(),
            display_unit,
            nest_level,
            default_date_bookmark: bookmark,
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let page = view(&reckoning(), ViewRequest::new());
        assert_eq!(page.display_unit, DAY);
        assert_eq!(page.iteration, 1);
        assert_eq!(page.nest_level, 0);
        assert_eq!(page.title, "Day 1");
        assert_eq!(page.smallest_unit, DAY);
        assert_eq!(names(&page.cells), vec!["Day 1"]);
        assert_eq!(page.cells[0].events[0].name, "New Year");
    }

    #[test]
    fn test_flat_year_page() {
        let page = view(&reckoning(), ViewRequest::new().with_display_unit(YEAR));
        assert!(!page.nested);
        assert_eq!(page.smallest_unit, MONTH);
        assert_eq!(page.cells.len(), 12);
        assert_eq!(page.cells[0].name, "January");
        assert_eq!(page.cells[11].name, "December");
        assert_eq!(page.cells.iter().map(|c| c.iteration).collect::<Vec<_>>(), (1..=12).collect::<Vec<_>>());

        let with_events: Vec<&str> = page.cells.iter().filter(|c| !c.events.is_empty()).map(|c| c.name.as_str()).collect();
        assert_eq!(with_events, vec!["January", "February"]);
    }

    #[test]
    fn test_second_year_page() {
        let page = view(&reckoning(), ViewRequest::new().with_display_unit(YEAR).at_iteration(2));
        assert_eq!(page.title, "Year 2");
        assert_eq!(page.cells[0].iteration, 13);
        assert!(page.cells.iter().all(|c| c.events.is_empty()));
    }

    #[test]
    fn test_nested_year_page() {
        let page = view(&reckoning(), ViewRequest::new().with_display_unit(YEAR).with_nest_level(1));
        assert!(page.nested);
        assert_eq!(page.smallest_unit, DAY);

        let february = &page.cells[1];
        assert_eq!(february.children.len(), 30);
        assert_eq!(february.children[0].name, "Day 1");
        assert_eq!(february.children[0].iteration, 31);
        assert_eq!(february.children[4].iteration, 35);
        assert_eq!(february.children[4].events[0].name, "Fair");
        assert!(february.children[3].events.is_empty());
    }

    #[test]
    fn test_nesting_needs_two_levels_below() {
        let page = view(&reckoning(), ViewRequest::new().with_display_unit(MONTH).with_nest_level(1));
        assert!(!page.nested);
        assert_eq!(page.smallest_unit, DAY);
        assert_eq!(page.cells.len(), 30);
        assert!(page.cells.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn test_config_supplies_unit_and_nesting() {
        let store = with_config(reckoning(), config(Some(YEAR), 1, None));
        let page = view(&store, ViewRequest::new());
        assert_eq!(page.display_unit, YEAR);
        assert!(page.nested);

        let page = view(&store, ViewRequest::new().with_nest_level(0));
        assert!(!page.nested);
    }

    #[test]
    fn test_config_bookmark_picks_iteration() {
        let mut store = reckoning();
        store
            .insert_date_bookmark(DateBookmark {
                id: DateBookmarkId::new(1),
                calendar: CAL,
                name: Some("Fair day".to_string()),
                bookmark_unit: DAY,
                bookmark_iteration: 35,
            })
            .unwrap();
        let store = with_config(store, config(Some(MONTH), 0, Some(DateBookmarkId::new(1))));

        let page = view(&store, ViewRequest::new());
        assert_eq!(page.display_unit, MONTH);
        assert_eq!(page.iteration, 2);
        assert_eq!(page.cells[0].iteration, 31);

        let page = view(&store, ViewRequest::new().with_display_unit(DAY));
        assert_eq!(page.iteration, 35);
        assert_eq!(page.cells[0].events[0].name, "Fair");
    }

    #[test]
    fn test_unit_from_other_calendar() {
        let store = reckoning();
        let result = CalendarView::resolve(Hierarchy::new(&store), CAL, &ViewRequest::new().with_display_unit(OTHER_DAY));
        assert!(matches!(result, Err(CalendarError::CrossCalendarReference { .. })));
    }

    #[test]
    fn test_invalid_iteration() {
        let result = CalendarView::resolve(Hierarchy::new(&reckoning()), CAL, &ViewRequest::new().at_iteration(0));
        assert_eq!(result, Err(CalendarError::InvalidIteration(0)));
    }

    #[test]
    fn test_view_serializes_without_empty_children() {
        let page = view(&reckoning(), ViewRequest::new().with_display_unit(MONTH));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["cells"][0]["name"], "Day 1");
        assert!(json["cells"][0].get("children").is_none());
    }
}
