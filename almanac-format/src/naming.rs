//! Display names for instances, bookmarks and events
//!
//! Names fall back to `"<unit name> <iteration>"` whenever no date format
//! applies.

use almanac_core::{CalendarError, DateBookmark, DateFormat, DateFormatId, Event};
use almanac_units::{Hierarchy, UnitHandle};

use crate::formatter::DateFormatter;

/// Display name of instance `iteration` of `unit`
///
/// An explicit `format` wins and must belong to `unit`. Otherwise the
/// unit's default format is used, or its secondary one when
/// `prefer_secondary` is set; `backup_to_other` allows falling back to the
/// format that was not preferred.
pub fn instance_display_name(
    unit: UnitHandle<'_>,
    iteration: i64,
    format: Option<&DateFormat>,
    prefer_secondary: bool,
    backup_to_other: bool,
) -> Result<String, CalendarError> {
    let h = unit.hierarchy();
    if let Some(format) = format {
        return render_with(h, unit, format, iteration);
    }

    let record = unit.record();
    let (preferred, other) = if prefer_secondary {
        (record.secondary_date_format, record.default_date_format)
    } else {
        (record.default_date_format, record.secondary_date_format)
    };
    let chosen: Option<DateFormatId> = preferred.or(if backup_to_other { other } else { None });

    match chosen {
        Some(id) => render_with(h, unit, h.store().require_date_format(id)?, iteration),
        None if iteration < 1 => Err(CalendarError::InvalidIteration(iteration)),
        None => Ok(plain_name(unit, iteration)),
    }
}

/// Stored and explicit formats alike must belong to the unit being named
fn render_with(h: Hierarchy<'_>, unit: UnitHandle<'_>, format: &DateFormat, iteration: i64) -> Result<String, CalendarError> {
    if format.time_unit != unit.id() {
        return Err(CalendarError::FormatUnitMismatch {
            format: format.id,
            format_unit: format.time_unit,
            unit: unit.id(),
        });
    }
    DateFormatter::new(h, format)?.format_at(iteration)
}

fn plain_name(unit: UnitHandle<'_>, iteration: i64) -> String {
    format!("{} {}", unit.name(), iteration)
}

/// Explicit name, else the bookmarked instance in its unit's default format
pub fn bookmark_display_name(hierarchy: Hierarchy<'_>, bookmark: &DateBookmark) -> Result<String, CalendarError> {
    if let Some(name) = bookmark.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return Ok(name.to_string());
    }
    let unit = hierarchy.unit(bookmark.bookmark_unit)?;
    instance_display_name(unit, bookmark.bookmark_iteration, None, false, false)
}

/// The event's day as its calendar's bottom level unit would name it
pub fn event_display_date(hierarchy: Hierarchy<'_>, event: &Event) -> Result<String, CalendarError> {
    let bottom = hierarchy.bottom_level_unit(event.calendar)?;
    instance_display_name(bottom, event.bottom_level_iteration, None, false, true)
}
