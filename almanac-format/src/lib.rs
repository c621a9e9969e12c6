//! Almanac Format - Date Formats and Display Names
//!
//! A date format is literal text with `{parent-sub-display}` codes between
//! it, e.g. `"{3-2-n} {2-1-i}, {3-3-i}"` → `"April 10, 1"`.
//! - Rendering an instance of the format's unit
//! - Reading a rendered date back into an iteration
//! - Guessing which formats could have produced a date
//! - Display names for instances, bookmarks and events

mod compile;
mod formatter;
mod reverse;
mod detect;
mod naming;
mod functions;

#[cfg(test)]
mod fixtures;

pub use compile::{Code, CompiledFormat, DisplayKind, Slot};
pub use formatter::{date_representations, DateFormatter, DateRepresentation, INVALID_CODE};
pub use detect::find_likely_source_formats;
pub use naming::{bookmark_display_name, event_display_date, instance_display_name};

use almanac_plugin::PluginRegistry;

/// Load date format and naming functions into registry
pub fn load_format_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Formatting and parsing (3 functions)
        .with_function(functions::FormatDate)
        .with_function(functions::ParseDate)
        .with_function(functions::IsReversible)

        // Format detection (2 functions)
        .with_function(functions::IsDifferentiable)
        .with_function(functions::LikelySourceFormats)

        // Display names (4 functions)
        .with_function(functions::DateRepresentations)
        .with_function(functions::InstanceDisplayName)
        .with_function(functions::BookmarkDisplayName)
        .with_function(functions::EventDisplayDate)
}
