//! Almanac Units - Time Unit Hierarchy
//!
//! Resolves a calendar's unit tree down to its bottom level unit:
//! - Lengths and named instances of any unit
//! - Conversions to and from bottom level iterations
//! - Positions of sub units inside their parents
//! - Events inside an instance, and the same span on linked calendars

mod hierarchy;
mod events;
mod links;
mod functions;

#[cfg(test)]
mod fixtures;

pub use hierarchy::{Hierarchy, Instance, UnitHandle};
pub use links::LinkedIteration;

use almanac_plugin::PluginRegistry;

/// Load hierarchy and event functions into registry
pub fn load_units_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Cycles and lengths (3 functions)
        .with_function(functions::LengthAt)
        .with_function(functions::ExpandCycle)
        .with_function(functions::InstancesAt)

        // Bottom level conversions (4 functions)
        .with_function(functions::FirstBottomLevelIteration)
        .with_function(functions::BottomLevelLength)
        .with_function(functions::IterationAtBottomLevelIteration)
        .with_function(functions::SubUnitIterationWithinParent)

        // Events and links (3 functions)
        .with_function(functions::EventsAt)
        .with_function(functions::LinkedIterations)
        .with_function(functions::LinkedEvents)
}
