//! Event lookup
//!
//! Events are anchored to a bottom level iteration; an instance of any unit
//! owns the events inside its bottom level span.

use almanac_core::{CalendarError, Event};

use crate::UnitHandle;

impl<'s> UnitHandle<'s> {
    /// Events inside `iteration`, ordered by display order
    pub fn events_at(&self, iteration: i64) -> Result<Vec<&'s Event>, CalendarError> {
        let first = self.first_bottom_level_iteration(iteration)?;
        let last = first + self.bottom_level_length(iteration)? - 1;
        Ok(self.store().events_in_range(self.calendar(), first, last))
    }

    /// Reads the calendar's events once for all iterations
    pub fn events_at_iterations(&self, iterations: &[i64]) -> Result<Vec<Vec<&'s Event>>, CalendarError> {
        let firsts = self.first_bottom_level_iteration_at_iterations(iterations)?;
        let lengths = self.bottom_level_length_at_iterations(iterations)?;
        let mut all = self.store().events_in_calendar(self.calendar());
        all.sort_by_key(|e| (e.display_order, e.id));

        Ok(firsts
            .into_iter()
            .zip(lengths)
            .map(|(first, length)| {
                let span = first..first + length;
                all.iter()
                    .copied()
                    .filter(|e| span.contains(&e.bottom_level_iteration))
                    .collect()
            })
            .collect())
    }
}
