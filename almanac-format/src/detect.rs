//! Guessing which format produced a date string

use almanac_core::{CalendarError, DateFormat};
use std::cmp::Reverse;
use tracing::debug;

use crate::compile::CompiledFormat;
use crate::formatter::DateFormatter;

impl<'s> DateFormatter<'s> {
    /// Fluff differs from the fluff of every format in `others`
    pub fn is_differentiable(&self, others: &[DateFormatter<'_>]) -> bool {
        self.compiled().is_differentiable(others.iter().map(|o| o.compiled()))
    }

    /// Loose check that `date` has this format's literal text in the right places
    pub fn formatted_date_is_possible(&self, date: &str) -> Result<bool, CalendarError> {
        self.compiled().could_produce(date)
    }
}

/// Candidates that could have produced `date`, most specific first
///
/// Specificity is the number of non-empty fluff segments; ties keep their
/// input order.
pub fn find_likely_source_formats<'f>(
    date: &str,
    candidates: &[&'f DateFormat],
) -> Result<Vec<&'f DateFormat>, CalendarError> {
    let mut likely = Vec::new();
    for &format in candidates {
        let compiled = CompiledFormat::compile(&format.format_string)?;
        if compiled.could_produce(date)? {
            likely.push((compiled.specificity(), format));
        }
    }
    likely.sort_by_key(|&(specificity, _)| Reverse(specificity));
    debug!(date, candidates = candidates.len(), matches = likely.len(), "ranked source formats");
    Ok(likely.into_iter().map(|(_, format)| format).collect())
}
