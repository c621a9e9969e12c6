//! Reading formatted dates back into iterations
//!
//! A format can be read back when an absolute code anchors some unit at or
//! above the format's unit, and relative codes chain from that anchor down
//! to the format's unit. Each link in the chain turns a parent iteration
//! plus a position into the sub unit's iteration. A name link only works
//! when the sub unit is the parent's base unit and the parent's custom
//! names are unique.

use almanac_core::{CalendarError, TimeUnitId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::ControlFlow;
use tracing::{debug, trace};

use crate::compile::{Code, DisplayKind};
use crate::formatter::DateFormatter;

impl<'s> DateFormatter<'s> {
    /// Whether `iteration_of` can read this format's output back
    pub fn is_reversible(&self) -> Result<bool, CalendarError> {
        let target = self.unit().id();
        if self.compiled().malformed().next().is_some() {
            return Ok(false);
        }
        if !self.compiled().codes().any(|c| c.sub == target) {
            debug!(format = %self.format().id, "not reversible: no code for the format's own unit");
            return Ok(false);
        }

        let mut frontier: VecDeque<TimeUnitId> = self.anchors()?.into_iter().map(|c| c.sub).collect();
        let mut reached: HashSet<TimeUnitId> = frontier.iter().copied().collect();
        while let Some(unit) = frontier.pop_front() {
            if unit == target {
                debug!(format = %self.format().id, "reversible");
                return Ok(true);
            }
            for code in self.compiled().codes().filter(|c| c.parent == unit && !c.is_absolute()) {
                if !reached.contains(&code.sub) && self.is_usable_link(code)? {
                    reached.insert(code.sub);
                    frontier.push_back(code.sub);
                }
            }
        }
        debug!(format = %self.format().id, "not reversible: no chain of codes reaches the format's unit");
        Ok(false)
    }

    /// Absolute numeric codes for units containing the format's unit
    fn anchors(&self) -> Result<Vec<&Code>, CalendarError> {
        let h = self.hierarchy();
        let target = self.unit().id();
        let mut anchors = Vec::new();
        for code in self.compiled().codes() {
            if code.is_absolute()
                && code.display == DisplayKind::Iteration
                && h.unit(code.sub)?.contains_unit(target)?
            {
                anchors.push(code);
            }
        }
        Ok(anchors)
    }

    /// A relative code that leads toward the format's unit and resolves to one instance
    fn is_usable_link(&self, code: &Code) -> Result<bool, CalendarError> {
        let h = self.hierarchy();
        let parent = h.unit(code.parent)?;
        if !parent.contains_unit(code.sub)? || !h.unit(code.sub)?.contains_unit(self.unit().id())? {
            return Ok(false);
        }
        Ok(match code.display {
            DisplayKind::Iteration => true,
            DisplayKind::Name => {
                parent.base()?.map(|b| b.id()) == Some(code.sub) && !parent.record().has_duplicate_instance_names()
            }
        })
    }

    /// The text standing in each code slot of `date`
    pub fn values_from_formatted_date(&self, date: &str) -> Result<Vec<String>, CalendarError> {
        self.compiled().values_of(date)
    }

    /// Iteration of the format's unit that `date` was rendered from
    pub fn iteration_of(&self, date: &str) -> Result<i64, CalendarError> {
        if let Some(raw) = self.compiled().malformed().next() {
            return Err(CalendarError::MalformedCode(raw.to_string()));
        }
        if !self.is_reversible()? {
            return Err(self.not_reversible());
        }

        let mut usable = Vec::new();
        for code in self.compiled().codes() {
            usable.push(if code.is_absolute() {
                self.anchors()?.contains(&code)
            } else {
                self.is_usable_link(code)?
            });
        }

        // Later splits only matter when the shortest one fails to read
        let mut first_error = None;
        let found = self.compiled().find_split(date, |values| {
            match self.resolve_values(date, &usable, values) {
                Ok(iteration) => ControlFlow::Break(iteration),
                Err(e) => {
                    first_error.get_or_insert(e);
                    ControlFlow::Continue(())
                }
            }
        });
        match (found, first_error) {
            (Some(iteration), _) => {
                debug!(format = %self.format().id, date, iteration, "parsed formatted date");
                Ok(iteration)
            }
            (None, Some(e)) => Err(e),
            (None, None) => Err(CalendarError::unparseable(date, "literal text does not match the format")),
        }
    }

    /// Resolve one split of `date`, anchors first, then links down from known units
    fn resolve_values(&self, date: &str, usable: &[bool], values: &[&str]) -> Result<i64, CalendarError> {
        let mut pending: Vec<(&Code, &str)> = self
            .compiled()
            .codes()
            .zip(values.iter().copied())
            .zip(usable)
            .filter(|(_, usable)| **usable)
            .map(|(pair, _)| pair)
            .collect();

        let target = self.unit().id();
        let mut known: HashMap<TimeUnitId, i64> = HashMap::new();
        loop {
            let before = pending.len();
            let mut waiting = Vec::new();
            for (code, value) in pending {
                let resolved = if code.is_absolute() {
                    parse_position(date, value)?
                } else if let Some(&parent_iteration) = known.get(&code.parent) {
                    self.resolve_link(date, code, value, parent_iteration)?
                } else {
                    waiting.push((code, value));
                    continue;
                };
                trace!(code = %code, value, resolved, "read date format code");
                match known.insert(code.sub, resolved) {
                    Some(previous) if previous != resolved => {
                        return Err(CalendarError::unparseable(
                            date,
                            format!("codes disagree on unit {}: {} and {}", code.sub, previous, resolved),
                        ));
                    }
                    _ => {}
                }
            }
            pending = waiting;

            if let Some(&iteration) = known.get(&target) {
                return Ok(iteration);
            }
            if pending.len() == before {
                return Err(self.not_reversible());
            }
        }
    }

    /// Sub unit iteration named by `value` inside `parent_iteration`
    fn resolve_link(&self, date: &str, code: &Code, value: &str, parent_iteration: i64) -> Result<i64, CalendarError> {
        let parent = self.hierarchy().unit(code.parent)?;
        let position = match code.display {
            DisplayKind::Iteration => parse_position(date, value)?,
            DisplayKind::Name => parent
                .instances_at(parent_iteration)?
                .iter()
                .position(|instance| instance.name == value)
                .map(|i| i as i64 + 1)
                .ok_or_else(|| {
                    CalendarError::unparseable(
                        date,
                        format!("'{}' is not an instance of {} {}", value, parent.name(), parent_iteration),
                    )
                })?,
        };

        let first = parent.first_sub_unit_instance_iteration(code.sub, parent_iteration)?;
        let next = parent.first_sub_unit_instance_iteration(code.sub, parent_iteration + 1)?;
        if position > next - first {
            return Err(CalendarError::unparseable(
                date,
                format!("{} {} has only {} instances of unit {}", parent.name(), parent_iteration, next - first, code.sub),
            ));
        }
        Ok(first + position - 1)
    }

    fn not_reversible(&self) -> CalendarError {
        CalendarError::NotReversible(format!(
            "'{}' does not pin down a single {}",
            self.format().name,
            self.unit().name()
        ))
    }
}

fn parse_position(date: &str, value: &str) -> Result<i64, CalendarError> {
    let n: i64 = value
        .trim()
        .parse()
        .map_err(|_| CalendarError::unparseable(date, format!("'{}' is not a number", value)))?;
    if n < 1 {
        return Err(CalendarError::InvalidIteration(n));
    }
    Ok(n)
}
