//! Time unit hierarchy resolver
//!
//! Units form a tree per calendar through `base_unit`, with the single
//! bottom level unit at the root. Every conversion walks that chain by id
//! through the store, so a `UnitHandle` is just a record plus the store it
//! came from.

use almanac_core::{
    gcd_i64, CalendarError, CalendarId, CalendarStore, LengthCycle, Limits, TimeUnit, TimeUnitId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// One base instance inside an instance of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub length: i64,
}

/// Entry point for hierarchy queries over a store
#[derive(Clone, Copy)]
pub struct Hierarchy<'s> {
    store: &'s dyn CalendarStore,
    limits: Limits,
}

impl<'s> Hierarchy<'s> {
    pub fn new(store: &'s dyn CalendarStore) -> Self {
        Self {
            store,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &'s dyn CalendarStore {
        self.store
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn unit(&self, id: TimeUnitId) -> Result<UnitHandle<'s>, CalendarError> {
        let unit = self.store.require_time_unit(id)?;
        Ok(UnitHandle {
            store: self.store,
            limits: self.limits,
            unit,
        })
    }

    /// The calendar's finest unit, the one every event is anchored to
    pub fn bottom_level_unit(&self, calendar: CalendarId) -> Result<UnitHandle<'s>, CalendarError> {
        self.store.require_calendar(calendar)?;
        self.store
            .units_in_calendar(calendar)
            .into_iter()
            .find(|u| u.base_unit.is_none())
            .map(|unit| UnitHandle {
                store: self.store,
                limits: self.limits,
                unit,
            })
            .ok_or_else(|| CalendarError::not_found("bottom level unit of calendar", calendar))
    }
}

/// A time unit together with the store its relatives live in
#[derive(Clone, Copy)]
pub struct UnitHandle<'s> {
    store: &'s dyn CalendarStore,
    limits: Limits,
    unit: &'s TimeUnit,
}

impl fmt::Debug for UnitHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitHandle")
            .field("id", &self.unit.id)
            .field("name", &self.unit.name)
            .finish()
    }
}

impl<'s> UnitHandle<'s> {
    // ========== Record Access ==========

    pub fn record(&self) -> &'s TimeUnit {
        self.unit
    }

    pub fn id(&self) -> TimeUnitId {
        self.unit.id
    }

    pub fn name(&self) -> &'s str {
        &self.unit.name
    }

    pub fn calendar(&self) -> CalendarId {
        self.unit.calendar
    }

    pub fn length_cycle(&self) -> &'s LengthCycle {
        &self.unit.length_cycle
    }

    pub fn store(&self) -> &'s dyn CalendarStore {
        self.store
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Hierarchy over the same store and limits
    pub fn hierarchy(&self) -> Hierarchy<'s> {
        Hierarchy::new(self.store).with_limits(self.limits)
    }

    fn lookup(&self, id: TimeUnitId) -> Result<UnitHandle<'s>, CalendarError> {
        self.hierarchy().unit(id)
    }

    pub fn base(&self) -> Result<Option<UnitHandle<'s>>, CalendarError> {
        self.unit.base_unit.map(|id| self.lookup(id)).transpose()
    }

    /// This unit followed by each base unit down to the bottom level
    pub fn chain(&self) -> Result<Vec<UnitHandle<'s>>, CalendarError> {
        let limit = self.store.units_in_calendar(self.calendar()).len().max(1);
        let mut chain = vec![*self];
        let mut current = *self;
        while let Some(base) = current.base()? {
            if chain.len() >= limit || chain.iter().any(|u| u.id() == base.id()) {
                return Err(CalendarError::CyclicHierarchy(self.id()));
            }
            chain.push(base);
            current = base;
        }
        Ok(chain)
    }

    /// Whether `sub` is this unit or reachable through its base units
    pub fn contains_unit(&self, sub: TimeUnitId) -> Result<bool, CalendarError> {
        Ok(self.chain()?.iter().any(|u| u.id() == sub))
    }

    // ========== Tree Position ==========

    pub fn is_bottom_level(&self) -> bool {
        self.unit.base_unit.is_none()
    }

    /// No unit uses this one as its base
    pub fn is_top_level(&self) -> bool {
        self.store.units_with_base(self.id()).is_empty()
    }

    /// 1 for the bottom level unit
    pub fn depth(&self) -> Result<usize, CalendarError> {
        Ok(self.chain()?.len())
    }

    /// No unit in the calendar, on any branch, is deeper
    pub fn is_highest_level(&self) -> Result<bool, CalendarError> {
        let own = self.depth()?;
        for unit in self.store.units_in_calendar(self.calendar()) {
            if self.lookup(unit.id)?.depth()? > own {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ========== Lengths and Instances ==========

    pub fn length_at(&self, iteration: i64) -> Result<i64, CalendarError> {
        self.unit.length_cycle.length_at(iteration)
    }

    /// Iteration of the base unit where `iteration` of this unit starts
    pub fn first_base_instance_iteration(&self, iteration: i64) -> Result<i64, CalendarError> {
        if self.is_bottom_level() {
            return check_iteration(iteration);
        }
        self.unit.length_cycle.first_instance_iteration(iteration)
    }

    /// Named base instances inside `iteration`, with their lengths
    pub fn instances_at(&self, iteration: i64) -> Result<Vec<Instance>, CalendarError> {
        let base = match self.base()? {
            Some(base) => base,
            None => {
                check_iteration(iteration)?;
                return Ok(vec![Instance {
                    name: format!("{} {}", self.name(), iteration),
                    length: 1,
                }]);
            }
        };

        let count = self.length_at(iteration)?;
        let first = self.first_base_instance_iteration(iteration)?;
        (0..count)
            .map(|i| {
                let name = match self.unit.instance_name(i as usize) {
                    Some(name) => name.to_string(),
                    None => format!("{} {}", base.name(), i + 1),
                };
                Ok(Instance {
                    name,
                    length: base.length_at(first + i)?,
                })
            })
            .collect()
    }

    // ========== Bottom Level Conversions ==========

    pub fn first_bottom_level_iteration(&self, iteration: i64) -> Result<i64, CalendarError> {
        check_iteration(iteration)?;
        let mut iteration = iteration;
        for unit in self.chain()? {
            if unit.is_bottom_level() {
                break;
            }
            iteration = unit.length_cycle().first_instance_iteration(iteration)?;
        }
        Ok(iteration)
    }

    /// Bottom level instances spanned by `iteration`
    pub fn bottom_level_length(&self, iteration: i64) -> Result<i64, CalendarError> {
        check_iteration(iteration)?;
        let (mut start, mut end) = (iteration, iteration);
        for unit in self.chain()? {
            if unit.is_bottom_level() {
                break;
            }
            let cycle = unit.length_cycle();
            let next = end
                .checked_add(1)
                .ok_or(CalendarError::IterationOverflow(end))?;
            start = cycle.first_instance_iteration(start)?;
            end = cycle.first_instance_iteration(next)? - 1;
            if end < start {
                return Ok(0);
            }
        }
        Ok(end - start + 1)
    }

    pub fn last_bottom_level_iteration(&self, iteration: i64) -> Result<i64, CalendarError> {
        Ok(self.first_bottom_level_iteration(iteration)? + self.bottom_level_length(iteration)? - 1)
    }

    /// This unit's cycle measured in bottom level instances
    ///
    /// Built level by level: the base unit's bottom cycle is expanded to
    /// integers, walked in step with this unit's expanded cycle until both
    /// line up again, and the grouped sums are condensed back to the
    /// shortest equivalent cycle.
    pub fn bottom_level_length_cycle(&self) -> Result<LengthCycle, CalendarError> {
        self.chain()?;
        let base = match self.base()? {
            Some(base) if !base.is_bottom_level() => base,
            _ => return Ok(self.length_cycle().clone()),
        };

        let base_lengths = base.bottom_level_length_cycle()?.expand(&self.limits)?;
        let own = self.length_cycle().expand(&self.limits)?;
        let period = base_lengths.len() as i64;
        let own_total: i64 = own.iter().sum();
        if own_total <= 0 {
            return Err(CalendarError::EmptyOrInvalidCycle(format!(
                "cycle of {} sums to zero",
                self.name()
            )));
        }

        // Loops of this cycle before the base cycle starts over in step
        let loops = period / gcd_i64(own_total, period);
        let entries = loops as u128 * own.len() as u128;
        let steps = loops as u128 * own_total as u128;
        let limit = u128::from(self.limits.max_expanded_cycle_len);
        if entries > limit || steps > limit {
            return Err(CalendarError::CycleExpansionOverflow {
                required: entries.max(steps),
                limit,
            });
        }

        let mut sums = Vec::with_capacity(entries as usize);
        let mut cursor = 0usize;
        for _ in 0..loops {
            for &count in &own {
                let mut total = 0;
                for _ in 0..count {
                    total += base_lengths[cursor];
                    cursor = (cursor + 1) % base_lengths.len();
                }
                sums.push(total);
            }
        }

        let cycle = LengthCycle::condense(&sums)?;
        debug!(unit = %self.id(), loops, entries = sums.len(), cycle = %cycle, "built bottom level length cycle");
        Ok(cycle)
    }

    /// Iteration of this unit containing the bottom level instance `bottom_iteration`
    pub fn iteration_at_bottom_level_iteration(&self, bottom_iteration: i64) -> Result<i64, CalendarError> {
        if self.is_bottom_level() {
            return check_iteration(bottom_iteration);
        }
        self.bottom_level_length_cycle()?.iteration_at_instance(bottom_iteration)
    }

    // ========== Sub Units ==========

    /// Iteration of `sub` where `iteration` of this unit starts
    pub fn first_sub_unit_instance_iteration(&self, sub: TimeUnitId, iteration: i64) -> Result<i64, CalendarError> {
        check_iteration(iteration)?;
        let mut iteration = iteration;
        for unit in self.chain()? {
            if unit.id() == sub {
                return Ok(iteration);
            }
            if unit.is_bottom_level() {
                break;
            }
            iteration = unit.length_cycle().first_instance_iteration(iteration)?;
        }
        Err(CalendarError::UnitNotContained {
            unit: self.id(),
            sub_unit: sub,
        })
    }

    /// Position of `sub_iteration` inside the instance of this unit containing it
    ///
    /// For `sub == self` the iteration is absolute and returned unchanged.
    pub fn sub_unit_iteration_within_parent(&self, sub: TimeUnitId, sub_iteration: i64) -> Result<i64, CalendarError> {
        check_iteration(sub_iteration)?;
        if sub == self.id() {
            return Ok(sub_iteration);
        }
        if !self.contains_unit(sub)? {
            return Err(CalendarError::UnitNotContained {
                unit: self.id(),
                sub_unit: sub,
            });
        }

        let bottom = self.lookup(sub)?.first_bottom_level_iteration(sub_iteration)?;
        let parent_iteration = self.iteration_at_bottom_level_iteration(bottom)?;
        let first = self.first_sub_unit_instance_iteration(sub, parent_iteration)?;
        Ok(sub_iteration - first + 1)
    }

    // ========== Batched ==========

    pub fn length_at_iterations(&self, iterations: &[i64]) -> Result<Vec<i64>, CalendarError> {
        iterations.iter().map(|&i| self.length_at(i)).collect()
    }

    pub fn instances_at_iterations(&self, iterations: &[i64]) -> Result<Vec<Vec<Instance>>, CalendarError> {
        iterations.iter().map(|&i| self.instances_at(i)).collect()
    }

    /// Resolves the base chain once for all iterations
    pub fn first_bottom_level_iteration_at_iterations(&self, iterations: &[i64]) -> Result<Vec<i64>, CalendarError> {
        let chain = self.chain()?;
        iterations
            .iter()
            .map(|&iteration| {
                check_iteration(iteration)?;
                chain
                    .iter()
                    .take_while(|u| !u.is_bottom_level())
                    .try_fold(iteration, |it, u| u.length_cycle().first_instance_iteration(it))
            })
            .collect()
    }

    pub fn bottom_level_length_at_iterations(&self, iterations: &[i64]) -> Result<Vec<i64>, CalendarError> {
        iterations.iter().map(|&i| self.bottom_level_length(i)).collect()
    }

    /// Builds the bottom level cycle once for all iterations
    pub fn iteration_at_bottom_level_iterations(&self, bottom_iterations: &[i64]) -> Result<Vec<i64>, CalendarError> {
        if self.is_bottom_level() {
            return bottom_iterations.iter().map(|&b| check_iteration(b)).collect();
        }
        let cycle = self.bottom_level_length_cycle()?;
        bottom_iterations
            .iter()
            .map(|&b| cycle.iteration_at_instance(b))
            .collect()
    }
}

pub(crate) fn check_iteration(iteration: i64) -> Result<i64, CalendarError> {
    if iteration < 1 {
        Err(CalendarError::InvalidIteration(iteration))
    } else {
        Ok(iteration)
    }
}
