//! Rendering dates
//!
//! Every code is resolved against the first bottom level iteration of the
//! instance being formatted: the sub unit instance containing that moment is
//! located, then measured from the start of the parent instance around it.

use almanac_core::{CalendarError, DateFormat, DateFormatId};
use almanac_units::{Hierarchy, UnitHandle};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::compile::{Code, CompiledFormat, DisplayKind, Slot};

/// Rendered in place of a code that could not be parsed
pub const INVALID_CODE: &str = "[invalid code]";

/// A date format bound to its time unit
#[derive(Debug, Clone)]
pub struct DateFormatter<'s> {
    format: &'s DateFormat,
    unit: UnitHandle<'s>,
    compiled: CompiledFormat,
}

impl<'s> DateFormatter<'s> {
    pub fn new(hierarchy: Hierarchy<'s>, format: &'s DateFormat) -> Result<Self, CalendarError> {
        Ok(Self {
            format,
            unit: hierarchy.unit(format.time_unit)?,
            compiled: CompiledFormat::compile(&format.format_string)?,
        })
    }

    pub fn load(hierarchy: Hierarchy<'s>, id: DateFormatId) -> Result<Self, CalendarError> {
        let format = hierarchy.store().require_date_format(id)?;
        Self::new(hierarchy, format)
    }

    pub fn format(&self) -> &'s DateFormat {
        self.format
    }

    pub fn unit(&self) -> UnitHandle<'s> {
        self.unit
    }

    pub fn compiled(&self) -> &CompiledFormat {
        &self.compiled
    }

    pub(crate) fn hierarchy(&self) -> Hierarchy<'s> {
        self.unit.hierarchy()
    }

    /// Render instance `iteration` of the format's unit
    pub fn format_at(&self, iteration: i64) -> Result<String, CalendarError> {
        let bottom = self.unit.first_bottom_level_iteration(iteration)?;
        let values = self
            .compiled
            .slots()
            .iter()
            .map(|slot| match slot {
                Slot::Code(code) => self.render_code(code, bottom),
                Slot::Malformed(raw) => {
                    warn!(format = %self.format.id, code = %raw, "rendering malformed date format code");
                    Ok(INVALID_CODE.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.compiled.assemble(&values))
    }

    fn render_code(&self, code: &Code, bottom: i64) -> Result<String, CalendarError> {
        let h = self.hierarchy();
        let parent = h.unit(code.parent)?;
        let sub = h.unit(code.sub)?;
        let sub_iteration = sub.iteration_at_bottom_level_iteration(bottom)?;
        let relative = parent.sub_unit_iteration_within_parent(sub.id(), sub_iteration)?;
        trace!(code = %code, bottom, sub_iteration, relative, "resolved date format code");

        match code.display {
            DisplayKind::Iteration => Ok(relative.to_string()),
            DisplayKind::Name => name_within(parent, sub, bottom, relative),
        }
    }
}

/// Name of the `relative`th `sub` instance inside `parent`
///
/// Names come from the parent's instance list when `sub` is its base unit;
/// any other pairing falls back to `"<sub name> <position>"`.
fn name_within(parent: UnitHandle<'_>, sub: UnitHandle<'_>, bottom: i64, relative: i64) -> Result<String, CalendarError> {
    if parent.base()?.map(|b| b.id()) == Some(sub.id()) {
        let parent_iteration = parent.iteration_at_bottom_level_iteration(bottom)?;
        let instance = usize::try_from(relative - 1)
            .ok()
            .and_then(|i| parent.instances_at(parent_iteration).ok()?.into_iter().nth(i));
        if let Some(instance) = instance {
            return Ok(instance.name);
        }
    }
    Ok(format!("{} {}", sub.name(), relative))
}

/// One format of a unit rendered at an iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRepresentation {
    pub format: DateFormatId,
    pub name: String,
    pub date: String,
}

/// Every date format of `unit` rendered at `iteration`, by format id
pub fn date_representations(unit: UnitHandle<'_>, iteration: i64) -> Result<Vec<DateRepresentation>, CalendarError> {
    let h = unit.hierarchy();
    unit.store()
        .formats_of_unit(unit.id())
        .into_iter()
        .map(|format| {
            Ok(DateRepresentation {
                format: format.id,
                name: format.name.clone(),
                date: DateFormatter::new(h, format)?.format_at(iteration)?,
            })
        })
        .collect()
}
