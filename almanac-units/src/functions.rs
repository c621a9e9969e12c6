//! Hierarchy functions for the plugin registry
//!
//! Iteration arguments accept a single integer or a list; a list runs the
//! batched form and returns a list of results in the same order.

use almanac_core::{ErrorReport, LengthCycle, Value};
use almanac_plugin::prelude::*;

use crate::{Hierarchy, UnitHandle};

impl<'s> Hierarchy<'s> {
    /// Hierarchy over the context's store and limits
    pub fn from_context(ctx: &'s EvalContext) -> Self {
        Hierarchy::new(ctx.store()).with_limits(ctx.limits)
    }
}

fn respond(result: Result<Value, ErrorReport>) -> Value {
    result.unwrap_or_else(Value::Error)
}

fn unit_arg<'s>(func: &str, args: &[Value], index: usize, ctx: &'s EvalContext) -> Result<UnitHandle<'s>, ErrorReport> {
    let id: TimeUnitId = extract_id(func, args, index, "unit")?;
    Ok(Hierarchy::from_context(ctx).unit(id)?)
}

/// Run the singular or batched form depending on the iteration argument's shape
fn per_iteration<T, F, B>(func: &str, args: &[Value], index: usize, single: F, batch: B) -> Result<Value, ErrorReport>
where
    T: Into<Value>,
    F: Fn(i64) -> Result<T, CalendarError>,
    B: Fn(&[i64]) -> Result<Vec<T>, CalendarError>,
{
    match args.get(index) {
        Some(Value::List(_)) => {
            let iterations = extract_int_list(func, args, index, "iteration")?;
            Ok(batch(&iterations)?.into())
        }
        _ => {
            let iteration = extract_int(func, args, index, "iteration")?;
            Ok(single(iteration)?.into())
        }
    }
}

static UNIT_ITERATION_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("unit", "Int", "Time unit id"),
    ArgMeta::required("iteration", "Int | List", "1-based iteration of the unit, or a list of them"),
];

// ========== length_at ==========

pub struct LengthAt;

static LENGTH_AT_EXAMPLES: [&str; 2] = ["length_at(2, 14) → 29", "length_at(2, [1, 2, 3]) → [31, 28, 31]"];

impl FunctionPlugin for LengthAt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "length_at",
            description: "Number of base unit instances in an instance of a unit",
            usage: "length_at(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "Int",
            examples: &LENGTH_AT_EXAMPLES,
            category: "units",
            related: &["instances_at", "bottom_level_length"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("length_at", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("length_at", args, 0, ctx)?;
            per_iteration("length_at", args, 1, |i| unit.length_at(i), |is| unit.length_at_iterations(is))
        })())
    }
}

// ========== expand_cycle ==========

pub struct ExpandCycle;

static EXPAND_CYCLE_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "cycle",
    "Text | Int",
    "Space-separated lengths such as \"31 28.25 31 30\", or a time unit id",
)];

static EXPAND_CYCLE_EXAMPLES: [&str; 2] = ["expand_cycle(\"30.25\") → [30, 30, 30, 31]", "expand_cycle(\"1.75\") → [1, 2, 2, 2]"];

impl FunctionPlugin for ExpandCycle {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "expand_cycle",
            description: "Equivalent all-integer cycle of a fractional length cycle",
            usage: "expand_cycle(cycle)",
            args: &EXPAND_CYCLE_ARGS,
            returns: "List",
            examples: &EXPAND_CYCLE_EXAMPLES,
            category: "units",
            related: &["length_at"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("expand_cycle", args, &EXPAND_CYCLE_ARGS)?;
            let cycle: LengthCycle = match &args[0] {
                Value::Text(s) => s.parse()?,
                _ => unit_arg("expand_cycle", args, 0, ctx)?.length_cycle().clone(),
            };
            Ok(cycle.expand(&ctx.limits)?.into())
        })())
    }
}

// ========== instances_at ==========

pub struct InstancesAt;

static INSTANCES_AT_EXAMPLES: [&str; 1] = ["instances_at(3, 1) → [{name: \"Frost\", length: 31}, ...]"];

impl FunctionPlugin for InstancesAt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "instances_at",
            description: "Named base unit instances inside an instance of a unit, with their lengths",
            usage: "instances_at(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "List",
            examples: &INSTANCES_AT_EXAMPLES,
            category: "units",
            related: &["length_at", "instance_display_name"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("instances_at", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("instances_at", args, 0, ctx)?;
            per_iteration(
                "instances_at",
                args,
                1,
                |i| unit.instances_at(i).map(|v| Value::from_serialize(&v)),
                |is| {
                    unit.instances_at_iterations(is)
                        .map(|all| all.iter().map(Value::from_serialize).collect())
                },
            )
        })())
    }
}

// ========== first_bottom_level_iteration ==========

pub struct FirstBottomLevelIteration;

static FIRST_BOTTOM_EXAMPLES: [&str; 1] = ["first_bottom_level_iteration(3, 2) → 121"];

impl FunctionPlugin for FirstBottomLevelIteration {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "first_bottom_level_iteration",
            description: "Bottom level iteration where an instance of a unit starts",
            usage: "first_bottom_level_iteration(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "Int",
            examples: &FIRST_BOTTOM_EXAMPLES,
            category: "units",
            related: &["bottom_level_length", "iteration_at_bottom_level_iteration"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("first_bottom_level_iteration", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("first_bottom_level_iteration", args, 0, ctx)?;
            per_iteration(
                "first_bottom_level_iteration",
                args,
                1,
                |i| unit.first_bottom_level_iteration(i),
                |is| unit.first_bottom_level_iteration_at_iterations(is),
            )
        })())
    }
}

// ========== bottom_level_length ==========

pub struct BottomLevelLength;

static BOTTOM_LENGTH_EXAMPLES: [&str; 1] = ["bottom_level_length(3, 4) → 121"];

impl FunctionPlugin for BottomLevelLength {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "bottom_level_length",
            description: "Bottom level instances spanned by an instance of a unit",
            usage: "bottom_level_length(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "Int",
            examples: &BOTTOM_LENGTH_EXAMPLES,
            category: "units",
            related: &["first_bottom_level_iteration"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("bottom_level_length", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("bottom_level_length", args, 0, ctx)?;
            per_iteration(
                "bottom_level_length",
                args,
                1,
                |i| unit.bottom_level_length(i),
                |is| unit.bottom_level_length_at_iterations(is),
            )
        })())
    }
}

// ========== iteration_at_bottom_level_iteration ==========

pub struct IterationAtBottomLevelIteration;

static ITERATION_AT_BOTTOM_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("unit", "Int", "Time unit id"),
    ArgMeta::required("bottom_iteration", "Int | List", "Bottom level iteration, or a list of them"),
];

static ITERATION_AT_BOTTOM_EXAMPLES: [&str; 2] = [
    "iteration_at_bottom_level_iteration(2, 100) → 4",
    "iteration_at_bottom_level_iteration(3, [120, 121]) → [1, 2]",
];

impl FunctionPlugin for IterationAtBottomLevelIteration {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "iteration_at_bottom_level_iteration",
            description: "Iteration of a unit containing a bottom level iteration",
            usage: "iteration_at_bottom_level_iteration(unit, bottom_iteration)",
            args: &ITERATION_AT_BOTTOM_ARGS,
            returns: "Int",
            examples: &ITERATION_AT_BOTTOM_EXAMPLES,
            category: "units",
            related: &["first_bottom_level_iteration"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("iteration_at_bottom_level_iteration", args, &ITERATION_AT_BOTTOM_ARGS)?;
            let unit = unit_arg("iteration_at_bottom_level_iteration", args, 0, ctx)?;
            per_iteration(
                "iteration_at_bottom_level_iteration",
                args,
                1,
                |b| unit.iteration_at_bottom_level_iteration(b),
                |bs| unit.iteration_at_bottom_level_iterations(bs),
            )
        })())
    }
}

// ========== sub_unit_iteration_within_parent ==========

pub struct SubUnitIterationWithinParent;

static SUB_UNIT_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("parent", "Int", "Containing time unit id"),
    ArgMeta::required("sub_unit", "Int", "Contained time unit id"),
    ArgMeta::required("sub_iteration", "Int", "Absolute iteration of the sub unit"),
];

static SUB_UNIT_EXAMPLES: [&str; 1] = ["sub_unit_iteration_within_parent(2, 1, 100) → 10"];

impl FunctionPlugin for SubUnitIterationWithinParent {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "sub_unit_iteration_within_parent",
            description: "Position of a sub unit instance inside the parent instance containing it",
            usage: "sub_unit_iteration_within_parent(parent, sub_unit, sub_iteration)",
            args: &SUB_UNIT_ARGS,
            returns: "Int",
            examples: &SUB_UNIT_EXAMPLES,
            category: "units",
            related: &["format_date"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            let func = "sub_unit_iteration_within_parent";
            check_arity(func, args, &SUB_UNIT_ARGS)?;
            let parent = unit_arg(func, args, 0, ctx)?;
            let sub: TimeUnitId = extract_id(func, args, 1, "sub_unit")?;
            let sub_iteration = extract_int(func, args, 2, "sub_iteration")?;
            Ok(parent.sub_unit_iteration_within_parent(sub, sub_iteration)?.into())
        })())
    }
}

// ========== events_at ==========

pub struct EventsAt;

static EVENTS_AT_EXAMPLES: [&str; 1] = ["events_at(3, 1) → [{name: \"New Year\", ...}]"];

impl FunctionPlugin for EventsAt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "events_at",
            description: "Events inside an instance of a unit, by display order",
            usage: "events_at(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "List",
            examples: &EVENTS_AT_EXAMPLES,
            category: "events",
            related: &["linked_events"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("events_at", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("events_at", args, 0, ctx)?;
            per_iteration(
                "events_at",
                args,
                1,
                |i| unit.events_at(i).map(|events| Value::from_serialize(&events)),
                |is| {
                    unit.events_at_iterations(is)
                        .map(|all| all.iter().map(Value::from_serialize).collect())
                },
            )
        })())
    }
}

// ========== linked_iterations ==========

pub struct LinkedIterations;

static LINKED_ITERATIONS_EXAMPLES: [&str; 1] =
    ["linked_iterations(101, 103) → [{calendar: 20, time_unit: 201, iteration: 53}]"];

impl FunctionPlugin for LinkedIterations {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "linked_iterations",
            description: "Matching bottom level iterations on the other linked calendars of the world",
            usage: "linked_iterations(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "List",
            examples: &LINKED_ITERATIONS_EXAMPLES,
            category: "events",
            related: &["linked_events"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("linked_iterations", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("linked_iterations", args, 0, ctx)?;
            let iteration = extract_int("linked_iterations", args, 1, "iteration")?;
            Ok(Value::from_serialize(&unit.linked_iterations(iteration)?))
        })())
    }
}

// ========== linked_events ==========

pub struct LinkedEvents;

static LINKED_EVENTS_EXAMPLES: [&str; 1] = ["linked_events(101, 103) → [{name: \"Eclipse\", ...}]"];

impl FunctionPlugin for LinkedEvents {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "linked_events",
            description: "Events of other linked calendars that fall inside an instance of a unit",
            usage: "linked_events(unit, iteration)",
            args: &UNIT_ITERATION_ARGS,
            returns: "List",
            examples: &LINKED_EVENTS_EXAMPLES,
            category: "events",
            related: &["events_at", "linked_iterations"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("linked_events", args, &UNIT_ITERATION_ARGS)?;
            let unit = unit_arg("linked_events", args, 0, ctx)?;
            let iteration = extract_int("linked_events", args, 1, "iteration")?;
            Ok(Value::from_serialize(&unit.linked_events(iteration)?))
        })())
    }
}
