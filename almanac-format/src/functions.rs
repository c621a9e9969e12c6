//! Date format and naming functions for the plugin registry

use almanac_core::{ErrorReport, Value};
use almanac_plugin::prelude::*;
use almanac_units::Hierarchy;

use crate::detect::find_likely_source_formats;
use crate::formatter::{date_representations, DateFormatter};
use crate::naming::{bookmark_display_name, event_display_date, instance_display_name};

fn respond(result: Result<Value, ErrorReport>) -> Value {
    result.unwrap_or_else(Value::Error)
}

fn formatter_arg<'s>(func: &str, args: &[Value], index: usize, ctx: &'s EvalContext) -> Result<DateFormatter<'s>, ErrorReport> {
    let id: DateFormatId = extract_id(func, args, index, "format")?;
    Ok(DateFormatter::load(Hierarchy::from_context(ctx), id)?)
}

fn format_ids(func: &str, args: &[Value], index: usize, name: &str) -> Result<Vec<DateFormatId>, ErrorReport> {
    extract_int_list(func, args, index, name)?
        .into_iter()
        .map(|raw| {
            u64::try_from(raw)
                .map(DateFormatId::from)
                .map_err(|_| ErrorReport::arg_type(func, name, "List of id", "negative Int"))
        })
        .collect()
}

// ========== format_date ==========

pub struct FormatDate;

static FORMAT_DATE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("format", "Int", "Date format id"),
    ArgMeta::required("iteration", "Int | List", "Iteration of the format's unit, or a list of them"),
];

static FORMAT_DATE_EXAMPLES: [&str; 2] = ["format_date(1, 100) → \"April 10, 1\"", "format_date(2, [1, 2]) → [\"1/1/1\", \"1/2/1\"]"];

impl FunctionPlugin for FormatDate {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "format_date",
            description: "Render an instance of a unit through one of its date formats",
            usage: "format_date(format, iteration)",
            args: &FORMAT_DATE_ARGS,
            returns: "Text",
            examples: &FORMAT_DATE_EXAMPLES,
            category: "format",
            related: &["parse_date", "instance_display_name"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("format_date", args, &FORMAT_DATE_ARGS)?;
            let formatter = formatter_arg("format_date", args, 0, ctx)?;
            match &args[1] {
                Value::List(_) => {
                    let dates = extract_int_list("format_date", args, 1, "iteration")?
                        .into_iter()
                        .map(|i| formatter.format_at(i))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(dates.into())
                }
                _ => {
                    let iteration = extract_int("format_date", args, 1, "iteration")?;
                    Ok(formatter.format_at(iteration)?.into())
                }
            }
        })())
    }
}

// ========== parse_date ==========

pub struct ParseDate;

static PARSE_DATE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("format", "Int", "Reversible date format id"),
    ArgMeta::required("date", "Text", "Date rendered by that format"),
];

static PARSE_DATE_EXAMPLES: [&str; 1] = ["parse_date(1, \"April 10, 1\") → 100"];

impl FunctionPlugin for ParseDate {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "parse_date",
            description: "Iteration of the format's unit a formatted date stands for",
            usage: "parse_date(format, date)",
            args: &PARSE_DATE_ARGS,
            returns: "Int",
            examples: &PARSE_DATE_EXAMPLES,
            category: "format",
            related: &["is_reversible", "likely_source_formats"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("parse_date", args, &PARSE_DATE_ARGS)?;
            let formatter = formatter_arg("parse_date", args, 0, ctx)?;
            let date = extract_text("parse_date", args, 1, "date")?;
            Ok(formatter.iteration_of(date)?.into())
        })())
    }
}

// ========== is_reversible ==========

pub struct IsReversible;

static FORMAT_ONLY_ARGS: [ArgMeta; 1] = [ArgMeta::required("format", "Int", "Date format id")];

static IS_REVERSIBLE_EXAMPLES: [&str; 1] = ["is_reversible(1) → true"];

impl FunctionPlugin for IsReversible {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "is_reversible",
            description: "Whether dates in this format can be read back into iterations",
            usage: "is_reversible(format)",
            args: &FORMAT_ONLY_ARGS,
            returns: "Bool",
            examples: &IS_REVERSIBLE_EXAMPLES,
            category: "format",
            related: &["parse_date"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("is_reversible", args, &FORMAT_ONLY_ARGS)?;
            let formatter = formatter_arg("is_reversible", args, 0, ctx)?;
            Ok(formatter.is_reversible()?.into())
        })())
    }
}

// ========== is_differentiable ==========

pub struct IsDifferentiable;

static IS_DIFFERENTIABLE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("format", "Int", "Date format id"),
    ArgMeta::required("others", "List", "Date format ids to tell it apart from"),
];

static IS_DIFFERENTIABLE_EXAMPLES: [&str; 1] = ["is_differentiable(1, [2, 3]) → true"];

impl FunctionPlugin for IsDifferentiable {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "is_differentiable",
            description: "Whether the format's literal text differs from every other format's",
            usage: "is_differentiable(format, others)",
            args: &IS_DIFFERENTIABLE_ARGS,
            returns: "Bool",
            examples: &IS_DIFFERENTIABLE_EXAMPLES,
            category: "format",
            related: &["likely_source_formats"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("is_differentiable", args, &IS_DIFFERENTIABLE_ARGS)?;
            let formatter = formatter_arg("is_differentiable", args, 0, ctx)?;
            let h = Hierarchy::from_context(ctx);
            let others = format_ids("is_differentiable", args, 1, "others")?
                .into_iter()
                .map(|id| DateFormatter::load(h, id))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(formatter.is_differentiable(&others).into())
        })())
    }
}

// ========== likely_source_formats ==========

pub struct LikelySourceFormats;

static LIKELY_SOURCE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("date", "Text", "Formatted date"),
    ArgMeta::required("formats", "List", "Candidate date format ids"),
];

static LIKELY_SOURCE_EXAMPLES: [&str; 1] = ["likely_source_formats(\"/2/3/1800/\", [1, 2]) → [2, 1]"];

impl FunctionPlugin for LikelySourceFormats {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "likely_source_formats",
            description: "Candidate formats that could have produced a date, most specific first",
            usage: "likely_source_formats(date, formats)",
            args: &LIKELY_SOURCE_ARGS,
            returns: "List",
            examples: &LIKELY_SOURCE_EXAMPLES,
            category: "format",
            related: &["parse_date", "is_differentiable"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("likely_source_formats", args, &LIKELY_SOURCE_ARGS)?;
            let date = extract_text("likely_source_formats", args, 0, "date")?;
            let candidates = format_ids("likely_source_formats", args, 1, "formats")?
                .into_iter()
                .map(|id| ctx.store().require_date_format(id))
                .collect::<Result<Vec<_>, _>>()?;
            let likely: Vec<u64> = find_likely_source_formats(date, &candidates)?
                .into_iter()
                .map(|f| f.id.get())
                .collect();
            Ok(likely.into())
        })())
    }
}

// ========== date_representations ==========

pub struct DateRepresentations;

static DATE_REPRESENTATIONS_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("unit", "Int", "Time unit id"),
    ArgMeta::required("iteration", "Int", "Iteration of the unit"),
];

static DATE_REPRESENTATIONS_EXAMPLES: [&str; 1] =
    ["date_representations(1, 100) → [{format: 1, name: \"Numeric\", date: \"4/10/1\"}]"];

impl FunctionPlugin for DateRepresentations {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "date_representations",
            description: "An instance rendered through every date format of its unit",
            usage: "date_representations(unit, iteration)",
            args: &DATE_REPRESENTATIONS_ARGS,
            returns: "List",
            examples: &DATE_REPRESENTATIONS_EXAMPLES,
            category: "format",
            related: &["format_date"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("date_representations", args, &DATE_REPRESENTATIONS_ARGS)?;
            let id: TimeUnitId = extract_id("date_representations", args, 0, "unit")?;
            let iteration = extract_int("date_representations", args, 1, "iteration")?;
            let unit = Hierarchy::from_context(ctx).unit(id)?;
            Ok(Value::from_serialize(&date_representations(unit, iteration)?))
        })())
    }
}

// ========== instance_display_name ==========

pub struct InstanceDisplayName;

static INSTANCE_NAME_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("unit", "Int", "Time unit id"),
    ArgMeta::required("iteration", "Int", "Iteration of the unit"),
    ArgMeta::optional("format", "Int", "Date format id to use instead of the unit's own", "null"),
    ArgMeta::optional("prefer_secondary", "Bool", "Try the secondary format before the default", "false"),
    ArgMeta::optional("backup_to_other", "Bool", "Fall back to the format that was not preferred", "false"),
];

static INSTANCE_NAME_EXAMPLES: [&str; 2] = [
    "instance_display_name(1, 100) → \"4/10/1\"",
    "instance_display_name(3, 2, null, true, true) → \"Year 2\"",
];

impl FunctionPlugin for InstanceDisplayName {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "instance_display_name",
            description: "Display name of an instance through its unit's default or secondary date format",
            usage: "instance_display_name(unit, iteration, format?, prefer_secondary?, backup_to_other?)",
            args: &INSTANCE_NAME_ARGS,
            returns: "Text",
            examples: &INSTANCE_NAME_EXAMPLES,
            category: "naming",
            related: &["format_date", "bookmark_display_name"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            let func = "instance_display_name";
            check_arity(func, args, &INSTANCE_NAME_ARGS)?;
            let id: TimeUnitId = extract_id(func, args, 0, "unit")?;
            let iteration = extract_int(func, args, 1, "iteration")?;
            let format_id: Option<DateFormatId> = extract_optional_id(func, args, 2, "format")?;
            let prefer_secondary = extract_optional_bool(func, args, 3, "prefer_secondary")?;
            let backup_to_other = extract_optional_bool(func, args, 4, "backup_to_other")?;

            let unit = Hierarchy::from_context(ctx).unit(id)?;
            let format = format_id.map(|f| ctx.store().require_date_format(f)).transpose()?;
            Ok(instance_display_name(unit, iteration, format, prefer_secondary, backup_to_other)?.into())
        })())
    }
}

// ========== bookmark_display_name ==========

pub struct BookmarkDisplayName;

static BOOKMARK_NAME_ARGS: [ArgMeta; 1] = [ArgMeta::required("bookmark", "Int", "Date bookmark id")];

static BOOKMARK_NAME_EXAMPLES: [&str; 1] = ["bookmark_display_name(1) → \"Coronation\""];

impl FunctionPlugin for BookmarkDisplayName {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "bookmark_display_name",
            description: "A bookmark's own name, else its instance in the unit's default date format",
            usage: "bookmark_display_name(bookmark)",
            args: &BOOKMARK_NAME_ARGS,
            returns: "Text",
            examples: &BOOKMARK_NAME_EXAMPLES,
            category: "naming",
            related: &["instance_display_name"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("bookmark_display_name", args, &BOOKMARK_NAME_ARGS)?;
            let id: DateBookmarkId = extract_id("bookmark_display_name", args, 0, "bookmark")?;
            let bookmark = ctx.store().require_date_bookmark(id)?;
            Ok(bookmark_display_name(Hierarchy::from_context(ctx), bookmark)?.into())
        })())
    }
}

// ========== event_display_date ==========

pub struct EventDisplayDate;

static EVENT_DATE_ARGS: [ArgMeta; 1] = [ArgMeta::required("event", "Int", "Event id")];

static EVENT_DATE_EXAMPLES: [&str; 1] = ["event_display_date(1) → \"April 10, 1\""];

impl FunctionPlugin for EventDisplayDate {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "event_display_date",
            description: "The day an event falls on, named through the bottom level unit's formats",
            usage: "event_display_date(event)",
            args: &EVENT_DATE_ARGS,
            returns: "Text",
            examples: &EVENT_DATE_EXAMPLES,
            category: "naming",
            related: &["events_at", "instance_display_name"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        respond((|| -> Result<Value, ErrorReport> {
            check_arity("event_display_date", args, &EVENT_DATE_ARGS)?;
            let id: EventId = extract_id("event_display_date", args, 0, "event")?;
            let event = ctx.store().require_event(id)?;
            Ok(event_display_date(Hierarchy::from_context(ctx), event)?.into())
        })())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::load_format_library;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> MemoryStore {
        let mut store = with_format(months_and_years(&MONTH_NAMES), &format!("{} {}, {}", month_n(), day_i(), year_i()));
        store
            .insert_date_format(DateFormat::new(
                DateFormatId::new(2),
                CAL,
                DAY,
                "Slashes",
                format!("/{}/{}/{}/", month_i(), day_i(), year_i()),
            ))
            .unwrap();
        store
            .insert_date_format(DateFormat::new(
                DateFormatId::new(3),
                CAL,
                DAY,
                "Day and year",
                format!("{}/{}", day_i(), year_i()),
            ))
            .unwrap();
        store
            .insert_date_bookmark(DateBookmark {
                id: DateBookmarkId::new(1),
                calendar: CAL,
                name: None,
                bookmark_unit: DAY,
                bookmark_iteration: 100,
            })
            .unwrap();
        store.insert_event(Event::new(EventId::new(1), CAL, "Fair", 100)).unwrap();

        let mut day = store.time_unit(DAY).cloned().unwrap();
        day.default_date_format = Some(FORMAT);
        store.insert_time_unit(day).unwrap();
        store
    }

    fn call(name: &str, args: serde_json::Value) -> Value {
        let registry = load_format_library(PluginRegistry::new());
        let ctx = EvalContext::new(Arc::new(store()));
        let args: Vec<Value> = match Value::from(args) {
            Value::List(items) => items,
            other => vec![other],
        };
        registry.call_function(name, &args, &ctx)
    }

    #[test]
    fn test_format_and_parse() {
        assert_eq!(call("format_date", json!([1, 100])), Value::from("April 10, 1"));
        assert_eq!(
            call("format_date", json!([2, [1, 31]])),
            Value::from(vec!["/1/1/1/", "/2/1/1/"])
        );
        assert_eq!(call("parse_date", json!([1, "April 10, 1"])), Value::Int(100));
    }

    #[test]
    fn test_parse_requires_reversible_format() {
        assert_eq!(call("is_reversible", json!([1])), Value::Bool(true));
        assert_eq!(call("is_reversible", json!([3])), Value::Bool(false));
        let result = call("parse_date", json!([3, "10/1"]));
        assert_eq!(result.as_error().map(|e| e.code.as_str()), Some("NOT_REVERSIBLE"));
        assert_eq!(result.as_error().and_then(|e| e.function.as_deref()), Some("parse_date"));
    }

    #[test]
    fn test_detection_functions() {
        assert_eq!(call("is_differentiable", json!([1, [2, 3]])), Value::Bool(true));
        assert_eq!(
            call("likely_source_formats", json!(["/2/3/1800/", [3, 2]])),
            Value::from(vec![2i64, 3])
        );
        assert_eq!(call("likely_source_formats", json!(["2.3", [1, 2, 3]])), Value::from(Vec::<i64>::new()));
    }

    #[test]
    fn test_naming_functions() {
        assert_eq!(call("instance_display_name", json!([1, 100])), Value::from("April 10, 1"));
        assert_eq!(call("instance_display_name", json!([1, 100, 2])), Value::from("/4/10/1/"));
        assert_eq!(call("instance_display_name", json!([3, 2, null, true, true])), Value::from("Year 2"));
        assert_eq!(call("bookmark_display_name", json!([1])), Value::from("April 10, 1"));
        assert_eq!(call("event_display_date", json!([1])), Value::from("April 10, 1"));
    }

    #[test]
    fn test_format_from_other_unit_is_rejected() {
        let result = call("instance_display_name", json!([2, 1, 1]));
        assert_eq!(result.as_error().map(|e| e.code.as_str()), Some("FORMAT_UNIT_MISMATCH"));
    }

    #[test]
    fn test_date_representations_function() {
        let result = call("date_representations", json!([1, 100]));
        let dates: Vec<Value> = result.as_list().unwrap().iter().map(|r| r.get("date")).collect();
        assert_eq!(dates, vec![Value::from("April 10, 1"), Value::from("/4/10/1/"), Value::from("10/1")]);
    }
}
