//! Page functions for the plugin registry

use almanac_core::{ErrorReport, Value};
use almanac_plugin::prelude::*;
use almanac_units::Hierarchy;

use crate::view::{CalendarView, ViewRequest};

pub struct CalendarPage;

static CALENDAR_PAGE_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("calendar", "Int", "Calendar id"),
    ArgMeta::optional("display_unit", "Int", "Unit to show, else the default display config's", "null"),
    ArgMeta::optional("nest_level", "Int", "Break cells down one more level when above 0", "null"),
    ArgMeta::optional("iteration", "Int", "Instance of the display unit, else the default bookmark's", "null"),
];

static CALENDAR_PAGE_EXAMPLES: [&str; 2] = [
    "calendar_view(1) → {display_unit: 1, iteration: 1, cells: [...]}",
    "calendar_view(1, 3, 1, 2) → {title: \"Year 2\", nested: true, ...}",
];

impl FunctionPlugin for CalendarPage {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "calendar_view",
            description: "A page of a calendar: an instance broken into named sub instances with their events",
            usage: "calendar_view(calendar, display_unit?, nest_level?, iteration?)",
            args: &CALENDAR_PAGE_ARGS,
            returns: "Object",
            examples: &CALENDAR_PAGE_EXAMPLES,
            category: "pages",
            related: &["instances_at", "events_at", "instance_display_name"],
        }
    }

    fn call(&self, args: &[Value], ctx: &EvalContext) -> Value {
        let result = (|| -> Result<Value, ErrorReport> {
            let func = "calendar_view";
            check_arity(func, args, &CALENDAR_PAGE_ARGS)?;
            let calendar: CalendarId = extract_id(func, args, 0, "calendar")?;
            let request = ViewRequest {
                display_unit: extract_optional_id(func, args, 1, "display_unit")?,
                nest_level: optional_int(func, args, 2, "nest_level")?
                    .map(|n| u32::try_from(n).map_err(|_| ErrorReport::arg_type(func, "nest_level", "Int >= 0", "negative Int")))
                    .transpose()?,
                iteration: optional_int(func, args, 3, "iteration")?,
            };
            let view = CalendarView::resolve(Hierarchy::from_context(ctx), calendar, &request)?;
            Ok(Value::from_serialize(&view))
        })();
        result.unwrap_or_else(Value::Error)
    }
}

fn optional_int(func: &str, args: &[Value], index: usize, name: &str) -> Result<Option<i64>, ErrorReport> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => extract_int(func, args, index, name).map(Some),
    }
}
