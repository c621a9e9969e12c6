//! Almanac - Fantasy Calendar Arithmetic
//!
//! Calendars are trees of time units ("a year is 12 months, a month is
//! 31 28.25 31 30 days") over an external record store. This crate ties the
//! libraries together: an engine holding the store and the function
//! registry, and calendar pages built on top of both.

mod view;
mod functions;

#[cfg(test)]
mod fixtures;

pub use view::{CalendarView, ViewCell, ViewRequest};

pub use almanac_core as core;
pub use almanac_format as format;
pub use almanac_plugin as plugin;
pub use almanac_units as units;

use almanac_core::{CalendarError, CalendarId, CalendarStore, ErrorReport, Limits, Value};
use almanac_plugin::{EvalContext, PluginRegistry, TraceStep};
use almanac_units::Hierarchy;
use serde::Serialize;
use std::sync::Arc;

/// Every hierarchy, format and page function
pub fn standard_registry() -> PluginRegistry {
    let registry = PluginRegistry::new();
    let registry = almanac_units::load_units_library(registry);
    let registry = almanac_format::load_format_library(registry);
    registry.with_function(functions::CalendarPage)
}

/// Main Almanac engine
pub struct Almanac {
    store: Arc<dyn CalendarStore>,
    registry: Arc<PluginRegistry>,
    limits: Limits,
    tracing: bool,
}

/// Outcome of a dispatched function call
#[derive(Debug, Clone, Serialize)]
pub struct CallResult {
    pub value: Value,
    /// Dispatched calls, when tracing is on
    pub trace: Vec<TraceStep>,
    pub errors: Vec<ErrorReport>,
}

impl Almanac {
    /// Engine over `store` with the standard library and limits from the environment
    pub fn new(store: impl CalendarStore + 'static) -> Self {
        Self::with_registry(Arc::new(store), standard_registry())
    }

    pub fn with_registry(store: Arc<dyn CalendarStore>, registry: PluginRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            limits: Limits::from_env(),
            tracing: false,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    pub fn store(&self) -> &dyn CalendarStore {
        self.store.as_ref()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn hierarchy(&self) -> Hierarchy<'_> {
        Hierarchy::new(self.store.as_ref()).with_limits(self.limits)
    }

    /// Dispatch a registered function by name
    pub fn call(&self, name: &str, args: &[Value]) -> CallResult {
        let mut ctx = EvalContext::new(self.store.clone())
            .with_limits(self.limits)
            .with_tracing(self.tracing);

        let value = self.registry.call_function(name, args, &ctx);
        ctx.record_trace(name, args, &value);

        CallResult {
            errors: value.as_error().cloned().into_iter().collect(),
            value,
            trace: ctx.trace,
        }
    }

    /// `call` with JSON in and out; a non-array `args` is a single argument
    pub fn call_json(&self, name: &str, args: serde_json::Value) -> serde_json::Value {
        let args = match Value::from(args) {
            Value::List(items) => items,
            other => vec![other],
        };
        self.call(name, &args).value.to_json()
    }

    pub fn view(&self, calendar: CalendarId, request: &ViewRequest) -> Result<CalendarView, CalendarError> {
        CalendarView::resolve(self.hierarchy(), calendar, request)
    }

    pub fn help(&self, name: Option<&str>) -> Value {
        self.registry.help(name)
    }

    pub fn list_functions(&self, category: Option<&str>) -> Value {
        self.registry.list_functions(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use almanac_core::prelude::*;
    use serde_json::json;

    fn almanac() -> Almanac {
        Almanac::new(reckoning())
    }

    #[test]
    fn test_standard_library_is_complete() {
        let registry = standard_registry();
        for name in [
            "length_at",
            "expand_cycle",
            "instances_at",
            "first_bottom_level_iteration",
            "bottom_level_length",
            "iteration_at_bottom_level_iteration",
            "sub_unit_iteration_within_parent",
            "events_at",
            "linked_iterations",
            "linked_events",
            "format_date",
            "parse_date",
            "is_reversible",
            "is_differentiable",
            "likely_source_formats",
            "date_representations",
            "instance_display_name",
            "bookmark_display_name",
            "event_display_date",
            "calendar_view",
        ] {
            assert!(registry.get_function(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_call_json() {
        let almanac = almanac();
        assert_eq!(almanac.call_json("length_at", json!([2, 1])), json!(30));
        assert_eq!(almanac.call_json("expand_cycle", json!("30.5")), json!([30, 31]));
        assert_eq!(almanac.call_json("iteration_at_bottom_level_iteration", json!([3, [360, 361]])), json!([1, 2]));
    }

    #[test]
    fn test_errors_are_collected() {
        let almanac = almanac();
        let result = almanac.call("length_at", &[Value::Int(2), Value::Int(0)]);
        assert!(result.value.is_error());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, codes::INVALID_ITERATION);
        assert!(result.trace.is_empty());
    }

    #[test]
    fn test_tracing_records_calls() {
        let almanac = almanac().with_tracing(true);
        let result = almanac.call("first_bottom_level_iteration", &[Value::Int(2), Value::Int(2)]);
        assert_eq!(result.value, Value::Int(31));
        assert_eq!(result.trace.len(), 1);
        assert_eq!(result.trace[0].function, "first_bottom_level_iteration");
    }

    #[test]
    fn test_unknown_function_suggests() {
        let result = almanac().call("length", &[]);
        let error = result.value.as_error().unwrap();
        assert_eq!(error.code, codes::UNDEFINED_FUNC);
        assert!(error.suggestion.as_deref().unwrap_or("").contains("length_at"));
    }

    #[test]
    fn test_limits_reach_functions() {
        let almanac = almanac().with_limits(Limits::new().with_max_expanded_cycle_len(3));
        let result = almanac.call("expand_cycle", &[Value::from("30.25")]);
        assert_eq!(result.errors[0].code, codes::CYCLE_EXPANSION_OVERFLOW);
    }

    #[test]
    fn test_view_through_engine() {
        let page = almanac()
            .view(CAL, &ViewRequest::new().with_display_unit(YEAR).at_iteration(1))
            .unwrap();
        assert_eq!(page.cells.len(), 12);
        assert_eq!(page.smallest_unit, MONTH);
    }

    #[test]
    fn test_help_lists_categories() {
        let almanac = almanac();
        assert!(!almanac.help(Some("calendar_view")).is_error());
        let units = almanac.list_functions(Some("units"));
        assert!(!units.is_error());
    }
}
