//! Evaluation Context

use almanac_core::{CalendarStore, Limits, Value};
use serde::Serialize;
use std::sync::Arc;

/// Evaluation context passed to plugins
pub struct EvalContext {
    pub store: Arc<dyn CalendarStore>,
    pub limits: Limits,
    pub tracing: bool,
    pub trace: Vec<TraceStep>,
}

/// Single dispatched call, kept when tracing is on
#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub function: String,
    pub args: Vec<Value>,
    pub result: Value,
}

impl EvalContext {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self {
            store,
            limits: Limits::default(),
            tracing: false,
            trace: Vec::new(),
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

    pub fn record_trace(&mut self, function: &str, args: &[Value], result: &Value) {
        if self.tracing {
            self.trace.push(TraceStep {
                function: function.to_string(),
                args: args.to_vec(),
                result: result.clone(),
            });
        }
    }

    /// Error results recorded in the trace
    pub fn errors(&self) -> Vec<&TraceStep> {
        self.trace.iter().filter(|s| s.result.is_error()).collect()
    }
}
