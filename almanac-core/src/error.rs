//! Calendar errors
//!
//! `CalendarError` is what the arithmetic returns. `ErrorReport` is the
//! structured, serializable form handed to callers of the function layer.
//! Nothing here is retried: every error is a property of the input data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{CalendarId, DateFormatId, TimeUnitId};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const INVALID_ITERATION: &str = "INVALID_ITERATION";
    pub const ITERATION_OVERFLOW: &str = "ITERATION_OVERFLOW";
    pub const INVALID_CYCLE: &str = "INVALID_CYCLE";
    pub const INVALID_LENGTH: &str = "INVALID_LENGTH";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const UNIT_NOT_CONTAINED: &str = "UNIT_NOT_CONTAINED";
    pub const FORMAT_UNIT_MISMATCH: &str = "FORMAT_UNIT_MISMATCH";
    pub const NOT_REVERSIBLE: &str = "NOT_REVERSIBLE";
    pub const MALFORMED_CODE: &str = "MALFORMED_CODE";
    pub const CYCLE_EXPANSION_OVERFLOW: &str = "CYCLE_EXPANSION_OVERFLOW";
    pub const CYCLIC_HIERARCHY: &str = "CYCLIC_HIERARCHY";
    pub const MULTIPLE_BOTTOM_UNITS: &str = "MULTIPLE_BOTTOM_UNITS";
    pub const CROSS_CALENDAR: &str = "CROSS_CALENDAR";
    pub const UNPARSEABLE_DATE: &str = "UNPARSEABLE_DATE";
    // Function layer
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const ARG_TYPE: &str = "ARG_TYPE";
    pub const UNDEFINED_FUNC: &str = "UNDEFINED_FUNC";
}

/// Error type for calendar arithmetic and lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("Invalid iteration {0}: iterations start at 1")]
    InvalidIteration(i64),

    #[error("Iteration {0} is too large to compute")]
    IterationOverflow(i64),

    #[error("Invalid length cycle: {0}")]
    EmptyOrInvalidCycle(String),

    #[error("Invalid length: {0}")]
    InvalidLength(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Time unit {sub_unit} is not contained in time unit {unit}")]
    UnitNotContained { unit: TimeUnitId, sub_unit: TimeUnitId },

    #[error("Date format {format} belongs to time unit {format_unit}, not {unit}")]
    FormatUnitMismatch {
        format: DateFormatId,
        format_unit: TimeUnitId,
        unit: TimeUnitId,
    },

    #[error("Date format is not reversible: {0}")]
    NotReversible(String),

    #[error("Malformed format code '{0}'")]
    MalformedCode(String),

    #[error("Cycle expansion needs {required} entries, limit is {limit}")]
    CycleExpansionOverflow { required: u128, limit: u128 },

    #[error("Time unit {0} is part of a base unit cycle")]
    CyclicHierarchy(TimeUnitId),

    #[error("Calendar {calendar} already has bottom level unit {existing}")]
    MultipleBottomUnits {
        calendar: CalendarId,
        existing: TimeUnitId,
    },

    #[error("{kind} {id} belongs to calendar {found}, expected calendar {expected}")]
    CrossCalendarReference {
        kind: &'static str,
        id: u64,
        expected: CalendarId,
        found: CalendarId,
    },

    #[error("Cannot read '{date}': {reason}")]
    UnparseableDate { date: String, reason: String },
}

impl CalendarError {
    pub fn not_found(kind: &'static str, id: impl Into<u64>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn unparseable(date: &str, reason: impl Into<String>) -> Self {
        Self::UnparseableDate {
            date: date.to_string(),
            reason: reason.into(),
        }
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIteration(_) => codes::INVALID_ITERATION,
            Self::IterationOverflow(_) => codes::ITERATION_OVERFLOW,
            Self::EmptyOrInvalidCycle(_) => codes::INVALID_CYCLE,
            Self::InvalidLength(_) => codes::INVALID_LENGTH,
            Self::NotFound { .. } => codes::NOT_FOUND,
            Self::UnitNotContained { .. } => codes::UNIT_NOT_CONTAINED,
            Self::FormatUnitMismatch { .. } => codes::FORMAT_UNIT_MISMATCH,
            Self::NotReversible(_) => codes::NOT_REVERSIBLE,
            Self::MalformedCode(_) => codes::MALFORMED_CODE,
            Self::CycleExpansionOverflow { .. } => codes::CYCLE_EXPANSION_OVERFLOW,
            Self::CyclicHierarchy(_) => codes::CYCLIC_HIERARCHY,
            Self::MultipleBottomUnits { .. } => codes::MULTIPLE_BOTTOM_UNITS,
            Self::CrossCalendarReference { .. } => codes::CROSS_CALENDAR,
            Self::UnparseableDate { .. } => codes::UNPARSEABLE_DATE,
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidIteration(_) => Some("Iterations are 1-based positive integers"),
            Self::EmptyOrInvalidCycle(_) => Some("Give at least one positive length, e.g. \"31 28.25 31 30\""),
            Self::UnitNotContained { .. } => Some("The sub unit must be reachable through base units"),
            Self::NotReversible(_) => Some("Check is_reversible() before parsing dates"),
            Self::MalformedCode(_) => Some("Codes look like {parent_id-sub_id-i} or {parent_id-sub_id-n}"),
            Self::CycleExpansionOverflow { .. } => Some("Use fractions with smaller denominators"),
            Self::CyclicHierarchy(_) => Some("Base units must form a tree ending at one bottom unit"),
            _ => None,
        }
    }

    /// Configuration errors make the calendar unusable, not just this call
    pub fn severity(&self) -> Severity {
        match self {
            Self::CyclicHierarchy(_) | Self::MultipleBottomUnits { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Result is still usable
    Warning,
    /// This call failed
    Error,
    /// The calendar data itself is invalid
    Fatal,
}

/// Structured error for JSON consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Function that produced the error, when called through the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    pub severity: Severity,
}

impl ErrorReport {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            function: None,
            severity: Severity::Error,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    // ========== Function Layer Constructors ==========

    pub fn arg_count(func: &str, expected: usize, got: usize) -> Self {
        Self::new(codes::ARG_COUNT, format!("{}() expects {} arguments, got {}", func, expected, got))
            .with_suggestion(format!("Use help('{}') for usage", func))
    }

    pub fn arg_type(func: &str, arg: &str, expected: &str, got: &str) -> Self {
        Self::new(
            codes::ARG_TYPE,
            format!("{}() argument '{}': expected {}, got {}", func, arg, expected, got),
        )
    }

    pub fn undefined_func(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FUNC, format!("Unknown function: {}", name))
            .with_suggestion("Use list_functions() to see available functions")
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorReport {}

impl From<CalendarError> for ErrorReport {
    fn from(err: CalendarError) -> Self {
        let mut report = Self::new(err.code(), err.to_string()).with_severity(err.severity());
        if let Some(suggestion) = err.suggestion() {
            report = report.with_suggestion(suggestion);
        }
        report
    }
}
