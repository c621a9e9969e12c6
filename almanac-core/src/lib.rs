//! Almanac Core - Fundamental types
//!
//! This crate provides the core types used throughout Almanac:
//! - `Length` / `LengthCycle`: exact decimal cycle arithmetic
//! - Calendar records and ids, read through `CalendarStore`
//! - `Value`: runtime values for the function layer
//! - `CalendarError` / `ErrorReport`: typed and structured errors

mod length;
mod cycle;
mod error;
mod value;
mod limits;
pub mod ids;
pub mod model;
pub mod store;

pub use length::Length;
pub use cycle::{LengthCycle, gcd_i64};
pub use error::{CalendarError, ErrorReport, Severity, codes};
pub use value::Value;
pub use limits::Limits;
pub use ids::*;
pub use model::*;
pub use store::{CalendarStore, MemoryStore, Snapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CalendarError, CalendarStore, ErrorReport, Length, LengthCycle, Limits, MemoryStore, Severity, Value,
    };
    pub use crate::error::codes;
    pub use crate::ids::*;
    pub use crate::model::*;
}
