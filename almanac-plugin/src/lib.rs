//! Almanac Plugin System
//!
//! Calendar operations are exposed as named, self-describing functions so
//! any caller (a JSON API, a script, a test) can drive them with plain values.

mod traits;
mod registry;
mod context;
pub mod args;

pub use traits::{FunctionPlugin, FunctionMeta, ArgMeta};
pub use registry::PluginRegistry;
pub use context::{EvalContext, TraceStep};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{FunctionPlugin, FunctionMeta, ArgMeta, PluginRegistry, EvalContext, TraceStep};
    pub use crate::args::*;
    pub use almanac_core::prelude::*;
}
