//! One-shot tools that do not go through the execution core
//!
//! - `probes`: synchronous probe listing (`<binary> -l [filter]`)
//! - `helpers`: static catalog of tracing-language builtins

pub mod helpers;
pub mod probes;

pub use helpers::{list_helpers, HELPERS};
pub use probes::{parse_probe_listing, ProbeLister};
