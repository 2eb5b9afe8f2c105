//! tplgen: template-driven source code generation.
//!
//! Takes one or more Tera template files, a set of flat `key=value`
//! assignments expanded into a nested value tree, and an optional numeric
//! iteration range, and produces one or more rendered output files. Output
//! destinations may themselves be computed by templates evaluated against
//! the current value tree, and are deduplicated so repeated iterations
//! accumulate into one stream.

#![deny(unsafe_code)]

pub mod error;
pub mod functions;
pub mod generate;
pub mod output;
pub mod range;
pub mod template;
pub mod values;

pub use error::{Error, Result};
