//!
//! # Vary21 Technology Parameter Catalog & Variation Engine
//!
//! In-memory model of a tech-file parameter catalog, plus the engines that
//! keep it consistent while a configuration session edits it:
//!
//! * [data]: the catalog data model and its wire format
//! * [read] / [write]: loading and saving, with structural validation
//! * [hiding]: cross-parameter conditional visibility rules
//! * [select]: promotion of parameters into the variation set
//! * [bounds]: resolution of valid start/end/step ranges
//! * [validate]: the live field-level validation error set
//! * [session]: the owning store tying the above together
//!

// Internal modules & re-exports
pub use vary21utils as utils;

pub mod bounds;
pub mod data;
pub mod hiding;
pub mod read;
pub mod select;
pub mod session;
pub mod validate;
pub mod write;

pub use bounds::{max_for, min_for, VariationField};
pub use data::*;
pub use hiding::{is_hidden, is_rendered};
pub use session::Session;
pub use validate::{CellKey, EditOutcome, ValidationError, Validator};

#[cfg(test)]
mod tests;
