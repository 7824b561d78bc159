//!
//! # Range Constraint Resolver
//!
//! Computes the currently valid [min, max] for the start, end, and step
//! fields of a numeric variation entry. Bounds come from either explicit
//! `minStart`/`maxStart`/`minEnd`/`maxEnd` metadata, or from a percentage
//! deviation around the entry's default values; percentage bounds always
//! take precedence when defined.
//!
//! These functions are pure and recomputed on every edit rather than cached:
//! the end floor references the live start value when no percentage or
//! literal bound is configured.
//!

// Crates.io Imports
use serde::{Deserialize, Serialize};

// Local imports
use super::data::{VariationEntry, VaryDecimal, HUNDRED, ONE};
use crate::utils::{enumstr, EnumStr};

enumstr!(
    /// # Editable Fields of a Numeric Variation Entry
    ///
    /// Paired with the wire-format field names of [crate::data::NumericRange].
    VariationField {
        Start: "start",
        End: "end",
        Step: "step",
    }
);

/// Resolve the current minimum for `field` of `entry`.
/// `None` denotes "unbounded below".
pub fn min_for(field: VariationField, entry: &VariationEntry) -> Option<VaryDecimal> {
    let spec = &entry.range;
    match field {
        VariationField::Step => Some(spec.stepper.unwrap_or(*ONE)),
        VariationField::End => {
            if let (Some(pct), Some(dflt)) = (spec.end_percentage, spec.default_end_value) {
                Some(dflt - dflt * pct / *HUNDRED)
            } else if let Some(min_end) = spec.min_end {
                Some(min_end)
            } else {
                // No configured floor: the end must clear the live start
                entry.numeric().map(|r| r.start + *ONE)
            }
        }
        VariationField::Start => {
            if let (Some(pct), Some(dflt)) = (spec.start_percentage, spec.default_start_value) {
                Some(dflt - dflt * pct / *HUNDRED)
            } else {
                spec.min_start
            }
        }
    }
}

/// Resolve the current maximum for `field` of `entry`.
/// `None` denotes "unbounded above"; the step field has no maximum.
pub fn max_for(field: VariationField, entry: &VariationEntry) -> Option<VaryDecimal> {
    let spec = &entry.range;
    match field {
        VariationField::Step => None,
        VariationField::End => {
            if let (Some(pct), Some(dflt)) = (spec.end_percentage, spec.default_end_value) {
                Some(dflt + dflt * pct / *HUNDRED)
            } else {
                spec.max_end
            }
        }
        VariationField::Start => {
            if let (Some(pct), Some(dflt)) = (spec.start_percentage, spec.default_start_value) {
                Some(dflt + dflt * pct / *HUNDRED)
            } else {
                spec.max_start
            }
        }
    }
}
