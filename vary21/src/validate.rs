//!
//! # Validation Tracker
//!
//! Accumulates and retracts field-level validation errors as variation
//! entries are edited. Errors are keyed by cell, i.e. (group, row, field),
//! so at most one error exists per cell at a time; a new failing edit
//! replaces rather than duplicates the entry for that cell.
//!
//! Out-of-range input is preserved in the model so the user can see what
//! they typed; rejection is advisory. The only hard refusals happen at
//! input time, through [accepts_keystroke].
//!

// Local imports
use super::bounds::{max_for, min_for, VariationField};
use super::data::{RangeSpec, TechFile, VariationEntry, VariationKey};

/// # Validation Cell Key
///
/// Uniquely identifies one offending input cell of the variation table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellKey {
    /// Owning group name
    pub group: String,
    /// Row index within the variation set
    pub row: usize,
    /// Offending field
    pub field: VariationField,
}

/// # Field-Level Validation Error
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// Cell identity; one error per cell at a time
    pub key: CellKey,
    /// Typed identity of the offending parameter
    pub param: VariationKey,
    /// User-facing message
    pub message: String,
}

/// Result of applying one edit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditOutcome {
    /// Whether the edited field is now valid.
    /// `false` edits are still stored in the model; rejection is advisory.
    pub accepted: bool,
}

/// # Validation Tracker
///
/// Owns the current field-level error set of one configuration session.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}
impl Validator {
    /// Create a new, initially error-free [Validator]
    pub fn new() -> Self {
        Self::default()
    }
    /// The current error set
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
    /// Boolean indication of an empty error set.
    /// Consumers gating a downstream run should query this.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
    /// Wipe all errors
    pub fn clear(&mut self) {
        self.errors.clear();
    }
    /// Retract every error referencing parameter `param`
    pub fn retract_param(&mut self, param: &VariationKey) {
        self.errors.retain(|e| e.param != *param);
    }
    /// Compute the initial error set implied by the loaded values.
    /// Called once on load; does not clear pre-existing errors.
    pub fn seed(&mut self, file: &TechFile) {
        for (row, entry) in file.variations().iter().enumerate() {
            self.revalidate(entry, row);
        }
    }
    /// Record the edit of `field` on `entry` (which already holds the new
    /// value, per read-after-write ordering) at variation-row `row`.
    /// Re-checks the paired start/end field so stale cross-field errors are
    /// retracted without operator intervention.
    pub fn on_edit(&mut self, entry: &VariationEntry, row: usize, field: VariationField) -> EditOutcome {
        let accepted = self.check_and_store(entry, row, field);
        match field {
            VariationField::Start => {
                self.check_and_store(entry, row, VariationField::End);
            }
            VariationField::End => {
                self.check_and_store(entry, row, VariationField::Start);
            }
            VariationField::Step => (),
        }
        EditOutcome { accepted }
    }
    /// Re-derive all three field states for `entry` at `row`
    pub fn revalidate(&mut self, entry: &VariationEntry, row: usize) {
        for field in [VariationField::Start, VariationField::End, VariationField::Step] {
            self.check_and_store(entry, row, field);
        }
    }
    /// Check one field and reconcile the error set: set, replace, or remove
    /// the error for its cell. Returns validity.
    fn check_and_store(&mut self, entry: &VariationEntry, row: usize, field: VariationField) -> bool {
        let key = CellKey {
            group: entry.parameter_name.clone(),
            row,
            field,
        };
        match check_field(entry, field) {
            None => {
                self.unset(&key);
                true
            }
            Some(message) => {
                self.set(ValidationError {
                    key,
                    param: entry.key(),
                    message,
                });
                false
            }
        }
    }
    /// Insert or replace the error for `err.key`
    fn set(&mut self, err: ValidationError) {
        match self.errors.iter_mut().find(|e| e.key == err.key) {
            Some(existing) => *existing = err,
            None => self.errors.push(err),
        }
    }
    /// Remove the error for `key`, if any
    fn unset(&mut self, key: &CellKey) {
        self.errors.retain(|e| e.key != *key);
    }
}

/// Check `field` of `entry` against its resolved bounds and cross-field
/// constraints. Returns the error message for an invalid value, or `None`.
/// Option-valued entries have no numeric fields and are always valid.
fn check_field(entry: &VariationEntry, field: VariationField) -> Option<String> {
    let range = entry.numeric()?;
    let value = match field {
        VariationField::Start => range.start,
        VariationField::End => range.end,
        VariationField::Step => range.step,
    };
    if let Some(floor) = min_for(field, entry) {
        if value < floor {
            return Some(match field {
                VariationField::Step => format!("step must be at least {}", floor),
                VariationField::End => format!(
                    "end must be at least {} and greater than start ({})",
                    floor, range.start
                ),
                VariationField::Start => format!("start must be at least {}", floor),
            });
        }
    }
    if let Some(ceil) = max_for(field, entry) {
        if value > ceil {
            return Some(format!("{} must be at most {}", field, ceil));
        }
    }
    match field {
        VariationField::End if value <= range.start => {
            Some(format!("end must exceed start ({})", range.start))
        }
        VariationField::Start if value >= range.end => {
            Some(format!("start must be less than end ({})", range.end))
        }
        _ => None,
    }
}

/// Input-time keystroke filter for numeric variation fields.
///
/// Accepts digits; a single leading minus only when the matching
/// `negativeStartAllowed`/`negativeEndAllowed` flag is set; and a single
/// decimal point only when `stepperFloat` is set. Everything else is refused
/// before it reaches the model.
pub fn accepts_keystroke(current: &str, ch: char, spec: &RangeSpec, field: VariationField) -> bool {
    if ch.is_ascii_digit() {
        return true;
    }
    if ch == '-' {
        let allowed = match field {
            VariationField::Start => spec.negative_start_allowed.unwrap_or(false),
            VariationField::End => spec.negative_end_allowed.unwrap_or(false),
            VariationField::Step => false,
        };
        return allowed && current.is_empty();
    }
    if ch == '.' {
        return spec.stepper_float.unwrap_or(false) && !current.contains('.');
    }
    false
}
