//!
//! # Configuration Session Store
//!
//! The owning store of one configuration flow: the live catalog, the deep
//! default snapshot used for reset, and the validation tracker. Every
//! user-visible operation runs to completion before the next state is
//! produced; the session is the single owner of its catalog, so no locking
//! discipline applies.
//!
//! The field-level error set is a pure function of catalog values (invalid
//! input stays in the model), so structural changes to the variation set
//! re-derive it wholesale rather than patching row indices.
//!

// Standard Lib Imports
use std::path::Path;

// Local imports
use super::bounds::VariationField;
use super::data::{ParamValue, TechFile, VariationKey, VariationValue, VaryDecimal, VaryResult};
use super::validate::{EditOutcome, ValidationError, Validator};
use super::{hiding, read, select, write};

/// # Configuration Session
pub struct Session {
    /// Live catalog, mutated by edits and selections
    file: TechFile,
    /// Deep snapshot of the loaded state, for reset
    default: TechFile,
    /// Field-level validation state
    validator: Validator,
}
impl Session {
    /// Create a [Session] over `file`.
    /// Runs the structural load checks, snapshots the default state,
    /// and computes the initial validation errors implied by the loaded values.
    pub fn load(mut file: TechFile) -> VaryResult<Session> {
        read::validate(&mut file)?;
        let default = file.clone();
        let mut validator = Validator::new();
        validator.seed(&file);
        Ok(Session {
            file,
            default,
            validator,
        })
    }
    /// Create a [Session] from JSON-format file `fname`
    pub fn open(fname: impl AsRef<Path>) -> VaryResult<Session> {
        Self::load(read::parse_file(fname)?)
    }
    /// The live catalog
    pub fn file(&self) -> &TechFile {
        &self.file
    }
    /// The current validation error set
    pub fn errors(&self) -> &[ValidationError] {
        self.validator.errors()
    }
    /// Boolean indication of no outstanding errors.
    /// Consumers gating a downstream run query this.
    pub fn is_clean(&self) -> bool {
        self.validator.is_clean()
    }
    /// Replace the live catalog with a clone of the default snapshot.
    /// Wipes the entire validation error set.
    pub fn reset(&mut self) {
        self.file = self.default.clone();
        self.validator.clear();
    }
    /// Save the live catalog to JSON-format file `fname`
    pub fn save(&self, fname: impl AsRef<Path>) -> VaryResult<()> {
        write::save(&self.file, fname)
    }

    /// Promote parameter `key` into the variation set
    pub fn select(&mut self, key: &VariationKey) -> VaryResult<()> {
        self.file = select::select(&self.file, key)?;
        self.resync();
        Ok(())
    }
    /// Remove parameter `key` from the variation set,
    /// retracting its validation errors
    pub fn deselect(&mut self, key: &VariationKey) -> VaryResult<()> {
        self.file = select::deselect(&self.file, key)?;
        self.resync();
        Ok(())
    }
    /// Toggle one allowed value of an enumerated/boolean parameter
    pub fn toggle_option(&mut self, key: &VariationKey, option: &ParamValue) -> VaryResult<()> {
        self.file = select::toggle_option(&self.file, key, option)?;
        self.resync();
        Ok(())
    }
    /// Empty the variation set, deselect every parameter,
    /// and clear the validation error set, atomically
    pub fn clear_all(&mut self) {
        self.file = select::clear_all(&self.file);
        self.validator.clear();
    }

    /// Apply one edit to a numeric field of the variation entry for `key`.
    /// The new value is stored even when invalid; the returned outcome and
    /// the error set reflect the state immediately after the write.
    pub fn edit(
        &mut self,
        key: &VariationKey,
        field: VariationField,
        new_value: VaryDecimal,
    ) -> VaryResult<EditOutcome> {
        let row = self
            .file
            .variations()
            .iter()
            .position(|e| e.key() == *key)
            .ok_or_else(|| format!("no variation entry for ({}, {})", key.group, key.key1))?;
        {
            let entry = &mut self.file.variations_mut()[row];
            let range = match &mut entry.value {
                VariationValue::Range(r) => r,
                VariationValue::Chosen(_) => {
                    return Err(format!(
                        "variation entry ({}, {}) is not range-valued",
                        key.group, key.key1
                    )
                    .into())
                }
            };
            match field {
                VariationField::Start => range.start = new_value,
                VariationField::End => range.end = new_value,
                VariationField::Step => range.step = new_value,
            }
        }
        let entry = &self.file.variations()[row];
        Ok(self.validator.on_edit(entry, row, field))
    }

    /// Edit a catalog parameter's value in place.
    /// Hiding rules are pure over catalog state, so visibility queries made
    /// after this call observe the new value.
    pub fn set_param_value(
        &mut self,
        group: &str,
        key1: &str,
        key2: Option<&str>,
        val: ParamValue,
    ) -> VaryResult<()> {
        let param = self
            .file
            .param_mut(group, key1, key2)
            .ok_or_else(|| format!("no parameter ({}, {:?}) in group {}", key1, key2, group))?;
        param.val = val;
        Ok(())
    }

    /// Whether the parameter at (`group`, `key1`, `key2`) is currently
    /// rendered: visible by its own flag and not hidden by rule.
    pub fn rendered(&self, group: &str, key1: &str, key2: Option<&str>) -> bool {
        match self.file.param(group, key1, key2) {
            Some(p) => hiding::is_rendered(p, &self.file),
            None => false,
        }
    }

    /// Re-derive the validation error set from the current catalog values.
    /// Used after structural changes to the variation set, where row indices
    /// shift and per-parameter errors must be retracted.
    fn resync(&mut self) {
        self.validator.clear();
        self.validator.seed(&self.file);
    }
}
