//!
//! # Catalog Writing Module
//!
//! Emits the wire-format structure consumed by the persistence collaborator.
//! The selection/permutation equivalence invariant is re-checked before
//! anything is written, so a saved catalog always reflects every currently
//! selected parameter exactly once.
//!

// Standard Lib Imports
use std::io::Write;
use std::path::Path;

// Local imports
use super::data::{TechFile, VariationKey, VaryResult};

/// Write a [TechFile] to JSON-format file `fname`.
pub fn save(file: &TechFile, fname: impl AsRef<Path>) -> VaryResult<()> {
    let s = to_json_string(file)?;
    let mut f = std::fs::File::create(fname)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Write a [TechFile] to a JSON-format [String].
pub fn to_json_string(file: &TechFile) -> VaryResult<String> {
    check_consistency(file)?;
    let rv = serde_json::to_string(file)?;
    Ok(rv)
}

/// Verify that permutation membership equals the selected flags.
/// The selection manager maintains this invariant; emitting a catalog that
/// violates it would desynchronize the persisted catalog from the view.
fn check_consistency(file: &TechFile) -> VaryResult<()> {
    for entry in file.variations() {
        let key = entry.key();
        let selected = file
            .param(&key.group, &key.key1, key.key2.as_deref())
            .map(|p| p.is_selected)
            .unwrap_or(false);
        if !selected {
            return Err(format!(
                "refusing to save: permutation entry ({}, {}) has no selected source parameter",
                key.group, key.key1
            )
            .into());
        }
    }
    for (group, param) in file.all_params() {
        let key = VariationKey::new(group.name.clone(), param.key.key1.clone(), param.key.key2.clone());
        if param.is_selected && !file.variations().iter().any(|e| e.key() == key) {
            return Err(format!(
                "refusing to save: selected parameter ({}, {}) missing from the permutation group",
                group.name, param.key.key1
            )
            .into());
        }
    }
    Ok(())
}
