//!
//! # Variation Selection Manager
//!
//! Promotion of catalog parameters into (and out of) the variation set.
//! Every operation takes the catalog by reference and returns a new value;
//! the owning [crate::session::Session] commits results and keeps the
//! validation tracker consistent.
//!

// Local imports
use super::data::{
    NumericRange, Param, ParamValue, TechFile, VariationEntry, VariationKey, VariationValue,
    VaryResult, ONE, TWO,
};

/// Select parameter `key` for variation: build a [VariationEntry] from its
/// current metadata, append it to the permutation group, and mark the row
/// selected. Numeric ranges are seeded from the row's defaults:
/// `start = defaultStartValue`, `end = defaultEndValue` (2 when absent),
/// `step = stepper` (1 when absent).
///
/// Selecting an already-selected parameter is a no-op.
/// Enumerated and boolean parameters vary through [toggle_option] instead.
pub fn select(file: &TechFile, key: &VariationKey) -> VaryResult<TechFile> {
    let mut next = file.clone();
    let param = lookup(&next, key)?;
    if param.is_selected {
        return Ok(next);
    }
    if !param.is_numeric() {
        return Err(format!(
            "parameter ({}, {}) varies by option choice, not by range",
            key.group, key.key1
        )
        .into());
    }
    let entry = numeric_entry(param, key);
    next.variations_mut().push(entry);
    mark(&mut next, key, true)?;
    Ok(next)
}

/// Deselect parameter `key`: remove every permutation entry with its
/// identity and clear the row's selected flag.
/// The caller is responsible for retracting the parameter's validation errors.
pub fn deselect(file: &TechFile, key: &VariationKey) -> VaryResult<TechFile> {
    let mut next = file.clone();
    lookup(&next, key)?;
    next.variations_mut().retain(|e| e.key() != *key);
    mark(&mut next, key, false)?;
    Ok(next)
}

/// Toggle one allowed value of an enumerated or boolean parameter.
///
/// The first toggled value creates the permutation entry and selects the
/// row; later toggles add or remove values in place; removing the last
/// chosen value removes the entry and deselects the row.
pub fn toggle_option(file: &TechFile, key: &VariationKey, option: &ParamValue) -> VaryResult<TechFile> {
    let mut next = file.clone();
    let param = lookup(&next, key)?;
    let options = match &param.options {
        Some(opts) => opts.clone(),
        None => {
            return Err(format!(
                "parameter ({}, {}) has no enumerated options",
                key.group, key.key1
            )
            .into())
        }
    };
    if !options.contains(option) {
        return Err(format!(
            "value {:?} is not among the options of ({}, {})",
            option, key.group, key.key1
        )
        .into());
    }
    let template = option_entry(param, key, &options);
    let variations = next.variations_mut();
    let selected = match variations.iter().position(|e| e.key() == *key) {
        None => {
            // First toggle: create the entry with this single chosen value
            let mut entry = template;
            entry.value = VariationValue::Chosen(vec![option.clone()]);
            variations.push(entry);
            true
        }
        Some(at) => {
            let now_empty = {
                let chosen = match &mut variations[at].value {
                    VariationValue::Chosen(c) => c,
                    VariationValue::Range(_) => {
                        return Err(format!(
                            "parameter ({}, {}) is range-valued",
                            key.group, key.key1
                        )
                        .into())
                    }
                };
                match chosen.iter().position(|v| v == option) {
                    Some(i) => {
                        chosen.remove(i);
                    }
                    None => chosen.push(option.clone()),
                }
                chosen.is_empty()
            };
            if now_empty {
                variations.remove(at);
                false
            } else {
                true
            }
        }
    };
    mark(&mut next, key, selected)?;
    Ok(next)
}

/// Empty the permutation group and reset every parameter's selected flag,
/// as one atomic update. The caller wipes the validation error set.
pub fn clear_all(file: &TechFile) -> TechFile {
    let mut next = file.clone();
    next.variations_mut().clear();
    for group in next.file_content.iter_mut() {
        if let Some(params) = group.params_mut() {
            for p in params.iter_mut() {
                p.is_selected = false;
            }
        }
    }
    next
}

/// Build the numeric permutation entry for `param`
fn numeric_entry(param: &Param, key: &VariationKey) -> VariationEntry {
    let spec = &param.range;
    let range = NumericRange::new(
        spec.default_start_value.unwrap_or_default(),
        spec.default_end_value.unwrap_or(*TWO),
        spec.stepper.unwrap_or(*ONE),
    );
    VariationEntry {
        name: key.key1.clone(),
        attribute: key.key2.clone(),
        display_name: display_name(param),
        parameter_name: key.group.clone(),
        default_value: param.val_as_vec(),
        value: VariationValue::Range(range),
        options: None,
        range: spec.clone(),
    }
}

/// Build the option-valued permutation entry for `param`, chosen values unset
fn option_entry(param: &Param, key: &VariationKey, options: &[ParamValue]) -> VariationEntry {
    VariationEntry {
        name: key.key1.clone(),
        attribute: key.key2.clone(),
        display_name: display_name(param),
        parameter_name: key.group.clone(),
        default_value: param.val_as_vec(),
        value: VariationValue::Chosen(Vec::new()),
        options: Some(options.to_vec()),
        range: param.range.clone(),
    }
}

/// Compose the entry display name.
/// Two-key parameters carry both display-name parts, so that single-key and
/// two-key rows remain distinguishable in the shared variation widget.
fn display_name(param: &Param) -> String {
    let kdn = &param.key_display_name;
    match &kdn.display_name_key2 {
        Some(second) => format!("{} {}", kdn.display_name_key1, second),
        None => kdn.display_name_key1.clone(),
    }
}

/// Find the source parameter for `key`, or fail descriptively
fn lookup<'f>(file: &'f TechFile, key: &VariationKey) -> VaryResult<&'f Param> {
    let group = file
        .group(&key.group)
        .ok_or_else(|| format!("no group named {}", key.group))?;
    if !group.supports_variations {
        return Err(format!("group {} does not support variations", key.group).into());
    }
    file.param(&key.group, &key.key1, key.key2.as_deref())
        .ok_or_else(|| {
            format!(
                "no parameter ({}, {:?}) in group {}",
                key.key1, key.key2, key.group
            )
            .into()
        })
}

/// Set the selected flag of the parameter at `key`
fn mark(file: &mut TechFile, key: &VariationKey, selected: bool) -> VaryResult<()> {
    let param = file
        .param_mut(&key.group, &key.key1, key.key2.as_deref())
        .ok_or_else(|| format!("no parameter ({}, {:?})", key.key1, key.key2))?;
    param.is_selected = selected;
    Ok(())
}
