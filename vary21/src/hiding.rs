//!
//! # Hiding Rule Evaluator
//!
//! Pure evaluation of a parameter's conditional visibility against the
//! current catalog. A parameter's rule set is an OR-list of AND-lists of
//! conditions; each condition names a key combination and a value which some
//! parameter elsewhere in the catalog must hold.
//!
//! Evaluation is non-local: a rule's satisfaction depends on arbitrary other
//! rows, so visibility must be re-derived whenever any parameter value
//! changes. Hiding never mutates stored values.
//!

// Local imports
use super::data::{HidingCondition, Param, TechFile};

/// Decide whether `param` is hidden under the current state of `file`.
///
/// Rules referencing keys absent from the catalog resolve to "not satisfied",
/// so a bad rule fails open to visible rather than silently hiding data.
pub fn is_hidden(param: &Param, file: &TechFile) -> bool {
    let ruleset = match &param.parameter_hiding_rule {
        Some(rs) => rs,
        None => return false,
    };
    ruleset
        .iter()
        .any(|rule| !rule.is_empty() && rule.iter().all(|cond| condition_met(cond, file)))
}

/// Decide whether `param` is rendered: visible by its own flag and not hidden.
pub fn is_rendered(param: &Param, file: &TechFile) -> bool {
    param.ui_visible && !is_hidden(param, file)
}

/// Check whether some parameter in `file` satisfies `cond`.
/// A condition with only `key1` matches any row whose first key and value agree;
/// one with `key2` additionally requires the second key to match.
fn condition_met(cond: &HidingCondition, file: &TechFile) -> bool {
    file.all_params().any(|(_, p)| {
        p.key.key1 == cond.key1
            && (cond.key2.is_none() || p.key.key2 == cond.key2)
            && p.val == cond.key_value
    })
}
