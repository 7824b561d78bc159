//!
//! # Catalog Reading Module
//!
//! Facilities for loading wire-format catalog content from file, string, or
//! in-memory JSON, plus the structural validation pass run on every load.
//! Structural failures are fatal to the load: the engine refuses to
//! construct a catalog and reports where in the tree it stopped.
//!

// Standard Lib Imports
use std::io::Read;
use std::path::Path;

// Local imports
use super::data::*;
use crate::utils::{ErrorContext, ErrorHelper};

/// Parse catalog content from JSON-format file `fname`
pub fn parse_file(fname: impl AsRef<Path>) -> VaryResult<TechFile> {
    let mut file = std::fs::File::open(fname)?;
    let mut src = String::new();
    file.read_to_string(&mut src)?;
    parse_str(&src)
}
/// Parse catalog content `src` from a JSON string
pub fn parse_str(src: &str) -> VaryResult<TechFile> {
    let mut file: TechFile = serde_json::from_str(src)?;
    TechLoader::new().check(&mut file)?;
    Ok(file)
}
/// Parse catalog content from an in-memory JSON value
pub fn parse_value(value: serde_json::Value) -> VaryResult<TechFile> {
    let mut file: TechFile = serde_json::from_value(value)?;
    TechLoader::new().check(&mut file)?;
    Ok(file)
}
/// Run the structural validation pass over an already-built [TechFile]
pub fn validate(file: &mut TechFile) -> VaryResult<()> {
    TechLoader::new().check(file)
}

/// # Catalog Structural Checker
///
/// Walks a freshly-deserialized [TechFile], normalizing ambiguous row data
/// and enforcing the structural rules the rest of the engine relies on.
/// Carries a context stack so failures report their position in the tree.
pub struct TechLoader {
    /// Context stack for error reporting
    ctx: Vec<ErrorContext>,
}
impl TechLoader {
    pub fn new() -> Self {
        Self {
            ctx: vec![ErrorContext::TechFile],
        }
    }
    /// Check (and lightly normalize) `file`.
    ///
    /// * Group row-data is forced to the shape its group implies: variation
    ///   entries in the permutation group, parameter rows everywhere else.
    /// * Each parameter's value shape must agree with its declared type.
    /// * Wire code 3 is promoted to [ParamType::Enumerated] when options are
    ///   present; an explicitly enumerated row without options fails.
    /// * Permutation membership must equal the selected flags, each selected
    ///   parameter appearing exactly once.
    pub fn check(&mut self, file: &mut TechFile) -> VaryResult<()> {
        for group in file.file_content.iter_mut() {
            self.ctx.push(ErrorContext::Group(group.name.clone()));
            self.check_group(group)?;
            self.ctx.pop();
        }
        self.check_membership(file)?;
        Ok(())
    }
    fn check_group(&mut self, group: &mut ParamGroup) -> VaryResult<()> {
        // An empty `data` array deserializes as the untagged enum's first
        // variant; normalize it to the shape the group name implies.
        if group.name == PERMUTATION {
            if matches!(&group.data, GroupData::Params(p) if p.is_empty()) {
                group.data = GroupData::Variations(Vec::new());
            }
            if let GroupData::Params(_) = group.data {
                return self.fail("permutation group holds parameter rows");
            }
            return Ok(());
        }
        if matches!(&group.data, GroupData::Variations(v) if v.is_empty()) {
            group.data = GroupData::Params(Vec::new());
        }
        let params = match group.params_mut() {
            Some(p) => p,
            None => return self.fail("non-permutation group holds variation entries"),
        };
        for param in params.iter_mut() {
            self.ctx.push(ErrorContext::Parameter(param.key.key1.clone()));
            check_param(param).map_err(|msg| self.err(msg))?;
            self.ctx.pop();
        }
        Ok(())
    }
    /// Enforce the selection/permutation equivalence invariant
    fn check_membership(&mut self, file: &TechFile) -> VaryResult<()> {
        for entry in file.variations() {
            self.ctx.push(ErrorContext::Variation(entry.name.clone()));
            let key = entry.key();
            let param = self.unwrap(
                file.param(&key.group, &key.key1, key.key2.as_deref()),
                format!(
                    "permutation entry references unknown parameter ({}, {})",
                    key.group, key.key1
                ),
            )?;
            self.assert(
                param.is_selected,
                format!(
                    "permutation entry for unselected parameter ({}, {})",
                    key.group, key.key1
                ),
            )?;
            self.ctx.pop();
        }
        for (group, param) in file.all_params() {
            if !param.is_selected {
                continue;
            }
            let key = VariationKey::new(group.name.clone(), param.key.key1.clone(), param.key.key2.clone());
            let count = file.variations().iter().filter(|e| e.key() == key).count();
            self.assert(
                count == 1,
                format!(
                    "selected parameter ({}, {}) appears {} times in the permutation group",
                    key.group, key.key1, count
                ),
            )?;
        }
        Ok(())
    }
}
impl Default for TechLoader {
    fn default() -> Self {
        Self::new()
    }
}
impl ErrorHelper for TechLoader {
    type Error = VaryError;
    /// Error creation, including the loader's current context stack
    fn err(&self, msg: impl Into<String>) -> VaryError {
        VaryError::Load {
            message: msg.into(),
            stack: self.ctx.clone(),
        }
    }
}

/// Check one parameter row: value shape vs declared type,
/// promoting wire code 3 to [ParamType::Enumerated] when options are present.
fn check_param(param: &mut Param) -> Result<(), String> {
    if param.tp == ParamType::Text && param.options.is_some() {
        param.tp = ParamType::Enumerated;
    }
    let ok = match param.tp {
        ParamType::Scalar => matches!(param.val, ParamValue::Scalar(_)),
        ParamType::Array => matches!(param.val, ParamValue::Array(_)),
        ParamType::Enumerated => {
            if param.options.is_none() {
                return Err("enumerated parameter carries no options".to_string());
            }
            matches!(param.val, ParamValue::Text(_))
        }
        ParamType::Text => matches!(param.val, ParamValue::Text(_)),
        ParamType::Bool => matches!(param.val, ParamValue::Bool(_)),
    };
    match ok {
        true => Ok(()),
        false => Err(format!(
            "value {:?} does not match declared type code {}",
            param.val,
            param.tp.code()
        )),
    }
}
