//!
//! # Technology Catalog Data Model
//!
//! Core types for the parameter catalog loaded from a tech file:
//! parameter groups, typed parameter rows, hiding rules, and the
//! permutation (variation) entries derived from selected parameters.
//!

// Std-Lib
use std::path::Path;

// Crates.io Imports
use derive_builder::Builder;
use once_cell::sync::Lazy;
#[allow(unused_imports)]
use rust_decimal::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

///
/// # VaryDecimal
///
/// Internal type alias for all decimal-valued data.
/// Uses [rust_decimal](https://crates.io/crates/rust_decimal) internally.
///
pub type VaryDecimal = rust_decimal::Decimal;

// Static short-hands for common [VaryDecimal] values.
// Note [`once_cell`](https://docs.rs/once_cell) demands these be `static`, not `const`.
pub(crate) static ONE: Lazy<VaryDecimal> = Lazy::new(|| VaryDecimal::from_str("1").unwrap());
pub(crate) static TWO: Lazy<VaryDecimal> = Lazy::new(|| VaryDecimal::from_str("2").unwrap());
pub(crate) static HUNDRED: Lazy<VaryDecimal> = Lazy::new(|| VaryDecimal::from_str("100").unwrap());

/// Name of the group holding the variation set
pub const PERMUTATION: &str = "permutation";

/// # Tech File
///
/// The primary catalog container: an ordered set of parameter groups,
/// one of which (named [PERMUTATION]) holds the variation set.
#[derive(Default, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct TechFile {
    /// Parameter Groups
    #[serde(rename = "FileContent")]
    pub file_content: Vec<ParamGroup>,
}
impl TechFile {
    /// Create a new and initially empty [TechFile].
    /// Also available via [Default].
    pub fn new() -> TechFile {
        TechFile::default()
    }
    /// Open a [TechFile] from JSON-format file `fname`
    pub fn open(fname: impl AsRef<Path>) -> VaryResult<TechFile> {
        super::read::parse_file(fname)
    }
    /// Write a [TechFile] to JSON-format file `fname`.
    pub fn save(&self, fname: impl AsRef<Path>) -> VaryResult<()> {
        super::write::save(self, fname)
    }
    /// Write a [TechFile] to a JSON-format [String].
    pub fn to_json_string(&self) -> VaryResult<String> {
        super::write::to_json_string(self)
    }
    /// Find the group named `name`, if present
    pub fn group(&self, name: &str) -> Option<&ParamGroup> {
        self.file_content.iter().find(|g| g.name == name)
    }
    /// Find the group named `name`, mutably
    pub fn group_mut(&mut self, name: &str) -> Option<&mut ParamGroup> {
        self.file_content.iter_mut().find(|g| g.name == name)
    }
    /// Find the parameter in group `group` with keys `key1` / `key2`
    pub fn param(&self, group: &str, key1: &str, key2: Option<&str>) -> Option<&Param> {
        self.group(group)?
            .params()
            .iter()
            .find(|p| p.key.matches(key1, key2))
    }
    /// Find the parameter in group `group` with keys `key1` / `key2`, mutably
    pub fn param_mut(&mut self, group: &str, key1: &str, key2: Option<&str>) -> Option<&mut Param> {
        self.group_mut(group)?
            .params_mut()?
            .iter_mut()
            .find(|p| p.key.matches(key1, key2))
    }
    /// Iterate over every parameter row in every non-permutation group,
    /// paired with its owning group.
    pub fn all_params(&self) -> impl Iterator<Item = (&ParamGroup, &Param)> {
        self.file_content
            .iter()
            .filter(|g| g.name != PERMUTATION)
            .flat_map(|g| g.params().iter().map(move |p| (g, p)))
    }
    /// Get the current variation set.
    /// Empty if no permutation group is present.
    pub fn variations(&self) -> &[VariationEntry] {
        match self.group(PERMUTATION) {
            Some(g) => g.variations(),
            None => &[],
        }
    }
    /// Get mutable access to the variation set,
    /// creating an empty permutation group if none exists.
    pub(crate) fn variations_mut(&mut self) -> &mut Vec<VariationEntry> {
        if self.group(PERMUTATION).is_none() {
            self.file_content.push(ParamGroup {
                name: PERMUTATION.to_string(),
                display_name: "Permutation".to_string(),
                ui_visible: true,
                data: GroupData::Variations(Vec::new()),
                ..Default::default()
            });
        }
        let group = self.group_mut(PERMUTATION).unwrap();
        if !matches!(group.data, GroupData::Variations(_)) {
            group.data = GroupData::Variations(Vec::new());
        }
        match group.data {
            GroupData::Variations(ref mut v) => v,
            GroupData::Params(_) => unreachable!(),
        }
    }
}

/// # Parameter Group
///
/// A named, ordered collection of parameter rows sharing a semantic purpose,
/// e.g. "Layer Map" or "Design Rules".
/// The group named [PERMUTATION] instead holds [VariationEntry] rows.
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
#[serde(rename_all = "camelCase")]
pub struct ParamGroup {
    // Required
    /// Group Name (stable identifier)
    pub name: String,
    /// Human-Readable Name
    pub display_name: String,
    /// Visibility of the group as a whole
    pub ui_visible: bool,

    // Optional
    /// Whether entries are editable at all
    #[serde(default)]
    #[builder(default)]
    pub parameter_support: bool,
    /// Whether entries of this group may be promoted into the variation set
    #[serde(default)]
    #[builder(default)]
    pub supports_variations: bool,
    /// Ordered column labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub header: Option<Vec<String>>,
    /// Row Data
    #[serde(default)]
    #[builder(default)]
    pub data: GroupData,
}
impl ParamGroup {
    /// Get this group's parameter rows.
    /// Empty for the permutation group.
    pub fn params(&self) -> &[Param] {
        match &self.data {
            GroupData::Params(p) => p,
            GroupData::Variations(_) => &[],
        }
    }
    /// Get this group's parameter rows, mutably.
    /// Returns `None` for the permutation group.
    pub fn params_mut(&mut self) -> Option<&mut Vec<Param>> {
        match &mut self.data {
            GroupData::Params(p) => Some(p),
            GroupData::Variations(_) => None,
        }
    }
    /// Get this group's variation entries.
    /// Empty for all non-permutation groups.
    pub fn variations(&self) -> &[VariationEntry] {
        match &self.data {
            GroupData::Variations(v) => v,
            GroupData::Params(_) => &[],
        }
    }
}

/// # Group Row Data
///
/// Ordinary groups hold [Param] rows; the permutation group holds
/// [VariationEntry] rows. Both arrive under the same `data` key.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum GroupData {
    /// Variation entries (the permutation group)
    Variations(Vec<VariationEntry>),
    /// Parameter rows (all other groups)
    Params(Vec<Param>),
}
impl Default for GroupData {
    fn default() -> Self {
        GroupData::Params(Vec::new())
    }
}

/// # Parameter Row
///
/// One row inside a [ParamGroup]: a composite key, a typed value,
/// visibility settings, an optional hiding-rule set,
/// and the numeric metadata consulted when the row is promoted into the variation set.
#[derive(Clone, Default, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
#[serde(rename_all = "camelCase")]
pub struct Param {
    // Required
    /// Composite Key
    pub key: ParamKey,
    /// Human labels for the key parts
    #[serde(default)]
    #[builder(default)]
    pub key_display_name: KeyDisplayName,
    /// Current Value
    pub val: ParamValue,
    /// Value Type Discriminant
    #[serde(rename = "type")]
    pub tp: ParamType,
    /// Row Visibility, independent of the group's flag
    pub ui_visible: bool,

    // Optional
    /// Unit Label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub unit: Option<String>,
    /// Tooltip Text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub description: Option<String>,
    /// Membership in the variation set
    #[serde(default)]
    #[builder(default)]
    pub is_selected: bool,
    /// Conditional Hiding Rules (OR of AND-lists)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub parameter_hiding_rule: Option<HidingRuleSet>,
    /// Numeric Variation Metadata
    #[serde(flatten)]
    #[builder(default)]
    pub range: RangeSpec,
    /// Allowed values for enumerated/boolean rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub options: Option<Vec<ParamValue>>,
    /// Human labels for `options`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub display_name_options: Option<Vec<String>>,
}
impl Param {
    /// Snapshot this parameter's value as an array,
    /// the shape stored in [VariationEntry::default_value].
    pub fn val_as_vec(&self) -> Vec<ParamValue> {
        match &self.val {
            ParamValue::Array(xs) => xs.iter().map(|x| ParamValue::Scalar(*x)).collect(),
            other => vec![other.clone()],
        }
    }
    /// Boolean indication of whether this row varies numerically,
    /// i.e. produces a start/end/step range when selected.
    pub fn is_numeric(&self) -> bool {
        matches!(self.tp, ParamType::Scalar | ParamType::Array)
    }
}

/// # Composite Parameter Key
///
/// One or two sub-keys, used both for display and for hiding-rule matching.
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct ParamKey {
    pub key1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key2: Option<String>,
}
impl ParamKey {
    /// Create a new [ParamKey]
    pub fn new(key1: impl Into<String>, key2: Option<String>) -> Self {
        Self {
            key1: key1.into(),
            key2,
        }
    }
    /// Exact match on both key parts
    pub fn matches(&self, key1: &str, key2: Option<&str>) -> bool {
        self.key1 == key1 && self.key2.as_deref() == key2
    }
}

/// # Key Display Names
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyDisplayName {
    #[serde(default)]
    pub display_name_key1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name_key2: Option<String>,
}

/// # Parameter Value Types
///
/// Explicit tagged variants over the wire format's numeric `type` codes:
/// 1 = [ParamType::Scalar], 2 = [ParamType::Array], 3 = [ParamType::Enumerated]
/// (with `options`) or [ParamType::Text] (without), 5 = [ParamType::Bool].
/// Both string variants serialize back to code 3; unknown codes fail the load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    /// Single numeric value (code 1)
    Scalar,
    /// Array of numeric values (code 2)
    Array,
    /// String limited to `options` (code 3, options present)
    Enumerated,
    /// Free-form string (code 3, options absent)
    Text,
    /// Boolean, enumerated true/false (code 5)
    Bool,
}
impl ParamType {
    /// The wire-format code for this type
    pub fn code(&self) -> u8 {
        match self {
            Self::Scalar => 1,
            Self::Array => 2,
            Self::Enumerated | Self::Text => 3,
            Self::Bool => 5,
        }
    }
    /// Resolve a wire-format code.
    /// Code 3 initially maps to [ParamType::Text]; the loader promotes rows
    /// with `options` to [ParamType::Enumerated].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Scalar),
            2 => Some(Self::Array),
            3 => Some(Self::Text),
            5 => Some(Self::Bool),
            _ => None,
        }
    }
}
impl Default for ParamType {
    fn default() -> Self {
        Self::Scalar
    }
}
impl Serialize for ParamType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}
impl<'de> Deserialize<'de> for ParamType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown parameter type code {}", code)))
    }
}
impl JsonSchema for ParamType {
    fn schema_name() -> String {
        "ParamType".to_string()
    }
    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        // Serialized as the wire-format integer code
        <u8>::json_schema(gen)
    }
}

/// # Parameter Value
///
/// Untagged union over the value shapes a catalog row may hold.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean
    Bool(bool),
    /// Single Number
    Scalar(VaryDecimal),
    /// Numeric Array
    Array(Vec<VaryDecimal>),
    /// String, free or enumerated
    Text(String),
}
impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Scalar(VaryDecimal::ZERO)
    }
}

/// # Numeric Variation Metadata
///
/// The per-row bounds and stepping information consulted when a parameter is
/// promoted into the variation set. All fields are optional on the wire and
/// flattened into the owning record.
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stepper: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stepper_float: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_start_value: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_end_value: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_start: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_start: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_end: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_end: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_percentage: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_percentage: Option<VaryDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_start_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_end_allowed: Option<bool>,
}

/// # Hiding Rule Condition
///
/// Satisfied if some parameter anywhere in the catalog has the named key
/// combination holding `key_value`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HidingCondition {
    pub key1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key2: Option<String>,
    pub key_value: ParamValue,
}

/// One AND-list of conditions
pub type HidingRule = Vec<HidingCondition>;
/// An ordered OR-list of [HidingRule]s
pub type HidingRuleSet = Vec<HidingRule>;

/// # Typed Variation Identity
///
/// The composite key identifying a variation entry and its source parameter:
/// owning group name plus the raw key tuple. Used uniformly for selection,
/// deselection, and validation-error keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariationKey {
    pub group: String,
    pub key1: String,
    pub key2: Option<String>,
}
impl VariationKey {
    /// Create a new [VariationKey]
    pub fn new(group: impl Into<String>, key1: impl Into<String>, key2: Option<String>) -> Self {
        Self {
            group: group.into(),
            key1: key1.into(),
            key2,
        }
    }
}

/// # Variation Entry
///
/// An element of the permutation group, created when a parameter is selected
/// for variation. Numeric parameters carry a start/end/step range;
/// enumerated and boolean parameters carry the chosen subset of their options.
#[derive(Clone, Default, Builder, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned", setter(into))]
#[serde(rename_all = "camelCase")]
pub struct VariationEntry {
    // Required
    /// Source parameter's first key
    pub name: String,
    /// Human-Readable Name
    pub display_name: String,
    /// Owning group name
    pub parameter_name: String,
    /// Snapshot of the source value at selection time
    #[serde(default)]
    #[builder(default)]
    pub default_value: Vec<ParamValue>,
    /// Range or chosen-options value
    pub value: VariationValue,

    // Optional
    /// Source parameter's second key, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub attribute: Option<String>,
    /// Allowed values, for enumerated/boolean entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub options: Option<Vec<ParamValue>>,
    /// Copy of the source parameter's numeric metadata
    #[serde(flatten)]
    #[builder(default)]
    pub range: RangeSpec,
}
impl VariationEntry {
    /// This entry's typed identity
    pub fn key(&self) -> VariationKey {
        VariationKey {
            group: self.parameter_name.clone(),
            key1: self.name.clone(),
            key2: self.attribute.clone(),
        }
    }
    /// Get the numeric range, if this entry is range-valued
    pub fn numeric(&self) -> Option<&NumericRange> {
        match &self.value {
            VariationValue::Range(r) => Some(r),
            VariationValue::Chosen(_) => None,
        }
    }
}

/// # Variation Entry Value
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum VariationValue {
    /// Numeric start/end/step range
    Range(NumericRange),
    /// Currently-chosen option values
    Chosen(Vec<ParamValue>),
}
impl Default for VariationValue {
    fn default() -> Self {
        VariationValue::Range(NumericRange::default())
    }
}

/// # Numeric Variation Range
#[derive(Clone, Default, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct NumericRange {
    pub start: VaryDecimal,
    pub end: VaryDecimal,
    pub step: VaryDecimal,
}
impl NumericRange {
    /// Create a new [NumericRange]
    pub fn new(start: VaryDecimal, end: VaryDecimal, step: VaryDecimal) -> Self {
        Self { start, end, step }
    }
}

// Local imports, down here to match the error types below
use vary21utils::ErrorContext;

/// # Vary Error Enumeration
#[derive(Debug)]
pub enum VaryError {
    /// Structural errors encountered while loading a catalog
    Load {
        message: String,
        stack: Vec<ErrorContext>,
    },
    /// Wrapped errors, generally from other crates
    Boxed(Box<dyn std::error::Error + Send + Sync>),
    /// String message-valued errors
    Str(String),
}
impl VaryError {
    /// Create a [VaryError::Str] from anything String-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
}
impl From<vary21utils::ser::Error> for VaryError {
    fn from(e: vary21utils::ser::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<std::io::Error> for VaryError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<serde_json::Error> for VaryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<rust_decimal::Error> for VaryError {
    fn from(e: rust_decimal::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for VaryError {
    /// Convert string-based errors by wrapping them
    fn from(e: String) -> Self {
        Self::Str(e)
    }
}
impl From<&str> for VaryError {
    /// Convert string-based errors by wrapping them
    fn from(e: &str) -> Self {
        Self::Str(e.into())
    }
}
impl std::fmt::Display for VaryError {
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for VaryError {}

/// Vary21 Library-Wide Result Type
pub type VaryResult<T> = Result<T, VaryError>;

// Implement the serialization to/from file trait for the catalog
impl crate::utils::SerdeFile for TechFile {}
