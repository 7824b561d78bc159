use super::validate::accepts_keystroke;
use super::{read, write};
use super::*;
use crate::utils::SerializationFormat::Yaml;

/// Construct a [VaryDecimal] from integer `v`
fn d(v: i64) -> VaryDecimal {
    VaryDecimal::new(v, 0)
}

/// A small but representative catalog:
/// numeric rows with and without percentage bounds, an array row,
/// enumerated rows, a boolean row, a rule-hidden row,
/// and an empty permutation group.
fn fixture() -> VaryResult<TechFile> {
    read::parse_str(
        r#"
        { "FileContent": [
            { "name": "design_rules", "displayName": "Design Rules", "uiVisible": true,
              "parameterSupport": true, "supportsVariations": true,
              "header": ["Name", "Value", "Unit"],
              "data": [
                { "key": {"key1": "width"}, "keyDisplayName": {"displayNameKey1": "Width"},
                  "val": 50, "type": 1, "unit": "nm", "uiVisible": true,
                  "stepper": 1, "defaultStartValue": 10, "defaultEndValue": 20 },
                { "key": {"key1": "spacing"}, "keyDisplayName": {"displayNameKey1": "Spacing"},
                  "val": 7, "type": 1, "uiVisible": true,
                  "stepper": 1, "defaultStartValue": 5, "defaultEndValue": 10 },
                { "key": {"key1": "offsets"}, "keyDisplayName": {"displayNameKey1": "Offsets"},
                  "val": [1, 2, 3], "type": 2, "uiVisible": true,
                  "stepper": 1, "defaultStartValue": 1, "defaultEndValue": 3 },
                { "key": {"key1": "thickness"}, "keyDisplayName": {"displayNameKey1": "Thickness"},
                  "val": 100, "type": 1, "uiVisible": true,
                  "stepper": 1, "defaultStartValue": 100, "defaultEndValue": 200,
                  "minStart": 5, "startPercentage": 20 },
                { "key": {"key1": "mode"}, "keyDisplayName": {"displayNameKey1": "Mode"},
                  "val": "A", "type": 3, "uiVisible": true, "options": ["A", "B"] },
                { "key": {"key1": "variant"}, "keyDisplayName": {"displayNameKey1": "Variant"},
                  "val": "X", "type": 3, "uiVisible": true, "options": ["X", "Y"] },
                { "key": {"key1": "fill", "key2": "metal1"},
                  "keyDisplayName": {"displayNameKey1": "Fill", "displayNameKey2": "Metal 1"},
                  "val": true, "type": 5, "uiVisible": true, "options": [true, false] },
                { "key": {"key1": "legacy_offset"}, "keyDisplayName": {"displayNameKey1": "Legacy Offset"},
                  "val": 3, "type": 1, "uiVisible": true,
                  "parameterHidingRule": [[ {"key1": "mode", "keyValue": "A"},
                                            {"key1": "variant", "keyValue": "X"} ]] }
              ]
            },
            { "name": "permutation", "displayName": "Permutation", "uiVisible": true, "data": [] }
        ]}
        "#,
    )
}

fn width_key() -> VariationKey {
    VariationKey::new("design_rules", "width", None)
}

#[test]
fn it_loads() -> VaryResult<()> {
    let file = fixture()?;
    assert_eq!(file.file_content.len(), 2);
    let group = file.group("design_rules").unwrap();
    assert_eq!(group.header.as_ref().unwrap().len(), 3);
    assert_eq!(group.params().len(), 8);
    assert!(file.variations().is_empty());

    // Wire code 3 with options is promoted to the enumerated variant
    let mode = file.param("design_rules", "mode", None).unwrap();
    assert_eq!(mode.tp, ParamType::Enumerated);
    assert_eq!(mode.val, ParamValue::Text("A".to_string()));

    let width = file.param("design_rules", "width", None).unwrap();
    assert_eq!(width.tp, ParamType::Scalar);
    assert_eq!(width.range.default_start_value, Some(d(10)));
    Ok(())
}

#[test]
fn it_rejects_unknown_type_codes() {
    let rv = read::parse_str(
        r#"
        { "FileContent": [
            { "name": "g", "displayName": "G", "uiVisible": true,
              "data": [ { "key": {"key1": "x"}, "val": 1, "type": 4, "uiVisible": true } ] }
        ]}
        "#,
    );
    assert!(rv.is_err());
}

#[test]
fn it_rejects_mismatched_values() {
    let rv = read::parse_str(
        r#"
        { "FileContent": [
            { "name": "g", "displayName": "G", "uiVisible": true,
              "data": [ { "key": {"key1": "x"}, "val": "oops", "type": 1, "uiVisible": true } ] }
        ]}
        "#,
    );
    match rv {
        Err(VaryError::Load { .. }) => (),
        other => panic!("expected a structural load error, got {:?}", other),
    }
}

#[test]
fn it_rejects_selection_desync_on_load() {
    // A selected parameter with no permutation entry must not load
    let rv = read::parse_str(
        r#"
        { "FileContent": [
            { "name": "g", "displayName": "G", "uiVisible": true, "supportsVariations": true,
              "data": [ { "key": {"key1": "x"}, "val": 1, "type": 1, "uiVisible": true,
                          "isSelected": true } ] },
            { "name": "permutation", "displayName": "Permutation", "uiVisible": true, "data": [] }
        ]}
        "#,
    );
    assert!(rv.is_err());
}

#[test]
fn hiding_is_pure_and_idempotent() -> VaryResult<()> {
    let file = fixture()?;
    let hidden = file.param("design_rules", "legacy_offset", None).unwrap();
    let before = hidden.val.clone();

    // mode == "A" and variant == "X" both hold, so the row is hidden
    let first = is_hidden(hidden, &file);
    let second = is_hidden(hidden, &file);
    assert!(first);
    assert_eq!(first, second);

    // Hiding never mutates the stored value
    assert_eq!(hidden.val, before);
    assert!(!is_rendered(hidden, &file));
    Ok(())
}

#[test]
fn rule_conjunction_hides_and_unhides() -> VaryResult<()> {
    let mut session = Session::load(fixture()?)?;
    assert!(!session.rendered("design_rules", "legacy_offset", None));

    // Breaking either conjunct unhides the row
    session.set_param_value("design_rules", "mode", None, ParamValue::Text("B".into()))?;
    assert!(session.rendered("design_rules", "legacy_offset", None));

    session.set_param_value("design_rules", "mode", None, ParamValue::Text("A".into()))?;
    assert!(!session.rendered("design_rules", "legacy_offset", None));
    session.set_param_value("design_rules", "variant", None, ParamValue::Text("Y".into()))?;
    assert!(session.rendered("design_rules", "legacy_offset", None));
    Ok(())
}

#[test]
fn missing_rule_keys_fail_open() -> VaryResult<()> {
    let mut file = fixture()?;
    let param = file.param_mut("design_rules", "legacy_offset", None).unwrap();
    param.parameter_hiding_rule = Some(vec![vec![HidingCondition {
        key1: "no_such_key".to_string(),
        key2: None,
        key_value: ParamValue::Text("A".to_string()),
    }]]);
    let param = file.param("design_rules", "legacy_offset", None).unwrap();
    assert!(!is_hidden(param, &file));
    Ok(())
}

#[test]
fn selection_round_trip() -> VaryResult<()> {
    let mut session = Session::load(fixture()?)?;
    let before = session.file().clone();

    session.select(&width_key())?;
    assert_eq!(session.file().variations().len(), 1);
    let entry = &session.file().variations()[0];
    assert_eq!(entry.key(), width_key());
    assert_eq!(
        entry.value,
        VariationValue::Range(NumericRange::new(d(10), d(20), d(1)))
    );
    assert_eq!(entry.default_value, vec![ParamValue::Scalar(d(50))]);
    assert!(session.file().param("design_rules", "width", None).unwrap().is_selected);

    session.deselect(&width_key())?;
    assert_eq!(*session.file(), before);
    assert!(session.is_clean());
    Ok(())
}

#[test]
fn array_param_selection_round_trip() -> VaryResult<()> {
    let key = VariationKey::new("design_rules", "offsets", None);
    let mut session = Session::load(fixture()?)?;
    let offsets = session.file().param("design_rules", "offsets", None).unwrap();
    assert_eq!(offsets.tp, ParamType::Array);
    assert_eq!(offsets.val, ParamValue::Array(vec![d(1), d(2), d(3)]));

    // Array values snapshot element-wise into the entry's defaults
    session.select(&key)?;
    let entry = &session.file().variations()[0];
    assert_eq!(
        entry.default_value,
        vec![
            ParamValue::Scalar(d(1)),
            ParamValue::Scalar(d(2)),
            ParamValue::Scalar(d(3)),
        ]
    );
    assert_eq!(
        entry.value,
        VariationValue::Range(NumericRange::new(d(1), d(3), d(1)))
    );

    let saved = session.file().to_json_string()?;
    let reloaded = read::parse_str(&saved)?;
    assert_eq!(reloaded, *session.file());
    Ok(())
}

#[test]
fn width_scenario() -> VaryResult<()> {
    let mut session = Session::load(fixture()?)?;
    session.select(&width_key())?;
    assert!(session.is_clean());

    let outcome = session.edit(&width_key(), VariationField::Step, d(0))?;
    assert!(!outcome.accepted);
    assert_eq!(session.errors().len(), 1);
    assert_eq!(session.errors()[0].key.field, VariationField::Step);

    // The rejected value is preserved in the model; rejection is advisory
    let entry = &session.file().variations()[0];
    assert_eq!(entry.numeric().unwrap().step, d(0));

    let outcome = session.edit(&width_key(), VariationField::Step, d(1))?;
    assert!(outcome.accepted);
    assert!(session.is_clean());
    Ok(())
}

#[test]
fn bound_monotonicity() -> VaryResult<()> {
    let key = VariationKey::new("design_rules", "thickness", None);
    let mut session = Session::load(fixture()?)?;
    session.select(&key)?;

    // startPercentage = 20, defaultStartValue = 100 resolves to [80, 120]
    let entry = &session.file().variations()[0];
    assert_eq!(min_for(VariationField::Start, entry), Some(d(80)));
    assert_eq!(max_for(VariationField::Start, entry), Some(d(120)));

    let outcome = session.edit(&key, VariationField::Start, d(79))?;
    assert!(!outcome.accepted);
    assert_eq!(
        session.errors()[0].key,
        CellKey {
            group: "design_rules".to_string(),
            row: 0,
            field: VariationField::Start,
        }
    );

    let outcome = session.edit(&key, VariationField::Start, d(80))?;
    assert!(outcome.accepted);
    assert!(session.is_clean());
    Ok(())
}

#[test]
fn percentage_overrides_literal_bounds() -> VaryResult<()> {
    // thickness carries minStart = 5 *and* startPercentage = 20;
    // the percentage bound must win
    let key = VariationKey::new("design_rules", "thickness", None);
    let mut session = Session::load(fixture()?)?;
    session.select(&key)?;
    let entry = &session.file().variations()[0];
    assert_eq!(min_for(VariationField::Start, entry), Some(d(80)));
    Ok(())
}

#[test]
fn end_exceeds_start_retraction() -> VaryResult<()> {
    let key = VariationKey::new("design_rules", "spacing", None);
    let mut session = Session::load(fixture()?)?;
    session.select(&key)?;
    let entry = &session.file().variations()[0];
    assert_eq!(
        entry.value,
        VariationValue::Range(NumericRange::new(d(5), d(10), d(1)))
    );

    let outcome = session.edit(&key, VariationField::End, d(5))?;
    assert!(!outcome.accepted);
    assert_eq!(session.errors().len(), 1);
    assert_eq!(session.errors()[0].key.field, VariationField::End);

    // Raising the end clears the error without touching start
    let outcome = session.edit(&key, VariationField::End, d(6))?;
    assert!(outcome.accepted);
    assert!(session.is_clean());
    let entry = &session.file().variations()[0];
    assert_eq!(entry.numeric().unwrap().start, d(5));
    Ok(())
}

#[test]
fn start_exceeds_end_retraction() -> VaryResult<()> {
    let key = VariationKey::new("design_rules", "spacing", None);
    let mut session = Session::load(fixture()?)?;
    session.select(&key)?;

    // Raising the start past the end flags both fields of the pair
    let outcome = session.edit(&key, VariationField::Start, d(10))?;
    assert!(!outcome.accepted);
    assert!(session
        .errors()
        .iter()
        .any(|e| e.key.field == VariationField::Start));
    assert!(session
        .errors()
        .iter()
        .any(|e| e.key.field == VariationField::End));

    // Lowering it back clears the stale end error without any end edit
    let outcome = session.edit(&key, VariationField::Start, d(5))?;
    assert!(outcome.accepted);
    assert!(session.is_clean());
    let entry = &session.file().variations()[0];
    assert_eq!(entry.numeric().unwrap().end, d(10));
    Ok(())
}

#[test]
fn step_floor_follows_stepper() -> VaryResult<()> {
    let mut session = Session::load(fixture()?)?;
    session.select(&width_key())?;
    let entry = &session.file().variations()[0];
    assert_eq!(min_for(VariationField::Step, entry), Some(d(1)));
    assert_eq!(max_for(VariationField::Step, entry), None);
    Ok(())
}

#[test]
fn toggle_options_for_booleans() -> VaryResult<()> {
    let key = VariationKey::new("design_rules", "fill", Some("metal1".to_string()));
    let mut session = Session::load(fixture()?)?;

    // First toggle creates the entry and selects the row
    session.toggle_option(&key, &ParamValue::Bool(true))?;
    assert_eq!(session.file().variations().len(), 1);
    let entry = &session.file().variations()[0];
    assert_eq!(entry.key(), key);
    assert_eq!(entry.display_name, "Fill Metal 1");
    assert_eq!(entry.value, VariationValue::Chosen(vec![ParamValue::Bool(true)]));
    assert!(session
        .file()
        .param("design_rules", "fill", Some("metal1"))
        .unwrap()
        .is_selected);

    // Later toggles add and remove values in place
    session.toggle_option(&key, &ParamValue::Bool(false))?;
    assert_eq!(
        session.file().variations()[0].value,
        VariationValue::Chosen(vec![ParamValue::Bool(true), ParamValue::Bool(false)])
    );
    session.toggle_option(&key, &ParamValue::Bool(true))?;
    assert_eq!(
        session.file().variations()[0].value,
        VariationValue::Chosen(vec![ParamValue::Bool(false)])
    );

    // Removing the last chosen value removes the entry and deselects
    session.toggle_option(&key, &ParamValue::Bool(false))?;
    assert!(session.file().variations().is_empty());
    assert!(!session
        .file()
        .param("design_rules", "fill", Some("metal1"))
        .unwrap()
        .is_selected);
    Ok(())
}

#[test]
fn toggle_rejects_unknown_options() -> VaryResult<()> {
    let key = VariationKey::new("design_rules", "mode", None);
    let mut session = Session::load(fixture()?)?;
    assert!(session
        .toggle_option(&key, &ParamValue::Text("C".to_string()))
        .is_err());
    Ok(())
}

#[test]
fn clear_all_resets_everything() -> VaryResult<()> {
    let mut session = Session::load(fixture()?)?;
    session.select(&width_key())?;
    session.select(&VariationKey::new("design_rules", "spacing", None))?;
    session.edit(&width_key(), VariationField::Step, d(0))?;
    assert!(!session.is_clean());

    session.clear_all();
    assert!(session.file().variations().is_empty());
    assert!(session
        .file()
        .all_params()
        .all(|(_, p)| !p.is_selected));
    assert!(session.is_clean());
    Ok(())
}

#[test]
fn reset_restores_default_and_wipes_errors() -> VaryResult<()> {
    let default = fixture()?;
    let mut session = Session::load(default.clone())?;
    session.select(&width_key())?;
    session.edit(&width_key(), VariationField::Step, d(0))?;
    assert!(!session.is_clean());

    session.reset();
    assert_eq!(*session.file(), default);
    assert!(session.is_clean());
    Ok(())
}

#[test]
fn json_round_trip() -> VaryResult<()> {
    let mut session = Session::load(fixture()?)?;
    session.select(&width_key())?;
    let saved = session.file().to_json_string()?;
    let reloaded = read::parse_str(&saved)?;
    assert_eq!(reloaded, *session.file());
    Ok(())
}

#[test]
fn yaml_round_trip() -> VaryResult<()> {
    let file = fixture()?;
    let s = Yaml.to_string(&file).unwrap();
    let reloaded: TechFile = Yaml.from_str(&s).unwrap();
    assert_eq!(reloaded, file);
    Ok(())
}

#[test]
fn save_rejects_desynced_catalogs() -> VaryResult<()> {
    let param = ParamBuilder::default()
        .key(ParamKey::new("width", None))
        .val(ParamValue::Scalar(d(5)))
        .tp(ParamType::Scalar)
        .ui_visible(true)
        .is_selected(true)
        .build()
        .unwrap();
    let group = ParamGroupBuilder::default()
        .name("g")
        .display_name("G")
        .ui_visible(true)
        .supports_variations(true)
        .data(GroupData::Params(vec![param]))
        .build()
        .unwrap();
    let file = TechFile {
        file_content: vec![group],
    };
    assert!(write::to_json_string(&file).is_err());
    Ok(())
}

#[test]
fn keystroke_filter() {
    use VariationField::{End, Start, Step};
    let mut spec = RangeSpec::default();

    // Digits are always welcome
    assert!(accepts_keystroke("", '7', &spec, Start));
    assert!(accepts_keystroke("12", '0', &spec, Step));

    // Minus only leading, and only where negatives are allowed
    assert!(!accepts_keystroke("", '-', &spec, Start));
    spec.negative_start_allowed = Some(true);
    assert!(accepts_keystroke("", '-', &spec, Start));
    assert!(!accepts_keystroke("1", '-', &spec, Start));
    assert!(!accepts_keystroke("", '-', &spec, End));
    assert!(!accepts_keystroke("", '-', &spec, Step));

    // Decimal point only once, and only for float steppers
    assert!(!accepts_keystroke("1", '.', &spec, Start));
    spec.stepper_float = Some(true);
    assert!(accepts_keystroke("1", '.', &spec, Start));
    assert!(!accepts_keystroke("1.5", '.', &spec, Start));

    // Everything else is refused outright
    assert!(!accepts_keystroke("", 'x', &spec, Start));
}

#[test]
fn initial_errors_are_seeded_on_load() -> VaryResult<()> {
    // A loaded catalog whose stored range already violates its bounds
    // reports the error without any edit
    let file = read::parse_str(
        r#"
        { "FileContent": [
            { "name": "g", "displayName": "G", "uiVisible": true, "supportsVariations": true,
              "data": [ { "key": {"key1": "x"}, "val": 1, "type": 1, "uiVisible": true,
                          "isSelected": true, "stepper": 1 } ] },
            { "name": "permutation", "displayName": "Permutation", "uiVisible": true,
              "data": [ { "name": "x", "displayName": "X", "parameterName": "g",
                          "defaultValue": [1], "value": {"start": 9, "end": 4, "step": 1},
                          "stepper": 1 } ] }
        ]}
        "#,
    )?;
    let session = Session::load(file)?;
    assert!(!session.is_clean());
    // Both ends of the inverted range are flagged
    assert!(session
        .errors()
        .iter()
        .any(|e| e.key.field == VariationField::End));
    assert!(session
        .errors()
        .iter()
        .any(|e| e.key.field == VariationField::Start));
    Ok(())
}
