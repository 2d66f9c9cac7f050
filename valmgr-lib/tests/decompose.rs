//! Tests for flattening complex editor payloads into store entries.

use serde_json::json;
use valmgr_lib::model::{BlockNode, ErrorMessage, ModelState, PropertyKey};
use valmgr_lib::{MatchOptions, ServerValidationManager};

fn aliases(manager: &ServerValidationManager) -> Vec<String> {
    manager
        .items()
        .iter()
        .filter_map(|e| e.property_alias.clone())
        .collect()
}

#[test]
fn test_nested_payload_is_flattened_and_blanked() {
    let manager = ServerValidationManager::new();
    let model_state = ModelState::from_json(
        r#"{"_Properties.blocks.invariant.null.": ["[{\"$id\":\"AAA\",\"ModelState\":{\"_Properties.city.invariant.null.\":[\"Required\"]}}]"]}"#,
    )
    .unwrap();
    manager.add_errors_for_model_state(&model_state, None);

    let city = manager
        .get_property_error(&PropertyKey::new("blocks/AAA/city"))
        .expect("nested entry");
    assert_eq!(city.error_msg, "Required");

    let blocks = manager
        .get_property_error(&PropertyKey::new("blocks"))
        .expect("parent entry");
    assert_eq!(blocks.error_msg, "");
    assert_eq!(manager.error_count(), 2);
}

#[test]
fn test_two_level_nesting() {
    let payload = json!([{
        "$id": "AAA",
        "ModelState": { "_Properties.title.invariant.null.": ["Too long"] },
        "items": [{
            "$id": "BBB",
            "ModelState": { "_Properties.city.invariant.null.": ["Required"] }
        }]
    }]);
    let model_state = ModelState::from_value(&json!({
        "_Properties.blocks.invariant.null.": [payload.to_string()]
    }))
    .unwrap();

    let manager = ServerValidationManager::new();
    manager.add_errors_for_model_state(&model_state, None);

    assert_eq!(
        aliases(&manager),
        ["blocks/AAA/title", "blocks/AAA/BBB/city", "blocks"]
    );
    let under_bbb =
        manager.get_property_errors(&PropertyKey::new("blocks/AAA/BBB"), MatchOptions::prefix());
    assert_eq!(under_bbb.len(), 1);
    assert_eq!(under_bbb[0].error_msg, "Required");
}

#[test]
fn test_decomposition_round_trip_path() {
    // A property on block BBB nested in block AAA of `blocks` is stored at
    // exactly blocks/AAA/BBB/<alias>; the `items` child key adds no segment.
    let payload = json!([{
        "$id": "AAA",
        "ModelState": {},
        "items": [{
            "$id": "BBB",
            "ModelState": { "_Properties.city.invariant.null.": ["Required"] }
        }]
    }]);
    let manager = ServerValidationManager::new();
    manager
        .add_property_error(&PropertyKey::new("blocks"), payload.to_string())
        .unwrap();

    let city = manager
        .get_property_error(&PropertyKey::new("blocks/AAA/BBB/city"))
        .expect("entry at the full validation path");
    assert_eq!(city.property_alias.as_deref(), Some("blocks/AAA/BBB/city"));
    assert_eq!(city.error_msg, "Required");
    assert!(!manager.has_property_error(&PropertyKey::new("blocks/AAA/items/BBB/city")));
    assert_eq!(aliases(&manager), ["blocks/AAA/BBB/city", "blocks"]);
}

#[test]
fn test_nested_property_inside_nested_property() {
    // A block property holding its own complex editor payload.
    let inner = json!([{
        "$id": "BBB",
        "ModelState": { "_Properties.street.en-US.null.": ["Required"] }
    }]);
    let outer = json!([{
        "$id": "AAA",
        "ModelState": { "_Properties.addresses.invariant.null.": [inner.to_string()] }
    }]);
    let model_state =
        ModelState::new().with("_Properties.blocks.invariant.null.", outer.to_string());

    let manager = ServerValidationManager::new();
    manager.add_errors_for_model_state(&model_state, None);

    assert!(manager.has_property_error(
        &PropertyKey::new("blocks/AAA/addresses/BBB/street").with_culture("en-US")
    ));
    assert_eq!(
        manager
            .get_property_error(&PropertyKey::new("blocks/AAA/addresses"))
            .map(|e| e.error_msg),
        Some(String::new())
    );
}

#[test]
fn test_pre_parsed_payload() {
    let model_state = ModelState::from_value(&json!({
        "_Properties.blocks.invariant.null.": [[{
            "$id": "AAA",
            "ModelState": { "_Properties.city.invariant.null.": ["Required"] }
        }]]
    }))
    .unwrap();

    let manager = ServerValidationManager::new();
    manager.add_errors_for_model_state(&model_state, None);
    assert_eq!(aliases(&manager), ["blocks/AAA/city", "blocks"]);
}

#[test]
fn test_direct_property_error_with_blocks() {
    let manager = ServerValidationManager::new();
    let blocks = vec![BlockNode::new(
        "AAA",
        ModelState::new().with("_Properties.city.invariant.null.", "Required"),
    )];
    manager
        .add_property_error(&PropertyKey::new("blocks"), blocks)
        .unwrap();
    assert_eq!(aliases(&manager), ["blocks/AAA/city", "blocks"]);
}

#[test]
fn test_malformed_blocks_are_skipped() {
    let payload = json!([
        { "ModelState": { "_Properties.lost.invariant.null.": ["x"] } },
        { "$id": "NOSTATE", "items": [{ "$id": "CHILD", "ModelState": {} }] },
        { "$id": "OK", "ModelState": { "_Properties.city.invariant.null.": ["Required"] } }
    ]);
    let manager = ServerValidationManager::new();
    manager
        .add_property_error(&PropertyKey::new("blocks"), payload.to_string())
        .unwrap();
    assert_eq!(aliases(&manager), ["blocks/OK/city", "blocks"]);
}

#[test]
fn test_undecodable_payload_is_blanked() {
    let manager = ServerValidationManager::new();
    manager
        .add_property_error(&PropertyKey::new("blocks"), "[{ not json")
        .unwrap();
    assert_eq!(
        manager
            .get_property_error(&PropertyKey::new("blocks"))
            .map(|e| e.error_msg),
        Some(String::new())
    );
    assert_eq!(manager.error_count(), 1);
}

#[test]
fn test_whitespace_before_payload() {
    let manager = ServerValidationManager::new();
    let payload = format!(
        "\u{feff}\n  {}",
        json!([{ "$id": "AAA", "ModelState": { "_Properties.city.invariant.null.": ["Required"] } }])
    );
    manager
        .add_property_error(&PropertyKey::new("blocks"), payload)
        .unwrap();
    assert!(manager.has_property_error(&PropertyKey::new("blocks/AAA/city")));
}

#[test]
fn test_parse_complex_editor_error_units() {
    let payload: ErrorMessage = json!([{
        "$id": "AAA",
        "$elementTypeAlias": "address",
        "ModelState": {},
        "items": [{ "$id": "BBB", "ModelState": {} }]
    }])
    .to_string()
    .into();

    let units = ServerValidationManager::parse_complex_editor_error(&payload, "blocks").unwrap();
    let paths: Vec<_> = units.iter().map(|u| u.validation_path.as_str()).collect();
    assert_eq!(paths, ["blocks/AAA", "blocks/AAA/BBB"]);
}

#[test]
fn test_culture_and_segment_inside_blocks() {
    let payload = json!([{
        "$id": "AAA",
        "ModelState": { "_Properties.city.da-DK.mobile.value": ["Påkrævet"] }
    }]);
    let manager = ServerValidationManager::new();
    manager
        .add_property_error(&PropertyKey::new("blocks"), payload.to_string())
        .unwrap();

    let entry = manager
        .get_property_error(
            &PropertyKey::new("blocks/AAA/city")
                .with_culture("da-DK")
                .with_segment("mobile")
                .with_field("value"),
        )
        .expect("entry");
    assert_eq!(entry.error_msg, "Påkrævet");
}
