//! Tests for the resilient payload deserializer.
use fukugen::codec::parse_resilient;
use fukugen::error::PayloadError;
use serde_json::json;

#[test]
fn test_intact_payload_parses_directly() {
    let doc = json!({"alpha": [1, 2, 3], "beta": {"x": true}});
    let bytes = serde_json::to_vec(&doc).unwrap();

    let parsed = parse_resilient(&bytes).expect("intact payload");
    assert_eq!(parsed, doc);
}

#[test]
fn test_trailing_garbage_is_truncated_at_the_structural_boundary() {
    let mut bytes = br#"{"alpha": 1, "beta": [2, 3]}"#.to_vec();
    bytes.extend_from_slice(b"\x00\xffgarbage after the document");

    let parsed = parse_resilient(&bytes).expect("garbage should be dropped");
    assert_eq!(parsed, json!({"alpha": 1, "beta": [2, 3]}));
}

#[test]
fn test_undecodable_bytes_inside_strings_are_replaced() {
    // 0xff is not valid UTF-8; the lossy decode turns it into U+FFFD
    // instead of rejecting the payload.
    let bytes = b"{\"name\": \"a\xffb\"}".to_vec();

    let parsed = parse_resilient(&bytes).expect("lossy decode should succeed");
    assert_eq!(parsed["name"], json!("a\u{fffd}b"));
}

#[test]
fn test_cut_after_complete_nested_value_recovers_a_prefix() {
    let full = r#"{"alpha": [1, 2, 3], "beta": {"x": true}, "gamma": "tail"}"#;
    // Cut right after `"beta": {"x": true}` completes.
    let cut = full.find(r#", "gamma""#).unwrap();
    let truncated = &full.as_bytes()[..cut];

    let parsed = parse_resilient(truncated).expect("prefix should be recoverable");
    assert_eq!(parsed, json!({"alpha": [1, 2, 3], "beta": {"x": true}}));
}

#[test]
fn test_cut_inside_later_key_recovers_earlier_values() {
    let full = r#"{"alpha": [1, 2, 3], "beta": {"x": true}}"#;
    // Cut mid-way through the "beta" key, after alpha completed.
    let cut = full.find(r#""beta""#).unwrap() + 3;
    let truncated = &full.as_bytes()[..cut];

    let parsed = parse_resilient(truncated).expect("alpha should survive");
    assert_eq!(parsed, json!({"alpha": [1, 2, 3]}));
}

#[test]
fn test_cut_inside_nested_object_recovers_what_completed() {
    let full = r#"[{"a": 1}, {"b": 2}, {"c": 3}]"#;
    let cut = full.find(r#"{"c""#).unwrap();
    let truncated = &full.as_bytes()[..cut];

    let parsed = parse_resilient(truncated).expect("completed elements should survive");
    assert_eq!(parsed, json!([{"a": 1}, {"b": 2}]));
}

#[test]
fn test_trailing_commas_and_whitespace_are_stripped() {
    let bytes = b"{\"alpha\": 1}  ,,\n\t".to_vec();

    let parsed = parse_resilient(&bytes).expect("trailing separators should be dropped");
    assert_eq!(parsed, json!({"alpha": 1}));
}

#[test]
fn test_hopeless_payload_is_reported_corrupt() {
    let bytes = b"no structure here at all".to_vec();

    assert!(matches!(
        parse_resilient(&bytes),
        Err(PayloadError::Corrupt { .. })
    ));
}
