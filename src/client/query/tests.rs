use super::*;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

#[test]
fn test_array_values_repeat_key() {
    let qs = encode(&json!({"status": ["New", "Deal"]})).unwrap();
    assert_eq!(qs, "status=New&status=Deal");
}

#[test]
fn test_null_values_omitted() {
    let qs = encode(&json!({"city": null, "page": 2})).unwrap();
    assert_eq!(qs, "page=2");
}

#[test]
fn test_option_fields_omitted() {
    #[derive(Serialize)]
    struct Params {
        city: Option<String>,
        search: Option<String>,
        status: Vec<&'static str>,
    }
    let qs = encode(&Params {
        city: None,
        search: Some("kopi susu".into()),
        status: vec!["New"],
    })
    .unwrap();
    assert_eq!(qs, "search=kopi+susu&status=New");
}

#[test]
fn test_scalars_stringified() {
    let qs = encode(&json!({"active": true, "limit": 50, "ratio": 0.5})).unwrap();
    assert_eq!(qs, "active=true&limit=50&ratio=0.5");
}

#[test]
fn test_special_characters_escaped() {
    let qs = encode(&json!({"search": "a&b=c/d"})).unwrap();
    assert_eq!(qs, "search=a%26b%3Dc%2Fd");
}

#[test]
fn test_null_array_elements_skipped() {
    let qs = encode(&json!({"status": ["New", null, "Junk"]})).unwrap();
    assert_eq!(qs, "status=New&status=Junk");
}

#[test]
fn test_empty_array_contributes_nothing() {
    let qs = encode(&json!({"status": []})).unwrap();
    assert_eq!(qs, "");
}

#[test]
fn test_nested_object_as_json() {
    let qs = encode(&json!({"range": {"from": 1}})).unwrap();
    assert_eq!(qs, "range=%7B%22from%22%3A1%7D");
}

#[test]
fn test_unit_and_none_encode_empty() {
    assert_eq!(encode(&()).unwrap(), "");
    assert_eq!(encode(&None::<BTreeMap<String, String>>).unwrap(), "");
}

#[test]
fn test_non_object_rejected() {
    let err = encode(&vec!["a", "b"]).unwrap_err();
    assert!(err.to_string().contains("an array"));
    assert!(encode("plain").is_err());
}

#[test]
fn test_with_query() {
    assert_eq!(with_query("/leads", ""), "/leads");
    assert_eq!(with_query("/leads", "page=1"), "/leads?page=1");
    assert_eq!(with_query("/leads?x=1", "page=1"), "/leads?x=1&page=1");
}

proptest! {
    #[test]
    fn every_array_element_becomes_one_pair(values in proptest::collection::vec("[A-Za-z0-9 ]{0,12}", 0..8)) {
        let qs = encode(&json!({"status": &values})).unwrap();
        let decoded: Vec<(String, String)> = form_urlencoded::parse(qs.as_bytes())
            .into_owned()
            .collect();
        prop_assert_eq!(decoded.len(), values.len());
        for ((key, value), expected) in decoded.iter().zip(values.iter()) {
            prop_assert_eq!(key, "status");
            prop_assert_eq!(value, expected);
        }
    }

    #[test]
    fn null_fields_never_appear(key in "[a-z]{1,8}") {
        let mut map = serde_json::Map::new();
        map.insert(key.clone(), Value::Null);
        let qs = encode(&Value::Object(map)).unwrap();
        prop_assert!(qs.is_empty());
    }
}
