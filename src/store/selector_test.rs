use serde_json::json;

use super::*;

#[test]
fn test_id_and_where_spellings_share_canonical_key() {
    let bare: Selector = "post1".into();
    let spelled = Selector::Where(json!({ "_id": "post1" }).as_object().unwrap().clone());
    assert_eq!(bare.canonical(), spelled.canonical());
}

#[test]
fn test_canonical_is_key_order_independent() {
    // serde_json::Map orders keys, so insertion order cannot leak into the key
    let a = Selector::Where(json!({ "post_id": "p1", "kind": "note" }).as_object().unwrap().clone());
    let b = Selector::Where(json!({ "kind": "note", "post_id": "p1" }).as_object().unwrap().clone());
    assert_eq!(a.canonical(), b.canonical());
}

#[test]
fn test_single_id_detection() {
    assert!(Selector::Id("x".to_string()).is_single_id());
    assert!(Selector::Where(json!({ "_id": "x" }).as_object().unwrap().clone()).is_single_id());
    assert!(!Selector::Where(json!({ "_id": "x", "k": 1 }).as_object().unwrap().clone()).is_single_id());
    assert!(!Selector::Where(json!({ "post_id": "x" }).as_object().unwrap().clone()).is_single_id());
    assert!(!Selector::all().is_single_id());
}
