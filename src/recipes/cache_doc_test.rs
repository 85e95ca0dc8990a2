use serde_json::json;
use serde_json::Value;

use super::*;
use crate::Collection;
use crate::CollectionRef;
use crate::DispatchMode;
use crate::Engine;
use crate::MemoryCollection;
use crate::Selector;
use crate::UpdateOps;

fn setup() -> (Engine, CollectionRef, CollectionRef) {
    let engine = Engine::with_mode(DispatchMode::Inline);
    let posts = MemoryCollection::new_shared("posts");
    let comments = MemoryCollection::new_shared("comments");
    cache_doc(&engine, &comments, &posts, &["title"], Some("post"), CacheDocOptions::default())
        .unwrap();
    (engine, posts, comments)
}

fn comment(comments: &CollectionRef, id: &str) -> Value {
    comments.find_one(&Selector::Id(id.to_string())).unwrap().unwrap()
}

fn set_fields(collection: &CollectionRef, id: &str, fields: Value) {
    collection
        .update(
            &Selector::Id(id.to_string()),
            UpdateOps {
                assign: fields.as_object().unwrap().clone(),
                remove: vec![],
            },
            false,
        )
        .unwrap();
}

#[test]
fn test_child_insert_with_dangling_reference_stays_bare() {
    let (_engine, _posts, comments) = setup();
    comments
        .insert(json!({ "_id": "comment1", "post_id": "post1", "content": "Great post!" }))
        .unwrap();
    assert!(comment(&comments, "comment1").get("_post").is_none());
}

#[test]
fn test_parent_insert_fills_copies_on_existing_children() {
    let (_engine, posts, comments) = setup();
    comments
        .insert(json!({ "_id": "comment1", "post_id": "post1", "content": "Great post!" }))
        .unwrap();
    comments
        .insert(json!({ "_id": "comment2", "post_id": "post1", "content": "Love it!" }))
        .unwrap();

    posts
        .insert(json!({ "_id": "post1", "title": "My first post", "content": "body" }))
        .unwrap();

    assert_eq!(comment(&comments, "comment1")["_post"], json!({ "title": "My first post" }));
    assert_eq!(comment(&comments, "comment2")["_post"], json!({ "title": "My first post" }));
}

#[test]
fn test_child_insert_copies_from_existing_parent() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1", "title": "T" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "post_id": "post1" })).unwrap();
    assert_eq!(comment(&comments, "comment1")["_post"]["title"], json!("T"));
}

#[test]
fn test_parent_title_update_propagates_to_every_child() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1", "title": "old" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "post_id": "post1" })).unwrap();
    comments.insert(json!({ "_id": "comment2", "post_id": "post1" })).unwrap();

    set_fields(&posts, "post1", json!({ "title": "new" }));
    assert_eq!(comment(&comments, "comment1")["_post"]["title"], json!("new"));
    assert_eq!(comment(&comments, "comment2")["_post"]["title"], json!("new"));
}

#[test]
fn test_uncopied_parent_fields_do_not_touch_children() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1", "title": "T" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "post_id": "post1" })).unwrap();

    set_fields(&posts, "post1", json!({ "views": 10 }));
    assert_eq!(comment(&comments, "comment1")["_post"], json!({ "title": "T" }));
}

#[test]
fn test_rereferencing_a_child_swaps_the_copy() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1", "title": "A" })).unwrap();
    posts.insert(json!({ "_id": "post2", "title": "B" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "post_id": "post1" })).unwrap();

    set_fields(&comments, "comment1", json!({ "post_id": "post2" }));
    assert_eq!(comment(&comments, "comment1")["_post"]["title"], json!("B"));

    // pointing at a missing parent clears the copy
    set_fields(&comments, "comment1", json!({ "post_id": "ghost" }));
    assert!(comment(&comments, "comment1").get("_post").is_none());
}

#[test]
fn test_parent_removal_clears_copies() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1", "title": "T" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "post_id": "post1" })).unwrap();
    comments.insert(json!({ "_id": "comment2", "post_id": "post1" })).unwrap();

    posts.remove(&Selector::Id("post1".to_string())).unwrap();
    assert!(comment(&comments, "comment1").get("_post").is_none());
    assert!(comment(&comments, "comment2").get("_post").is_none());
}

#[test]
fn test_copy_never_contains_the_parent_id() {
    let engine = Engine::with_mode(DispatchMode::Inline);
    let posts = MemoryCollection::new_shared("posts");
    let comments = MemoryCollection::new_shared("comments");
    cache_doc(&engine, &comments, &posts, &["_id", "title"], Some("post"), CacheDocOptions::default())
        .unwrap();

    posts.insert(json!({ "_id": "post1", "title": "T" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "post_id": "post1" })).unwrap();
    assert_eq!(comment(&comments, "comment1")["_post"], json!({ "title": "T" }));
}

#[test]
fn test_custom_cache_and_ref_field_names() {
    let engine = Engine::with_mode(DispatchMode::Inline);
    let posts = MemoryCollection::new_shared("posts");
    let comments = MemoryCollection::new_shared("comments");
    let options = CacheDocOptions {
        cache_field: Some("parentCopy".to_string()),
        ref_field: Some("parent".to_string()),
    };
    cache_doc(&engine, &comments, &posts, &["title"], None, options).unwrap();

    posts.insert(json!({ "_id": "post1", "title": "T" })).unwrap();
    comments.insert(json!({ "_id": "comment1", "parent": "post1" })).unwrap();
    assert_eq!(comment(&comments, "comment1")["parentCopy"]["title"], json!("T"));
}
