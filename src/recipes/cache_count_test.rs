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
    cache_count(&engine, &posts, "commentsCount", &comments, "post_id", CacheCountOptions::default())
        .unwrap();
    (engine, posts, comments)
}

fn count_on(posts: &CollectionRef, id: &str) -> Value {
    posts
        .find_one(&Selector::Id(id.to_string()))
        .unwrap()
        .unwrap()
        .get("commentsCount")
        .cloned()
        .unwrap_or(Value::Null)
}

fn move_comment(comments: &CollectionRef, id: &str, post_id: &str) {
    comments
        .update(
            &Selector::Id(id.to_string()),
            UpdateOps {
                assign: json!({ "post_id": post_id }).as_object().unwrap().clone(),
                remove: vec![],
            },
            false,
        )
        .unwrap();
}

#[test]
fn test_parent_insert_initializes_count_over_existing_children() {
    let (_engine, posts, comments) = setup();
    comments.insert(json!({ "post_id": "post1" })).unwrap();
    comments.insert(json!({ "post_id": "post1" })).unwrap();

    posts.insert(json!({ "_id": "post1", "title": "t" })).unwrap();
    assert_eq!(count_on(&posts, "post1"), json!(2));
}

#[test]
fn test_child_inserts_and_removes_keep_count_current() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1", "title": "t" })).unwrap();
    assert_eq!(count_on(&posts, "post1"), json!(0));

    comments.insert(json!({ "_id": "c1", "post_id": "post1" })).unwrap();
    comments.insert(json!({ "_id": "c2", "post_id": "post1" })).unwrap();
    assert_eq!(count_on(&posts, "post1"), json!(2));

    comments.remove(&Selector::Id("c1".to_string())).unwrap();
    assert_eq!(count_on(&posts, "post1"), json!(1));
}

#[test]
fn test_moving_a_child_recounts_both_parents() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1" })).unwrap();
    posts.insert(json!({ "_id": "post2" })).unwrap();
    comments.insert(json!({ "_id": "c1", "post_id": "post1" })).unwrap();

    move_comment(&comments, "c1", "post2");
    assert_eq!(count_on(&posts, "post1"), json!(0));
    assert_eq!(count_on(&posts, "post2"), json!(1));
}

#[test]
fn test_unrelated_child_updates_do_not_recount() {
    let (_engine, posts, comments) = setup();
    posts.insert(json!({ "_id": "post1" })).unwrap();
    comments.insert(json!({ "_id": "c1", "post_id": "post1", "body": "hi" })).unwrap();
    assert_eq!(count_on(&posts, "post1"), json!(1));

    // no watched field changes; the count write must not even be attempted,
    // which we can observe by clobbering the cache first
    posts
        .update(
            &Selector::Id("post1".to_string()),
            UpdateOps {
                assign: json!({ "commentsCount": 99 }).as_object().unwrap().clone(),
                remove: vec![],
            },
            false,
        )
        .unwrap();
    comments
        .update(
            &Selector::Id("c1".to_string()),
            UpdateOps {
                assign: json!({ "body": "edited" }).as_object().unwrap().clone(),
                remove: vec![],
            },
            false,
        )
        .unwrap();
    assert_eq!(count_on(&posts, "post1"), json!(99));
}

#[test]
fn test_selector_option_filters_counted_children() {
    let engine = Engine::with_mode(DispatchMode::Inline);
    let posts = MemoryCollection::new_shared("posts");
    let comments = MemoryCollection::new_shared("comments");
    let options = CacheCountOptions {
        selector: json!({ "approved": true }).as_object().unwrap().clone(),
    };
    cache_count(&engine, &posts, "approvedCount", &comments, "post_id", options).unwrap();

    posts.insert(json!({ "_id": "post1" })).unwrap();
    comments
        .insert(json!({ "_id": "c1", "post_id": "post1", "approved": true }))
        .unwrap();
    comments
        .insert(json!({ "_id": "c2", "post_id": "post1", "approved": false }))
        .unwrap();

    let post = posts.find_one(&Selector::Id("post1".to_string())).unwrap().unwrap();
    assert_eq!(post["approvedCount"], json!(1));

    // approving c2 changes a watched selector key, so the count follows
    comments
        .update(
            &Selector::Id("c2".to_string()),
            UpdateOps {
                assign: json!({ "approved": true }).as_object().unwrap().clone(),
                remove: vec![],
            },
            false,
        )
        .unwrap();
    let post = posts.find_one(&Selector::Id("post1".to_string())).unwrap().unwrap();
    assert_eq!(post["approvedCount"], json!(2));
}
