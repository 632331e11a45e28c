//! Eager loading issues one batched statement per hop and wires the
//! results without dirtying anything.

mod common;

use std::sync::Arc;

use asupersync::runtime::RuntimeBuilder;
use cerulean::prelude::*;

use common::{ScriptedAdapter, blog_schema, pg, unwrap_outcome};

#[test]
fn eager_belongs_to_batches_into_two_statements() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create runtime");
    let cx = Cx::for_testing();
    let (_, post, _) = blog_schema();

    rt.block_on(async {
        let adapter = ScriptedAdapter::new();
        adapter.push_rows(
            &["id", "title", "author_id"],
            vec![
                vec![Value::BigInt(10), "first".into(), Value::BigInt(1)],
                vec![Value::BigInt(11), "second".into(), Value::BigInt(2)],
                vec![Value::BigInt(12), "third".into(), Value::BigInt(1)],
            ],
        );
        adapter.push_rows(
            &["id", "name"],
            vec![
                vec![Value::BigInt(1), "Alice".into()],
                vec![Value::BigInt(2), "Bob".into()],
            ],
        );

        let posts = unwrap_outcome(
            ModelQuery::new(&post, pg())
                .with("author")
                .all(&cx, &adapter)
                .await,
        );
        assert_eq!(posts.len(), 3);

        let statements = adapter.statements();
        assert_eq!(statements.len(), 2, "one select plus one prefetch");
        assert_eq!(
            statements[1].sql,
            "SELECT * FROM \"authors\" WHERE \"authors\".\"id\" IN ($1, $2)"
        );
        // Keys are deduplicated in first-seen order.
        assert_eq!(statements[1].args, vec![Value::BigInt(1), Value::BigInt(2)]);

        let first_author = posts[0].read().unwrap().one("author").unwrap().unwrap();
        let third_author = posts[2].read().unwrap().one("author").unwrap().unwrap();
        assert_eq!(
            first_author.read().unwrap().attribute("name"),
            Some(&Value::Text("Alice".to_string()))
        );
        // Both posts share the same loaded author instance.
        assert!(Arc::ptr_eq(&first_author, &third_author));

        // Hydration wiring never dirties either side.
        assert!(!posts[0].read().unwrap().is_dirty());
        assert!(!first_author.read().unwrap().is_dirty());
    });
}

#[test]
fn eager_has_many_groups_children_per_owner() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create runtime");
    let cx = Cx::for_testing();
    let (author, _, _) = blog_schema();

    rt.block_on(async {
        let adapter = ScriptedAdapter::new();
        adapter.push_rows(
            &["id", "name"],
            vec![
                vec![Value::BigInt(1), "Alice".into()],
                vec![Value::BigInt(2), "Bob".into()],
            ],
        );
        adapter.push_rows(
            &["id", "title", "author_id"],
            vec![
                vec![Value::BigInt(10), "first".into(), Value::BigInt(1)],
                vec![Value::BigInt(11), "second".into(), Value::BigInt(1)],
            ],
        );

        let authors = unwrap_outcome(
            ModelQuery::new(&author, pg())
                .with("posts")
                .all(&cx, &adapter)
                .await,
        );

        let alice_posts = authors[0].read().unwrap().many("posts").unwrap();
        assert_eq!(alice_posts.len(), 2);
        // An owner with no matching children is loaded as empty, not
        // left unloaded.
        let bob_posts = authors[1].read().unwrap().many("posts").unwrap();
        assert!(bob_posts.is_empty());
    });
}

#[test]
fn eager_through_walks_both_hops() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create runtime");
    let cx = Cx::for_testing();
    let (author, _, _) = blog_schema();

    rt.block_on(async {
        let adapter = ScriptedAdapter::new();
        adapter.push_rows(
            &["id", "name"],
            vec![vec![Value::BigInt(1), "Alice".into()]],
        );
        adapter.push_rows(
            &["id", "title", "author_id"],
            vec![vec![Value::BigInt(10), "first".into(), Value::BigInt(1)]],
        );
        adapter.push_rows(
            &["id", "body", "post_id", "author_id"],
            vec![vec![
                Value::BigInt(100),
                "nice".into(),
                Value::BigInt(10),
                Value::BigInt(2),
            ]],
        );

        let authors = unwrap_outcome(
            ModelQuery::new(&author, pg())
                .with("comments")
                .all(&cx, &adapter)
                .await,
        );

        assert_eq!(adapter.calls(), 3, "primary select plus one per hop");
        let comments = authors[0].read().unwrap().many("comments").unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(
            comments[0].read().unwrap().attribute("body"),
            Some(&Value::Text("nice".to_string()))
        );
    });
}

#[test]
fn unloaded_relation_read_is_a_not_loaded_error() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create runtime");
    let cx = Cx::for_testing();
    let (_, post, _) = blog_schema();

    rt.block_on(async {
        let adapter = ScriptedAdapter::new();
        adapter.push_rows(
            &["id", "title", "author_id"],
            vec![vec![Value::BigInt(10), "first".into(), Value::BigInt(1)]],
        );

        let posts = unwrap_outcome(ModelQuery::new(&post, pg()).all(&cx, &adapter).await);
        match posts[0].read().unwrap().one("author") {
            Err(Error::NotLoaded(e)) => {
                assert_eq!(e.relation, "author");
                assert_eq!(e.model, "Post");
            }
            other => panic!("expected NotLoaded, got {other:?}"),
        }
    });
}

#[test]
fn dangling_foreign_key_is_a_lookup_error() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create runtime");
    let cx = Cx::for_testing();
    let (_, post, _) = blog_schema();

    rt.block_on(async {
        let adapter = ScriptedAdapter::new();
        adapter.push_rows(
            &["id", "title", "author_id"],
            vec![vec![Value::BigInt(10), "orphan".into(), Value::BigInt(99)]],
        );
        adapter.push_rows(&["id", "name"], vec![]);

        let outcome = ModelQuery::new(&post, pg())
            .with("author")
            .all(&cx, &adapter)
            .await;
        match outcome {
            Outcome::Err(Error::Lookup(e)) => {
                assert_eq!(e.related, "Author");
                assert_eq!(e.key, Value::BigInt(99));
            }
            other => panic!("expected Lookup error, got {other:?}"),
        }
    });
}

#[test]
fn null_foreign_key_loads_an_absent_parent() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create runtime");
    let cx = Cx::for_testing();
    let (_, post, _) = blog_schema();

    rt.block_on(async {
        let adapter = ScriptedAdapter::new();
        adapter.push_rows(
            &["id", "title", "author_id"],
            vec![vec![Value::BigInt(10), "draft".into(), Value::Null]],
        );

        let posts = unwrap_outcome(
            ModelQuery::new(&post, pg())
                .with("author")
                .all(&cx, &adapter)
                .await,
        );
        // No keys to batch: the prefetch statement is skipped entirely.
        assert_eq!(adapter.calls(), 1);
        assert!(posts[0].read().unwrap().one("author").unwrap().is_none());
    });
}
