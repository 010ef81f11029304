//! Process-wide registry hooks: default connection, crud override, reset.
//!
//! Everything here mutates global state, so it lives in a single test.

use std::sync::Arc;

use aorm::prelude::*;
use aorm::record::{register_crud, reset, set_crud_override, unregister_crud};
use aorm::sqlite::SqliteConnection;
use aorm::{ErrorCode, register_connection};
use pretty_assertions::assert_eq;

struct Post;

impl Model for Post {
    const NAME: &'static str = "Post";

    fn create_crud() -> Arc<dyn Crud> {
        Arc::new(DbCrud::new("post", PrimaryKey::single("post_id")))
    }
}

/// Answers every fetch with one row naming the model it was built for.
struct Canned {
    model: &'static str,
}

impl Crud for Canned {
    fn primary_key(&self) -> PrimaryKey {
        PrimaryKey::single("id")
    }

    fn fetch_one(&self, criteria: &Criteria) -> QueryResult<Option<Row>> {
        Ok(self.fetch_all(criteria)?.into_iter().next())
    }

    fn fetch_all(&self, _criteria: &Criteria) -> QueryResult<Vec<Row>> {
        Ok(vec![row! { "id" => 1, "model" => self.model }])
    }

    fn save(&self, row: &Row) -> QueryResult<KeyValue> {
        self.primary_key().value_of(row)
    }

    fn insert(&self, row: &Row) -> QueryResult<KeyValue> {
        self.save(row)
    }

    fn delete(&self, _key: &KeyValue) -> QueryResult<()> {
        Ok(())
    }
}

fn models(posts: &[Record<Post>]) -> Vec<Value> {
    posts
        .iter()
        .map(|p| p.value("model").cloned().unwrap_or(Value::Null))
        .collect()
}

#[test]
fn registry_hooks() {
    reset();

    let err = Post::fetch_all(()).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingConfiguration);
    assert_eq!(err.message, "No db connection was registered");

    let conn = SqliteConnection::memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE post (post_id INTEGER PRIMARY KEY, title TEXT);
         INSERT INTO post (title) VALUES ('Hello');",
    )
    .unwrap();
    register_connection(Arc::new(conn));
    assert_eq!(Post::fetch_all(()).unwrap().len(), 1);

    set_crud_override(Some(Arc::new(|model: &'static str| {
        Arc::new(Canned { model }) as Arc<dyn Crud>
    })));
    assert_eq!(models(&Post::fetch_all(()).unwrap()), vec![Value::from("Post")]);

    register_crud::<Post>(Arc::new(Canned { model: "registered" }));
    assert_eq!(models(&Post::fetch_all(()).unwrap()), vec![Value::from("registered")]);
    unregister_crud::<Post>();
    assert_eq!(models(&Post::fetch_all(()).unwrap()), vec![Value::from("Post")]);

    set_crud_override(None);
    let posts = Post::fetch_all(()).unwrap();
    assert_eq!(posts[0].value("title").unwrap(), &Value::from("Hello"));

    reset();
    assert_eq!(
        Post::fetch_all(()).unwrap_err().code,
        ErrorCode::MissingConfiguration
    );
}
