//! Blog scenarios against an in-memory SQLite database.

use std::sync::Arc;

use aorm::prelude::*;
use aorm::record::register_crud;
use aorm::sqlite::SqliteConnection;
use aorm::{Connection, ErrorCode};
use pretty_assertions::assert_eq;
use serde_json::json;

const SCHEMA: &str = "
    CREATE TABLE post (
        post_id INTEGER PRIMARY KEY AUTOINCREMENT,
        author TEXT NOT NULL,
        title TEXT NOT NULL,
        text TEXT NOT NULL,
        published_at TEXT
    );
    CREATE TABLE comment (
        comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL REFERENCES post (post_id),
        author TEXT NOT NULL,
        body TEXT NOT NULL
    );
    CREATE TABLE author (
        name TEXT PRIMARY KEY,
        email TEXT NOT NULL
    );

    INSERT INTO post (author, title, text, published_at) VALUES
        ('Deniz', 'Post 1', 'Text 1 ...', '2024-01-01'),
        ('Deniz', 'Post 2', 'Text 2 ...', NULL),
        ('Someone Else', 'My Awesome Post', 'This is my awesome text!', '2024-02-01'),
        ('Another Author', 'Great Post', 'This is a great post!', '2024-03-01');

    INSERT INTO comment (post_id, author, body) VALUES
        (1, 'Someone Else', 'Nice one'),
        (1, 'Deniz', 'Thanks!'),
        (3, 'Deniz', 'Awesome indeed');

    INSERT INTO author (name, email) VALUES
        ('Deniz', 'deniz@example.com'),
        ('Someone Else', 'someone@example.com');
";

fn open_blog() -> Arc<SqliteConnection> {
    let conn = SqliteConnection::memory().expect("open in-memory database");
    conn.execute_batch(SCHEMA).expect("create schema");
    Arc::new(conn)
}

/// Defines `Post`, `Comment` and `Author` for the calling test and binds
/// them to `$conn`.
macro_rules! blog_models {
    ($conn:expr) => {
        struct Post;
        struct Comment;
        struct Author;

        impl Model for Post {
            const NAME: &'static str = "Post";

            fn create_crud() -> Arc<dyn Crud> {
                Arc::new(DbCrud::new("post", PrimaryKey::single("post_id")))
            }

            fn relations() -> RelationTable<Self> {
                RelationTable::new()
                    .with("comments", |post: &Record<Post>| {
                        let post_id = post.value("post_id")?.clone();
                        Ok(Comment::fetch_all(row! { "post_id" => post_id })?.into())
                    })
                    .with("writer", |post: &Record<Post>| {
                        let name = post.value("author")?.clone();
                        Ok(Author::fetch_one(row! { "name" => name })?.into())
                    })
            }
        }

        impl Model for Comment {
            const NAME: &'static str = "Comment";

            fn create_crud() -> Arc<dyn Crud> {
                Arc::new(DbCrud::new("comment", PrimaryKey::single("comment_id")))
            }

            fn relations() -> RelationTable<Self> {
                RelationTable::new().with("writer", |comment: &Record<Comment>| {
                    let name = comment.value("author")?.clone();
                    Ok(Author::fetch_one(row! { "name" => name })?.into())
                })
            }
        }

        impl Model for Author {
            const NAME: &'static str = "Author";

            fn create_crud() -> Arc<dyn Crud> {
                Arc::new(DbCrud::new("author", PrimaryKey::single("name")))
            }
        }

        let conn: Arc<SqliteConnection> = $conn;
        register_crud::<Post>(table_on(&conn, "post", "post_id"));
        register_crud::<Comment>(table_on(&conn, "comment", "comment_id"));
        register_crud::<Author>(table_on(&conn, "author", "name"));
    };
}

fn table_on(conn: &Arc<SqliteConnection>, table: &str, key: &str) -> Arc<dyn Crud> {
    let conn: Arc<dyn Connection> = Arc::clone(conn) as Arc<dyn Connection>;
    Arc::new(DbCrud::new(table, PrimaryKey::single(key)).with_connection(conn))
}

fn titles<M: Model>(records: &[Record<M>]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.value("title").unwrap().as_str().unwrap().to_string())
        .collect()
}

#[test]
fn fetch_all_by_author() {
    blog_models!(open_blog());

    let posts = Post::fetch_all(json!({"author": "Deniz"})).unwrap();
    assert_eq!(titles(&posts), vec!["Post 1", "Post 2"]);
    assert!(posts.iter().all(|p| !p.is_new() && !p.is_immutable()));
    assert_eq!(
        aorm::query::row_to_json(posts[0].data()),
        json!({
            "post_id": 1,
            "author": "Deniz",
            "title": "Post 1",
            "text": "Text 1 ...",
            "published_at": "2024-01-01",
        })
    );
}

#[test]
fn conditions_execute_on_sqlite() {
    blog_models!(open_blog());
    let f = Post::condition();

    let either = f.equals("author", "Someone Else").or(f.equals("author", "Another Author"));
    assert_eq!(titles(&Post::fetch_all(either).unwrap()), vec!["My Awesome Post", "Great Post"]);

    let listed = f.in_list("post_id", [2, 4]);
    assert_eq!(titles(&Post::fetch_all(listed).unwrap()), vec!["Post 2", "Great Post"]);

    let ranged = f.between("post_id", 2, 3).and(f.not_equals("author", "Deniz"));
    assert_eq!(titles(&Post::fetch_all(ranged).unwrap()), vec!["My Awesome Post"]);

    let drafts = f.is_null("published_at");
    assert_eq!(titles(&Post::fetch_all(drafts).unwrap()), vec!["Post 2"]);

    let awesome = f.like("title", "%Awesome%").and(f.is_not_null("published_at"));
    assert_eq!(titles(&Post::fetch_all(awesome).unwrap()), vec!["My Awesome Post"]);

    let raw = f.raw("LENGTH(title) > :len", row! { "len" => 6 });
    assert_eq!(
        titles(&Post::fetch_all(raw).unwrap()),
        vec!["My Awesome Post", "Great Post"]
    );
}

#[test]
fn save_inserts_then_updates() {
    blog_models!(open_blog());

    let mut post = Record::<Post>::new(row! {
        "author" => "Deniz",
        "title" => "Post 3",
        "text" => "Draft",
        "not_a_column" => "dropped",
    });
    post.save().unwrap();
    assert_eq!(post.value("post_id").unwrap(), &Value::Int(5));
    assert!(!post.is_new());

    post.set("text", "Final").unwrap();
    post.save().unwrap();
    assert_eq!(post.value("post_id").unwrap(), &Value::Int(5));

    let stored = Post::fetch_by_primary_key(5, None).unwrap();
    assert_eq!(stored.value("text").unwrap(), &Value::from("Final"));
    assert!(!stored.data().contains_key("not_a_column"));
    assert_eq!(Post::fetch_all(()).unwrap().len(), 5);
}

#[test]
fn saving_a_fetched_record_keeps_its_key() {
    blog_models!(open_blog());

    let mut post = Post::fetch_by_primary_key(3, None).unwrap();
    post.save().unwrap();
    assert_eq!(post.value("post_id").unwrap(), &Value::Int(3));
    assert!(!post.is_new());
    assert_eq!(Post::fetch_all(()).unwrap().len(), 4);

    let mut author = Author::fetch_by_primary_key("Deniz", None).unwrap();
    author.save().unwrap();
    assert_eq!(author.value("name").unwrap(), &Value::from("Deniz"));
    assert!(!author.is_new());
    assert_eq!(Author::fetch_all(()).unwrap().len(), 2);
}

#[test]
fn insert_refuses_existing_key() {
    blog_models!(open_blog());

    let mut author = Record::<Author>::new(row! { "name" => "Deniz", "email" => "x@example.com" });
    let err = author.insert().unwrap_err();
    assert_eq!(err.code, ErrorCode::UniqueConstraint);
    assert!(author.is_new());

    let mut author = Record::<Author>::new(row! { "name" => "Newcomer", "email" => "new@example.com" });
    author.insert().unwrap();
    assert_eq!(author.value("name").unwrap(), &Value::from("Newcomer"));
}

#[test]
fn delete_removes_the_row() {
    blog_models!(open_blog());

    let mut post = Post::fetch_by_primary_key(4, None).unwrap();
    post.delete().unwrap();
    assert!(post.is_deleted());

    let err = Post::fetch_by_primary_key(4, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::RecordNotFound);
    assert_eq!(Post::fetch_all(()).unwrap().len(), 3);
}

#[test]
fn nested_relations_are_resolved_from_criteria() {
    blog_models!(open_blog());

    let mut criteria = Criteria::create();
    criteria
        .add_condition(Post::condition().equals("post_id", 1))
        .unwrap()
        .add_related("comments.writer")
        .unwrap()
        .add_related("writer")
        .unwrap()
        .immutable()
        .unwrap();

    let mut post = Post::fetch_one(criteria).unwrap().unwrap();
    assert!(post.is_immutable());
    assert_eq!(
        post.data_with_relations(),
        json!({
            "post_id": 1,
            "author": "Deniz",
            "title": "Post 1",
            "text": "Text 1 ...",
            "published_at": "2024-01-01",
            "writer": {"name": "Deniz", "email": "deniz@example.com"},
            "comments": [
                {
                    "comment_id": 1,
                    "post_id": 1,
                    "author": "Someone Else",
                    "body": "Nice one",
                    "writer": {"name": "Someone Else", "email": "someone@example.com"},
                },
                {
                    "comment_id": 2,
                    "post_id": 1,
                    "author": "Deniz",
                    "body": "Thanks!",
                    "writer": {"name": "Deniz", "email": "deniz@example.com"},
                },
            ],
        })
    );

    let comments = post.related_mut("comments").unwrap();
    for comment in comments.records_mut::<Comment>() {
        assert_eq!(comment.set("body", "edited").unwrap_err().code, ErrorCode::Immutable);
    }
}

#[test]
fn lazy_relation_on_plain_fetch() {
    blog_models!(open_blog());

    let mut post = Post::fetch_by_primary_key(2, None).unwrap();
    assert!(post.get_related("comments").unwrap().is_empty());

    let mut other = Post::fetch_by_primary_key(4, None).unwrap();
    let writer = other.get("writer").unwrap().as_related().unwrap();
    assert!(writer.as_one::<Author>().is_none());
    assert!(writer.is_empty());
}
