//! In-memory storage and blog models shared by the unit tests.

use std::sync::atomic::{AtomicI64, Ordering};

use aorm_query::{
    Condition, ConditionKind, Criteria, Crud, KeyValue, Operator, PrimaryKey, QueryError,
    QueryResult, Row, Value,
};
use parking_lot::Mutex;

/// A [`Crud`] over a vector of rows. Understands equality conditions joined
/// by AND / OR, which is all the tests filter with.
pub(crate) struct MemoryCrud {
    primary_key: PrimaryKey,
    rows: Mutex<Vec<Row>>,
    next_id: AtomicI64,
}

impl MemoryCrud {
    pub(crate) fn new(primary_key: PrimaryKey) -> Self {
        Self {
            primary_key,
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn position(&self, rows: &[Row], row: &Row) -> Option<usize> {
        let key = self.primary_key.value_of(row).ok()?;
        rows.iter()
            .position(|r| self.primary_key.value_of(r).ok().as_ref() == Some(&key))
    }

    fn with_key(&self, row: &Row) -> Row {
        let mut row = row.clone();
        if let PrimaryKey::Single(column) = &self.primary_key {
            if !self.primary_key.is_set_in(&row) {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                row.insert(column.clone(), Value::Int(id));
            }
        }
        row
    }
}

fn matches(condition: &Condition, row: &Row) -> bool {
    match condition {
        Condition::Simple(simple) => match simple.kind() {
            ConditionKind::Equals => row.get(simple.field()) == simple.value(),
            other => panic!("MemoryCrud cannot evaluate {}", other),
        },
        Condition::Composite(composite) => match composite.operator() {
            Operator::And => composite.children().iter().all(|c| matches(c, row)),
            Operator::Or => composite.children().iter().any(|c| matches(c, row)),
        },
    }
}

impl Crud for MemoryCrud {
    fn primary_key(&self) -> PrimaryKey {
        self.primary_key.clone()
    }

    fn fetch_one(&self, criteria: &Criteria) -> QueryResult<Option<Row>> {
        Ok(self.fetch_all(criteria)?.into_iter().next())
    }

    fn fetch_all(&self, criteria: &Criteria) -> QueryResult<Vec<Row>> {
        let rows = self.rows.lock();
        Ok(rows
            .iter()
            .filter(|row| criteria.condition().is_none_or(|c| matches(c, row)))
            .cloned()
            .collect())
    }

    fn save(&self, row: &Row) -> QueryResult<KeyValue> {
        let row = self.with_key(row);
        let mut rows = self.rows.lock();
        match self.position(&rows, &row) {
            Some(index) => rows[index] = row.clone(),
            None => rows.push(row.clone()),
        }
        self.primary_key.value_of(&row)
    }

    fn insert(&self, row: &Row) -> QueryResult<KeyValue> {
        let row = self.with_key(row);
        let mut rows = self.rows.lock();
        if self.position(&rows, &row).is_some() {
            return Err(QueryError::unique_violation("memory", self.primary_key.to_string()));
        }
        rows.push(row.clone());
        self.primary_key.value_of(&row)
    }

    fn delete(&self, key: &KeyValue) -> QueryResult<()> {
        let key = key.to_row(&self.primary_key)?;
        self.rows
            .lock()
            .retain(|row| !key.iter().all(|(column, value)| row.get(column) == Some(value)));
        Ok(())
    }
}

/// Defines `Post`, `Comment` and `Author` models backed by fresh
/// [`MemoryCrud`]s, plus a `COMMENT_LOADS` counter of `Post.comments` loads.
///
/// Invoke inside a test function so each test gets its own model types, and
/// with them its own registry entries.
macro_rules! blog_models {
    () => {
        #[allow(unused_imports)]
        use std::sync::Arc;
        #[allow(unused_imports)]
        use std::sync::atomic::{AtomicUsize, Ordering as LoadOrdering};

        #[allow(unused_imports)]
        use aorm_query::{Crud, PrimaryKey, row};

        #[allow(unused_imports)]
        use $crate::testing::MemoryCrud;
        #[allow(unused_imports)]
        use $crate::{Model, Record, RelationTable};

        #[allow(dead_code)]
        static COMMENT_LOADS: AtomicUsize = AtomicUsize::new(0);

        struct Post;
        struct Comment;
        struct Author;

        impl Model for Post {
            const NAME: &'static str = "Post";

            fn create_crud() -> Arc<dyn Crud> {
                Arc::new(MemoryCrud::new(PrimaryKey::single("post_id")))
            }

            fn relations() -> RelationTable<Self> {
                RelationTable::new()
                    .with("comments", |post: &Record<Post>| {
                        COMMENT_LOADS.fetch_add(1, LoadOrdering::SeqCst);
                        let post_id = post.value("post_id")?.clone();
                        Ok(Comment::fetch_all(row! { "post_id" => post_id })?.into())
                    })
                    .with("author", |post: &Record<Post>| {
                        let name = post.value("author")?.clone();
                        Ok(Author::fetch_one(row! { "name" => name })?.into())
                    })
            }
        }

        impl Model for Comment {
            const NAME: &'static str = "Comment";

            fn create_crud() -> Arc<dyn Crud> {
                Arc::new(MemoryCrud::new(PrimaryKey::single("comment_id")))
            }

            fn relations() -> RelationTable<Self> {
                RelationTable::new().with("author", |comment: &Record<Comment>| {
                    let name = comment.value("author")?.clone();
                    Ok(Author::fetch_one(row! { "name" => name })?.into())
                })
            }
        }

        impl Model for Author {
            const NAME: &'static str = "Author";

            fn create_crud() -> Arc<dyn Crud> {
                Arc::new(MemoryCrud::new(PrimaryKey::single("name")))
            }
        }

        #[allow(dead_code)]
        fn seed_blog() {
            let posts = Post::crud();
            posts.save(&row! { "post_id" => 1, "author" => "Deniz", "title" => "First" }).unwrap();
            posts.save(&row! { "post_id" => 2, "author" => "Deniz", "title" => "Second" }).unwrap();
            posts.save(&row! { "post_id" => 3, "author" => "Other", "title" => "Third" }).unwrap();

            let comments = Comment::crud();
            comments.save(&row! { "comment_id" => 10, "post_id" => 1, "author" => "Other" }).unwrap();
            comments.save(&row! { "comment_id" => 11, "post_id" => 1, "author" => "Deniz" }).unwrap();
            comments.save(&row! { "comment_id" => 12, "post_id" => 2, "author" => "Ghost" }).unwrap();

            let authors = Author::crud();
            authors.save(&row! { "name" => "Deniz", "email" => "deniz@example.com" }).unwrap();
            authors.save(&row! { "name" => "Other", "email" => "other@example.com" }).unwrap();
        }
    };
}

pub(crate) use blog_models;
