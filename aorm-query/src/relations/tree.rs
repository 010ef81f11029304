//! Relation-request trees: which relations to resolve on a fetch, and how deep.

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::error::{QueryError, QueryResult};

/// One entry of a [`RelationTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationNode {
    /// Resolve the relation, but nothing below it.
    Include,
    /// Resolve the relation, then the nested relations on every related record.
    Nested(RelationTree),
}

impl RelationNode {
    /// The nested tree, if any.
    pub fn nested(&self) -> Option<&RelationTree> {
        match self {
            Self::Include => None,
            Self::Nested(tree) => Some(tree),
        }
    }

    fn merge(&mut self, other: &RelationNode) {
        let RelationNode::Nested(theirs) = other else {
            return;
        };
        match self {
            RelationNode::Include => *self = RelationNode::Nested(theirs.clone()),
            RelationNode::Nested(mine) => mine.merge(theirs),
        }
    }
}

/// Ordered mapping of relation name to [`RelationNode`].
///
/// ```rust
/// use aorm_query::RelationTree;
///
/// let mut tree = RelationTree::from_path("comments.author");
/// tree.merge(&RelationTree::from_path("comments"));
///
/// // a bare request never truncates a deeper one
/// assert!(tree.get("comments").unwrap().nested().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTree {
    nodes: IndexMap<String, RelationNode>,
}

impl RelationTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree requesting one relation.
    pub fn include(name: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.nodes.insert(name.into(), RelationNode::Include);
        tree
    }

    /// A tree from a dotted path: `"a.b"` requests `a`, and `b` on every `a`.
    pub fn from_path(path: &str) -> Self {
        let mut segments = path.split('.').filter(|s| !s.is_empty()).rev();
        let Some(last) = segments.next() else {
            return Self::new();
        };
        segments.fold(Self::include(last), |inner, name| {
            let mut tree = Self::new();
            tree.nodes.insert(name.to_string(), RelationNode::Nested(inner));
            tree
        })
    }

    /// Add one entry, merging with an existing entry of the same name.
    pub fn insert(&mut self, name: impl Into<String>, node: RelationNode) {
        let name = name.into();
        match self.nodes.get_mut(&name) {
            Some(existing) => existing.merge(&node),
            None => {
                self.nodes.insert(name, node);
            }
        }
    }

    /// Merge `other` into this tree.
    ///
    /// A bare inclusion never overwrites an existing entry. A nested request
    /// upgrades a bare entry and merges into an existing nested one.
    pub fn merge(&mut self, other: &RelationTree) {
        for (name, node) in &other.nodes {
            self.insert(name.clone(), node.clone());
        }
    }

    /// Look up an entry.
    pub fn get(&self, name: &str) -> Option<&RelationNode> {
        self.nodes.get(name)
    }

    /// Iterate entries in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RelationNode)> {
        self.nodes.iter()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// JSON form: bare entries are `1`, nested entries are objects.
    pub fn to_json(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .nodes
            .iter()
            .map(|(name, node)| {
                let value = match node {
                    RelationNode::Include => JsonValue::from(1),
                    RelationNode::Nested(tree) => tree.to_json(),
                };
                (name.clone(), value)
            })
            .collect();
        JsonValue::Object(map)
    }

    /// Parse the JSON form. Objects nest; any other value is a bare entry.
    pub fn from_json(value: &JsonValue) -> QueryResult<Self> {
        let JsonValue::Object(map) = value else {
            return Err(QueryError::invalid_criteria(
                "relation map must be a JSON object",
            ));
        };
        let mut tree = Self::new();
        for (name, value) in map {
            let node = match value {
                JsonValue::Object(_) => RelationNode::Nested(Self::from_json(value)?),
                _ => RelationNode::Include,
            };
            tree.insert(name.clone(), node);
        }
        Ok(tree)
    }
}

impl From<&str> for RelationTree {
    fn from(path: &str) -> Self {
        Self::from_path(path)
    }
}

impl<'a> IntoIterator for &'a RelationTree {
    type Item = (&'a String, &'a RelationNode);
    type IntoIter = indexmap::map::Iter<'a, String, RelationNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
