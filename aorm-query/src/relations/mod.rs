//! Relation requests attached to a [`Criteria`](crate::Criteria).

mod tree;

pub use tree::{RelationNode, RelationTree};

/// Anything `Criteria::add_related` accepts: a name, a dotted path, or a tree.
#[derive(Debug, Clone)]
pub struct RelationRequest(pub(crate) RelationTree);

impl From<&str> for RelationRequest {
    fn from(path: &str) -> Self {
        Self(RelationTree::from_path(path))
    }
}

impl From<String> for RelationRequest {
    fn from(path: String) -> Self {
        Self(RelationTree::from_path(&path))
    }
}

impl From<RelationTree> for RelationRequest {
    fn from(tree: RelationTree) -> Self {
        Self(tree)
    }
}

impl From<&RelationTree> for RelationRequest {
    fn from(tree: &RelationTree) -> Self {
        Self(tree.clone())
    }
}
