//! Placeholder name allocation for one rendered statement.

use std::collections::{HashMap, HashSet};

/// Hands out placeholder names that are unique within a statement.
///
/// The first single-value predicate on a field gets the bare field name.
/// Multi-value predicates and later predicates on the same field get
/// `field__1`, `field__2`, … from a per-field counter, skipping names that are
/// already taken.
#[derive(Debug, Default)]
pub(crate) struct ParamNamer {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl ParamNamer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark a caller-chosen name (from a raw predicate) as taken.
    pub(crate) fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    /// Name for a predicate binding one value.
    pub(crate) fn single(&mut self, field: &str) -> String {
        let base = placeholder_base(field);
        if self.used.insert(base.clone()) {
            return base;
        }
        self.suffixed(&base)
    }

    /// Names for a predicate binding `count` values.
    pub(crate) fn many(&mut self, field: &str, count: usize) -> Vec<String> {
        let base = placeholder_base(field);
        (0..count).map(|_| self.suffixed(&base)).collect()
    }

    fn suffixed(&mut self, base: &str) -> String {
        loop {
            let counter = self.next_suffix.entry(base.to_string()).or_insert(1);
            let name = format!("{}__{}", base, counter);
            *counter += 1;
            if self.used.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Placeholder base for a field: characters that cannot appear in a named
/// placeholder (e.g. the dot of `p.author`) become underscores.
pub(crate) fn placeholder_base(field: &str) -> String {
    field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
