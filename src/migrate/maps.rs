//! In-memory identity maps for one migration run.
//!
//! The maps translate source ids to target ids and live only for the run;
//! restarts rebuild them through the natural-key lookups in the target
//! store.

use std::collections::HashMap;

/// Source-id to target-id map. First mapping wins.
#[derive(Debug, Default)]
pub struct IdentityMap {
    inner: HashMap<i64, i64>,
}

impl IdentityMap {
    /// Record a mapping unless the source id is already mapped.
    pub fn insert_once(&mut self, source_id: i64, target_id: i64) {
        self.inner.entry(source_id).or_insert(target_id);
    }

    pub fn get(&self, source_id: i64) -> Option<i64> {
        self.inner.get(&source_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// One map per entity family. Terms share a map across categories and tags
/// because source term ids are unique across taxonomies; the same holds for
/// posts and pages in the content table.
#[derive(Debug, Default)]
pub struct IdentityMaps {
    pub users: IdentityMap,
    pub terms: IdentityMap,
    pub contents: IdentityMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mapping_wins() {
        let mut map = IdentityMap::default();
        map.insert_once(5, 100);
        map.insert_once(5, 200);
        assert_eq!(map.get(5), Some(100));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_missing_id() {
        let map = IdentityMap::default();
        assert_eq!(map.get(1), None);
        assert!(map.is_empty());
    }
}
