use std::collections::HashMap;
use std::path::Path;

use crate::paths::index_key;

/// Case-insensitive set of the file paths present anywhere in the tree.
/// 樹中所有檔案路徑的索引（不分大小寫）。
///
/// Counts are kept per key so a hand-edited file listing the same path twice
/// still reports it as favorited until the last copy is removed.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    counts: HashMap<String, usize>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild<'a>(&mut self, paths: impl IntoIterator<Item = &'a Path>) {
        self.counts.clear();
        for path in paths {
            self.insert(path);
        }
    }

    pub fn insert(&mut self, path: &Path) {
        *self.counts.entry(index_key(path)).or_insert(0) += 1;
    }

    pub fn remove(&mut self, path: &Path) {
        let key = index_key(path);
        if let Some(count) = self.counts.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&key);
            }
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.counts.contains_key(&index_key(path))
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
