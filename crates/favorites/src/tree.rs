use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use thiserror::Error;

use crate::entry::{FavoriteEntry, FavoritesDocument};

static NEXT_FAVORITE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle to a node of the favorites tree.
/// 收藏樹節點的穩定識別碼。
///
/// Handles are process-unique and survive renames and moves; two nodes with
/// the same name and path are still distinct favorites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FavoriteId(u64);

impl FavoriteId {
    fn next() -> Self {
        Self(NEXT_FAVORITE_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FavoriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What a favorite points at.
/// 收藏節點的種類。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteKind {
    File { path: PathBuf },
    Folder { children: Vec<FavoriteId> },
}

/// A node stored in the favorites arena.
/// 收藏樹中的節點。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    name: String,
    kind: FavoriteKind,
}

impl Favorite {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FavoriteKind {
        &self.kind
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, FavoriteKind::Folder { .. })
    }

    /// Stored (usually base-relative) path; `None` for folders.
    pub fn path(&self) -> Option<&Path> {
        match &self.kind {
            FavoriteKind::File { path } => Some(path),
            FavoriteKind::Folder { .. } => None,
        }
    }

    /// Child handles; empty for files.
    pub fn children(&self) -> &[FavoriteId] {
        match &self.kind {
            FavoriteKind::Folder { children } => children,
            FavoriteKind::File { .. } => &[],
        }
    }
}

/// Tree-manipulation errors.
/// 收藏樹操作錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FavoritesTreeError {
    #[error("favorite {0} not found")]
    NodeNotFound(FavoriteId),
    #[error("favorite {0} cannot accept children")]
    InvalidParent(FavoriteId),
    #[error("cannot move folder {moved} into itself or its descendant {target}")]
    Cycle {
        moved: FavoriteId,
        target: FavoriteId,
    },
    #[error("favorite names cannot be empty")]
    EmptyName,
    #[error("file favorites need a path")]
    EmptyPath,
}

/// Arena-backed favorites tree.
/// 以 arena 儲存的收藏樹。
///
/// Every sibling list is kept in display order: folders first, then files,
/// each group sorted by case-insensitive name.
#[derive(Debug, Clone, Default)]
pub struct FavoritesTree {
    roots: Vec<FavoriteId>,
    nodes: HashMap<FavoriteId, Favorite>,
}

impl FavoritesTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a persisted document, dropping malformed entries
    /// and sorting every sibling list.
    /// 由文件建立收藏樹，移除格式錯誤的項目並排序。
    pub fn from_document(document: &FavoritesDocument) -> Self {
        let mut tree = Self::new();
        let roots = tree.adopt_entries(&document.items);
        tree.roots = roots;
        tree.sort_all();
        tree
    }

    /// Produces the serializable form of the tree.
    /// 轉換為可序列化的文件。
    pub fn to_document(&self) -> FavoritesDocument {
        FavoritesDocument::new(self.entries_for(&self.roots))
    }

    pub fn roots(&self) -> &[FavoriteId] {
        &self.roots
    }

    pub fn get(&self, id: FavoriteId) -> Option<&Favorite> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: FavoriteId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Children of `folder`, or the roots when `folder` is `None`.
    pub fn children(&self, folder: Option<FavoriteId>) -> &[FavoriteId] {
        match folder {
            None => &self.roots,
            Some(id) => self.get(id).map(Favorite::children).unwrap_or(&[]),
        }
    }

    /// Stored paths of every file favorite reachable from the roots.
    pub fn file_paths(&self) -> Vec<&Path> {
        let mut paths = Vec::new();
        let mut stack: Vec<FavoriteId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            match &node.kind {
                FavoriteKind::File { path } => paths.push(path.as_path()),
                FavoriteKind::Folder { children } => stack.extend(children.iter().rev()),
            }
        }
        paths
    }

    /// Inserts a new file favorite at its sorted position.
    /// 依排序位置新增檔案收藏。
    pub fn insert_file(
        &mut self,
        parent: Option<FavoriteId>,
        name: impl Into<String>,
        path: PathBuf,
    ) -> Result<FavoriteId, FavoritesTreeError> {
        if path.as_os_str().is_empty() {
            return Err(FavoritesTreeError::EmptyPath);
        }
        self.insert_node(parent, name.into(), FavoriteKind::File { path })
    }

    /// Inserts a new empty folder at its sorted position.
    /// 依排序位置新增空資料夾。
    pub fn insert_folder(
        &mut self,
        parent: Option<FavoriteId>,
        name: impl Into<String>,
    ) -> Result<FavoriteId, FavoritesTreeError> {
        self.insert_node(
            parent,
            name.into(),
            FavoriteKind::Folder {
                children: Vec::new(),
            },
        )
    }

    /// Renames a node and restores the order of its sibling list. Returns the
    /// parent folder (`None` for root-level nodes).
    /// 重新命名節點並重新排序其同層項目。
    pub fn rename(
        &mut self,
        id: FavoriteId,
        name: impl Into<String>,
    ) -> Result<Option<FavoriteId>, FavoritesTreeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FavoritesTreeError::EmptyName);
        }
        let (parent, index) = self.locate(id).ok_or(FavoritesTreeError::NodeNotFound(id))?;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = name;
        }
        // Re-seat the renamed node instead of sorting the whole list so equal
        // names keep their relative order.
        self.siblings_mut(parent)?.remove(index);
        self.place_sorted(parent, id)?;
        Ok(parent)
    }

    /// Re-parents `id` under `target` (`None` = root).
    /// 將節點移動到目標資料夾（`None` 代表根層）。
    pub fn move_to(
        &mut self,
        id: FavoriteId,
        target: Option<FavoriteId>,
    ) -> Result<(), FavoritesTreeError> {
        let (parent, index) = self.locate(id).ok_or(FavoritesTreeError::NodeNotFound(id))?;
        if let Some(target) = target {
            let node = self
                .get(target)
                .ok_or(FavoritesTreeError::NodeNotFound(target))?;
            if !node.is_folder() || self.locate(target).is_none() {
                return Err(FavoritesTreeError::InvalidParent(target));
            }
            if self.is_within(id, target) {
                return Err(FavoritesTreeError::Cycle { moved: id, target });
            }
        }
        self.siblings_mut(parent)?.remove(index);
        self.place_sorted(target, id)
    }

    /// Detaches `id` and drops its subtree. Returns the stored paths of every
    /// file favorite that was removed.
    /// 移除節點及其子樹，回傳被移除的檔案路徑。
    pub fn remove(&mut self, id: FavoriteId) -> Result<Vec<PathBuf>, FavoritesTreeError> {
        let (parent, index) = self.locate(id).ok_or(FavoritesTreeError::NodeNotFound(id))?;
        self.siblings_mut(parent)?.remove(index);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.nodes.remove(&current).map(|node| node.kind) {
                Some(FavoriteKind::File { path }) => removed.push(path),
                Some(FavoriteKind::Folder { children }) => stack.extend(children),
                None => {}
            }
        }
        Ok(removed)
    }

    /// Finds the parent and sibling index of `id` with a depth-first search.
    /// 以深度優先搜尋找出節點的父節點與索引。
    pub fn locate(&self, id: FavoriteId) -> Option<(Option<FavoriteId>, usize)> {
        if let Some(index) = self.roots.iter().position(|root| *root == id) {
            return Some((None, index));
        }
        let mut stack: Vec<FavoriteId> = self.roots.clone();
        while let Some(current) = stack.pop() {
            let children = self.children(Some(current));
            if let Some(index) = children.iter().position(|child| *child == id) {
                return Some((Some(current), index));
            }
            stack.extend(children.iter().copied());
        }
        None
    }

    /// Returns `true` when `candidate` is `ancestor` or lies beneath it.
    pub fn is_within(&self, ancestor: FavoriteId, candidate: FavoriteId) -> bool {
        let mut stack = vec![ancestor];
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            stack.extend(self.children(Some(current)).iter().copied());
        }
        false
    }

    /// Resolves a display path such as `["Utils", "readme.txt"]`, comparing
    /// names case-insensitively.
    /// 依顯示名稱路徑尋找節點（不分大小寫）。
    pub fn find_by_names<S: AsRef<str>>(&self, names: &[S]) -> Option<FavoriteId> {
        let mut parent = None;
        let mut found = None;
        for name in names {
            let name = name.as_ref();
            let id = self.children(parent).iter().copied().find(|child| {
                self.get(*child)
                    .is_some_and(|node| compare_names(&node.name, name) == Ordering::Equal)
            })?;
            found = Some(id);
            parent = Some(id);
        }
        found
    }

    /// Stable sort of every sibling list by (kind, case-insensitive name).
    /// 依（種類、名稱）穩定排序所有同層項目。
    pub fn sort_all(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        self.sort_ids(&mut roots);
        self.roots = roots;

        let folders: Vec<FavoriteId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.is_folder())
            .map(|(id, _)| *id)
            .collect();
        for folder in folders {
            let mut children = match self.nodes.get_mut(&folder).map(|node| &mut node.kind) {
                Some(FavoriteKind::Folder { children }) => std::mem::take(children),
                _ => continue,
            };
            self.sort_ids(&mut children);
            if let Some(FavoriteKind::Folder { children: slot }) =
                self.nodes.get_mut(&folder).map(|node| &mut node.kind)
            {
                *slot = children;
            }
        }
    }

    fn sort_ids(&self, ids: &mut [FavoriteId]) {
        ids.sort_by(|a, b| match (self.get(*a), self.get(*b)) {
            (Some(a), Some(b)) => display_order(a, b),
            _ => Ordering::Equal,
        });
    }

    fn insert_node(
        &mut self,
        parent: Option<FavoriteId>,
        name: String,
        kind: FavoriteKind,
    ) -> Result<FavoriteId, FavoritesTreeError> {
        if name.trim().is_empty() {
            return Err(FavoritesTreeError::EmptyName);
        }
        if let Some(parent) = parent {
            let node = self
                .get(parent)
                .ok_or(FavoritesTreeError::NodeNotFound(parent))?;
            if !node.is_folder() {
                return Err(FavoritesTreeError::InvalidParent(parent));
            }
        }
        let id = FavoriteId::next();
        self.nodes.insert(id, Favorite { name, kind });
        if let Err(err) = self.place_sorted(parent, id) {
            self.nodes.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Linear scan: insert before the first sibling that sorts strictly after
    /// `id`, otherwise append.
    fn place_sorted(
        &mut self,
        parent: Option<FavoriteId>,
        id: FavoriteId,
    ) -> Result<(), FavoritesTreeError> {
        let node = self.get(id).ok_or(FavoritesTreeError::NodeNotFound(id))?;
        let position = self
            .children(parent)
            .iter()
            .position(|sibling| {
                self.get(*sibling)
                    .is_some_and(|sibling| display_order(node, sibling) == Ordering::Less)
            })
            .unwrap_or_else(|| self.children(parent).len());
        self.siblings_mut(parent)?.insert(position, id);
        Ok(())
    }

    fn siblings_mut(
        &mut self,
        parent: Option<FavoriteId>,
    ) -> Result<&mut Vec<FavoriteId>, FavoritesTreeError> {
        let Some(parent) = parent else {
            return Ok(&mut self.roots);
        };
        match self.nodes.get_mut(&parent).map(|node| &mut node.kind) {
            Some(FavoriteKind::Folder { children }) => Ok(children),
            Some(FavoriteKind::File { .. }) => Err(FavoritesTreeError::InvalidParent(parent)),
            None => Err(FavoritesTreeError::NodeNotFound(parent)),
        }
    }

    fn adopt_entries(&mut self, entries: &[FavoriteEntry]) -> Vec<FavoriteId> {
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(id) = self.adopt_entry(entry) {
                ids.push(id);
            }
        }
        ids
    }

    fn adopt_entry(&mut self, entry: &FavoriteEntry) -> Option<FavoriteId> {
        let kind = match (&entry.children, &entry.path) {
            (Some(children), _) => FavoriteKind::Folder {
                children: self.adopt_entries(children),
            },
            (None, Some(path)) if !path.as_os_str().is_empty() => {
                FavoriteKind::File { path: path.clone() }
            }
            (None, _) => {
                tracing::warn!(name = %entry.name, "dropping favorite without path or children");
                return None;
            }
        };

        let name = if entry.name.trim().is_empty() {
            match &kind {
                FavoriteKind::File { path } => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned()),
                FavoriteKind::Folder { children } => {
                    tracing::warn!(
                        children = children.len(),
                        "dropping favorite folder without a name"
                    );
                    for child in children.iter().copied() {
                        self.drop_subtree(child);
                    }
                    return None;
                }
            }
        } else {
            entry.name.clone()
        };

        let id = FavoriteId::next();
        self.nodes.insert(id, Favorite { name, kind });
        Some(id)
    }

    fn drop_subtree(&mut self, id: FavoriteId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(FavoriteKind::Folder { children }) =
                self.nodes.remove(&current).map(|node| node.kind)
            {
                stack.extend(children);
            }
        }
    }

    fn entries_for(&self, ids: &[FavoriteId]) -> Vec<FavoriteEntry> {
        ids.iter()
            .filter_map(|id| self.get(*id))
            .map(|node| match &node.kind {
                FavoriteKind::File { path } => FavoriteEntry::file(node.name.clone(), path.clone()),
                FavoriteKind::Folder { children } => {
                    FavoriteEntry::folder(node.name.clone(), self.entries_for(children))
                }
            })
            .collect()
    }
}

/// Folders before files, then case-insensitive name order.
pub fn display_order(a: &Favorite, b: &Favorite) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| compare_names(&a.name, &b.name))
}

/// Case-insensitive name comparison.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &FavoritesTree, parent: Option<FavoriteId>) -> Vec<String> {
        tree.children(parent)
            .iter()
            .map(|id| tree.get(*id).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn inserts_keep_folders_first_and_names_sorted() {
        let mut tree = FavoritesTree::new();
        tree.insert_file(None, "zeta.rs", "zeta.rs".into()).unwrap();
        tree.insert_folder(None, "beta").unwrap();
        tree.insert_file(None, "Alpha.rs", "Alpha.rs".into()).unwrap();
        tree.insert_folder(None, "Alpha").unwrap();

        assert_eq!(names(&tree, None), ["Alpha", "beta", "Alpha.rs", "zeta.rs"]);
    }

    #[test]
    fn equal_names_are_appended_after_existing_ones() {
        let mut tree = FavoritesTree::new();
        let first = tree.insert_file(None, "a.txt", "one/a.txt".into()).unwrap();
        let second = tree.insert_file(None, "A.TXT", "two/a.txt".into()).unwrap();
        assert_eq!(tree.roots(), [first, second]);
    }

    #[test]
    fn insert_under_file_is_rejected() {
        let mut tree = FavoritesTree::new();
        let file = tree.insert_file(None, "a.txt", "a.txt".into()).unwrap();
        assert_eq!(
            tree.insert_folder(Some(file), "nested"),
            Err(FavoritesTreeError::InvalidParent(file))
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut tree = FavoritesTree::new();
        assert_eq!(
            tree.insert_folder(None, "  "),
            Err(FavoritesTreeError::EmptyName)
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn rename_resorts_siblings() {
        let mut tree = FavoritesTree::new();
        let a = tree.insert_folder(None, "a").unwrap();
        tree.insert_folder(None, "m").unwrap();
        tree.rename(a, "z").unwrap();
        assert_eq!(names(&tree, None), ["m", "z"]);
    }

    #[test]
    fn move_rejects_cycles() {
        let mut tree = FavoritesTree::new();
        let outer = tree.insert_folder(None, "outer").unwrap();
        let inner = tree.insert_folder(Some(outer), "inner").unwrap();

        assert_eq!(
            tree.move_to(outer, Some(outer)),
            Err(FavoritesTreeError::Cycle {
                moved: outer,
                target: outer
            })
        );
        assert_eq!(
            tree.move_to(outer, Some(inner)),
            Err(FavoritesTreeError::Cycle {
                moved: outer,
                target: inner
            })
        );
        assert_eq!(tree.roots(), [outer]);
        assert_eq!(tree.children(Some(outer)), [inner]);
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let mut tree = FavoritesTree::new();
        let folder = tree.insert_folder(None, "docs").unwrap();
        let nested = tree.insert_folder(Some(folder), "nested").unwrap();
        tree.insert_file(Some(folder), "a.md", "docs/a.md".into())
            .unwrap();
        tree.insert_file(Some(nested), "b.md", "docs/b.md".into())
            .unwrap();
        let keep = tree.insert_file(None, "c.md", "c.md".into()).unwrap();

        let mut removed = tree.remove(folder).unwrap();
        removed.sort();
        assert_eq!(
            removed,
            [PathBuf::from("docs/a.md"), PathBuf::from("docs/b.md")]
        );
        assert_eq!(tree.roots(), [keep]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn from_document_sorts_and_sanitizes() {
        let document = FavoritesDocument::new(vec![
            FavoriteEntry::file("b.txt", "b.txt"),
            FavoriteEntry::file("", "docs/guide.md"),
            FavoriteEntry {
                name: "broken".into(),
                path: None,
                children: None,
            },
            FavoriteEntry::folder(
                "Zed",
                vec![
                    FavoriteEntry::file("y", "y"),
                    FavoriteEntry::folder("x", Vec::new()),
                ],
            ),
        ]);

        let tree = FavoritesTree::from_document(&document);
        assert_eq!(names(&tree, None), ["Zed", "b.txt", "guide.md"]);
        let zed = tree.find_by_names(&["zed"]).unwrap();
        assert_eq!(names(&tree, Some(zed)), ["x", "y"]);
        assert_eq!(tree.to_document().items[0].children.as_ref().unwrap().len(), 2);
    }
}
