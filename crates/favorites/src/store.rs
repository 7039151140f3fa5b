use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};

use crate::config::FavoritesConfig;
use crate::entry::FavoritesDocument;
use crate::events::{Listeners, StoreEvent, SubscriptionId};
use crate::file::FavoritesFile;
use crate::index::PathIndex;
use crate::paths::{to_absolute, to_relative};
use crate::tree::{Favorite, FavoriteId, FavoritesTree, FavoritesTreeError};

/// Answers "which workspace is open right now?" for the store.
/// 提供目前開啟中工作區的標記檔路徑。
///
/// The returned path is the workspace marker file (solution/project file);
/// favorites are stored beside it.
pub trait WorkspaceProvider {
    fn current_workspace(&self) -> Option<PathBuf>;
}

impl<F> WorkspaceProvider for F
where
    F: Fn() -> Option<PathBuf>,
{
    fn current_workspace(&self) -> Option<PathBuf> {
        self()
    }
}

/// Result of adding a file favorite.
/// 新增檔案收藏的結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added(FavoriteId),
    /// The path is already favorited somewhere in the tree.
    AlreadyFavorited,
    /// No workspace is open, or the target folder is gone.
    Unavailable,
}

impl AddOutcome {
    pub fn id(&self) -> Option<FavoriteId> {
        match self {
            AddOutcome::Added(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct WorkspaceContext {
    base_dir: PathBuf,
    file: FavoritesFile,
}

/// Owns the favorites tree of the active workspace and keeps it persisted.
/// 管理目前工作區的收藏樹並負責保存。
///
/// Mutations never fail loudly: missing nodes, duplicate paths and invalid
/// moves are no-ops, and persistence problems are logged and swallowed.
/// Every successful mutation is saved immediately and announced to the
/// content listeners with the narrowest affected folder (`None` means the
/// whole tree must be re-read).
///
/// An owned store calls listeners inline. Inside a
/// [`SharedFavoritesStore`](crate::SharedFavoritesStore) events are queued
/// and delivered once the mutation has released the store, so listeners may
/// read it back.
pub struct FavoritesStore {
    config: FavoritesConfig,
    provider: Option<Box<dyn WorkspaceProvider>>,
    context: Option<WorkspaceContext>,
    tree: FavoritesTree,
    index: PathIndex,
    visible: bool,
    next_subscription: u64,
    listeners: Listeners,
    deferred: bool,
    pending: Vec<StoreEvent>,
    /// Listeners currently handed out for delivery.
    checked_out: Option<Vec<SubscriptionId>>,
    revoked: Vec<SubscriptionId>,
}

impl fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FavoritesStore")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("tree", &self.tree)
            .field("visible", &self.visible)
            .field("listeners", &self.listeners)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Default for FavoritesStore {
    fn default() -> Self {
        Self::new(FavoritesConfig::default())
    }
}

impl FavoritesStore {
    pub fn new(config: FavoritesConfig) -> Self {
        let visible = config.visible;
        Self {
            config,
            provider: None,
            context: None,
            tree: FavoritesTree::new(),
            index: PathIndex::new(),
            visible,
            next_subscription: 1,
            listeners: Listeners::default(),
            deferred: false,
            pending: Vec::new(),
            checked_out: None,
            revoked: Vec::new(),
        }
    }

    /// Attaches the provider consulted when a mutation runs before any
    /// workspace was loaded.
    /// 設定在尚未載入工作區時用來解析工作區的提供者。
    pub fn with_provider(mut self, provider: impl WorkspaceProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Wraps the store for shared ownership.
    /// 包裝為可共用的收藏庫。
    pub fn shared(self) -> crate::SharedFavoritesStore {
        crate::SharedFavoritesStore::new(self)
    }

    pub fn config(&self) -> &FavoritesConfig {
        &self.config
    }

    /// Loads the favorites stored beside `workspace_marker`.
    /// 載入工作區標記檔旁的收藏檔案。
    ///
    /// A missing, unreadable or malformed file yields an empty tree. Content
    /// listeners are always notified.
    pub fn load(&mut self, workspace_marker: impl AsRef<Path>) {
        let marker = workspace_marker.as_ref();
        let base_dir = marker
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file = FavoritesFile::in_directory(&base_dir, &self.config);

        let document = match file.load() {
            Ok(Some(document)) => document,
            Ok(None) => FavoritesDocument::default(),
            Err(err) => {
                tracing::warn!(error = %err, "falling back to empty favorites");
                FavoritesDocument::default()
            }
        };

        self.tree = FavoritesTree::from_document(&document);
        self.index.rebuild(self.tree.file_paths());
        tracing::debug!(
            base_dir = %base_dir.display(),
            favorites = self.tree.len(),
            "loaded favorites"
        );
        self.context = Some(WorkspaceContext { base_dir, file });
        self.emit(StoreEvent::ContentChanged { folder: None });
    }

    /// Forgets the active workspace and its tree.
    /// 清除目前的工作區與收藏樹。
    pub fn clear(&mut self) {
        self.context = None;
        self.tree = FavoritesTree::new();
        self.index.clear();
        tracing::debug!("cleared favorites context");
        self.emit(StoreEvent::ContentChanged { folder: None });
    }

    pub fn is_loaded(&self) -> bool {
        self.context.is_some()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.context.as_ref().map(|context| context.base_dir.as_path())
    }

    /// Location of the favorites file for the active workspace.
    pub fn storage_path(&self) -> Option<&Path> {
        self.context.as_ref().map(|context| context.file.path())
    }

    /// Favorites `absolute_path` at the root.
    /// 將檔案加入根層收藏。
    pub fn add_file(&mut self, absolute_path: impl AsRef<Path>) -> AddOutcome {
        self.add_file_under(None, absolute_path.as_ref())
    }

    /// Favorites `absolute_path` inside `folder`. Duplicates are detected
    /// against the whole tree, not only `folder`.
    /// 將檔案加入指定資料夾；重複檢查涵蓋整棵樹。
    pub fn add_file_to_folder(
        &mut self,
        absolute_path: impl AsRef<Path>,
        folder: FavoriteId,
    ) -> AddOutcome {
        self.add_file_under(Some(folder), absolute_path.as_ref())
    }

    pub fn create_folder(&mut self, name: &str) -> Option<FavoriteId> {
        self.create_folder_under(None, name)
    }

    pub fn create_folder_in(&mut self, name: &str, parent: FavoriteId) -> Option<FavoriteId> {
        self.create_folder_under(Some(parent), name)
    }

    /// Renames an entry and re-sorts its siblings.
    /// 重新命名項目並重新排序同層項目。
    pub fn rename(&mut self, id: FavoriteId, name: &str) -> bool {
        if !self.ensure_context() {
            return false;
        }
        match self.tree.rename(id, name) {
            Ok(parent) => {
                self.commit(parent);
                true
            }
            Err(err) => ignored("rename", err),
        }
    }

    /// Moves an entry under `target` (`None` = root). Moving a folder into
    /// itself or one of its descendants is ignored.
    /// 移動項目；不允許將資料夾移入自身或其子孫。
    pub fn move_item(&mut self, id: FavoriteId, target: Option<FavoriteId>) -> bool {
        if !self.ensure_context() {
            return false;
        }
        match self.tree.move_to(id, target) {
            Ok(()) => {
                self.commit(None);
                true
            }
            Err(err) => ignored("move", err),
        }
    }

    /// Removes an entry wherever it lives, together with its descendants.
    /// 移除項目（含所有子項目）。
    pub fn remove(&mut self, id: FavoriteId) -> bool {
        if !self.ensure_context() {
            return false;
        }
        match self.tree.remove(id) {
            Ok(removed_paths) => {
                for path in &removed_paths {
                    self.index.remove(path);
                }
                self.commit(None);
                true
            }
            Err(err) => ignored("remove", err),
        }
    }

    pub fn root_items(&self) -> &[FavoriteId] {
        self.tree.roots()
    }

    /// Children of `folder`; empty for files and unknown handles.
    pub fn folder_items(&self, folder: FavoriteId) -> &[FavoriteId] {
        self.tree.children(Some(folder))
    }

    pub fn entry(&self, id: FavoriteId) -> Option<&Favorite> {
        self.tree.get(id)
    }

    /// Absolute location of a file favorite.
    /// 取得檔案收藏的絕對路徑。
    pub fn absolute_path(&self, id: FavoriteId) -> Option<PathBuf> {
        let stored = self.tree.get(id)?.path()?;
        Some(to_absolute(self.base_dir(), stored))
    }

    pub fn is_favorited(&self, absolute_path: impl AsRef<Path>) -> bool {
        let relative = to_relative(self.base_dir(), absolute_path.as_ref());
        self.index.contains(&relative)
    }

    pub fn has_favorites(&self) -> bool {
        !self.tree.is_empty()
    }

    /// Resolves a display path such as `["Utils", "readme.txt"]`.
    pub fn find_by_names<S: AsRef<str>>(&self, names: &[S]) -> Option<FavoriteId> {
        self.tree.find_by_names(names)
    }

    pub fn tree(&self) -> &FavoritesTree {
        &self.tree
    }

    pub fn path_index(&self) -> &PathIndex {
        &self.index
    }

    /// Snapshot of the tree in its persisted form.
    pub fn document(&self) -> FavoritesDocument {
        self.tree.to_document()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Updates the visibility flag; listeners only hear about real changes.
    /// 更新可見狀態；僅在值改變時通知。
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.emit(StoreEvent::VisibilityChanged { visible });
    }

    pub fn subscribe_content_changed(
        &mut self,
        listener: impl FnMut(Option<FavoriteId>) + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription_id();
        self.listeners.add_content(id, Box::new(listener));
        id
    }

    pub fn subscribe_visibility_changed(
        &mut self,
        listener: impl FnMut(bool) + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription_id();
        self.listeners.add_visibility(id, Box::new(listener));
        id
    }

    /// Drops a listener registered through either `subscribe_*` method.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        if self.listeners.remove(subscription) {
            return true;
        }
        let Some(out) = self.checked_out.as_mut() else {
            return false;
        };
        match out.iter().position(|id| *id == subscription) {
            Some(at) => {
                out.swap_remove(at);
                self.revoked.push(subscription);
                true
            }
            None => false,
        }
    }

    fn next_subscription_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }

    fn add_file_under(&mut self, folder: Option<FavoriteId>, absolute_path: &Path) -> AddOutcome {
        if !self.ensure_context() {
            return AddOutcome::Unavailable;
        }
        let relative = to_relative(self.base_dir(), absolute_path);
        if self.index.contains(&relative) {
            tracing::debug!(path = %relative.display(), "file is already a favorite");
            return AddOutcome::AlreadyFavorited;
        }
        let name = relative
            .file_name()
            .unwrap_or(relative.as_os_str())
            .to_string_lossy()
            .into_owned();

        match self.tree.insert_file(folder, name, relative.clone()) {
            Ok(id) => {
                self.index.insert(&relative);
                self.commit(folder);
                AddOutcome::Added(id)
            }
            Err(err) => {
                ignored("add file", err);
                AddOutcome::Unavailable
            }
        }
    }

    fn create_folder_under(&mut self, parent: Option<FavoriteId>, name: &str) -> Option<FavoriteId> {
        if !self.ensure_context() {
            return None;
        }
        match self.tree.insert_folder(parent, name.trim()) {
            Ok(id) => {
                self.commit(parent);
                Some(id)
            }
            Err(err) => {
                ignored("create folder", err);
                None
            }
        }
    }

    /// Loads the provider's current workspace if nothing is loaded yet.
    fn ensure_context(&mut self) -> bool {
        if self.context.is_some() {
            return true;
        }
        let marker = self
            .provider
            .as_ref()
            .and_then(|provider| provider.current_workspace());
        match marker {
            Some(marker) => {
                self.load(marker);
                true
            }
            None => {
                tracing::debug!("no workspace open; ignoring favorites change");
                false
            }
        }
    }

    fn commit(&mut self, affected: Option<FavoriteId>) {
        self.save();
        self.emit(StoreEvent::ContentChanged { folder: affected });
    }

    fn save(&self) {
        let Some(context) = &self.context else {
            return;
        };
        if let Err(err) = context.file.save(&self.tree.to_document()) {
            tracing::warn!(error = %err, "failed to save favorites");
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        if self.deferred {
            self.pending.push(event);
        } else {
            self.listeners.dispatch(event);
        }
    }

    /// Switches to queued delivery; the owner drains the queue through
    /// [`take_pending`](Self::take_pending).
    pub(crate) fn defer_events(&mut self) {
        self.deferred = true;
    }

    /// Hands out queued events together with the listeners that should hear
    /// them. `None` while nothing is queued or a delivery is in progress.
    pub(crate) fn take_pending(&mut self) -> Option<(Vec<StoreEvent>, Listeners)> {
        if self.pending.is_empty() || self.checked_out.is_some() {
            return None;
        }
        let listeners = mem::take(&mut self.listeners);
        self.checked_out = Some(listeners.ids());
        Some((mem::take(&mut self.pending), listeners))
    }

    /// Takes back listeners handed out by `take_pending`, dropping the ones
    /// unsubscribed meanwhile and keeping the ones subscribed meanwhile.
    pub(crate) fn restore_listeners(&mut self, mut listeners: Listeners) {
        for subscription in self.revoked.drain(..) {
            listeners.remove(subscription);
        }
        self.checked_out = None;
        let later = mem::replace(&mut self.listeners, listeners);
        self.listeners.append(later);
    }
}

fn ignored(operation: &str, err: FavoritesTreeError) -> bool {
    tracing::debug!(operation, error = %err, "ignoring favorites change");
    false
}
