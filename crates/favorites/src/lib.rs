//! Workspace favorites: a persistent, hand-curated tree of files and virtual
//! folders stored beside the workspace marker as `favorites.json`.
//! 工作區收藏：儲存在工作區標記檔旁的檔案與虛擬資料夾樹。

mod serde_path;
mod util;

pub mod config;
pub mod entry;
pub mod events;
pub mod file;
pub mod index;
pub mod paths;
pub mod shared;
pub mod store;
pub mod tree;

pub use config::{ConfigError, FavoritesConfig, DEFAULT_FILE_NAME};
pub use entry::{FavoriteEntry, FavoritesDocument, FAVORITES_FORMAT_VERSION};
pub use events::{StoreEvent, SubscriptionId};
pub use file::{FavoritesFile, FavoritesFileError};
pub use index::PathIndex;
pub use shared::{SharedFavoritesStore, WeakFavoritesStore};
pub use store::{AddOutcome, FavoritesStore, WorkspaceProvider};
pub use tree::{Favorite, FavoriteId, FavoriteKind, FavoritesTree, FavoritesTreeError};
