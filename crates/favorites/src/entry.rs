use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Current `favorites.json` schema version.
pub const FAVORITES_FORMAT_VERSION: u32 = 2;

/// Serialized form of a single favorite (file or virtual folder).
/// 單一收藏項目（檔案或虛擬資料夾）的序列化格式。
///
/// The presence of `children` (even when empty) is what makes an entry a
/// folder; `path` is only meaningful for files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteEntry {
    pub name: String,
    #[serde(
        default,
        with = "crate::serde_path::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FavoriteEntry>>,
}

impl FavoriteEntry {
    /// Builds a file entry.
    /// 建立檔案項目。
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            children: None,
        }
    }

    /// Builds a folder entry with the given children.
    /// 建立含子項目的資料夾項目。
    pub fn folder(name: impl Into<String>, children: Vec<FavoriteEntry>) -> Self {
        Self {
            name: name.into(),
            path: None,
            children: Some(children),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }
}

/// Root container persisted as `favorites.json`.
/// 儲存為 `favorites.json` 的根文件。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoritesDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub items: Vec<FavoriteEntry>,
}

fn default_version() -> u32 {
    FAVORITES_FORMAT_VERSION
}

impl Default for FavoritesDocument {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FavoritesDocument {
    pub fn new(items: Vec<FavoriteEntry>) -> Self {
        Self {
            version: FAVORITES_FORMAT_VERSION,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
