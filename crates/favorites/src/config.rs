use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_FILE_NAME: &str = "favorites.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read favorites config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse favorites config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Options controlling where and how the favorites file is written.
/// 控制收藏檔案位置與寫入方式的設定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// File name created beside the workspace marker.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Initial value of the store's visibility flag.
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub atomic_writes: bool,
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            file_name: default_file_name(),
            visible: true,
            atomic_writes: true,
            pretty: true,
        }
    }
}

impl FavoritesConfig {
    /// Loads the config, returning defaults when the file does not exist.
    /// 載入設定；檔案不存在時回傳預設值。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: FavoritesConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        config.sanitize();
        Ok(config)
    }

    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        let name = self.file_name.trim();
        let is_plain_name = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if is_plain_name {
            self.file_name = name.to_string();
        } else {
            self.file_name = default_file_name();
        }
    }
}
