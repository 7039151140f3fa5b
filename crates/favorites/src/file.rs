use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::FavoritesConfig;
use crate::entry::FavoritesDocument;
use crate::util::write_atomic;

/// Reads and writes a `favorites.json` document.
/// 讀寫 `favorites.json` 文件。
#[derive(Debug, Clone)]
pub struct FavoritesFile {
    path: PathBuf,
    atomic: bool,
    pretty: bool,
}

impl FavoritesFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            atomic: true,
            pretty: true,
        }
    }

    /// Builds the file handle for the workspace rooted at `base_dir`.
    /// 依工作區根目錄與設定建立檔案存取器。
    pub fn in_directory(base_dir: &Path, config: &FavoritesConfig) -> Self {
        Self {
            path: base_dir.join(&config.file_name),
            atomic: config.atomic_writes,
            pretty: config.pretty,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document, returning `Ok(None)` when the file is absent.
    /// 載入文件；檔案不存在時回傳 `Ok(None)`。
    pub fn load(&self) -> Result<Option<FavoritesDocument>, FavoritesFileError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(FavoritesFileError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| FavoritesFileError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Overwrites the file with the whole document.
    /// 以完整文件覆寫檔案。
    pub fn save(&self, document: &FavoritesDocument) -> Result<(), FavoritesFileError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FavoritesFileError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = if self.pretty {
            serde_json::to_vec_pretty(document)
        } else {
            serde_json::to_vec(document)
        }
        .map_err(|source| FavoritesFileError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let written = if self.atomic {
            write_atomic(&self.path, &payload)
        } else {
            fs::write(&self.path, &payload)
        };
        written.map_err(|source| FavoritesFileError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Errors emitted by [`FavoritesFile`].
/// [`FavoritesFile`] 可能產生的錯誤。
#[derive(Debug, Error)]
pub enum FavoritesFileError {
    #[error("failed to read favorites {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse favorites {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize favorites {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write favorites {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
