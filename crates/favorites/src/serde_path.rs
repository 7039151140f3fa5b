//! Serde adapter for the `path` field of a favorite.
//! 收藏項目 `path` 欄位的 serde 轉換器。
//!
//! A path that is valid UTF-8 is always stored as a plain JSON string, whatever
//! it contains. Only a path the OS hands back as raw bytes is stored as an
//! object, `{"bytes": "<base64>"}`, so the two forms can never be confused.
//! A value that is neither form (or carries a broken payload) reads back as
//! "no path" and the tree drops that one entry on load.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize)]
#[serde(untagged)]
enum WrittenPath<'a> {
    Text(&'a str),
    Bytes { bytes: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPath {
    Text(String),
    Bytes { bytes: String },
    Unreadable(IgnoredAny),
}

/// `with = "crate::serde_path::option"` helpers for `Option<PathBuf>` fields.
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(path) => serializer.serialize_some(&written(path)),
            None => serializer.serialize_none(),
        }
    }

    /// Never fails on the path value itself; see the module docs.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<StoredPath>::deserialize(deserializer)?.and_then(restore))
    }
}

fn written(path: &Path) -> WrittenPath<'_> {
    match path.to_str() {
        Some(text) => WrittenPath::Text(text),
        None => WrittenPath::Bytes {
            bytes: BASE64.encode(raw::to_bytes(path)),
        },
    }
}

fn restore(stored: StoredPath) -> Option<PathBuf> {
    match stored {
        StoredPath::Text(text) => Some(PathBuf::from(text)),
        StoredPath::Bytes { bytes } => {
            let decoded = match BASE64.decode(bytes.as_bytes()) {
                Ok(decoded) => decoded,
                Err(err) => {
                    tracing::warn!(error = %err, "favorite path has a broken byte payload");
                    return None;
                }
            };
            let path = raw::from_bytes(decoded);
            if path.is_none() {
                tracing::warn!("favorite path bytes do not form a path on this platform");
            }
            path
        }
        StoredPath::Unreadable(_) => {
            tracing::warn!("favorite path is neither a string nor a byte object");
            None
        }
    }
}

#[cfg(unix)]
mod raw {
    use std::ffi::OsString;
    use std::os::unix::ffi::{OsStrExt, OsStringExt};
    use std::path::{Path, PathBuf};

    pub(super) fn to_bytes(path: &Path) -> Vec<u8> {
        path.as_os_str().as_bytes().to_vec()
    }

    pub(super) fn from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
        Some(PathBuf::from(OsString::from_vec(bytes)))
    }
}

// UTF-16 code units, little endian.
#[cfg(windows)]
mod raw {
    use std::ffi::OsString;
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use std::path::{Path, PathBuf};

    pub(super) fn to_bytes(path: &Path) -> Vec<u8> {
        path.as_os_str()
            .encode_wide()
            .flat_map(u16::to_le_bytes)
            .collect()
    }

    pub(super) fn from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
        if bytes.len() % 2 != 0 {
            return None;
        }
        let wide: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Some(PathBuf::from(OsString::from_wide(&wide)))
    }
}
