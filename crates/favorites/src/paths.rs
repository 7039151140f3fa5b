//! Translation between caller-facing absolute paths and the base-relative
//! form stored in `favorites.json`.
//! 絕對路徑與 `favorites.json` 中相對路徑之間的轉換。

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Converts `path` into a base-relative path with `/` separators.
/// 將路徑轉換為以 `/` 分隔、相對於基準目錄的路徑。
///
/// Falls back to the (normalized) absolute path when there is no base
/// directory or the file lives outside of it.
pub fn to_relative(base: Option<&Path>, path: &Path) -> PathBuf {
    let absolute = match base {
        Some(base) if path.is_relative() => normalize(&base.join(path)),
        _ => normalize(path),
    };
    let Some(base) = base else {
        return absolute;
    };
    match absolute.strip_prefix(normalize(base)) {
        Ok(relative) if !relative.as_os_str().is_empty() => portable(relative),
        _ => absolute,
    }
}

/// Resolves a stored path back to an absolute path.
/// 將儲存的路徑還原為絕對路徑。
pub fn to_absolute(base: Option<&Path>, stored: &Path) -> PathBuf {
    match base {
        Some(base) if stored.is_relative() => normalize(&base.join(stored)),
        _ => stored.to_path_buf(),
    }
}

/// Case-insensitive key used by the path index.
pub fn index_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

/// Lexically removes `.` and `..` components without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn portable(relative: &Path) -> PathBuf {
    match relative.to_str() {
        Some(text) if MAIN_SEPARATOR != '/' => PathBuf::from(text.replace(MAIN_SEPARATOR, "/")),
        _ => relative.to_path_buf(),
    }
}
