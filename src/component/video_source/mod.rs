//! 影片來源解析元件
//!
//! 把使用者輸入的影片參照（YouTube 連結或本機檔案）轉成可讀取的媒體位置

mod format_selector;
mod yt_dlp;

pub use format_selector::{FormatInfo, MAX_STREAM_HEIGHT, select_best_format};
pub use yt_dlp::{YtDlpResolver, find_downloaded_file};

use crate::component::frame_capture::MediaLocation;
use crate::tools::inspect_media;
use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

/// 無法取得標題時使用的名稱
pub const UNKNOWN_TITLE: &str = "Unknown";

/// 仍被執行中工作持有的暫存影片
static ACTIVE_MEDIA: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

fn media_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// 檔案是否仍由某個 [`TempMedia`] 持有；清理時必須跳過
#[must_use]
pub fn is_media_in_use(path: &Path) -> bool {
    ACTIVE_MEDIA
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&media_key(path))
}

/// 解析完成的影片
#[derive(Debug)]
pub struct ResolvedVideo {
    pub location: MediaLocation,
    pub title: String,
    /// 來源回報的長度；可能不存在或為 0
    pub duration_seconds: Option<f64>,
    /// 下載模式的暫存檔，離開作用域時刪除
    pub temp_media: Option<TempMedia>,
}

pub trait VideoSourceResolver: Send + Sync {
    fn resolve(&self, video_ref: &str) -> Result<ResolvedVideo>;
}

/// 暫存媒體檔案，持有期間不會被清理，`Drop` 時刪除
#[derive(Debug)]
pub struct TempMedia {
    path: PathBuf,
    key: PathBuf,
}

impl TempMedia {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let key = media_key(&path);
        ACTIVE_MEDIA
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        Self { path, key }
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        ACTIVE_MEDIA
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);

        if !self.path.exists() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("已刪除暫存影片: {}", self.path.display()),
            Err(e) => warn!("無法刪除暫存影片 {}: {e}", self.path.display()),
        }
    }
}

/// 參照是否為已存在的本機檔案
#[must_use]
pub fn is_local_reference(video_ref: &str) -> bool {
    Path::new(video_ref.trim()).is_file()
}

/// 本機檔案直接讀取：標題取檔名，長度由 ffprobe 取得
pub fn resolve_local_file(path: &Path) -> Result<ResolvedVideo> {
    let info = inspect_media(&path.to_string_lossy(), None)?;
    let title = path
        .file_stem()
        .map_or_else(|| UNKNOWN_TITLE.to_string(), |s| s.to_string_lossy().to_string());

    Ok(ResolvedVideo {
        location: MediaLocation::LocalFile(path.to_path_buf()),
        title,
        duration_seconds: info.duration_seconds,
        temp_media: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_media_removed_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("temp_video_x.mp4");
        fs::write(&path, b"data").unwrap();

        {
            let _guard = TempMedia::new(path.clone());
            assert!(is_media_in_use(&path));
        }

        assert!(!path.exists());
        assert!(!is_media_in_use(&path));
    }

    #[test]
    fn test_is_local_reference() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4");
        fs::write(&path, b"data").unwrap();

        assert!(is_local_reference(&path.to_string_lossy()));
        assert!(!is_local_reference("https://www.youtube.com/watch?v=abc"));
        assert!(!is_local_reference(&temp_dir.path().to_string_lossy()));
    }
}
