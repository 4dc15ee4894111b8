use super::format_selector::{FormatInfo, select_best_format};
use super::{
    ResolvedVideo, TempMedia, UNKNOWN_TITLE, VideoSourceResolver, is_local_reference,
    resolve_local_file,
};
use crate::component::frame_capture::MediaLocation;
use crate::config::{ResolveMode, UserSettings};
use crate::tools::{ensure_directory_exists, is_non_empty_file};
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use uuid::Uuid;
use walkdir::WalkDir;

/// 下載模式的格式選擇
const DOWNLOAD_FORMAT: &str = "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best";

/// 暫存下載檔名前綴
const DOWNLOAD_PREFIX: &str = "temp_video_";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoMetadata {
    title: Option<String>,
    duration: Option<f64>,
    formats: Vec<FormatInfo>,
    /// 沒有 formats 時 yt-dlp 會直接給出 URL
    url: Option<String>,
    requested_downloads: Vec<RequestedDownload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RequestedDownload {
    filepath: Option<PathBuf>,
}

impl VideoMetadata {
    fn title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string()
    }
}

/// 透過 `yt-dlp` 執行檔解析影片
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    mode: ResolveMode,
    download_dir: PathBuf,
    socket_timeout: Duration,
}

impl YtDlpResolver {
    #[must_use]
    pub const fn new(mode: ResolveMode, download_dir: PathBuf, socket_timeout: Duration) -> Self {
        Self {
            mode,
            download_dir,
            socket_timeout,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &UserSettings) -> Self {
        Self::new(
            settings.resolve_mode,
            settings.download_dir.clone(),
            settings.socket_timeout(),
        )
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.as_secs().max(1).to_string(),
        ]
    }

    fn run(&self, extra_args: &[String], video_ref: &str) -> Result<VideoMetadata> {
        let mut args = self.base_args();
        args.extend_from_slice(extra_args);
        args.push(video_ref.to_string());

        debug!("執行 yt-dlp {}", args.join(" "));
        let output = Command::new("yt-dlp")
            .args(&args)
            .output()
            .context("無法執行 yt-dlp，請確認已安裝並在 PATH 中")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("yt-dlp 執行失敗: {}", stderr.trim());
        }

        parse_metadata(&output.stdout)
    }

    fn resolve_stream(&self, video_ref: &str) -> Result<ResolvedVideo> {
        let metadata = self.run(&["-J".to_string()], video_ref)?;
        let url = stream_url(&metadata)?;

        info!("取得串流 URL: {}", metadata.title());
        Ok(ResolvedVideo {
            location: MediaLocation::Remote(url),
            title: metadata.title(),
            duration_seconds: metadata.duration,
            temp_media: None,
        })
    }

    fn resolve_download(&self, video_ref: &str) -> Result<ResolvedVideo> {
        ensure_directory_exists(&self.download_dir)?;

        let stem = format!("{DOWNLOAD_PREFIX}{}", Uuid::new_v4());
        let template = self.download_dir.join(format!("{stem}.%(ext)s"));
        let args = download_args(&template);

        let metadata = match self.run(&args, video_ref) {
            Ok(metadata) => metadata,
            Err(e) => {
                remove_with_prefix(&self.download_dir, &stem);
                return Err(e);
            }
        };

        let reported = metadata
            .requested_downloads
            .iter()
            .find_map(|d| d.filepath.clone())
            .filter(|p| is_non_empty_file(p));

        let Some(path) = reported.or_else(|| find_downloaded_file(&self.download_dir, &stem))
        else {
            remove_with_prefix(&self.download_dir, &stem);
            bail!("下載完成但找不到影片檔案: {}", self.download_dir.display());
        };

        info!("影片已下載: {}", path.display());
        Ok(ResolvedVideo {
            location: MediaLocation::LocalFile(path.clone()),
            title: metadata.title(),
            duration_seconds: metadata.duration,
            temp_media: Some(TempMedia::new(path)),
        })
    }
}

impl VideoSourceResolver for YtDlpResolver {
    fn resolve(&self, video_ref: &str) -> Result<ResolvedVideo> {
        let video_ref = video_ref.trim();

        if is_local_reference(video_ref) {
            debug!("使用本機檔案: {video_ref}");
            return resolve_local_file(Path::new(video_ref));
        }

        match self.mode {
            ResolveMode::Stream => self.resolve_stream(video_ref),
            ResolveMode::Download => self.resolve_download(video_ref),
        }
    }
}

fn parse_metadata(stdout: &[u8]) -> Result<VideoMetadata> {
    serde_json::from_slice(stdout).context("無法解析 yt-dlp 輸出的 JSON")
}

fn stream_url(metadata: &VideoMetadata) -> Result<String> {
    if let Some(format) = select_best_format(&metadata.formats) {
        debug!(
            "選擇格式 {}: {}p, {}",
            format.format_id.as_deref().unwrap_or("?"),
            format.height.map_or_else(|| "?".to_string(), |h| h.to_string()),
            format.vcodec.as_deref().unwrap_or("?")
        );
        if let Some(url) = &format.url {
            return Ok(url.clone());
        }
    }

    metadata
        .url
        .clone()
        .context("yt-dlp 沒有回傳可用的串流格式")
}

/// 下載模式的參數；`--no-mtime` 讓檔案時間等於下載時間，清理才不會誤判為過期
fn download_args(template: &Path) -> Vec<String> {
    vec![
        "-J".to_string(),
        "--no-simulate".to_string(),
        "--no-progress".to_string(),
        "--no-mtime".to_string(),
        "-f".to_string(),
        DOWNLOAD_FORMAT.to_string(),
        "-o".to_string(),
        template.to_string_lossy().to_string(),
    ]
}

/// 在下載資料夾中尋找以 `stem` 開頭的完整檔案（排除 `.part`）
#[must_use]
pub fn find_downloaded_file(download_dir: &Path, stem: &str) -> Option<PathBuf> {
    WalkDir::new(download_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|name| name.starts_with(stem) && !name.ends_with(".part"))
        })
        .find(|path| is_non_empty_file(path))
}

fn remove_with_prefix(download_dir: &Path, stem: &str) {
    for entry in WalkDir::new(download_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let matches = entry.file_name().to_string_lossy().starts_with(stem);
        if matches && fs::remove_file(entry.path()).is_err() {
            warn!("無法刪除下載殘留檔案: {}", entry.path().display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE_JSON: &str = r#"{
        "title": "Rust in 100 Seconds",
        "duration": 185,
        "formats": [
            {"format_id": "251", "url": "https://cdn/audio", "ext": "webm", "vcodec": "none", "height": null},
            {"format_id": "136", "url": "https://cdn/avc720", "ext": "mp4", "vcodec": "avc1.4d401f", "height": 720},
            {"format_id": "248", "url": "https://cdn/vp9-1080", "ext": "webm", "vcodec": "vp9", "height": 1080}
        ]
    }"#;

    #[test]
    fn test_download_args_keep_download_time() {
        let args = download_args(Path::new("downloads/temp_video_x.%(ext)s"));
        assert!(args.iter().any(|a| a == "--no-mtime"));
        assert!(args.iter().any(|a| a == "--no-simulate"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("downloads/temp_video_x.%(ext)s")
        );
    }

    #[test]
    fn test_parse_metadata_and_pick_stream() {
        let metadata = parse_metadata(SAMPLE_JSON.as_bytes()).unwrap();

        assert_eq!(metadata.title(), "Rust in 100 Seconds");
        assert_eq!(metadata.duration, Some(185.0));
        assert_eq!(stream_url(&metadata).unwrap(), "https://cdn/avc720");
    }

    #[test]
    fn test_stream_url_falls_back_to_top_level_url() {
        let metadata = parse_metadata(br#"{"title":"  ","url":"https://cdn/direct"}"#).unwrap();

        assert_eq!(metadata.title(), UNKNOWN_TITLE);
        assert_eq!(stream_url(&metadata).unwrap(), "https://cdn/direct");
    }

    #[test]
    fn test_stream_url_missing() {
        let metadata = parse_metadata(br#"{"title":"x","formats":[]}"#).unwrap();
        assert!(stream_url(&metadata).is_err());
    }

    #[test]
    fn test_find_downloaded_file_skips_partial() {
        let temp_dir = TempDir::new().unwrap();
        let stem = "temp_video_abc";
        fs::write(temp_dir.path().join(format!("{stem}.mp4.part")), b"partial").unwrap();
        fs::write(temp_dir.path().join("temp_video_other.mp4"), b"other").unwrap();

        assert!(find_downloaded_file(temp_dir.path(), stem).is_none());

        let complete = temp_dir.path().join(format!("{stem}.mkv"));
        fs::write(&complete, b"video").unwrap();
        assert_eq!(find_downloaded_file(temp_dir.path(), stem), Some(complete));
    }

    #[test]
    fn test_remove_with_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let stem = "temp_video_abc";
        let leftover = temp_dir.path().join(format!("{stem}.f137.mp4.part"));
        let unrelated = temp_dir.path().join("keep.mp4");
        fs::write(&leftover, b"x").unwrap();
        fs::write(&unrelated, b"x").unwrap();

        remove_with_prefix(temp_dir.path(), stem);

        assert!(!leftover.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_resolver_from_settings() {
        let resolver = YtDlpResolver::from_settings(&UserSettings::default());
        assert_eq!(resolver.mode, ResolveMode::Stream);
        assert!(resolver.base_args().contains(&"30".to_string()));
    }
}
