use super::layout::{NoteMap, plan_document};
use super::pdf_renderer::{PageRenderer, PdfRenderer};
use crate::component::frame_capture::CapturedFrame;
use crate::tools::{ensure_directory_exists, sanitize_filename};
use chrono::Local;
use log::{info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("沒有任何截圖可以產生 PDF")]
    NoImages,
    #[error("PDF 繪製失敗 {path}: {reason}")]
    Render { path: PathBuf, reason: String },
    #[error("PDF 檔案處理失敗 {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// 產生完成的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

/// 版面組合器：規劃版面後交給 [`PageRenderer`] 輸出
pub struct PageLayoutComposer {
    renderer: Arc<dyn PageRenderer>,
}

impl Default for PageLayoutComposer {
    fn default() -> Self {
        Self::new(Arc::new(PdfRenderer))
    }
}

impl PageLayoutComposer {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self { renderer }
    }

    /// 組合封面、備註頁與每張截圖的頁面
    ///
    /// 先寫入 `<name>.part`，成功後才改名為最終檔名
    pub fn compose(
        &self,
        frames: &[CapturedFrame],
        title: &str,
        notes: &NoteMap,
        output_path: &Path,
    ) -> Result<ComposedDocument, LayoutError> {
        if frames.is_empty() {
            return Err(LayoutError::NoImages);
        }

        if let Some(parent) = output_path.parent() {
            ensure_directory_exists(parent).map_err(|e| LayoutError::Io {
                path: parent.to_path_buf(),
                reason: format!("{e:#}"),
            })?;
        }

        let layout = plan_document(frames, title, notes, Local::now());
        let partial = partial_path(output_path);

        if let Err(e) = self.renderer.render(&layout, &partial) {
            remove_partial(&partial);
            return Err(LayoutError::Render {
                path: output_path.to_path_buf(),
                reason: format!("{e:#}"),
            });
        }

        if let Err(e) = fs::rename(&partial, output_path) {
            remove_partial(&partial);
            return Err(LayoutError::Io {
                path: output_path.to_path_buf(),
                reason: e.to_string(),
            });
        }

        info!(
            "PDF 已建立: {} ({} 頁)",
            output_path.display(),
            layout.page_count()
        );

        Ok(ComposedDocument {
            path: output_path.to_path_buf(),
            page_count: layout.page_count(),
        })
    }
}

/// 輸出檔名：`<清理後標題>_<job id>.pdf`
#[must_use]
pub fn output_file_name(title: &str, job_id: &str) -> String {
    format!("{}_{job_id}.pdf", sanitize_filename(title))
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = OsString::from(output_path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn remove_partial(partial: &Path) {
    if partial.exists() && fs::remove_file(partial).is_err() {
        warn!("無法刪除未完成的 PDF: {}", partial.display());
    }
}
