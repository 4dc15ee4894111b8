use crate::tools::ensure_directory_exists;
use anyhow::Result;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 工作專用的截圖暫存資料夾，`Drop` 時整個刪除
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(root: &Path, job_id: &str) -> Result<Self> {
        let path = root.join(format!("screenshots_{job_id}"));
        ensure_directory_exists(&path)?;
        debug!("建立截圖暫存資料夾: {}", path.display());
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists() && fs::remove_dir_all(&self.path).is_err() {
            warn!("無法清理暫存目錄: {}", self.path.display());
        }
    }
}
