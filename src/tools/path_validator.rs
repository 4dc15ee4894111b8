use anyhow::{Context, Result, bail};
use std::path::Path;

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("無法建立資料夾: {}", path.display()))?;
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

/// 檔案存在且大小不為 0
#[must_use]
pub fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directory_exists_creates_nested() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        ensure_directory_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // 再次呼叫不應出錯
        ensure_directory_exists(&nested).unwrap();
    }

    #[test]
    fn test_ensure_directory_exists_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(ensure_directory_exists(&file).is_err());
    }

    #[test]
    fn test_is_non_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty.png");
        let full = temp_dir.path().join("full.png");
        std::fs::write(&empty, "").unwrap();
        std::fs::write(&full, "data").unwrap();

        assert!(!is_non_empty_file(&empty));
        assert!(is_non_empty_file(&full));
        assert!(!is_non_empty_file(&temp_dir.path().join("missing.png")));
        assert!(!is_non_empty_file(temp_dir.path()));
    }
}
