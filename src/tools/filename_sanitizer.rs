//! 檔名與文字清理模組
//!
//! PDF 內建字型只支援 ASCII，輸出檔名也需在所有檔案系統上安全

use regex::Regex;
use std::sync::LazyLock;

/// 檔名最大長度（字元）
pub const MAX_FILENAME_LENGTH: usize = 50;

/// 標題為空時使用的預設檔名
pub const DEFAULT_FILENAME: &str = "YouTube_Video";

static REGEX_UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ._-]").expect("Invalid regex"));

/// 將非 ASCII 字元替換為 `_`，確保內建字型可編碼
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect()
}

/// 產生安全檔名：只保留 ASCII 英數字、空白、`-`、`_`、`.`，並限制長度
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let name = if name.trim().is_empty() {
        DEFAULT_FILENAME
    } else {
        name
    };

    // 先以字元為單位替換，避免多位元組字元被 regex 拆成多個底線
    let per_char: String = name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();

    REGEX_UNSAFE_FILENAME_CHARS
        .replace_all(&per_char, "_")
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text_replaces_non_ascii() {
        assert_eq!(sanitize_text("Café 日本"), "Caf_ __");
        assert_eq!(sanitize_text("Plain: title!"), "Plain: title!");
    }

    #[test]
    fn test_sanitize_filename_replaces_unsafe_chars() {
        assert_eq!(sanitize_filename("a/b:c?d"), "a_b_c_d");
        assert_eq!(sanitize_filename("My Video - part_1.v2"), "My Video - part_1.v2");
        assert_eq!(sanitize_filename("日本語"), "___");
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        let long = "x".repeat(80);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LENGTH);
    }

    #[test]
    fn test_sanitize_filename_empty() {
        assert_eq!(sanitize_filename("  "), DEFAULT_FILENAME);
    }
}
