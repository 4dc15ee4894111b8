//! 版面規劃
//!
//! 純函式：把已擷取的畫面轉成頁面元素，不碰任何檔案。
//! 座標單位為公釐，原點在頁面左上角

use crate::component::frame_capture::CapturedFrame;
use crate::tools::{format_hms, sanitize_text};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A4 直式
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

pub const COVER_HEADER: &str = "YouTube Video Screenshots";

const MARGIN_LEFT: f64 = 10.0;
const NOTES_START_Y: f64 = 30.0;
const NOTES_CONTINUATION_Y: f64 = 20.0;
const NOTES_BOTTOM_Y: f64 = 270.0;
const NOTE_LINE_HEIGHT: f64 = 6.0;
const NOTE_ENTRY_GAP: f64 = 2.0;
/// 10pt Helvetica 在 190mm 欄寬內大約可放的字元數
const NOTE_WRAP_COLUMNS: usize = 95;
const TITLE_WRAP_COLUMNS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::gray(0);
    pub const WHITE: Self = Self::gray(255);

    #[must_use]
    pub const fn gray(level: u8) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageElement {
    /// `y` 為文字基線到頁面頂端的距離
    Text {
        x: f64,
        y: f64,
        size_pt: f64,
        style: FontStyle,
        color: Rgb,
        text: String,
    },
    FilledRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Rgb,
    },
    Image {
        path: PathBuf,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        pixel_width: u32,
        pixel_height: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Notes,
    /// 對應排序後第幾張畫面（從 0 開始）
    Frame { position: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub kind: PageKind,
    pub elements: Vec<PageElement>,
}

impl Page {
    const fn new(kind: PageKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
        }
    }

    fn text(&mut self, x: f64, y: f64, size_pt: f64, style: FontStyle, color: Rgb, text: String) {
        self.elements.push(PageElement::Text {
            x,
            y,
            size_pt,
            style,
            color,
            text,
        });
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
        self.elements.push(PageElement::FilledRect {
            x,
            y,
            width,
            height,
            color,
        });
    }
}

/// 完整文件的版面
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    /// 已清理為 ASCII 的標題，也用於 PDF metadata
    pub title: String,
    pub pages: Vec<Page>,
}

impl DocumentLayout {
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn frame_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages
            .iter()
            .filter(|p| matches!(p.kind, PageKind::Frame { .. }))
    }

    #[must_use]
    pub fn notes_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.kind == PageKind::Notes)
            .count()
    }
}

/// 每個整數秒對應的備註
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteMap {
    notes: BTreeMap<String, String>,
}

impl NoteMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, second: u64, note: impl Into<String>) {
        self.notes.insert(second.to_string(), note.into());
    }

    /// 取得備註；空白備註視為不存在
    #[must_use]
    pub fn note_for(&self, second: u64) -> Option<&str> {
        self.notes
            .get(&second.to_string())
            .map(|note| note.trim())
            .filter(|note| !note.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.values().all(|note| note.trim().is_empty())
    }
}

impl From<BTreeMap<String, String>> for NoteMap {
    fn from(notes: BTreeMap<String, String>) -> Self {
        Self { notes }
    }
}

/// 依時間排序畫面；相同時間保留原本的請求順序
#[must_use]
pub fn sort_frames(frames: &[CapturedFrame]) -> Vec<CapturedFrame> {
    let mut sorted = frames.to_vec();
    sorted.sort_by(|a, b| {
        a.timestamp
            .total_cmp(&b.timestamp)
            .then(a.index.cmp(&b.index))
    });
    sorted
}

/// 規劃整份文件：封面、（選擇性）備註頁、每張畫面一頁
#[must_use]
pub fn plan_document(
    frames: &[CapturedFrame],
    title: &str,
    notes: &NoteMap,
    generated_at: DateTime<Local>,
) -> DocumentLayout {
    let frames = sort_frames(frames);
    let safe_title = sanitize_text(title);

    let mut pages = vec![plan_cover(&safe_title, frames.len(), generated_at)];
    pages.extend(plan_notes(&frames, notes));

    let total = frames.len();
    pages.extend(
        frames
            .iter()
            .enumerate()
            .map(|(position, frame)| plan_frame_page(frame, position, total)),
    );

    DocumentLayout {
        title: safe_title,
        pages,
    }
}

fn plan_cover(title: &str, frame_count: usize, generated_at: DateTime<Local>) -> Page {
    let mut page = Page::new(PageKind::Cover);
    page.text(
        MARGIN_LEFT,
        22.0,
        18.0,
        FontStyle::Bold,
        Rgb::gray(50),
        COVER_HEADER.to_string(),
    );

    let mut lines = wrap_text(&format!("Title: {title}"), TITLE_WRAP_COLUMNS);
    lines.push(format!(
        "Generated: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(format!("Number of screenshots: {frame_count}"));

    let mut y = 38.0;
    for line in lines {
        page.text(MARGIN_LEFT, y, 12.0, FontStyle::Regular, Rgb::gray(80), line);
        y += 8.0;
    }
    page
}

fn plan_notes(frames: &[CapturedFrame], notes: &NoteMap) -> Vec<Page> {
    let entries: Vec<String> = frames
        .iter()
        .filter_map(|frame| {
            notes.note_for(frame.second()).map(|note| {
                format!("{} - {}", format_hms(frame.second()), sanitize_text(note))
            })
        })
        .collect();

    if entries.is_empty() {
        return Vec::new();
    }

    let mut pages = Vec::new();
    let mut page = Page::new(PageKind::Notes);
    page.text(
        MARGIN_LEFT,
        20.0,
        14.0,
        FontStyle::Bold,
        Rgb::gray(50),
        "Notes:".to_string(),
    );
    let mut y = NOTES_START_Y;

    for entry in entries {
        for line in wrap_text(&entry, NOTE_WRAP_COLUMNS) {
            if y > NOTES_BOTTOM_Y {
                pages.push(page);
                page = Page::new(PageKind::Notes);
                y = NOTES_CONTINUATION_Y;
            }
            page.text(MARGIN_LEFT, y, 10.0, FontStyle::Regular, Rgb::gray(100), line);
            y += NOTE_LINE_HEIGHT;
        }
        y += NOTE_ENTRY_GAP;
    }

    pages.push(page);
    pages
}

fn plan_frame_page(frame: &CapturedFrame, position: usize, total: usize) -> Page {
    let mut page = Page::new(PageKind::Frame { position });

    // 黑底，避免圖片周圍出現白邊
    page.rect(0.0, 0.0, PAGE_WIDTH_MM, PAGE_HEIGHT_MM, Rgb::BLACK);

    let (x, y, width, height) = fit_image(frame.width, frame.height);
    page.elements.push(PageElement::Image {
        path: frame.path.clone(),
        x,
        y,
        width,
        height,
        pixel_width: frame.width,
        pixel_height: frame.height,
    });

    page.rect(5.0, 5.0, 50.0, 8.0, Rgb::BLACK);
    page.text(
        7.0,
        10.5,
        10.0,
        FontStyle::Bold,
        Rgb::WHITE,
        format!("Time: {}", format_hms(frame.second())),
    );

    page.rect(5.0, 287.0, 30.0, 8.0, Rgb::BLACK);
    page.text(
        7.0,
        292.0,
        8.0,
        FontStyle::Italic,
        Rgb::WHITE,
        format!("Page {}/{}", position + 1, total),
    );

    page
}

/// 等比例縮放到頁面內最大尺寸並置中，回傳 `(x, y, width, height)`
#[must_use]
pub fn fit_image(pixel_width: u32, pixel_height: u32) -> (f64, f64, f64, f64) {
    if pixel_width == 0 || pixel_height == 0 {
        return (0.0, 0.0, PAGE_WIDTH_MM, PAGE_HEIGHT_MM);
    }

    let image_width = f64::from(pixel_width);
    let image_height = f64::from(pixel_height);
    let scale = (PAGE_WIDTH_MM / image_width).min(PAGE_HEIGHT_MM / image_height);

    let width = image_width * scale;
    let height = image_height * scale;
    (
        (PAGE_WIDTH_MM - width) / 2.0,
        (PAGE_HEIGHT_MM - height) / 2.0,
        width,
        height,
    )
}

/// 以空白斷行；超過欄寬的單字直接切開
#[must_use]
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > columns {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(columns);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };

        if needed > columns && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn frame(index: usize, timestamp: f64) -> CapturedFrame {
        CapturedFrame {
            index,
            timestamp,
            path: PathBuf::from(format!("/frames/{index}.png")),
            width: 1920,
            height: 1080,
        }
    }

    fn generated_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn texts(page: &Page) -> Vec<&str> {
        page.elements
            .iter()
            .filter_map(|e| match e {
                PageElement::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_page_count_without_notes() {
        let frames = [frame(0, 0.0), frame(1, 60.0), frame(3, 180.0)];
        let layout = plan_document(&frames, "Demo", &NoteMap::new(), generated_at());

        assert_eq!(layout.page_count(), 1 + frames.len());
        assert_eq!(layout.pages[0].kind, PageKind::Cover);
        assert_eq!(layout.notes_page_count(), 0);
    }

    #[test]
    fn test_whitespace_notes_do_not_create_notes_page() {
        let mut notes = NoteMap::new();
        notes.insert(0, "   ");
        notes.insert(999, "not captured");
        let layout = plan_document(&[frame(0, 0.0)], "Demo", &notes, generated_at());

        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.notes_page_count(), 0);
    }

    #[test]
    fn test_notes_follow_sorted_frame_order() {
        let mut notes = NoteMap::new();
        notes.insert(120, "second");
        notes.insert(30, "first");
        let frames = [frame(0, 120.0), frame(1, 30.5)];

        let layout = plan_document(&frames, "Demo", &notes, generated_at());

        assert_eq!(layout.page_count(), 1 + 1 + 2);
        let notes_page = &layout.pages[1];
        assert_eq!(notes_page.kind, PageKind::Notes);
        assert_eq!(
            texts(notes_page),
            vec!["Notes:", "0:00:30 - first", "0:02:00 - second"]
        );
    }

    #[test]
    fn test_frame_pages_sorted_by_timestamp() {
        let frames = [frame(2, 120.0), frame(0, 0.0), frame(1, 60.0), frame(3, 60.0)];
        let layout = plan_document(&frames, "Demo", &NoteMap::new(), generated_at());

        let paths: Vec<PathBuf> = layout
            .frame_pages()
            .filter_map(|p| {
                p.elements.iter().find_map(|e| match e {
                    PageElement::Image { path, .. } => Some(path.clone()),
                    _ => None,
                })
            })
            .collect();

        assert_eq!(
            paths,
            ["/frames/0.png", "/frames/1.png", "/frames/3.png", "/frames/2.png"]
                .map(PathBuf::from)
                .to_vec()
        );
    }

    #[test]
    fn test_frame_page_overlays() {
        let layout = plan_document(&[frame(0, 3723.0)], "Demo", &NoteMap::new(), generated_at());
        let page = &layout.pages[1];

        assert_eq!(texts(page), vec!["Time: 1:02:03", "Page 1/1"]);
        // 第一個元素是整頁黑底
        assert_eq!(
            page.elements[0],
            PageElement::FilledRect {
                x: 0.0,
                y: 0.0,
                width: PAGE_WIDTH_MM,
                height: PAGE_HEIGHT_MM,
                color: Rgb::BLACK,
            }
        );
    }

    #[test]
    fn test_cover_sanitizes_title() {
        let layout = plan_document(&[frame(0, 0.0)], "Café 日本", &NoteMap::new(), generated_at());

        assert_eq!(layout.title, "Caf_ __");
        assert_eq!(
            texts(&layout.pages[0]),
            vec![
                COVER_HEADER,
                "Title: Caf_ __",
                "Generated: 2024-05-01 12:30:00",
                "Number of screenshots: 1",
            ]
        );
    }

    #[test]
    fn test_long_notes_overflow_to_new_page() {
        let mut notes = NoteMap::new();
        let frames: Vec<CapturedFrame> = (0..60).map(|i| frame(i, i as f64)).collect();
        for i in 0..60 {
            notes.insert(i, "a note that is long enough to matter");
        }

        let layout = plan_document(&frames, "Demo", &notes, generated_at());

        assert!(layout.notes_page_count() >= 2);
        for page in layout.pages.iter().filter(|p| p.kind == PageKind::Notes) {
            for element in &page.elements {
                if let PageElement::Text { y, .. } = element {
                    assert!(*y <= NOTES_BOTTOM_Y + NOTE_LINE_HEIGHT);
                }
            }
        }
    }

    #[test]
    fn test_fit_image_landscape_and_portrait() {
        let (x, y, w, h) = fit_image(1920, 1080);
        assert!((w - PAGE_WIDTH_MM).abs() < 1e-9);
        assert!((h - 118.125).abs() < 1e-9);
        assert!(x.abs() < 1e-9);
        assert!((y - (PAGE_HEIGHT_MM - 118.125) / 2.0).abs() < 1e-9);

        let (x, y, w, h) = fit_image(1080, 1920);
        assert!((h - PAGE_HEIGHT_MM).abs() < 1e-9);
        assert!(w <= PAGE_WIDTH_MM);
        assert!(y.abs() < 1e-9);
        assert!((x - (PAGE_WIDTH_MM - w) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("x abcdefgh", 4), vec!["x", "abcd", "efgh"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_note_map_lookup() {
        let mut notes = NoteMap::new();
        notes.insert(90, "  intro  ");
        assert_eq!(notes.note_for(90), Some("intro"));
        assert_eq!(notes.note_for(91), None);
        assert!(!notes.is_empty());
    }
}
