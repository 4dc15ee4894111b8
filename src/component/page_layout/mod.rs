//! PDF 版面組合元件
//!
//! 封面、（選擇性）備註頁，以及每張截圖一頁的全版面圖片

mod layout;
mod main;
mod pdf_renderer;

pub use layout::{
    COVER_HEADER, DocumentLayout, FontStyle, NoteMap, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Page,
    PageElement, PageKind, Rgb, fit_image, plan_document, sort_frames, wrap_text,
};
pub use main::{ComposedDocument, LayoutError, PageLayoutComposer, output_file_name};
pub use pdf_renderer::{PageRenderer, PdfRenderer};
