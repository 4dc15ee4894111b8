use super::layout::{DocumentLayout, FontStyle, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, PageElement, Rgb};
use anyhow::{Context, Result, anyhow};
use log::debug;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 嵌入圖片時使用的解析度，用來換算圖片原始尺寸
const IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

/// 把 [`DocumentLayout`] 畫到檔案
pub trait PageRenderer: Send + Sync {
    fn render(&self, layout: &DocumentLayout, output_path: &Path) -> Result<()>;
}

/// 使用 printpdf 與內建 Helvetica 字型的 PDF 輸出
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self> {
        let load = |font: BuiltinFont| {
            doc.add_builtin_font(font)
                .map_err(|e| anyhow!("無法載入內建字型: {e}"))
        };
        Ok(Self {
            regular: load(BuiltinFont::Helvetica)?,
            bold: load(BuiltinFont::HelveticaBold)?,
            italic: load(BuiltinFont::HelveticaOblique)?,
        })
    }

    const fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

impl PageRenderer for PdfRenderer {
    fn render(&self, layout: &DocumentLayout, output_path: &Path) -> Result<()> {
        let page_width = Mm(PAGE_WIDTH_MM as f32);
        let page_height = Mm(PAGE_HEIGHT_MM as f32);

        let (doc, first_page, first_layer) =
            PdfDocument::new(layout.title.as_str(), page_width, page_height, "Layer 1");
        let fonts = Fonts::load(&doc)?;

        for (number, page) in layout.pages.iter().enumerate() {
            let (page_index, layer_index) = if number == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(page_width, page_height, "Layer 1")
            };
            let layer = doc.get_page(page_index).get_layer(layer_index);

            debug!("繪製第 {} 頁 ({:?})", number + 1, page.kind);
            for element in &page.elements {
                draw_element(&layer, &fonts, element)?;
            }
        }

        let file = File::create(output_path)
            .with_context(|| format!("無法建立 PDF 檔案: {}", output_path.display()))?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| anyhow!("無法寫入 PDF {}: {e}", output_path.display()))?;

        Ok(())
    }
}

fn draw_element(layer: &PdfLayerReference, fonts: &Fonts, element: &PageElement) -> Result<()> {
    match element {
        PageElement::Text {
            x,
            y,
            size_pt,
            style,
            color,
            text,
        } => {
            layer.set_fill_color(pdf_color(*color));
            layer.use_text(
                text.as_str(),
                *size_pt as f32,
                Mm(*x as f32),
                Mm(flip_y(*y, 0.0) as f32),
                fonts.get(*style),
            );
        }
        PageElement::FilledRect {
            x,
            y,
            width,
            height,
            color,
        } => {
            let bottom = flip_y(*y, *height);
            layer.set_fill_color(pdf_color(*color));
            layer.add_rect(
                Rect::new(
                    Mm(*x as f32),
                    Mm(bottom as f32),
                    Mm((*x + *width) as f32),
                    Mm((bottom + *height) as f32),
                )
                .with_mode(PaintMode::Fill),
            );
        }
        PageElement::Image {
            path,
            x,
            y,
            width,
            height,
            pixel_width,
            pixel_height,
        } => {
            let image = load_png(path)?;
            let natural_width = f64::from(*pixel_width) / IMAGE_DPI * MM_PER_INCH;
            let natural_height = f64::from(*pixel_height) / IMAGE_DPI * MM_PER_INCH;

            image.add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(*x as f32)),
                    translate_y: Some(Mm(flip_y(*y, *height) as f32)),
                    scale_x: Some((*width / natural_width) as f32),
                    scale_y: Some((*height / natural_height) as f32),
                    dpi: Some(IMAGE_DPI as f32),
                    ..Default::default()
                },
            );
        }
    }
    Ok(())
}

fn load_png(path: &Path) -> Result<Image> {
    let file =
        File::open(path).with_context(|| format!("無法開啟截圖: {}", path.display()))?;
    let decoder = PngDecoder::new(std::io::BufReader::new(file))
        .map_err(|e| anyhow!("無法解碼截圖 {}: {e}", path.display()))?;
    Image::try_from(decoder).map_err(|e| anyhow!("無法嵌入截圖 {}: {e}", path.display()))
}

/// 版面座標（左上原點）轉 PDF 座標（左下原點）
fn flip_y(top: f64, height: f64) -> f64 {
    PAGE_HEIGHT_MM - top - height
}

fn pdf_color(color: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        f32::from(color.r) / 255.0,
        f32::from(color.g) / 255.0,
        f32::from(color.b) / 255.0,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::super::layout::{NoteMap, plan_document};
    use super::*;
    use crate::component::frame_capture::CapturedFrame;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_flip_y() {
        assert!((flip_y(0.0, PAGE_HEIGHT_MM)).abs() < 1e-9);
        assert!((flip_y(5.0, 8.0) - 284.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_writes_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let image_path = temp_dir.path().join("screenshot_000_0s.png");
        DynamicImage::ImageRgb8(RgbImage::new(32, 18))
            .save(&image_path)
            .unwrap();

        let frames = [CapturedFrame {
            index: 0,
            timestamp: 0.0,
            path: image_path,
            width: 32,
            height: 18,
        }];
        let mut notes = NoteMap::new();
        notes.insert(0, "opening");
        let layout = plan_document(&frames, "Demo", &notes, chrono::Local::now());

        let output = temp_dir.path().join("out.pdf");
        PdfRenderer.render(&layout, &output).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_missing_image_fails() {
        let temp_dir = TempDir::new().unwrap();
        let frames = [CapturedFrame {
            index: 0,
            timestamp: 0.0,
            path: temp_dir.path().join("missing.png"),
            width: 32,
            height: 18,
        }];
        let layout = plan_document(&frames, "Demo", &NoteMap::new(), chrono::Local::now());

        assert!(PdfRenderer.render(&layout, &temp_dir.path().join("out.pdf")).is_err());
    }
}
