//! Single-page PDF report for one assessment.
//!
//! The report is first laid out on a fixed-width logical canvas, then the whole
//! canvas is scaled onto an A4 page, preserving its aspect ratio, centered
//! horizontally and offset by a fixed top margin.

use crate::error::ReportError;
use crate::payload::ImagePayload;
use crate::record::AnalysisResult;
use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const TOP_MARGIN_MM: f32 = 10.0;

const CANVAS_WIDTH: f32 = 800.0;
const PADDING: f32 = 40.0;
const TITLE_SIZE: f32 = 32.0;
const HEADING_SIZE: f32 = 22.0;
const BODY_SIZE: f32 = 18.0;
const SMALL_SIZE: f32 = 14.0;
const LINE_SPACING: f32 = 1.4;
const IMAGE_MAX_HEIGHT: f32 = 360.0;
const IMAGE_DPI: f32 = 300.0;
const PT_PER_MM: f32 = 72.0 / 25.4;

pub const DISCLAIMER: &str = "This report is generated by an AI model for informational purposes only. \
It is not a diagnosis and does not replace advice from a qualified healthcare professional.";

/// A positioned element on the logical canvas. `y` is the top edge.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportLayout {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Element>,
}

struct LayoutBuilder {
    cursor: f32,
    elements: Vec<Element>,
}

impl LayoutBuilder {
    fn text(&mut self, text: &str, size: f32, bold: bool) {
        // Helvetica averages roughly half an em per glyph
        let max_chars = ((CANVAS_WIDTH - 2.0 * PADDING) / (size * 0.5)) as usize;
        for line in wrap(text, max_chars) {
            self.elements.push(Element::Text {
                x: PADDING,
                y: self.cursor,
                size,
                bold,
                text: line,
            });
            self.cursor += size * LINE_SPACING;
        }
    }

    fn list(&mut self, heading: &str, items: &[String]) {
        self.gap(BODY_SIZE * 0.5);
        self.text(heading, HEADING_SIZE, true);
        if items.is_empty() {
            self.text("None provided", BODY_SIZE, false);
        }
        for item in items {
            self.text(&format!("- {item}"), BODY_SIZE, false);
        }
    }

    fn image(&mut self, (width, height): (u32, u32)) {
        let max_width = CANVAS_WIDTH - 2.0 * PADDING;
        let (width, height) = (width as f32, height as f32);
        let scale = (max_width / width).min(IMAGE_MAX_HEIGHT / height);
        let (w, h) = (width * scale, height * scale);
        self.elements.push(Element::Image {
            x: (CANVAS_WIDTH - w) / 2.0,
            y: self.cursor,
            width: w,
            height: h,
        });
        self.cursor += h;
    }

    fn gap(&mut self, amount: f32) {
        self.cursor += amount;
    }
}

impl ReportLayout {
    /// Lays out `record`; `image_size` is the pixel size of its photo, if decodable.
    pub fn new(record: &AnalysisResult, image_size: Option<(u32, u32)>) -> Self {
        let mut b = LayoutBuilder {
            cursor: PADDING,
            elements: Vec::new(),
        };

        b.text("Wound Analysis Report", TITLE_SIZE, true);
        let date = record
            .created_at()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        b.text(&format!("Date: {date}"), BODY_SIZE, false);
        let age = record.age.map_or_else(|| "Not provided".to_string(), |a| a.to_string());
        match record.age_group {
            Some(group) => b.text(&format!("Age: {age} ({group})"), BODY_SIZE, false),
            None => b.text(&format!("Age: {age}"), BODY_SIZE, false),
        }
        b.gap(BODY_SIZE);

        match image_size {
            Some((w, h)) if w > 0 && h > 0 => b.image((w, h)),
            _ => b.text("Image unavailable", SMALL_SIZE, false),
        }
        b.gap(BODY_SIZE);

        b.text(&format!("Type: {}", record.core.wound_type), BODY_SIZE, false);
        b.text(&format!("Stage: {}", record.core.stage), BODY_SIZE, false);
        b.text(&format!("Severity: {}/100", record.core.severity), BODY_SIZE, false);
        b.list("Precautions", &record.core.precautions);
        b.list("Medicines & Care", &record.core.meds);

        b.gap(BODY_SIZE);
        b.text(DISCLAIMER, SMALL_SIZE, false);

        Self {
            width: CANVAS_WIDTH,
            height: b.cursor + PADDING,
            elements: b.elements,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Image { .. } => None,
        })
    }
}

/// Where the canvas lands on the page, in millimetres from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    /// Millimetres per canvas unit.
    pub scale: f32,
}

impl Placement {
    fn to_page(self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.y + y * self.scale)
    }
}

/// Scales `content` to fit below `top_margin` on the page, centered horizontally.
pub fn fit_to_page(content: (f32, f32), page: (f32, f32), top_margin: f32) -> Placement {
    let (cw, ch) = content;
    let (pw, ph) = page;
    let scale = (pw / cw).min((ph - top_margin) / ch);
    Placement {
        x: (pw - cw * scale) / 2.0,
        y: top_margin,
        scale,
    }
}

/// `wound-report-YYYY-MM-DD.pdf`
pub fn report_file_name(date: chrono::NaiveDate) -> String {
    format!("wound-report-{}.pdf", date.format("%Y-%m-%d"))
}

/// Renders `record` into `dir`, named with today's date. Returns the written path.
pub fn export_report(record: &AnalysisResult, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(report_file_name(chrono::Local::now().date_naive()));
    write_report(record, &path)?;
    log::info!("Report written to {}", path.display());
    Ok(path)
}

pub fn write_report(record: &AnalysisResult, path: &Path) -> Result<(), ReportError> {
    // sample records reference bundled assets rather than data URLs
    let photo = match ImagePayload::from_data_url(&record.image_source) {
        Ok(payload) => image_crate::load_from_memory(&payload.bytes)
            .inspect_err(|e| log::warn!("Report image could not be decoded: {e}"))
            .ok(),
        Err(_) => {
            log::debug!("No embedded image for record {}", record.timestamp);
            None
        }
    };

    let layout = ReportLayout::new(record, photo.as_ref().map(|p| p.dimensions()));
    let placement = fit_to_page(
        (layout.width, layout.height),
        (PAGE_WIDTH_MM, PAGE_HEIGHT_MM),
        TOP_MARGIN_MM,
    );

    let (doc, page, layer) = PdfDocument::new(
        "Wound Analysis Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Report",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for element in &layout.elements {
        match element {
            Element::Text {
                x,
                y,
                size,
                bold: is_bold,
                text,
            } => {
                // PDF text is positioned at its baseline, from the bottom edge
                let (px, py) = placement.to_page(*x, *y + *size);
                let font = if *is_bold { &bold } else { &regular };
                layer.use_text(
                    text.as_str(),
                    size * placement.scale * PT_PER_MM,
                    Mm(px),
                    Mm(PAGE_HEIGHT_MM - py),
                    font,
                );
            }
            Element::Image {
                x,
                y,
                width,
                height,
            } => {
                let Some(photo) = &photo else { continue };
                let (px, py) = placement.to_page(*x, *y + *height);
                let (pixels_w, pixels_h) = photo.dimensions();
                let natural_w = pixels_w as f32 * 25.4 / IMAGE_DPI;
                let natural_h = pixels_h as f32 * 25.4 / IMAGE_DPI;
                let rgb = DynamicImage::ImageRgb8(photo.to_rgb8());
                Image::from_dynamic_image(&rgb).add_to_layer(
                    layer.clone(),
                    ImageTransform {
                        translate_x: Some(Mm(px)),
                        translate_y: Some(Mm(PAGE_HEIGHT_MM - py)),
                        scale_x: Some(width * placement.scale / natural_w),
                        scale_y: Some(height * placement.scale / natural_h),
                        dpi: Some(IMAGE_DPI),
                        ..Default::default()
                    },
                );
            }
        }
    }

    doc.save(&mut BufWriter::new(File::create(path)?))?;
    Ok(())
}

fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AnalysisCore, WoundType};
    use tempfile::TempDir;

    fn record() -> AnalysisResult {
        AnalysisResult::with_timestamp(
            1_760_000_000_000,
            AnalysisCore {
                wound_type: WoundType::Burn,
                severity: 64,
                precautions: vec!["Keep covered".into(), "Avoid sunlight".into()],
                meds: vec![],
                ..Default::default()
            },
            "samples/burn.jpg".into(),
            Some(72),
        )
    }

    #[test]
    fn layout_contains_every_section() {
        let layout = ReportLayout::new(&record(), Some((1200, 800)));
        let lines: Vec<_> = layout.lines().collect();
        assert_eq!(lines[0], "Wound Analysis Report");
        assert!(lines.contains(&"Age: 72 (Elderly)"));
        assert!(lines.contains(&"Type: Burn"));
        assert!(lines.contains(&"Stage: Unknown"));
        assert!(lines.contains(&"Severity: 64/100"));
        assert!(lines.contains(&"- Avoid sunlight"));
        assert!(lines.contains(&"None provided"));
        assert!(lines.last().unwrap().ends_with("healthcare professional."));

        let image = layout
            .elements
            .iter()
            .find_map(|e| match e {
                Element::Image { x, width, height, .. } => Some((*x, *width, *height)),
                _ => None,
            })
            .unwrap();
        assert!((image.0 - 130.0).abs() < 1e-3);
        assert!((image.1 - 540.0).abs() < 1e-3);
        assert!((image.2 - 360.0).abs() < 1e-3);
    }

    #[test]
    fn layout_without_image_says_so() {
        let layout = ReportLayout::new(&record(), None);
        assert!(layout.lines().any(|l| l == "Image unavailable"));
        assert!(!layout.elements.iter().any(|e| matches!(e, Element::Image { .. })));
    }

    #[test]
    fn tall_content_is_limited_by_height_and_centered() {
        let placement = fit_to_page((800.0, 2870.0), (210.0, 297.0), 10.0);
        assert!((placement.scale - 0.1).abs() < 1e-6);
        assert!((placement.x - 65.0).abs() < 1e-4);
        assert_eq!(placement.y, 10.0);
    }

    #[test]
    fn wide_content_is_limited_by_width() {
        let placement = fit_to_page((800.0, 400.0), (210.0, 297.0), 10.0);
        assert!((placement.scale - 210.0 / 800.0).abs() < 1e-6);
        assert!(placement.x.abs() < 1e-4);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(wrap("", 5), vec![""]);
        assert_eq!(wrap("unbreakable", 4), vec!["unbreakable"]);
    }

    #[test]
    fn file_name_uses_date() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(report_file_name(date), "wound-report-2026-03-09.pdf");
    }

    #[test]
    fn exports_pdf_file() {
        let temp = TempDir::new().unwrap();
        let path = export_report(&record(), temp.path()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
