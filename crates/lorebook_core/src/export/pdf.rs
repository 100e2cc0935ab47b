//! Minimal paginated PDF line renderer for export documents.
//!
//! # Invariants
//! - A4 pages, fixed margins, built-in Helvetica only (no font files).
//! - Overlong lines are hard-truncated rather than overflowing the page.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const LINE_HEIGHT_MM: f32 = 5.2;
const FONT_SIZE: f32 = 10.0;
const MAX_LINE_CHARS: usize = 108;

/// Renders the given lines into PDF bytes, breaking pages as needed.
pub(crate) fn render(lines: &[String]) -> Result<Vec<u8>, String> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Lorebook export",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "content",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| err.to_string())?;

    let lines_per_page =
        ((PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / LINE_HEIGHT_MM).floor().max(1.0) as usize;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut line_on_page = 0usize;

    for line in lines {
        if line_on_page == lines_per_page {
            let (page, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
            layer = doc.get_page(page).get_layer(layer_index);
            line_on_page = 0;
        }

        let y = PAGE_HEIGHT_MM - MARGIN_MM - (line_on_page as f32) * LINE_HEIGHT_MM;
        layer.use_text(truncate(line), FONT_SIZE, Mm(MARGIN_MM), Mm(y), &font);
        line_on_page += 1;
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer).map_err(|err| err.to_string())?;
    buffer
        .into_inner()
        .map_err(|err| format!("PDF buffer flush failed: {err}"))
}

fn truncate(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_CHARS {
        return line.to_string();
    }
    let mut truncated: String = line.chars().take(MAX_LINE_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}
