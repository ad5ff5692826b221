use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use printpdf::{BuiltinFont, Mm, PdfDocument};

// A4, 10 mm margins, one 10 mm cell per source line.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const LINE_HEIGHT: f32 = 10.0;
const FONT_SIZE: f32 = 12.0;
// Baseline offset inside a cell so the text sits vertically centred.
const BASELINE: f32 = 3.5;

/// Lines that fit on one page.
pub const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2.0 * MARGIN) / LINE_HEIGHT) as usize;

/// Write every line of the UTF-8 text file `source` into a PDF at `target`.
pub fn write_text_pdf(source: &Path, target: &Path) -> Result<()> {
    let bytes = std::fs::read(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let text = String::from_utf8(bytes).context("Text file is not valid UTF-8")?;
    let text = text.replace('\t', "    ");
    check_drawable(&text)?;

    let title = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("Failed to load PDF font: {}", e))?;

    let mut layer = doc.get_page(page).get_layer(layer);

    for (index, lines) in paginate(&text).into_iter().enumerate() {
        if index > 0 {
            let (page, next) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(next);
        }

        for (row, line) in lines.into_iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let top = PAGE_HEIGHT - MARGIN - LINE_HEIGHT * (row as f32 + 1.0);
            layer.use_text(line, FONT_SIZE, Mm(MARGIN), Mm(top + BASELINE), &font);
        }
    }

    let file = File::create(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow!("Failed to write PDF: {}", e))?;

    Ok(())
}

/// The built-in Helvetica only covers Latin-1; anything else would vanish
/// from the page instead of failing.
fn check_drawable(text: &str) -> Result<()> {
    for (number, line) in text.lines().enumerate() {
        if let Some(c) = line.chars().find(|&c| !is_drawable(c)) {
            anyhow::bail!(
                "Line {} contains {:?} (U+{:04X}), which the PDF font cannot display",
                number + 1,
                c,
                c as u32
            );
        }
    }
    Ok(())
}

fn is_drawable(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}')
}

/// Trimmed lines grouped into pages. Always at least one page.
fn paginate(text: &str) -> Vec<Vec<&str>> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    if lines.is_empty() {
        return vec![Vec::new()];
    }
    lines.chunks(LINES_PER_PAGE).map(<[&str]>::to_vec).collect()
}
