pub mod lattice;
pub mod pdftotext;
pub mod raster;

use crate::error::TrenchError;
use crate::model::{TableGrid, TextBlob};

/// Axis-aligned box in PDF points, origin at the top-left of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }
}

/// One word of the text layer with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    pub text: String,
    pub bbox: BBox,
}

/// Content extracted from a single page of a PDF.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub page_number: usize,
    pub lines: Vec<String>,
    pub words: Vec<WordBox>,
}

/// Join every page's lines into one blob, pages separated by newlines.
pub fn text_blob(pages: &[PageContent]) -> TextBlob {
    let per_page: Vec<String> = pages.iter().map(|p| p.lines.join("\n")).collect();
    TextBlob::from_pages(&per_page)
}

/// Reject input that does not carry a PDF header before handing it to any tool.
pub fn ensure_pdf(pdf_bytes: &[u8]) -> Result<(), TrenchError> {
    let head = &pdf_bytes[..pdf_bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(TrenchError::DocumentUnreadable(
            "missing %PDF- header".into(),
        ))
    }
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract text content from PDF bytes, returning one PageContent per page.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, TrenchError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Ruled-table detection from a page's vector drawing instructions.
///
/// Finding no table is not an error: implementations return an empty vec.
pub trait VectorTableExtractor: Send + Sync {
    /// `pages` are 1-based. `text` supplies the word positions used to fill cells.
    fn extract_tables(
        &self,
        pdf_bytes: &[u8],
        text: &[PageContent],
        pages: &[usize],
    ) -> Result<Vec<TableGrid>, TrenchError>;

    fn backend_name(&self) -> &str;
}

/// Table reconstruction from a rendered page image.
pub trait RasterTableExtractor: Send + Sync {
    /// Grid of the largest ruled table on the 1-based `page`.
    fn extract_table(&self, pdf_bytes: &[u8], page: usize) -> Result<TableGrid, TrenchError>;

    fn backend_name(&self) -> &str;
}
