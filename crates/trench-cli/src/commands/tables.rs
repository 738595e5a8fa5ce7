use std::path::Path;

use trench_core::error::TrenchError;
use trench_core::extraction::lattice::LatticeExtractor;
use trench_core::extraction::pdftotext::PdftotextExtractor;
use trench_core::extraction::raster::{OcrTableExtractor, RasterOptions};
use trench_core::extraction::{PdfExtractor, RasterTableExtractor, VectorTableExtractor};

use crate::output;

pub fn run(input_file: &Path, page: usize, raster: bool, dpi: u32) -> Result<(), TrenchError> {
    let pdf_bytes = std::fs::read(input_file)?;

    let grids = if raster {
        let extractor = OcrTableExtractor::poppler_tesseract(RasterOptions {
            dpi,
            ..RasterOptions::default()
        });
        vec![extractor.extract_table(&pdf_bytes, page)?]
    } else {
        let pages = PdftotextExtractor::new().extract_pages(&pdf_bytes)?;
        LatticeExtractor::new().extract_tables(&pdf_bytes, &pages, &[page])?
    };

    let grids: Vec<_> = grids.into_iter().filter(|g| !g.is_empty()).collect();
    if grids.is_empty() {
        println!("No tables found on page {page}.");
        return Ok(());
    }
    for (i, grid) in grids.iter().enumerate() {
        if i > 0 {
            println!();
        }
        output::table::print_grid(i, grid);
    }
    Ok(())
}
