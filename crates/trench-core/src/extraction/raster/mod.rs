//! Table reconstruction from rendered page pixels.
//!
//! Some authorities distribute the charge table as a scan, so the grid has
//! to be inferred from the image: ruling lines are isolated with
//! morphology, the enclosed cell interiors become boxes, boxes are grouped
//! into rows by their top edge and each box is OCR'd on its own.
//! Pages are assumed upright; skewed scans will mis-cluster.

pub mod morphology;
pub mod ocr;

use image::imageops::{self, FilterType};
use image::GrayImage;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::TrenchError;
use crate::extraction::{ensure_pdf, RasterTableExtractor};
use crate::model::TableGrid;
use morphology::{
    blend, cluster_rows, connected_components, dilate, erode, invert, otsu_level, threshold,
    threshold_inverse, CellBox,
};

/// Tuning for the raster pipeline. Pixel values refer to the downscaled working image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterOptions {
    pub dpi: u32,
    /// Applied after rendering with Lanczos resampling; 1.0 disables it.
    pub downscale: f32,
    pub row_tolerance: u32,
    pub min_cell_area: u32,
    pub cell_pad: u32,
    pub ocr_workers: usize,
    pub psm: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        RasterOptions {
            dpi: 300,
            downscale: 0.7,
            row_tolerance: 10,
            min_cell_area: 1000,
            cell_pad: 2,
            ocr_workers: 4,
            psm: 6,
        }
    }
}

/// Renders one PDF page to a grayscale image.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path, page: usize, dpi: u32) -> Result<GrayImage, TrenchError>;
}

/// Reads the text of a single cell crop.
pub trait CellRecognizer: Send + Sync {
    fn recognize(&self, cell: &GrayImage) -> Result<String, TrenchError>;
}

/// Raster table extractor generic over its rendering and OCR backends.
pub struct OcrTableExtractor<R, C> {
    rasterizer: R,
    recognizer: C,
    options: RasterOptions,
}

impl OcrTableExtractor<ocr::PdftoppmRasterizer, ocr::TesseractRecognizer> {
    /// pdftoppm + tesseract, the production pairing.
    pub fn poppler_tesseract(options: RasterOptions) -> Self {
        let psm = options.psm;
        OcrTableExtractor::new(
            ocr::PdftoppmRasterizer,
            ocr::TesseractRecognizer::new(psm),
            options,
        )
    }
}

impl<R: PageRasterizer, C: CellRecognizer> OcrTableExtractor<R, C> {
    pub fn new(rasterizer: R, recognizer: C, options: RasterOptions) -> Self {
        OcrTableExtractor {
            rasterizer,
            recognizer,
            options,
        }
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Downscale a freshly rendered page to the working resolution.
    pub fn working_image(&self, page: &GrayImage) -> GrayImage {
        let factor = self.options.downscale;
        if factor <= 0.0 || factor >= 1.0 {
            return page.clone();
        }
        let w = ((page.width() as f32 * factor).round() as u32).max(1);
        let h = ((page.height() as f32 * factor).round() as u32).max(1);
        imageops::resize(page, w, h, FilterType::Lanczos3)
    }

    /// Cell boxes of the working image, grouped into rows.
    pub fn detect_cells(&self, img: &GrayImage) -> Vec<Vec<CellBox>> {
        let bin = threshold_inverse(img, otsu_level(img));

        let kernel_len = (img.width() / 100).max(1);
        let vertical = dilate(&erode(&bin, 1, kernel_len, 3), 1, kernel_len, 3);
        let horizontal = dilate(&erode(&bin, kernel_len, 1, 3), kernel_len, 1, 3);

        let rules = blend(&vertical, &horizontal, 0.5, 0.5);
        let interiors = erode(&invert(&rules), 2, 2, 2);
        let mask = threshold(&interiors, otsu_level(&interiors));

        let boxes: Vec<CellBox> = connected_components(&mask)
            .into_iter()
            .filter(|b| b.area() > self.options.min_cell_area)
            .collect();
        debug!(cells = boxes.len(), kernel_len, "raster cell detection");
        cluster_rows(boxes, self.options.row_tolerance)
    }

    fn crop(&self, img: &GrayImage, b: &CellBox) -> GrayImage {
        let pad = self.options.cell_pad;
        let x = b.x.saturating_sub(pad);
        let y = b.y.saturating_sub(pad);
        let w = (b.width + 2 * pad).min(img.width() - x);
        let h = (b.height + 2 * pad).min(img.height() - y);
        imageops::crop_imm(img, x, y, w, h).to_image()
    }

    /// Run the full pipeline on an already rendered page.
    pub fn table_from_image(&self, page: &GrayImage) -> Result<TableGrid, TrenchError> {
        let img = self.working_image(page);
        let rows = self.detect_cells(&img);

        let jobs: Vec<(usize, GrayImage)> = rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().map(move |b| (r, b)))
            .map(|(r, b)| (r, self.crop(&img, b)))
            .collect();

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.options.ocr_workers.max(1))
            .build()
            .map_err(|e| TrenchError::Image(e.to_string()))?;

        // Results come back in job order, so cells stay positional.
        let texts: Vec<(usize, String)> = pool.install(|| {
            jobs.into_par_iter()
                .map(|(r, crop)| self.recognizer.recognize(&crop).map(|t| (r, t.trim().to_string())))
                .collect::<Result<Vec<_>, TrenchError>>()
        })?;

        let mut grid: Vec<Vec<String>> = vec![Vec::new(); rows.len()];
        for (r, text) in texts {
            grid[r].push(text);
        }

        let table = TableGrid::new(grid);
        info!(rows = table.row_count(), cols = table.column_count(), "raster table recognized");
        debug!(grid = ?table.rows(), "raster table");
        Ok(table)
    }
}

impl<R: PageRasterizer, C: CellRecognizer> RasterTableExtractor for OcrTableExtractor<R, C> {
    fn extract_table(&self, pdf_bytes: &[u8], page: usize) -> Result<TableGrid, TrenchError> {
        ensure_pdf(pdf_bytes)?;
        let mut tmpfile = tempfile::NamedTempFile::new()?;
        tmpfile.write_all(pdf_bytes)?;

        let rendered = self
            .rasterizer
            .rasterize(tmpfile.path(), page, self.options.dpi)?;
        debug!(page, width = rendered.width(), height = rendered.height(), "page rasterized");
        self.table_from_image(&rendered)
    }

    fn backend_name(&self) -> &str {
        "raster-ocr"
    }
}
