use image::{GrayImage, ImageFormat};
use std::path::Path;
use std::process::{Command, Output};

use super::{CellRecognizer, PageRasterizer};
use crate::error::TrenchError;

/// Renders pages with poppler's `pdftoppm`.
pub struct PdftoppmRasterizer;

impl PdftoppmRasterizer {
    pub fn is_available() -> bool {
        command_available("pdftoppm", "-v")
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, page: usize, dpi: u32) -> Result<GrayImage, TrenchError> {
        let out_dir = tempfile::TempDir::new()?;
        let output_root = out_dir.path().join("page");

        run_tool(
            "pdftoppm",
            Command::new("pdftoppm")
                .arg("-f")
                .arg(page.to_string())
                .arg("-l")
                .arg(page.to_string())
                .arg("-r")
                .arg(dpi.to_string())
                .arg("-gray")
                .arg("-singlefile")
                .arg("-png")
                .arg(pdf_path)
                .arg(&output_root),
        )?;

        let png_path = output_root.with_extension("png");
        if !png_path.exists() {
            return Err(TrenchError::ToolFailed {
                tool: "pdftoppm".into(),
                code: 0,
                stderr: format!("no image produced for page {page}"),
            });
        }
        Ok(image::open(&png_path)?.to_luma8())
    }
}

/// Recognizes one cell crop with the `tesseract` CLI.
pub struct TesseractRecognizer {
    /// Page segmentation mode; 6 treats the crop as one uniform block of text.
    pub psm: u8,
}

impl TesseractRecognizer {
    pub fn new(psm: u8) -> Self {
        TesseractRecognizer { psm }
    }

    pub fn is_available() -> bool {
        command_available("tesseract", "--version")
    }
}

impl CellRecognizer for TesseractRecognizer {
    fn recognize(&self, cell: &GrayImage) -> Result<String, TrenchError> {
        let crop = tempfile::Builder::new().suffix(".png").tempfile()?;
        cell.save_with_format(crop.path(), ImageFormat::Png)?;

        let output = run_tool(
            "tesseract",
            Command::new("tesseract")
                .arg(crop.path())
                .arg("stdout")
                .arg("--psm")
                .arg(self.psm.to_string()),
        )?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace('\u{0000}', "")
            .trim()
            .to_string())
    }
}

fn run_tool(tool: &str, command: &mut Command) -> Result<Output, TrenchError> {
    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TrenchError::ToolNotFound { tool: tool.into() }
        } else {
            TrenchError::Io(e)
        }
    })?;

    if !output.status.success() {
        return Err(TrenchError::ToolFailed {
            tool: tool.into(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

fn command_available(program: &str, version_flag: &str) -> bool {
    Command::new(program).arg(version_flag).output().is_ok()
}
