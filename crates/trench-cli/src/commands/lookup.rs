use std::path::Path;

use trench_core::error::TrenchError;
use trench_core::extraction::pdftotext::PdftotextExtractor;
use trench_core::lookup::po::lookup_po;
use trench_core::parse_application_pdf;

use crate::output;

pub fn application(input_file: &Path, output_format: &str) -> Result<(), TrenchError> {
    let pdf_bytes = std::fs::read(input_file)?;
    let details = parse_application_pdf(&pdf_bytes, &PdftotextExtractor::new())?;
    match output_format {
        "json" => output::json::print(&details)?,
        _ => output::table::print_application(&details),
    }
    Ok(())
}

pub fn po(workbook: &Path, site_id: &str, output_format: &str) -> Result<(), TrenchError> {
    let record = lookup_po(workbook, site_id)?;
    match output_format {
        "json" => output::json::print(&record)?,
        _ => output::table::print_po(&record),
    }
    Ok(())
}
