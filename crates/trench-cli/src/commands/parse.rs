use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use trench_core::authority::{AuthorityParser, AuthorityRegistry};
use trench_core::error::TrenchError;
use trench_core::extraction::lattice::LatticeExtractor;
use trench_core::extraction::pdftotext::PdftotextExtractor;
use trench_core::extraction::raster::ocr::{PdftoppmRasterizer, TesseractRecognizer};
use trench_core::extraction::raster::{OcrTableExtractor, RasterOptions};
use trench_core::model::ManualOverrides;
use trench_core::output::xlsx::write_row;
use trench_core::profile::load_profile;
use trench_core::{parse_pdf, Backends, ParsedDemandNote};

use crate::output;
use crate::DocumentArgs;

/// Split repeated "HEADER=VALUE" arguments. Only the first '=' separates.
fn parse_pairs(pairs: &[String], into: &mut ManualOverrides) -> Result<(), TrenchError> {
    for pair in pairs {
        let (header, value) = pair.split_once('=').ok_or_else(|| {
            TrenchError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("override '{pair}' is not of the form HEADER=VALUE"),
            ))
        })?;
        into.insert(header.trim().to_string(), value.to_string());
    }
    Ok(())
}

/// Overrides from the manual file first, then from the command line.
fn overrides(args: &DocumentArgs) -> Result<(ManualOverrides, ManualOverrides), TrenchError> {
    let mut non_refundable = ManualOverrides::new();
    let mut sd = ManualOverrides::new();

    if let Some(path) = &args.manual_file {
        let content = std::fs::read_to_string(path)?;
        let mut file: BTreeMap<String, ManualOverrides> = serde_json::from_str(&content)?;
        non_refundable.extend(file.remove("non_refundable").unwrap_or_default());
        sd.extend(file.remove("sd").unwrap_or_default());
    }

    parse_pairs(&args.manual, &mut non_refundable)?;
    parse_pairs(&args.sd_manual, &mut sd)?;
    Ok((non_refundable, sd))
}

fn parse_document(args: &DocumentArgs) -> Result<ParsedDemandNote, TrenchError> {
    let mut registry = AuthorityRegistry::builtin()?;
    if let Some(path) = &args.profile {
        registry = registry.with_profile(load_profile(path)?)?;
    }
    let parser = registry.resolve(&args.authority)?;
    if !parser.is_supported() {
        return Err(TrenchError::UnsupportedAuthority(parser.authority()));
    }

    if parser.table_sources()?.raster_page.is_some()
        && !(PdftoppmRasterizer::is_available() && TesseractRecognizer::is_available())
    {
        eprintln!("  warning: pdftoppm or tesseract not found, table fields fall back to text");
    }

    let (non_refundable, sd) = overrides(args)?;
    let pdf_bytes = std::fs::read(&args.input_file)?;

    let text = PdftotextExtractor::new();
    let vector = LatticeExtractor::new();
    let raster = OcrTableExtractor::poppler_tesseract(RasterOptions {
        dpi: args.dpi,
        downscale: args.downscale,
        ocr_workers: args.ocr_workers,
        ..RasterOptions::default()
    });

    parse_pdf(
        &pdf_bytes,
        Backends {
            text: &text,
            vector: &vector,
            raster: &raster,
        },
        parser,
        &non_refundable,
        &sd,
    )
}

fn warn_if_blank(parsed: &ParsedDemandNote) {
    if parsed.majority_blank() {
        eprintln!(
            "  warning: {} of {} dynamic fields are blank. Is this really a {} demand note?",
            parsed.non_refundable.blank_dynamic,
            parsed.non_refundable.dynamic_total,
            parsed.authority
        );
    }
}

pub fn run(args: &DocumentArgs, out_dir: &Path) -> Result<(), TrenchError> {
    let parsed = parse_document(args)?;

    std::fs::create_dir_all(out_dir)?;
    let nr_path = out_dir.join(parsed.non_refundable_filename());
    let sd_path = out_dir.join(parsed.sd_filename());
    write_row(&nr_path, &parsed.non_refundable.row)?;
    write_row(&sd_path, &parsed.sd.row)?;

    match args.output.as_str() {
        "json" => output::json::print(&serde_json::json!({
            "reference": parsed.reference(),
            "non_refundable_file": nr_path,
            "sd_file": sd_path,
            "majority_blank": parsed.majority_blank(),
        }))?,
        _ => {
            println!("Authority:      {}", parsed.authority);
            println!("Reference:      {}", parsed.reference());
            println!("Non Refundable: {}", nr_path.display());
            println!("SD:             {}", sd_path.display());
        }
    }
    warn_if_blank(&parsed);
    Ok(())
}

pub fn preview(args: &DocumentArgs) -> Result<(), TrenchError> {
    let parsed = parse_document(args)?;
    match args.output.as_str() {
        "json" => output::json::print(&parsed)?,
        _ => {
            output::table::print_row(&parsed.non_refundable.row);
            println!();
            output::table::print_row(&parsed.sd.row);
        }
    }
    warn_if_blank(&parsed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_split_on_first_equals() {
        let mut out = ManualOverrides::new();
        parse_pairs(&["PO No.=PO=1".to_string(), " Circle =MUM".to_string()], &mut out).unwrap();
        assert_eq!(out.get("PO No.").map(String::as_str), Some("PO=1"));
        assert_eq!(out.get("Circle").map(String::as_str), Some("MUM"));
        assert!(parse_pairs(&["novalue".to_string()], &mut out).is_err());
    }
}
