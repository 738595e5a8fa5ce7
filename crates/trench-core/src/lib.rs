pub mod assemble;
pub mod authority;
pub mod error;
pub mod extraction;
pub mod fields;
pub mod lookup;
pub mod model;
pub mod output;
pub mod profile;
pub mod service;

use serde::Serialize;
use tracing::{debug, info, warn};

use assemble::AssembledRow;
use authority::{AuthorityParser, DocumentContext};
use error::TrenchError;
use extraction::{text_blob, PdfExtractor, RasterTableExtractor, VectorTableExtractor};
use fields::application::{parse_application, ApplicationDetails};
use model::{Authority, FieldKey, FieldValues, ManualOverrides};
use profile::schema::TableSources;

/// The three extraction backends a parse runs against.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub text: &'a dyn PdfExtractor,
    pub vector: &'a dyn VectorTableExtractor,
    pub raster: &'a dyn RasterTableExtractor,
}

/// Both output rows for one demand note.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDemandNote {
    pub authority: Authority,
    pub fields: FieldValues,
    pub non_refundable: AssembledRow,
    pub sd: AssembledRow,
}

impl ParsedDemandNote {
    /// Extracted demand-note reference used to name the output files.
    ///
    /// An operator override of the reference header changes the row only,
    /// not the filenames.
    pub fn reference(&self) -> &str {
        self.fields.get(FieldKey::DemandNoteReference)
    }

    /// Diagnostic for the operator, taken from the non-refundable row.
    pub fn majority_blank(&self) -> bool {
        self.non_refundable.majority_blank
    }

    pub fn non_refundable_filename(&self) -> String {
        output::non_refundable_filename(self.reference())
    }

    pub fn sd_filename(&self) -> String {
        output::sd_filename(self.reference())
    }
}

/// Read the text layer and the tables the authority's sources name.
///
/// An unreadable document is fatal. Table failures are logged and leave the
/// corresponding grids empty so the text fallbacks still run.
pub fn load_document(
    pdf_bytes: &[u8],
    backends: Backends<'_>,
    sources: &TableSources,
) -> Result<DocumentContext, TrenchError> {
    let pages = backends.text.extract_pages(pdf_bytes)?;
    let text = text_blob(&pages);
    info!(
        pages = pages.len(),
        backend = backends.text.backend_name(),
        "text layer extracted"
    );
    debug!(text = %text.as_str(), "full text");

    let vector_tables = if sources.vector_pages.is_empty() {
        Vec::new()
    } else {
        match backends
            .vector
            .extract_tables(pdf_bytes, &pages, &sources.vector_pages)
        {
            Ok(tables) => tables,
            Err(e) => {
                warn!(error = %e, backend = backends.vector.backend_name(), "vector table extraction failed");
                Vec::new()
            }
        }
    };

    let raster_table = match sources.raster_page {
        Some(page) => match backends.raster.extract_table(pdf_bytes, page) {
            Ok(grid) => grid,
            Err(e) => {
                warn!(error = %e, page, backend = backends.raster.backend_name(), "raster table extraction failed");
                model::TableGrid::empty()
            }
        },
        None => model::TableGrid::empty(),
    };

    Ok(DocumentContext {
        text,
        vector_tables,
        raster_table,
    })
}

/// Assemble both rows from already extracted fields.
pub fn assemble_rows(
    parser: &dyn AuthorityParser,
    fields: FieldValues,
    non_refundable_overrides: &ManualOverrides,
    sd_overrides: &ManualOverrides,
) -> Result<ParsedDemandNote, TrenchError> {
    let non_refundable = parser.assemble_non_refundable(&fields, non_refundable_overrides)?;
    let sd = parser.assemble_sd(&fields, sd_overrides)?;
    if non_refundable.majority_blank {
        warn!(
            authority = %parser.authority(),
            blank = non_refundable.blank_dynamic,
            of = non_refundable.dynamic_total,
            "most dynamic fields are blank; document may not match the authority template"
        );
    }
    Ok(ParsedDemandNote {
        authority: parser.authority(),
        fields,
        non_refundable,
        sd,
    })
}

/// Main API entry point: parse one demand note into its two output rows.
pub fn parse_pdf(
    pdf_bytes: &[u8],
    backends: Backends<'_>,
    parser: &dyn AuthorityParser,
    non_refundable_overrides: &ManualOverrides,
    sd_overrides: &ManualOverrides,
) -> Result<ParsedDemandNote, TrenchError> {
    if !parser.is_supported() {
        return Err(TrenchError::UnsupportedAuthority(parser.authority()));
    }
    let doc = load_document(pdf_bytes, backends, parser.table_sources()?)?;
    let fields = parser.extract_fields(&doc)?;
    assemble_rows(parser, fields, non_refundable_overrides, sd_overrides)
}

/// Parse a ROW application letter.
pub fn parse_application_pdf(
    pdf_bytes: &[u8],
    extractor: &dyn PdfExtractor,
) -> Result<ApplicationDetails, TrenchError> {
    let pages = extractor.extract_pages(pdf_bytes)?;
    Ok(parse_application(text_blob(&pages).as_str()))
}
