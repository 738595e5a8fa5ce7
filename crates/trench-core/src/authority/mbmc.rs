use crate::authority::{DocumentContext, ProfileParser};
use crate::error::TrenchError;
use crate::fields;
use crate::model::{Authority, FieldValues};
use crate::profile::builtin::load_builtin;

/// MBMC reads the OCR'd page-2 grid, with vector tables and text as fallbacks.
pub fn battery(doc: &DocumentContext) -> FieldValues {
    fields::mbmc::extract_all(doc.text.as_str(), &doc.vector_tables, &doc.raster_table)
}

pub fn parser() -> Result<ProfileParser, TrenchError> {
    ProfileParser::new(load_builtin(Authority::Mbmc)?, battery)
}
