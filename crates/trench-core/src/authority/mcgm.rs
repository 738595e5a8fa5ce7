use crate::authority::{DocumentContext, ProfileParser};
use crate::error::TrenchError;
use crate::fields;
use crate::model::{Authority, FieldValues};
use crate::profile::builtin::load_builtin;

/// MCGM reads the text layer and the page-1 lattice tables.
pub fn battery(doc: &DocumentContext) -> FieldValues {
    fields::mcgm::extract_all(doc.text.as_str(), &doc.vector_tables)
}

pub fn parser() -> Result<ProfileParser, TrenchError> {
    ProfileParser::new(load_builtin(Authority::Mcgm)?, battery)
}
