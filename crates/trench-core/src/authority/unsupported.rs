use crate::assemble::AssembledRow;
use crate::authority::{AuthorityParser, DocumentContext};
use crate::error::TrenchError;
use crate::model::{Authority, FieldValues, ManualOverrides};
use crate::profile::schema::AuthorityProfile;

/// Placeholder for an authority in the enumerated set that has no parser yet.
/// Every operation fails with [`TrenchError::UnsupportedAuthority`].
pub struct UnsupportedParser {
    authority: Authority,
}

impl UnsupportedParser {
    pub fn new(authority: Authority) -> Self {
        UnsupportedParser { authority }
    }

    fn unsupported<T>(&self) -> Result<T, TrenchError> {
        Err(TrenchError::UnsupportedAuthority(self.authority))
    }
}

impl AuthorityParser for UnsupportedParser {
    fn authority(&self) -> Authority {
        self.authority
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn profile(&self) -> Result<&AuthorityProfile, TrenchError> {
        self.unsupported()
    }

    fn extract_fields(&self, _doc: &DocumentContext) -> Result<FieldValues, TrenchError> {
        self.unsupported()
    }

    fn assemble_non_refundable(
        &self,
        _fields: &FieldValues,
        _overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError> {
        self.unsupported()
    }

    fn assemble_sd(
        &self,
        _fields: &FieldValues,
        _overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError> {
        self.unsupported()
    }
}
