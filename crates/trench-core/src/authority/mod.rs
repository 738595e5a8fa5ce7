//! Per-authority parsing strategies and the registry that selects them.

pub mod mbmc;
pub mod mcgm;
pub mod unsupported;

use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::assemble::{AssembledRow, RowAssembler};
use crate::error::TrenchError;
use crate::fields::extractable_fields;
use crate::model::{Authority, FieldValues, ManualOverrides, TableGrid, TextBlob};
use crate::profile::builtin::load_builtin;
use crate::profile::schema::{AuthorityProfile, TableSources};
use unsupported::UnsupportedParser;

/// Everything the extractor batteries read from one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    pub text: TextBlob,
    pub vector_tables: Vec<TableGrid>,
    /// Empty when the authority has no raster page or OCR failed.
    pub raster_table: TableGrid,
}

/// One authority's way of turning a document into the two output rows.
pub trait AuthorityParser: Send + Sync {
    fn authority(&self) -> Authority;

    /// False for authorities listed as coming soon.
    fn is_supported(&self) -> bool;

    fn profile(&self) -> Result<&AuthorityProfile, TrenchError>;

    fn table_sources(&self) -> Result<&TableSources, TrenchError> {
        Ok(&self.profile()?.tables)
    }

    /// Run the extractor battery. Missing values come back empty, never as errors.
    fn extract_fields(&self, doc: &DocumentContext) -> Result<FieldValues, TrenchError>;

    fn assemble_non_refundable(
        &self,
        fields: &FieldValues,
        overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError>;

    fn assemble_sd(
        &self,
        fields: &FieldValues,
        overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError>;

    fn parse_non_refundable(
        &self,
        doc: &DocumentContext,
        overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError> {
        let fields = self.extract_fields(doc)?;
        self.assemble_non_refundable(&fields, overrides)
    }

    fn parse_sd(
        &self,
        doc: &DocumentContext,
        overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError> {
        let fields = self.extract_fields(doc)?;
        self.assemble_sd(&fields, overrides)
    }
}

/// Extractor battery for one authority.
pub type Battery = fn(&DocumentContext) -> FieldValues;

/// Profile-driven parser: a battery plus one assembler per output schema.
pub struct ProfileParser {
    profile: AuthorityProfile,
    battery: Battery,
    non_refundable: RowAssembler,
    sd: RowAssembler,
    today: Option<NaiveDate>,
}

impl ProfileParser {
    pub fn new(profile: AuthorityProfile, battery: Battery) -> Result<Self, TrenchError> {
        let extractable = extractable_fields(profile.authority);
        let non_refundable = RowAssembler::new(&profile.non_refundable, extractable)?;
        let sd = RowAssembler::new(&profile.sd, extractable)?;
        Ok(ProfileParser {
            profile,
            battery,
            non_refundable,
            sd,
            today: None,
        })
    }

    /// Pin the date used for day counts. Defaults to the local date at assembly time.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

impl AuthorityParser for ProfileParser {
    fn authority(&self) -> Authority {
        self.profile.authority
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn profile(&self) -> Result<&AuthorityProfile, TrenchError> {
        Ok(&self.profile)
    }

    fn extract_fields(&self, doc: &DocumentContext) -> Result<FieldValues, TrenchError> {
        let fields = (self.battery)(doc);
        let found = fields.iter().filter(|(_, v)| !v.is_empty()).count();
        info!(authority = %self.profile.authority, found, "fields extracted");
        for (key, value) in fields.iter() {
            debug!(field = %key, value = %value, "parsed field");
        }
        Ok(fields)
    }

    fn assemble_non_refundable(
        &self,
        fields: &FieldValues,
        overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError> {
        Ok(self.non_refundable.assemble(fields, overrides, self.today()))
    }

    fn assemble_sd(
        &self,
        fields: &FieldValues,
        overrides: &ManualOverrides,
    ) -> Result<AssembledRow, TrenchError> {
        Ok(self.sd.assemble(fields, overrides, self.today()))
    }
}

/// The battery that ships with an authority, if it has one.
pub fn builtin_battery(authority: Authority) -> Option<Battery> {
    match authority {
        Authority::Mcgm => Some(mcgm::battery),
        Authority::Mbmc => Some(mbmc::battery),
        Authority::Kdmc | Authority::MidcType1 | Authority::MidcType2 | Authority::Nmmc => None,
    }
}

/// Parsers keyed by authority. Every enumerated authority has an entry.
pub struct AuthorityRegistry {
    parsers: BTreeMap<Authority, Box<dyn AuthorityParser>>,
}

impl AuthorityRegistry {
    /// Builtin profiles for implemented authorities, stubs for the rest.
    pub fn builtin() -> Result<Self, TrenchError> {
        let mut parsers: BTreeMap<Authority, Box<dyn AuthorityParser>> = BTreeMap::new();
        for authority in Authority::ALL {
            let parser: Box<dyn AuthorityParser> = match builtin_battery(authority) {
                Some(battery) => Box::new(ProfileParser::new(load_builtin(authority)?, battery)?),
                None => Box::new(UnsupportedParser::new(authority)),
            };
            parsers.insert(authority, parser);
        }
        Ok(AuthorityRegistry { parsers })
    }

    /// Replace an authority's profile, keeping its builtin battery.
    pub fn with_profile(mut self, profile: AuthorityProfile) -> Result<Self, TrenchError> {
        let authority = profile.authority;
        let battery =
            builtin_battery(authority).ok_or(TrenchError::UnsupportedAuthority(authority))?;
        self.parsers
            .insert(authority, Box::new(ProfileParser::new(profile, battery)?));
        Ok(self)
    }

    pub fn register(&mut self, parser: Box<dyn AuthorityParser>) {
        self.parsers.insert(parser.authority(), parser);
    }

    pub fn get(&self, authority: Authority) -> Result<&dyn AuthorityParser, TrenchError> {
        self.parsers
            .get(&authority)
            .map(|p| p.as_ref())
            .ok_or(TrenchError::UnsupportedAuthority(authority))
    }

    /// Look up a parser by a loosely written authority identifier.
    pub fn resolve(&self, name: &str) -> Result<&dyn AuthorityParser, TrenchError> {
        let authority = Authority::from_str_loose(name)
            .ok_or_else(|| TrenchError::UnknownAuthority(name.to_string()))?;
        self.get(authority)
    }

    pub fn supported(&self) -> Vec<Authority> {
        self.parsers
            .values()
            .filter(|p| p.is_supported())
            .map(|p| p.authority())
            .collect()
    }

    pub fn coming_soon(&self) -> Vec<Authority> {
        self.parsers
            .values()
            .filter(|p| !p.is_supported())
            .map(|p| p.authority())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_authority() {
        let registry = AuthorityRegistry::builtin().unwrap();
        for authority in Authority::ALL {
            assert_eq!(registry.get(authority).unwrap().authority(), authority);
        }
        assert_eq!(registry.supported(), vec![Authority::Mbmc, Authority::Mcgm]);
        assert_eq!(registry.coming_soon().len(), 4);
    }

    #[test]
    fn test_resolve_loose_names() {
        let registry = AuthorityRegistry::builtin().unwrap();
        assert_eq!(registry.resolve("mcgm").unwrap().authority(), Authority::Mcgm);
        assert!(matches!(
            registry.resolve("PMC"),
            Err(TrenchError::UnknownAuthority(_))
        ));
    }

    #[test]
    fn test_stub_authority_reports_unsupported() {
        let registry = AuthorityRegistry::builtin().unwrap();
        let parser = registry.resolve("NMMC").unwrap();
        assert!(!parser.is_supported());
        let err = parser
            .parse_non_refundable(&DocumentContext::default(), &ManualOverrides::new())
            .unwrap_err();
        assert!(matches!(err, TrenchError::UnsupportedAuthority(Authority::Nmmc)));
    }

    #[test]
    fn test_custom_profile_requires_battery() {
        let mut profile = load_builtin(Authority::Mcgm).unwrap();
        profile.authority = Authority::Kdmc;
        let registry = AuthorityRegistry::builtin().unwrap();
        assert!(registry.with_profile(profile).is_err());
    }

    #[test]
    fn test_custom_profile_replaces_builtin() {
        let mut profile = load_builtin(Authority::Mcgm).unwrap();
        profile.description = Some("custom".into());
        let registry = AuthorityRegistry::builtin()
            .unwrap()
            .with_profile(profile)
            .unwrap();
        let parser = registry.get(Authority::Mcgm).unwrap();
        assert_eq!(
            parser.profile().unwrap().description.as_deref(),
            Some("custom")
        );
    }
}
