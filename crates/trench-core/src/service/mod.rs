//! Preview workflow: parse once, then rebuild rows as the operator edits.

pub mod cache;

use uuid::Uuid;

use crate::authority::AuthorityRegistry;
use crate::error::TrenchError;
use crate::model::ManualOverrides;
use crate::ParsedDemandNote;
use cache::{CachedParse, ExpiryPolicy, PreviewCache};

pub struct PreviewService<P: ExpiryPolicy> {
    registry: AuthorityRegistry,
    cache: PreviewCache<P>,
}

impl<P: ExpiryPolicy> PreviewService<P> {
    pub fn new(registry: AuthorityRegistry, policy: P) -> Self {
        PreviewService {
            registry,
            cache: PreviewCache::new(policy),
        }
    }

    pub fn registry(&self) -> &AuthorityRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &PreviewCache<P> {
        &self.cache
    }

    /// Keep a parse's extracted fields for later regeneration.
    pub fn store(&self, parsed: &ParsedDemandNote, source_name: Option<String>) -> Uuid {
        self.cache.insert(CachedParse {
            authority: parsed.authority,
            fields: parsed.fields.clone(),
            source_name,
        })
    }

    /// Rebuild both rows for a cached parse with new overrides.
    pub fn regenerate(
        &self,
        id: &Uuid,
        non_refundable_overrides: &ManualOverrides,
        sd_overrides: &ManualOverrides,
    ) -> Result<ParsedDemandNote, TrenchError> {
        let cached = self
            .cache
            .get(id)
            .ok_or(TrenchError::PreviewNotFound(*id))?;
        let parser = self.registry.get(cached.authority)?;
        crate::assemble_rows(parser, cached.fields, non_refundable_overrides, sd_overrides)
    }
}
