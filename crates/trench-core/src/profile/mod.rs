//! Authority profiles: output schemas, static values and table sources as data.

pub mod builtin;
pub mod schema;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::TrenchError;
use crate::fields::extractable_fields;
use crate::model::FieldKey;
use schema::{AuthorityProfile, HeaderRole, SchemaDef};

/// Load a profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<AuthorityProfile, TrenchError> {
    let content = std::fs::read_to_string(path).map_err(|e| TrenchError::ProfileLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_profile(&content, path)
}

/// Parse a profile from a JSON string.
pub fn parse_profile(json: &str, source: &Path) -> Result<AuthorityProfile, TrenchError> {
    let profile: AuthorityProfile =
        serde_json::from_str(json).map_err(|e| TrenchError::ProfileLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_profile(&profile)?;
    Ok(profile)
}

/// Parse a profile from a JSON string (no file path context).
pub fn parse_profile_str(json: &str) -> Result<AuthorityProfile, TrenchError> {
    let profile: AuthorityProfile = serde_json::from_str(json)?;
    validate_profile(&profile)?;
    Ok(profile)
}

/// Validate both schemas of a profile against what its authority can extract.
pub fn validate_profile(profile: &AuthorityProfile) -> Result<(), TrenchError> {
    let extractable = extractable_fields(profile.authority);
    validate_schema(&profile.non_refundable, extractable)?;
    validate_schema(&profile.sd, extractable)?;

    if profile.tables.vector_pages.contains(&0) || profile.tables.raster_page == Some(0) {
        return Err(TrenchError::SchemaInvalid(format!(
            "{}: table pages are 1-based",
            profile.authority
        )));
    }
    Ok(())
}

/// Check that a schema is complete and computable.
///
/// Every header is classified by construction. This rejects duplicate or
/// empty names, extracted fields the authority has no extractor for,
/// derived fields whose inputs nothing produces, derivation cycles and
/// dynamic headers that are not in the schema.
pub fn validate_schema(schema: &SchemaDef, extractable: &[FieldKey]) -> Result<(), TrenchError> {
    if schema.headers.is_empty() {
        return Err(TrenchError::SchemaInvalid(format!(
            "schema '{}' has no headers",
            schema.name
        )));
    }

    let mut seen = BTreeSet::new();
    for header in &schema.headers {
        if header.name.trim().is_empty() {
            return Err(TrenchError::SchemaInvalid(format!(
                "schema '{}' has a header with an empty name",
                schema.name
            )));
        }
        if !seen.insert(header.name.as_str()) {
            return Err(TrenchError::SchemaInvalid(format!(
                "schema '{}' repeats header '{}'",
                schema.name, header.name
            )));
        }
        if let HeaderRole::Extracted { field } = &header.role {
            if !extractable.contains(field) {
                return Err(TrenchError::SchemaInvalid(format!(
                    "header '{}' is bound to '{}', which this authority does not extract",
                    header.name, field
                )));
            }
        }
    }

    derivation_order(schema, extractable)?;

    if let Some(dynamic) = &schema.dynamic_headers {
        for name in dynamic {
            if !seen.contains(name.as_str()) {
                return Err(TrenchError::SchemaInvalid(format!(
                    "dynamic header '{}' is not in schema '{}'",
                    name, schema.name
                )));
            }
        }
    }

    Ok(())
}

/// Derived fields in an order where every input is known before it is used.
pub fn derivation_order(
    schema: &SchemaDef,
    extractable: &[FieldKey],
) -> Result<Vec<FieldKey>, TrenchError> {
    let mut pending: BTreeMap<FieldKey, Vec<FieldKey>> = BTreeMap::new();
    for header in &schema.headers {
        if let HeaderRole::Derived { field, formula } = &header.role {
            if extractable.contains(field) {
                return Err(TrenchError::SchemaInvalid(format!(
                    "header '{}' derives '{}', which is already extracted",
                    header.name, field
                )));
            }
            pending.entry(*field).or_insert_with(|| formula.inputs());
        }
    }

    let mut known: BTreeSet<FieldKey> = extractable.iter().copied().collect();
    let mut order = Vec::new();
    while !pending.is_empty() {
        let ready: Vec<FieldKey> = pending
            .iter()
            .filter(|(_, inputs)| inputs.iter().all(|i| known.contains(i)))
            .map(|(field, _)| *field)
            .collect();

        if ready.is_empty() {
            let stuck: Vec<String> = pending
                .iter()
                .flat_map(|(field, inputs)| {
                    inputs
                        .iter()
                        .filter(|i| !known.contains(i))
                        .map(move |i| format!("{field} <- {i}"))
                })
                .collect();
            return Err(TrenchError::SchemaInvalid(format!(
                "schema '{}' has derived fields with unavailable or cyclic inputs: {}",
                schema.name,
                stuck.join(", ")
            )));
        }

        for field in ready {
            pending.remove(&field);
            known.insert(field);
            order.push(field);
        }
    }
    Ok(order)
}
