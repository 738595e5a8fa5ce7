//! Row assembly: merge extracted, static, derived and manual values into one
//! row that matches a schema header for header.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::TrenchError;
use crate::fields::dates::days_since;
use crate::fields::numeric::sum_lenient;
use crate::model::{FieldKey, FieldValues, ManualOverrides, OutputRow};
use crate::profile::derivation_order;
use crate::profile::schema::{Formula, HeaderRole, SchemaDef};
use crate::profile::validate_schema;

/// A finished row plus the blank-ratio diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledRow {
    pub row: OutputRow,
    /// Most dynamic headers came out blank; the document probably does not
    /// match the authority's template.
    pub majority_blank: bool,
    pub blank_dynamic: usize,
    pub dynamic_total: usize,
}

/// Builds rows for one validated schema.
#[derive(Debug, Clone)]
pub struct RowAssembler {
    schema: SchemaDef,
    derivations: Vec<(FieldKey, Formula)>,
}

impl RowAssembler {
    /// Validate `schema` against the fields the authority can extract.
    ///
    /// Fails when any header cannot be produced, so a row never silently
    /// carries an unclassified blank.
    pub fn new(schema: &SchemaDef, extractable: &[FieldKey]) -> Result<Self, TrenchError> {
        validate_schema(schema, extractable)?;
        let order = derivation_order(schema, extractable)?;

        let derivations = order
            .into_iter()
            .filter_map(|field| {
                schema.headers.iter().find_map(|h| match &h.role {
                    HeaderRole::Derived { field: f, formula } if *f == field => {
                        Some((field, formula.clone()))
                    }
                    _ => None,
                })
            })
            .collect();

        Ok(RowAssembler {
            schema: schema.clone(),
            derivations,
        })
    }

    pub fn schema(&self) -> &SchemaDef {
        &self.schema
    }

    /// Extracted values plus every derived field, computed in dependency order.
    pub fn derive(&self, fields: &FieldValues, today: NaiveDate) -> FieldValues {
        let mut values = fields.clone();
        for (field, formula) in &self.derivations {
            let value = match formula {
                Formula::Sum { of } => sum_lenient(of.iter().map(|k| values.get(*k))),
                Formula::Copy { from } => values.get(*from).to_string(),
                Formula::DaysSince { date } => days_since(values.get(*date), today),
            };
            debug!(field = %field, value = %value, "derived field");
            values.set(*field, value);
        }
        values
    }

    /// Build the row: static and field values first, then overrides by header name.
    pub fn assemble(
        &self,
        fields: &FieldValues,
        overrides: &ManualOverrides,
        today: NaiveDate,
    ) -> AssembledRow {
        let values = self.derive(fields, today);

        let headers: Vec<String> = self.schema.headers.iter().map(|h| h.name.clone()).collect();
        let editable: Vec<bool> = self.schema.headers.iter().map(|h| h.editable).collect();
        let mut row: Vec<String> = self
            .schema
            .headers
            .iter()
            .map(|h| match &h.role {
                HeaderRole::Static { value } => value.clone(),
                HeaderRole::Extracted { field } | HeaderRole::Derived { field, .. } => {
                    values.get(*field).to_string()
                }
                HeaderRole::Manual => String::new(),
            })
            .collect();

        for (header, value) in overrides {
            match headers.iter().position(|h| h == header) {
                Some(i) => row[i] = value.clone(),
                None => warn!(
                    schema = %self.schema.name,
                    header = %header,
                    "override targets a header that is not in the schema, ignored"
                ),
            }
        }

        let dynamic = self.schema.dynamic_header_names();
        let present: Vec<usize> = dynamic
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == name))
            .collect();
        let blank = present.iter().filter(|&&i| row[i].trim().is_empty()).count();
        let flagged = majority_blank(blank, present.len());

        debug!(
            schema = %self.schema.name,
            blank,
            dynamic = present.len(),
            majority_blank = flagged,
            "row assembled"
        );

        AssembledRow {
            row: OutputRow {
                schema: self.schema.name.clone(),
                headers,
                values: row,
                editable,
            },
            majority_blank: flagged,
            blank_dynamic: blank,
            dynamic_total: present.len(),
        }
    }
}

/// True when `blank >= total / 2 + 1` (integer division). Never true for an
/// empty dynamic set.
pub fn majority_blank(blank: usize, total: usize) -> bool {
    total > 0 && blank > total / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::schema::HeaderDef;

    fn header(name: &str, role: HeaderRole) -> HeaderDef {
        HeaderDef {
            name: name.into(),
            role,
            editable: false,
        }
    }

    fn schema() -> SchemaDef {
        SchemaDef {
            name: "Test Output".into(),
            headers: vec![
                header(
                    "Circle",
                    HeaderRole::Static {
                        value: "MUM".into(),
                    },
                ),
                header(
                    "SD",
                    HeaderRole::Extracted {
                        field: FieldKey::SdAmount,
                    },
                ),
                header(
                    "GST",
                    HeaderRole::Extracted {
                        field: FieldKey::GstAmount,
                    },
                ),
                header(
                    "Total",
                    HeaderRole::Derived {
                        field: FieldKey::TotalDnAmount,
                        formula: Formula::Sum {
                            of: vec![FieldKey::SdAmount, FieldKey::GstAmount],
                        },
                    },
                ),
                header(
                    "Received",
                    HeaderRole::Derived {
                        field: FieldKey::DnReceivedDate,
                        formula: Formula::Copy {
                            from: FieldKey::DemandNoteDate,
                        },
                    },
                ),
                header(
                    "Age",
                    HeaderRole::Derived {
                        field: FieldKey::DaysSinceDemandNote,
                        formula: Formula::DaysSince {
                            date: FieldKey::DnReceivedDate,
                        },
                    },
                ),
                header("PO No.", HeaderRole::Manual),
            ],
            dynamic_headers: None,
        }
    }

    const EXTRACTABLE: &[FieldKey] = &[
        FieldKey::SdAmount,
        FieldKey::GstAmount,
        FieldKey::DemandNoteDate,
    ];

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn fields() -> FieldValues {
        let mut f = FieldValues::new();
        f.set(FieldKey::SdAmount, "1,000");
        f.set(FieldKey::GstAmount, "2500.5");
        f.set(FieldKey::DemandNoteDate, "05/03/2025");
        f
    }

    #[test]
    fn test_row_length_matches_headers() {
        let assembler = RowAssembler::new(&schema(), EXTRACTABLE).unwrap();
        let out = assembler.assemble(&FieldValues::new(), &ManualOverrides::new(), today());
        assert_eq!(out.row.values.len(), schema().headers.len());
        assert_eq!(out.row.editable.len(), out.row.len());
    }

    #[test]
    fn test_static_and_derived_values() {
        let assembler = RowAssembler::new(&schema(), EXTRACTABLE).unwrap();
        let out = assembler.assemble(&fields(), &ManualOverrides::new(), today());
        assert_eq!(out.row.get("Circle"), Some("MUM"));
        assert_eq!(out.row.get("Total"), Some("3500.5"));
        assert_eq!(out.row.get("Received"), Some("05/03/2025"));
        assert_eq!(out.row.get("Age"), Some("10"));
        assert_eq!(out.row.get("PO No."), Some(""));
    }

    #[test]
    fn test_sum_treats_missing_inputs_as_zero() {
        let assembler = RowAssembler::new(&schema(), EXTRACTABLE).unwrap();
        let mut f = FieldValues::new();
        f.set(FieldKey::SdAmount, "100");
        f.set(FieldKey::GstAmount, "n/a");
        let out = assembler.assemble(&f, &ManualOverrides::new(), today());
        assert_eq!(out.row.get("Total"), Some("100"));
        assert_eq!(out.row.get("Age"), Some(""));
    }

    #[test]
    fn test_override_wins_over_static_and_extracted() {
        let assembler = RowAssembler::new(&schema(), EXTRACTABLE).unwrap();
        let mut overrides = ManualOverrides::new();
        overrides.insert("Circle".into(), "PUN".into());
        overrides.insert("SD".into(), "7".into());
        overrides.insert("Not A Header".into(), "x".into());
        let out = assembler.assemble(&fields(), &overrides, today());
        assert_eq!(out.row.get("Circle"), Some("PUN"));
        assert_eq!(out.row.get("SD"), Some("7"));
        assert_eq!(out.row.len(), 7);
    }

    #[test]
    fn test_majority_blank_boundary() {
        assert!(!majority_blank(5, 10));
        assert!(majority_blank(6, 10));
        assert!(majority_blank(2, 3));
        assert!(!majority_blank(0, 0));
    }

    #[test]
    fn test_blank_document_is_flagged() {
        let assembler = RowAssembler::new(&schema(), EXTRACTABLE).unwrap();
        let out = assembler.assemble(&FieldValues::new(), &ManualOverrides::new(), today());
        // SD, GST, Received, Age blank; Total renders "0"
        assert_eq!(out.dynamic_total, 5);
        assert_eq!(out.blank_dynamic, 4);
        assert!(out.majority_blank);

        let full = assembler.assemble(&fields(), &ManualOverrides::new(), today());
        assert!(!full.majority_blank);
    }

    #[test]
    fn test_unproducible_header_fails_construction() {
        let mut bad = schema();
        bad.headers.push(header(
            "Route",
            HeaderRole::Extracted {
                field: FieldKey::TotalRoute,
            },
        ));
        assert!(RowAssembler::new(&bad, EXTRACTABLE).is_err());
    }
}
