use serde::{Deserialize, Serialize};

use crate::model::{Authority, FieldKey};

/// Everything needed to turn one authority's demand note into output rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityProfile {
    pub authority: Authority,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tables: TableSources,
    pub non_refundable: SchemaDef,
    pub sd: SchemaDef,
}

/// Which table extractors run for this authority. Fixed per authority;
/// there is no adaptive switching between vector and raster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSources {
    /// 1-based pages handed to the vector (lattice) extractor.
    #[serde(default)]
    pub vector_pages: Vec<usize>,
    /// 1-based page rendered and OCR'd for the raster grid.
    #[serde(default)]
    pub raster_page: Option<usize>,
}

/// One output schema: ordered headers, each explicitly classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    pub headers: Vec<HeaderDef>,
    /// Headers counted by the majority-blank diagnostic. When absent every
    /// extracted or derived header counts.
    #[serde(default)]
    pub dynamic_headers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderDef {
    pub name: String,
    #[serde(flatten)]
    pub role: HeaderRole,
    /// Highlighted as an operator-editable column.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub editable: bool,
}

/// Where a header's value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum HeaderRole {
    Static { value: String },
    Extracted { field: FieldKey },
    Derived { field: FieldKey, formula: Formula },
    Manual,
}

impl HeaderRole {
    /// The logical field this header carries, if any.
    pub fn field(&self) -> Option<FieldKey> {
        match self {
            HeaderRole::Extracted { field } | HeaderRole::Derived { field, .. } => Some(*field),
            HeaderRole::Static { .. } | HeaderRole::Manual => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HeaderRole::Static { .. } => "static",
            HeaderRole::Extracted { .. } => "extracted",
            HeaderRole::Derived { .. } => "derived",
            HeaderRole::Manual => "manual",
        }
    }
}

/// Computation over already known field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    /// Lenient sum; missing or non-numeric inputs count as zero.
    Sum { of: Vec<FieldKey> },
    Copy { from: FieldKey },
    /// Whole days from the date field to today; blank when the date is.
    DaysSince { date: FieldKey },
}

impl Formula {
    pub fn inputs(&self) -> Vec<FieldKey> {
        match self {
            Formula::Sum { of } => of.clone(),
            Formula::Copy { from } => vec![*from],
            Formula::DaysSince { date } => vec![*date],
        }
    }
}

impl SchemaDef {
    pub fn header_names(&self) -> Vec<&str> {
        self.headers.iter().map(|h| h.name.as_str()).collect()
    }

    /// First header bound to `field`.
    pub fn header_for_field(&self, field: FieldKey) -> Option<&HeaderDef> {
        self.headers.iter().find(|h| h.role.field() == Some(field))
    }

    /// Names of the headers the blank-ratio diagnostic looks at.
    pub fn dynamic_header_names(&self) -> Vec<&str> {
        match &self.dynamic_headers {
            Some(names) => names.iter().map(|s| s.as_str()).collect(),
            None => self
                .headers
                .iter()
                .filter(|h| h.role.field().is_some())
                .map(|h| h.name.as_str())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roles_deserialize_from_tagged_json() {
        let json = r#"[
            {"name": "Circle", "role": "static", "value": "MUM"},
            {"name": "DN No", "role": "extracted", "field": "demand_note_reference"},
            {"name": "Total", "role": "derived", "field": "total_dn_amount",
             "formula": {"op": "sum", "of": ["sd_amount", "gst_amount"]}},
            {"name": "PO No.", "role": "manual", "editable": true}
        ]"#;
        let headers: Vec<HeaderDef> = serde_json::from_str(json).unwrap();
        assert_eq!(
            headers[0].role,
            HeaderRole::Static {
                value: "MUM".into()
            }
        );
        assert_eq!(headers[1].role.field(), Some(FieldKey::DemandNoteReference));
        match &headers[2].role {
            HeaderRole::Derived { formula, .. } => {
                assert_eq!(formula.inputs(), vec![FieldKey::SdAmount, FieldKey::GstAmount])
            }
            other => panic!("unexpected role {other:?}"),
        }
        assert!(headers[3].editable);
        assert!(!headers[0].editable);
    }

    #[test]
    fn test_dynamic_headers_default_to_field_bound_headers() {
        let schema = SchemaDef {
            name: "x".into(),
            headers: vec![
                HeaderDef {
                    name: "A".into(),
                    role: HeaderRole::Manual,
                    editable: false,
                },
                HeaderDef {
                    name: "B".into(),
                    role: HeaderRole::Extracted {
                        field: FieldKey::SdAmount,
                    },
                    editable: false,
                },
            ],
            dynamic_headers: None,
        };
        assert_eq!(schema.dynamic_header_names(), vec!["B"]);
        assert_eq!(schema.header_for_field(FieldKey::SdAmount).map(|h| h.name.as_str()), Some("B"));
    }
}
