use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Civic authorities that issue demand notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Authority {
    #[serde(rename = "KDMC")]
    Kdmc,
    #[serde(rename = "MBMC")]
    Mbmc,
    #[serde(rename = "MCGM")]
    Mcgm,
    #[serde(rename = "MIDC Type 1")]
    MidcType1,
    #[serde(rename = "MIDC Type 2")]
    MidcType2,
    #[serde(rename = "NMMC")]
    Nmmc,
}

impl Authority {
    pub const ALL: [Authority; 6] = [
        Authority::Kdmc,
        Authority::Mbmc,
        Authority::Mcgm,
        Authority::MidcType1,
        Authority::MidcType2,
        Authority::Nmmc,
    ];

    /// Parse an authority identifier, ignoring case, spaces, hyphens and underscores.
    pub fn from_str_loose(s: &str) -> Option<Authority> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "kdmc" => Some(Authority::Kdmc),
            "mbmc" => Some(Authority::Mbmc),
            "mcgm" | "mcgmtype1" => Some(Authority::Mcgm),
            "midctype1" | "midc1" => Some(Authority::MidcType1),
            "midctype2" | "midc2" => Some(Authority::MidcType2),
            "nmmc" => Some(Authority::Nmmc),
            _ => None,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::Kdmc => write!(f, "KDMC"),
            Authority::Mbmc => write!(f, "MBMC"),
            Authority::Mcgm => write!(f, "MCGM"),
            Authority::MidcType1 => write!(f, "MIDC Type 1"),
            Authority::MidcType2 => write!(f, "MIDC Type 2"),
            Authority::Nmmc => write!(f, "NMMC"),
        }
    }
}

/// Concatenated embedded text of every page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlob(String);

impl TextBlob {
    pub fn new(text: impl Into<String>) -> Self {
        TextBlob(text.into())
    }

    /// Join per-page text with newlines.
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
        let joined = pages
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        TextBlob(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> std::str::Lines<'_> {
        self.0.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Rows of cell strings for one detected table region.
///
/// Rows may be ragged. Every accessor is bounds-checked and yields `None`
/// rather than panicking, so callers can treat missing cells as blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        TableGrid { rows }
    }

    pub fn empty() -> Self {
        TableGrid::default()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(|s| s.as_str())
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(|r| r.as_slice())
    }
}

/// Logical fields produced by extractors or derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    DemandNoteReference,
    SectionLength,
    GstAmount,
    SdAmount,
    RowApplicationDate,
    DemandNoteDate,
    RoadTypes,
    RatePerMeter,
    CoveredUnderCapping,
    NotPartOfCapping,
    RiAmount,
    GroundRent,
    AdministrativeCharge,
    MultiplyingFactor,
    NonRefundableCost,
    TotalDnAmount,
    DnReceivedDate,
    DaysSinceDemandNote,
    TotalRoute,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::DemandNoteReference => "demand_note_reference",
            FieldKey::SectionLength => "section_length",
            FieldKey::GstAmount => "gst_amount",
            FieldKey::SdAmount => "sd_amount",
            FieldKey::RowApplicationDate => "row_application_date",
            FieldKey::DemandNoteDate => "demand_note_date",
            FieldKey::RoadTypes => "road_types",
            FieldKey::RatePerMeter => "rate_per_meter",
            FieldKey::CoveredUnderCapping => "covered_under_capping",
            FieldKey::NotPartOfCapping => "not_part_of_capping",
            FieldKey::RiAmount => "ri_amount",
            FieldKey::GroundRent => "ground_rent",
            FieldKey::AdministrativeCharge => "administrative_charge",
            FieldKey::MultiplyingFactor => "multiplying_factor",
            FieldKey::NonRefundableCost => "non_refundable_cost",
            FieldKey::TotalDnAmount => "total_dn_amount",
            FieldKey::DnReceivedDate => "dn_received_date",
            FieldKey::DaysSinceDemandNote => "days_since_demand_note",
            FieldKey::TotalRoute => "total_route",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Values keyed by logical field. Absent keys read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues(BTreeMap<FieldKey, String>);

impl FieldValues {
    pub fn new() -> Self {
        FieldValues::default()
    }

    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: FieldKey) -> &str {
        self.0.get(&key).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &String)> {
        self.0.iter()
    }
}

/// Operator-supplied values keyed by header name. Applied last.
pub type ManualOverrides = BTreeMap<String, String>;

/// One assembled output row, positionally aligned with its headers.
///
/// `headers`, `values` and `editable` always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub schema: String,
    pub headers: Vec<String>,
    pub values: Vec<String>,
    pub editable: Vec<bool>,
}

impl OutputRow {
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Value under a header name.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == header)
            .and_then(|i| self.values.get(i))
            .map(|s| s.as_str())
    }

    /// Header/value pairs in schema order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }
}
