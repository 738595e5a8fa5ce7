//! Extractors for Municipal Corporation of Greater Mumbai demand notes.
//!
//! MCGM notes carry a real vector table on page 1, so the lattice grid is
//! the primary source for per-road values; the text layer supplies the
//! reference, dates and deposit/tax lines.

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;
use tracing::debug;

use super::dates::{date_near_anchor, normalize_date};
use super::grid::{
    clean_cell, column_values, find_header_column, join_values, last_amount_in_row,
    last_non_blank_in_row, normalize_label, rows_containing, MULTI_VALUE_SEPARATOR,
};
use super::numeric::{normalize_amount, parse_amount, render_amount, sum_rendered};
use super::text_after;
use crate::model::{FieldKey, FieldValues, TableGrid};

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*No(?:\.\s*|\s+)([A-Za-z0-9\-/]+)").unwrap());
static LENGTH_IN_MT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Length in Mt\.\s*:?\s*([0-9,.]+)").unwrap());
static CGST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CGST\s*=\s*([0-9,.]+)").unwrap());
static SGST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SGST\s*=\s*([0-9,.]+)").unwrap());
static DEPOSIT_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Deposit as 50% of \(C\)\s*=\s*E\s*([0-9,]+\.?[0-9]*)").unwrap()
});
static DEPOSIT_LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Deposit as 50%.*?([0-9,]+\.?[0-9]*)").unwrap());
static LETTER_DATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Dated[:\s]*([0-9]{2}[./][0-9]{2}[./][0-9]{4})").unwrap()
});
static DT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Dt\.?\s*([0-9]{2}[./][0-9]{2}[./][0-9]{4})").unwrap());
static GROUND_RENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(i\)\s*Ground Rent\s*:?\s*([0-9,.]+)").unwrap());
static ADMIN_CHARGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(ii\)\s*Administrative Charge\s*:?\s*([0-9,.]+)").unwrap());
static SINGLE_ONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*1\s*$").unwrap());
static ALL_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Data rows of MCGM lattice tables start after the label row and the column-number row.
const FIRST_DATA_ROW: usize = 2;

const ROAD_TYPE_STOP_WORDS: &[&str] = &["excavation", "beyond", "liability", "guarantee", "period"];

/// Fields this battery can produce.
pub const EXTRACTED_FIELDS: &[FieldKey] = &[
    FieldKey::DemandNoteReference,
    FieldKey::SectionLength,
    FieldKey::GstAmount,
    FieldKey::SdAmount,
    FieldKey::RowApplicationDate,
    FieldKey::DemandNoteDate,
    FieldKey::RoadTypes,
    FieldKey::RatePerMeter,
    FieldKey::CoveredUnderCapping,
    FieldKey::NotPartOfCapping,
    FieldKey::RiAmount,
    FieldKey::GroundRent,
    FieldKey::AdministrativeCharge,
    FieldKey::MultiplyingFactor,
];

/// Run every MCGM extractor. Table values take precedence; text is the fallback.
pub fn extract_all(text: &str, tables: &[TableGrid]) -> FieldValues {
    let mut fields = FieldValues::new();

    fields.set(FieldKey::DemandNoteReference, demand_note_reference(text));
    fields.set(
        FieldKey::SectionLength,
        or_else(section_length_from_tables(tables), || section_length_from_text(text)),
    );
    fields.set(FieldKey::GstAmount, gst_amount(text));
    fields.set(FieldKey::SdAmount, sd_amount(text));
    fields.set(FieldKey::RowApplicationDate, row_application_date(text));
    fields.set(FieldKey::DemandNoteDate, demand_note_date(text));
    fields.set(
        FieldKey::RoadTypes,
        or_else(road_types_from_tables(tables), || road_types_from_text(text)),
    );
    fields.set(
        FieldKey::RatePerMeter,
        or_else(rate_from_tables(tables), || rate_from_text(text)),
    );
    fields.set(FieldKey::CoveredUnderCapping, covered_under_capping(text, tables));
    fields.set(FieldKey::NotPartOfCapping, String::new());
    fields.set(FieldKey::RiAmount, ri_amount(tables));
    fields.set(FieldKey::GroundRent, ground_rent(text));
    fields.set(FieldKey::AdministrativeCharge, administrative_charge(text));
    fields.set(FieldKey::MultiplyingFactor, multiplying_factor(tables));

    for (key, value) in fields.iter() {
        debug!(authority = "MCGM", field = %key, value = %value, "extracted field");
    }
    fields
}

fn or_else(primary: String, fallback: impl FnOnce() -> String) -> String {
    if primary.is_empty() {
        fallback()
    } else {
        primary
    }
}

/// Reference printed on its own line as `No. XX/1234/...`.
pub fn demand_note_reference(text: &str) -> String {
    REFERENCE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}

/// Sum of every "Length in Mt." figure in the text.
pub fn section_length_from_text(text: &str) -> String {
    sum_rendered(LENGTH_IN_MT.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str()))
}

/// Sum of the "Length ... Mt" column across all lattice tables.
pub fn section_length_from_tables(tables: &[TableGrid]) -> String {
    let values: Vec<String> = tables
        .iter()
        .filter_map(|t| find_header_column(t, 0, &["Length", "Mt"]).map(|c| column_values(t, c, FIRST_DATA_ROW)))
        .flatten()
        .collect();
    sum_rendered(values.iter().map(|s| s.as_str()))
}

/// CGST + SGST from the `CGST = ...` / `SGST = ...` lines.
pub fn gst_amount(text: &str) -> String {
    let cgst = CGST.captures(text).and_then(|c| parse_amount(&c[1]));
    let sgst = SGST.captures(text).and_then(|c| parse_amount(&c[1]));
    match (cgst, sgst) {
        (None, None) => String::new(),
        (c, s) => render_amount(c.unwrap_or(Decimal::ZERO) + s.unwrap_or(Decimal::ZERO)),
    }
}

/// Security deposit, "Deposit as 50% of (C) = E ..." with a looser fallback.
pub fn sd_amount(text: &str) -> String {
    if let Some(c) = DEPOSIT_EXACT.captures(text) {
        return normalize_amount(&c[1]);
    }
    DEPOSIT_LOOSE
        .captures(text)
        .map(|c| normalize_amount(&c[1]))
        .unwrap_or_default()
}

/// Date of the operator's ROW application, from the "Your Letter No." line.
pub fn row_application_date(text: &str) -> String {
    text.lines()
        .filter(|line| line.contains("Your Letter No."))
        .find_map(|line| LETTER_DATED.captures(line))
        .map(|c| normalize_date(&c[1]))
        .unwrap_or_default()
}

pub fn demand_note_date(text: &str) -> String {
    date_near_anchor(text, &DT_DATE, None)
}

/// Road surfaces from the "Particulars" column, one entry per data row.
pub fn road_types_from_tables(tables: &[TableGrid]) -> String {
    let values: Vec<String> = tables
        .iter()
        .filter_map(|t| {
            find_header_column(t, 0, &["Particulars"]).map(|c| column_values(t, c, FIRST_DATA_ROW))
        })
        .flatten()
        .collect();
    join_values(&values)
}

/// Text-layer fallback: the lines following the "1" row after each "Particulars" label.
pub fn road_types_from_text(text: &str) -> String {
    let mut values = Vec::new();
    for m in text.match_indices("Particulars") {
        let chunk = text_after(text, m.0 + m.1.len(), 600);
        let mut found_one = false;
        let mut collecting = false;
        let mut material_lines: Vec<&str> = Vec::new();

        for line in chunk.lines() {
            let s = line.trim();
            if found_one && !collecting {
                if s.is_empty() || ALL_DIGITS.is_match(s) {
                    continue;
                }
                collecting = true;
            }
            if collecting {
                let lower = s.to_lowercase();
                if s.is_empty() || ROAD_TYPE_STOP_WORDS.iter().any(|kw| lower.contains(kw)) {
                    break;
                }
                material_lines.push(s);
            }
            if SINGLE_ONE.is_match(line) {
                found_one = true;
            }
        }

        if !material_lines.is_empty() {
            values.push(material_lines.join(" "));
        }
    }
    values.join(MULTI_VALUE_SEPARATOR)
}

/// Rate per metre from the "Rate ... Rs" column.
pub fn rate_from_tables(tables: &[TableGrid]) -> String {
    let values: Vec<String> = tables
        .iter()
        .filter_map(|t| find_header_column(t, 0, &["Rate", "Rs"]).map(|c| column_values(t, c, FIRST_DATA_ROW)))
        .flatten()
        .map(|v| v.replace(' ', ""))
        .collect();
    join_values(&values)
}

/// Text-layer fallback: fourth token of the second non-blank line after the "1" row.
pub fn rate_from_text(text: &str) -> String {
    let mut rates = Vec::new();
    for m in text.match_indices("Rate in Rs.") {
        let chunk = text_after(text, m.0 + m.1.len(), 200);
        let lines: Vec<&str> = chunk.lines().collect();
        let Some(idx_one) = lines.iter().position(|l| SINGLE_ONE.is_match(l)) else {
            continue;
        };
        let mut non_blank = lines[idx_one + 1..].iter().filter(|l| !l.trim().is_empty());
        let _first = non_blank.next();
        if let Some(second) = non_blank.next() {
            let parts: Vec<&str> = second.split_whitespace().collect();
            if parts.len() >= 4 {
                rates.push(parts[3].to_string());
            }
        }
    }
    rates.join(MULTI_VALUE_SEPARATOR)
}

/// Restoration charges covered by the cost cap:
/// Total R.I. + Access Charges(F) + Ground Rent + Administrative Charge.
pub fn covered_under_capping(text: &str, tables: &[TableGrid]) -> String {
    let mut parts: Vec<Decimal> = Vec::new();
    for label in ["Total R.I.", "Access Charges(F)"] {
        for table in tables {
            for row in rows_containing(table, label) {
                if let Some(v) = last_amount_in_row(table, row) {
                    parts.push(v);
                }
            }
        }
    }
    parts.extend(GROUND_RENT.captures(text).and_then(|c| parse_amount(&c[1])));
    parts.extend(ADMIN_CHARGE.captures(text).and_then(|c| parse_amount(&c[1])));

    if parts.is_empty() {
        return String::new();
    }
    render_amount(parts.into_iter().sum())
}

/// Last filled cell of the first "Total R.I." row.
pub fn ri_amount(tables: &[TableGrid]) -> String {
    tables
        .iter()
        .find_map(|t| {
            rows_containing(t, "Total R.I.")
                .into_iter()
                .find_map(|row| last_non_blank_in_row(t, row))
        })
        .unwrap_or_default()
}

pub fn ground_rent(text: &str) -> String {
    GROUND_RENT
        .captures(text)
        .map(|c| normalize_amount(&c[1]))
        .unwrap_or_default()
}

pub fn administrative_charge(text: &str) -> String {
    ADMIN_CHARGE
        .captures(text)
        .map(|c| normalize_amount(&c[1]))
        .unwrap_or_default()
}

/// First data value of the "Multiplying Factor" column.
pub fn multiplying_factor(tables: &[TableGrid]) -> String {
    tables
        .iter()
        .find_map(|t| {
            let col = t
                .row(0)?
                .iter()
                .position(|h| normalize_label(h).contains("multiplyingfactor"))?;
            (FIRST_DATA_ROW..t.row_count())
                .filter_map(|r| t.cell(r, col))
                .map(|v| clean_cell(v).replace(',', ""))
                .find(|v| !v.is_empty() && !v.contains("Total"))
        })
        .unwrap_or_default()
}
