//! Extractors for Mira-Bhayandar Municipal Corporation demand notes.
//!
//! MBMC notes put the charge table on page 2 as a scanned image, so most
//! per-road values come from the raster grid by fixed column position.
//! Column layout of that grid (0-based):
//!
//! | col | content                 |
//! |-----|-------------------------|
//! | 2   | type of surface         |
//! | 3   | length (m)              |
//! | 4   | rate per metre          |
//! | 6-8 | restoration components  |
//! | 9   | security deposit        |
//! | 11  | CGST                    |
//! | 12  | SGST                    |

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;
use tracing::debug;

use super::dates::date_near_anchor;
use super::grid::{clean_cell, find_total_row, is_total_row, join_values, strict_amount};
use super::numeric::{normalize_amount, render_amount, sum_rendered};
use crate::model::{FieldKey, FieldValues, TableGrid};

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)NO[.:\s-]*(MBMC[\w/-]+)").unwrap());
static DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Date|Dt\.?)[\s:]*([0-9]{2}[./][0-9]{2}[./][0-9]{4})").unwrap()
});
static LENGTH_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:Length|Distance|Route Length)[:\s]*(?:in Mt[rs]?\.?)?[:\s]*([0-9,.]+)\s*(?:m(?:e)?t(?:e)?r(?:s)?)?",
    )
    .unwrap()
});
static LENGTH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:,\d+)?(?:\.\d+)?)\s*(?:m(?:e)?t(?:e)?r(?:s)?)").unwrap()
});
static SD_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Security\s+Deposit|SD)(?:\s+Amount)?[=: ]+(?:Rs\.?\s*)?([0-9,.]+)").unwrap()
});
static SD_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Deposit|SD)(?:\s+as\s+\d+%)?(?:\s+of\s+\([A-Z]\))?[=: ]+(?:Rs\.?\s*)?([0-9,.]+)")
        .unwrap()
});
static NOT_CAPPED_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:License|Rental|Way Leave)(?:\s+[Cc]harges?)?[:\s]+(?:Rs\.?\s*)?([0-9,.]+)").unwrap()
});
static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:,\d+)*(?:\.\d+)?$").unwrap());

/// Header block lines scanned for the note date.
const DATE_SCAN_LINES: usize = 20;

const COL_SURFACE: usize = 2;
const COL_LENGTH: usize = 3;
const COL_RATE: usize = 4;
const COLS_COVERED: [usize; 3] = [6, 7, 8];
const COL_SD: usize = 9;
const COL_CGST: usize = 11;
const COL_SGST: usize = 12;

const NOT_CAPPED_KEYWORDS: &[&str] = &["license", "rental", "way leave", "permission"];

pub const EXTRACTED_FIELDS: &[FieldKey] = &[
    FieldKey::DemandNoteReference,
    FieldKey::DemandNoteDate,
    FieldKey::SectionLength,
    FieldKey::RatePerMeter,
    FieldKey::RoadTypes,
    FieldKey::SdAmount,
    FieldKey::GstAmount,
    FieldKey::CoveredUnderCapping,
    FieldKey::NotPartOfCapping,
];

/// Run every MBMC extractor against the text layer, vector tables and the
/// raster grid. Grid values win; text regexes are the fallback.
pub fn extract_all(text: &str, vector_tables: &[TableGrid], raster: &TableGrid) -> FieldValues {
    let mut fields = FieldValues::new();

    fields.set(FieldKey::DemandNoteReference, demand_note_reference(text));
    fields.set(FieldKey::DemandNoteDate, demand_note_date(text));

    let length = section_length_from_grid(raster);
    fields.set(
        FieldKey::SectionLength,
        if length.is_empty() { section_length_from_text(text) } else { length },
    );
    fields.set(FieldKey::RatePerMeter, rate_from_grid(raster));
    fields.set(FieldKey::RoadTypes, road_types_from_grid(raster));

    let sd = sd_from_grid(raster);
    fields.set(
        FieldKey::SdAmount,
        if sd.is_empty() { sd_from_text(text) } else { sd },
    );
    fields.set(FieldKey::GstAmount, gst_from_grid(raster));
    fields.set(FieldKey::CoveredUnderCapping, covered_from_grid(raster));
    fields.set(FieldKey::NotPartOfCapping, not_part_of_capping(text, vector_tables));

    for (key, value) in fields.iter() {
        debug!(authority = "MBMC", field = %key, value = %value, "extracted field");
    }
    fields
}

/// Reference beginning with "MBMC", after a "No." label.
pub fn demand_note_reference(text: &str) -> String {
    REFERENCE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}

/// First labelled date within the header block.
pub fn demand_note_date(text: &str) -> String {
    date_near_anchor(text, &DATE_LINE, Some(DATE_SCAN_LINES))
}

/// Sum of labelled lengths in the text; falls back to any "<n> meters" figure.
pub fn section_length_from_text(text: &str) -> String {
    let labelled: Vec<&str> = LENGTH_LABELLED
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let candidates = if labelled.is_empty() {
        LENGTH_UNIT
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    } else {
        labelled
    };

    let valid: Vec<String> = candidates
        .into_iter()
        .filter_map(|v| strict_amount(Some(v)))
        .map(render_amount)
        .collect();
    sum_rendered(valid.iter().map(|s| s.as_str()))
}

/// Data rows of the raster grid: everything below the header row, minus the total row.
fn data_rows(grid: &TableGrid) -> impl Iterator<Item = usize> + '_ {
    (1..grid.row_count()).filter(move |&r| !is_total_row(grid, r))
}

/// Sum of the length column across data rows.
pub fn section_length_from_grid(grid: &TableGrid) -> String {
    if grid.column_count() <= COL_LENGTH {
        return String::new();
    }
    let total: Option<Decimal> = data_rows(grid)
        .filter_map(|r| strict_amount(grid.cell(r, COL_LENGTH)))
        .fold(None, |acc, v| Some(acc.unwrap_or(Decimal::ZERO) + v));
    total.map(render_amount).unwrap_or_default()
}

/// Plain numeric rate cells, commas stripped, joined in row order.
pub fn rate_from_grid(grid: &TableGrid) -> String {
    if grid.column_count() <= COL_RATE {
        return String::new();
    }
    let rates: Vec<String> = data_rows(grid)
        .filter_map(|r| grid.cell(r, COL_RATE))
        .map(|v| clean_cell(v).replace(',', ""))
        .filter(|v| strict_amount(Some(v.as_str())).is_some())
        .collect();
    join_values(&rates)
}

/// Distinct surface types in first-seen order, skipping OCR noise.
pub fn road_types_from_grid(grid: &TableGrid) -> String {
    if grid.column_count() <= COL_SURFACE {
        return String::new();
    }
    let mut seen: Vec<String> = Vec::new();
    for r in 1..grid.row_count() {
        let Some(raw) = grid.cell(r, COL_SURFACE) else {
            continue;
        };
        let v = clean_cell(raw);
        let lower = v.to_lowercase();
        if v.chars().count() <= 1
            || lower.contains("type of surface")
            || lower.contains("none")
        {
            continue;
        }
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    join_values(&seen)
}

/// Row carrying the totals: the explicit total row, else the last row.
fn totals_row(grid: &TableGrid) -> Option<usize> {
    find_total_row(grid).or_else(|| grid.row_count().checked_sub(1))
}

pub fn sd_from_grid(grid: &TableGrid) -> String {
    if grid.column_count() <= COL_SD {
        return String::new();
    }
    totals_row(grid)
        .and_then(|r| strict_amount(grid.cell(r, COL_SD)))
        .map(render_amount)
        .unwrap_or_default()
}

pub fn sd_from_text(text: &str) -> String {
    SD_LABELLED
        .captures(text)
        .or_else(|| SD_LOOSE.captures(text))
        .map(|c| normalize_amount(&c[1]))
        .unwrap_or_default()
}

/// CGST + SGST from the totals row. Non-numeric cells count as zero.
pub fn gst_from_grid(grid: &TableGrid) -> String {
    if grid.column_count() <= COL_SGST {
        return String::new();
    }
    let Some(r) = totals_row(grid) else {
        return String::new();
    };
    let cgst = strict_amount(grid.cell(r, COL_CGST)).unwrap_or(Decimal::ZERO);
    let sgst = strict_amount(grid.cell(r, COL_SGST)).unwrap_or(Decimal::ZERO);
    render_amount(cgst + sgst)
}

/// Sum of the restoration components on the explicit total row.
pub fn covered_from_grid(grid: &TableGrid) -> String {
    if grid.column_count() <= COL_SD {
        return String::new();
    }
    let Some(r) = find_total_row(grid) else {
        return String::new();
    };
    let total: Decimal = COLS_COVERED
        .iter()
        .filter_map(|&c| strict_amount(grid.cell(r, c)))
        .sum();
    render_amount(total)
}

/// License, rental or way-leave charges.
///
/// Looks in the vector tables for a keyword cell with a plain number in a
/// neighbouring cell, then falls back to labelled amounts in the text.
pub fn not_part_of_capping(text: &str, vector_tables: &[TableGrid]) -> String {
    for table in vector_tables {
        for (i, row) in table.rows().iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                let lower = cell.to_lowercase();
                if !NOT_CAPPED_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                    continue;
                }
                if let Some(v) = numeric_neighbour(table, i, j) {
                    return v;
                }
            }
        }
    }

    sum_rendered(
        NOT_CAPPED_TEXT
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str())),
    )
}

fn numeric_neighbour(table: &TableGrid, row: usize, col: usize) -> Option<String> {
    for di in -1i64..=1 {
        for dj in -1i64..=1 {
            if di == 0 && dj == 0 {
                continue;
            }
            let (Ok(ni), Ok(nj)) = (usize::try_from(row as i64 + di), usize::try_from(col as i64 + dj))
            else {
                continue;
            };
            if let Some(v) = table.cell(ni, nj) {
                let v = v.trim();
                if PLAIN_NUMBER.is_match(v) {
                    return Some(normalize_amount(v));
                }
            }
        }
    }
    None
}
