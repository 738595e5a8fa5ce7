use rust_decimal::Decimal;

use super::numeric::parse_amount;
use crate::model::TableGrid;

/// Separator for fields that legitimately hold several values.
pub const MULTI_VALUE_SEPARATOR: &str = " / ";

/// Lowercase and drop all whitespace so wrapped header labels still match.
pub fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Collapse embedded line breaks in a cell into single spaces.
pub fn clean_cell(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index of the first header-row cell containing every needle
/// (case- and whitespace-insensitive).
pub fn find_header_column(grid: &TableGrid, header_row: usize, needles: &[&str]) -> Option<usize> {
    let row = grid.row(header_row)?;
    let needles: Vec<String> = needles.iter().map(|n| normalize_label(n)).collect();
    row.iter().position(|cell| {
        let label = normalize_label(cell);
        needles.iter().all(|n| label.contains(n.as_str()))
    })
}

/// Whether either of the two leading label cells of `row` mentions "total".
pub fn has_total_label(grid: &TableGrid, row: usize) -> bool {
    (0..2)
        .filter_map(|c| grid.cell(row, c))
        .any(|c| c.to_lowercase().contains("total"))
}

/// Non-blank cells of `col` from `start_row` down to the first Total row.
pub fn column_values(grid: &TableGrid, col: usize, start_row: usize) -> Vec<String> {
    (start_row..grid.row_count())
        .take_while(|&r| !has_total_label(grid, r))
        .filter_map(|r| grid.cell(r, col))
        .map(clean_cell)
        .filter(|v| !v.is_empty() && !v.contains("Total"))
        .collect()
}

/// Row whose first cell starts with "total" (case-insensitive).
pub fn find_total_row(grid: &TableGrid) -> Option<usize> {
    (0..grid.row_count()).find(|&r| {
        grid.cell(r, 0)
            .map(|c| c.trim().to_lowercase().starts_with("total"))
            .unwrap_or(false)
    })
}

pub fn is_total_row(grid: &TableGrid, row: usize) -> bool {
    grid.cell(row, 0)
        .map(|c| c.trim().to_lowercase().starts_with("total"))
        .unwrap_or(false)
}

/// Rows in which some cell contains `needle` after line breaks are collapsed.
pub fn rows_containing(grid: &TableGrid, needle: &str) -> Vec<usize> {
    (0..grid.row_count())
        .filter(|&r| {
            grid.row(r)
                .map(|cells| cells.iter().any(|c| clean_cell(c).contains(needle)))
                .unwrap_or(false)
        })
        .collect()
}

/// Rightmost cell of `row` that parses as an amount.
pub fn last_amount_in_row(grid: &TableGrid, row: usize) -> Option<Decimal> {
    grid.row(row)?
        .iter()
        .rev()
        .find_map(|c| parse_amount(&clean_cell(c)))
}

/// Rightmost non-blank cell of `row`, with separators stripped.
pub fn last_non_blank_in_row(grid: &TableGrid, row: usize) -> Option<String> {
    grid.row(row)?.iter().rev().find_map(|c| {
        let v: String = c.chars().filter(|ch| *ch != ',' && *ch != '\n').collect();
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    })
}

/// Cell value parsed strictly as a plain number (`^\d+(\.\d+)?$` after removing commas).
pub fn strict_amount(cell: Option<&str>) -> Option<Decimal> {
    let v: String = cell?.chars().filter(|c| *c != ',').collect();
    let v = v.trim();
    let mut parts = v.splitn(2, '.');
    let int_ok = parts
        .next()
        .map(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);
    let frac_ok = parts
        .next()
        .map(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(true);
    if int_ok && frac_ok {
        parse_amount(v)
    } else {
        None
    }
}

pub fn join_values(values: &[String]) -> String {
    values.join(MULTI_VALUE_SEPARATOR)
}
