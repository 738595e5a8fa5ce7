//! Purchase-order master data lookup in the "684 POP" sheet of a PO workbook.

use calamine::{Data, Range, Reader, Xlsx};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::TrenchError;

pub const PO_SHEET: &str = "684 POP";
/// The header row sits somewhere in the first rows under a title block.
const HEADER_SCAN_ROWS: usize = 10;

const LENGTH_KEYS: &[&str] = &["polengthmtr", "polength"];
// "categaory" is how the column is spelled in circulated workbooks.
const CATEGORY_KEYS: &[&str] = &["categaory", "category"];
const UID_KEYS: &[&str] = &["uid"];
const PARENT_ROUTE_KEYS: &[&str] = &["parentroutenamehh"];
const PO_NUMBER_KEYS: &[&str] = &["pono"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoRecord {
    #[serde(rename = "PO No")]
    pub po_number: String,
    #[serde(rename = "PO Length (Mtr)")]
    pub po_length: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "SiteID")]
    pub site_id: String,
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(rename = "Parent Route Name / HH")]
    pub parent_route: String,
}

impl PoRecord {
    fn empty(site_id: &str) -> Self {
        PoRecord {
            site_id: site_id.to_string(),
            ..PoRecord::default()
        }
    }

    pub fn is_found(&self) -> bool {
        !self.po_number.is_empty()
            || !self.po_length.is_empty()
            || !self.category.is_empty()
            || !self.uid.is_empty()
    }
}

pub fn lookup_po(path: &Path, site_id: &str) -> Result<PoRecord, TrenchError> {
    let bytes = std::fs::read(path)?;
    lookup_po_bytes(&bytes, site_id)
}

/// Find the first row whose SiteID matches (trimmed, case-insensitive).
///
/// An unknown site yields a record with only `site_id` filled in.
pub fn lookup_po_bytes(bytes: &[u8], site_id: &str) -> Result<PoRecord, TrenchError> {
    let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| TrenchError::Lookup(format!("failed to open xlsx: {e}")))?;
    let sheet = workbook
        .worksheet_range(PO_SHEET)
        .map_err(|e| TrenchError::Lookup(format!("sheet '{PO_SHEET}' not found: {e}")))?;

    let (header_row, headers) = find_header_row(&sheet).ok_or_else(|| {
        TrenchError::Lookup(format!(
            "SiteID column not found in the first {HEADER_SCAN_ROWS} rows"
        ))
    })?;
    debug!(header_row, columns = headers.len(), "PO sheet header located");

    let column = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| headers.iter().position(|h| normalize_header(h) == *k))
    };
    let Some(site_col) = headers.iter().position(|h| h.to_lowercase() == "siteid") else {
        return Err(TrenchError::Lookup("SiteID column not found".into()));
    };
    let po_col = column(PO_NUMBER_KEYS);
    let length_col = column(LENGTH_KEYS);
    let category_col = column(CATEGORY_KEYS);
    let uid_col = column(UID_KEYS);
    let parent_col = column(PARENT_ROUTE_KEYS);

    let wanted = site_id.trim().to_lowercase();
    let (rows, _) = sheet.get_size();
    for r in header_row + 1..rows {
        let value = |col: Option<usize>| col.map(|c| cell_value(&sheet, r, c)).unwrap_or_default();
        if value(Some(site_col)).to_lowercase() != wanted {
            continue;
        }

        let mut category = value(category_col);
        if category.eq_ignore_ascii_case("fibmax") {
            category = "LMC (Standalone)".to_string();
        }
        return Ok(PoRecord {
            po_number: value(po_col),
            po_length: value(length_col),
            category,
            site_id: site_id.to_string(),
            uid: value(uid_col),
            parent_route: value(parent_col),
        });
    }

    debug!(site_id, "site not present in PO sheet");
    Ok(PoRecord::empty(site_id))
}

fn find_header_row(sheet: &Range<Data>) -> Option<(usize, Vec<String>)> {
    sheet
        .rows()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .find(|(_, row)| {
            row.iter()
                .any(|c| cell_as_string(c).is_some_and(|s| s.to_lowercase() == "siteid"))
        })
        .map(|(i, row)| {
            let headers = row
                .iter()
                .map(|c| cell_as_string(c).unwrap_or_default())
                .collect();
            (i, headers)
        })
}

/// Lowercase and drop everything but ASCII letters and digits.
fn normalize_header(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn cell_value(sheet: &Range<Data>, row: usize, col: usize) -> String {
    let Ok(r) = u32::try_from(row) else {
        return String::new();
    };
    let Ok(c) = u32::try_from(col) else {
        return String::new();
    };
    // rows() counts from the range origin; get_value takes absolute positions
    let (r0, c0) = sheet.start().unwrap_or((0, 0));
    sheet
        .get_value((r + r0, c + c0))
        .and_then(cell_as_string)
        .map(|s| clean_value(&s))
        .unwrap_or_default()
}

/// Placeholder cells ("-", "nan", "None") read as blank.
fn clean_value(s: &str) -> String {
    match s.trim() {
        "" | "-" | "nan" | "None" => String::new(),
        other => other.to_string(),
    }
}

fn cell_as_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::DateTime(dt) => Some(dt.to_string()),
        Data::Empty => None,
        _ => Some(format!("{cell}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn po_workbook(sheet_name: &str) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name).unwrap();
        sheet.write_string(0, 0, "PO REGISTER FY25").unwrap();
        let headers = [
            "SiteID",
            "PO No",
            "PO Length (Mtr)",
            "Categaory",
            "UID",
            "Parent Route Name / HH",
        ];
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(2, c as u16, *h).unwrap();
        }
        let rows: [[&str; 6]; 2] = [
            ["MUM-001", "PO-4400", "1200", "fibmax", "U-9", "Andheri HH"],
            ["MUM-002", "-", "nan", "Backbone", "", "None"],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                sheet.write_string(3 + r as u32, c as u16, *v).unwrap();
            }
        }
        sheet.write_number(5, 0, 42.0).unwrap();
        sheet.write_string(5, 1, "PO-42").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_lookup_maps_fibmax_category() {
        let rec = lookup_po_bytes(&po_workbook(PO_SHEET), " mum-001 ").unwrap();
        assert_eq!(rec.po_number, "PO-4400");
        assert_eq!(rec.po_length, "1200");
        assert_eq!(rec.category, "LMC (Standalone)");
        assert_eq!(rec.uid, "U-9");
        assert_eq!(rec.parent_route, "Andheri HH");
        assert_eq!(rec.site_id, " mum-001 ");
    }

    #[test]
    fn test_placeholder_cells_read_blank() {
        let rec = lookup_po_bytes(&po_workbook(PO_SHEET), "MUM-002").unwrap();
        assert_eq!(rec.po_number, "");
        assert_eq!(rec.po_length, "");
        assert_eq!(rec.category, "Backbone");
        assert_eq!(rec.parent_route, "");
    }

    #[test]
    fn test_numeric_site_id_matches() {
        let rec = lookup_po_bytes(&po_workbook(PO_SHEET), "42").unwrap();
        assert_eq!(rec.po_number, "PO-42");
    }

    #[test]
    fn test_unknown_site_is_empty_record() {
        let rec = lookup_po_bytes(&po_workbook(PO_SHEET), "XYZ").unwrap();
        assert!(!rec.is_found());
        assert_eq!(rec.site_id, "XYZ");
    }

    #[test]
    fn test_missing_sheet_is_error() {
        let err = lookup_po_bytes(&po_workbook("Sheet1"), "MUM-001").unwrap_err();
        assert!(matches!(err, TrenchError::Lookup(_)));
    }
}
