//! Two-row spreadsheet output: styled header row plus one data row.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

use crate::error::TrenchError;
use crate::model::OutputRow;

const HEADER_FILL: u32 = 0xFFFF00;
const EDITABLE_FILL: u32 = 0xB7E1FA;
const COLUMN_WIDTH: f64 = 22.0;
/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

fn base_format() -> Format {
    Format::new()
        .set_font_name("Calibri")
        .set_font_size(10)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
}

fn fill_row(sheet: &mut Worksheet, row: &OutputRow) -> Result<(), TrenchError> {
    let header = base_format()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL));
    let editable_header = base_format()
        .set_bold()
        .set_background_color(Color::RGB(EDITABLE_FILL));
    let cell = base_format();

    for (i, (name, value)) in row.pairs().enumerate() {
        let col = u16::try_from(i)
            .map_err(|_| TrenchError::Spreadsheet(format!("too many columns ({})", row.len())))?;
        let header_format = if row.editable.get(i).copied().unwrap_or(false) {
            &editable_header
        } else {
            &header
        };
        sheet.write_string_with_format(0, col, name, header_format)?;
        sheet.write_string_with_format(1, col, value, &cell)?;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
    }
    Ok(())
}

fn build_workbook(row: &OutputRow) -> Result<Workbook, TrenchError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let name: String = row.schema.chars().take(MAX_SHEET_NAME).collect();
    if !name.is_empty() {
        sheet.set_name(&name)?;
    }
    fill_row(sheet, row)?;
    Ok(workbook)
}

/// Serialize a row to xlsx bytes.
pub fn workbook_bytes(row: &OutputRow) -> Result<Vec<u8>, TrenchError> {
    let mut workbook = build_workbook(row)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write a row to `path`.
pub fn write_row(path: &Path, row: &OutputRow) -> Result<(), TrenchError> {
    let mut workbook = build_workbook(row)?;
    workbook.save(path)?;
    info!(path = %path.display(), columns = row.len(), "spreadsheet written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn row() -> OutputRow {
        OutputRow {
            schema: "SD Output".into(),
            headers: vec!["DN No".into(), "SD Amount".into(), "NFA no.".into()],
            values: vec!["MU-1608/25-26".into(), "962400".into(), "".into()],
            editable: vec![false, false, true],
        }
    }

    fn read_back(bytes: Vec<u8>, sheet: &str) -> calamine::Range<Data> {
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        wb.worksheet_range(sheet).unwrap()
    }

    #[test]
    fn test_header_and_data_rows_round_trip() {
        let range = read_back(workbook_bytes(&row()).unwrap(), "SD Output");
        assert_eq!(range.get_size(), (2, 3));
        assert_eq!(
            range.get_value((0, 1)),
            Some(&Data::String("SD Amount".into()))
        );
        assert_eq!(
            range.get_value((1, 0)),
            Some(&Data::String("MU-1608/25-26".into()))
        );
        // amounts are written as text, exactly as extracted
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("962400".into())));
    }

    #[test]
    fn test_long_schema_name_is_truncated() {
        let mut r = row();
        r.schema = "Non Refundable Output With A Very Long Name".into();
        let range = read_back(workbook_bytes(&r).unwrap(), "Non Refundable Output With A Ve");
        assert_eq!(range.get_size().1, 3);
    }

    #[test]
    fn test_write_row_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_row(&path, &row()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let range = read_back(bytes, "SD Output");
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("NFA no.".into())));
    }
}
