use trench_core::fields::application::ApplicationDetails;
use trench_core::lookup::po::PoRecord;
use trench_core::model::{OutputRow, TableGrid};

/// One "header: value" line per column; editable columns are marked with '*'.
pub fn print_row(row: &OutputRow) {
    println!("=== {} ({} columns) ===\n", row.schema, row.len());
    let width = row
        .headers
        .iter()
        .map(|h| h.chars().count().min(48))
        .max()
        .unwrap_or(10);
    for (i, (header, value)) in row.pairs().enumerate() {
        let marker = if row.editable.get(i).copied().unwrap_or(false) {
            "*"
        } else {
            " "
        };
        let label: String = header.chars().take(48).collect();
        println!("  {marker} {:<width$}  {}", label, value, width = width);
    }
}

/// Grid with columns padded to their widest cell.
pub fn print_grid(index: usize, grid: &TableGrid) {
    println!(
        "--- Table {} ({} rows x {} cols) ---",
        index + 1,
        grid.row_count(),
        grid.column_count()
    );
    let cols = grid.column_count();
    let widths: Vec<usize> = (0..cols)
        .map(|c| {
            grid.rows()
                .iter()
                .filter_map(|r| r.get(c))
                .map(|cell| flatten(cell).chars().count().min(30))
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in grid.rows() {
        let cells: Vec<String> = (0..cols)
            .map(|c| {
                let cell: String = row.get(c).map(|s| flatten(s)).unwrap_or_default();
                let cell: String = cell.chars().take(30).collect();
                format!("{:<w$}", cell, w = widths[c])
            })
            .collect();
        println!("  | {} |", cells.join(" | "));
    }
}

fn flatten(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn print_application(details: &ApplicationDetails) {
    println!("  Application Number:  {}", details.application_number);
    println!("  Application Length:  {}", details.application_length);
    println!("  Application Date:    {}", details.application_date);
    println!("  From:                {}", details.from);
    println!("  To:                  {}", details.to);
    println!("  Authority:           {}", details.authority);
    println!("  Ward:                {}", details.ward);
}

pub fn print_po(record: &PoRecord) {
    if !record.is_found() {
        println!("  Site {} not found in PO sheet", record.site_id);
        return;
    }
    println!("  SiteID:                  {}", record.site_id);
    println!("  PO No:                   {}", record.po_number);
    println!("  PO Length (Mtr):         {}", record.po_length);
    println!("  Category:                {}", record.category);
    println!("  UID:                     {}", record.uid);
    println!("  Parent Route Name / HH:  {}", record.parent_route);
}
