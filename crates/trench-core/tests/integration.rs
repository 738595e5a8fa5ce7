//! Integration tests for parse_pdf() end-to-end pipeline.
//!
//! Uses mock text, vector and raster backends, so these tests run without
//! poppler-utils or tesseract installed.

use std::sync::atomic::{AtomicUsize, Ordering};

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDate;
use std::io::Cursor;
use trench_core::authority::{mbmc, mcgm, AuthorityParser, AuthorityRegistry};
use trench_core::error::TrenchError;
use trench_core::extraction::{
    PageContent, PdfExtractor, RasterTableExtractor, VectorTableExtractor,
};
use trench_core::model::{Authority, ManualOverrides, TableGrid};
use trench_core::output::xlsx::workbook_bytes;
use trench_core::{parse_application_pdf, parse_pdf, Backends};

struct MockExtractor {
    pages: Vec<PageContent>,
}

impl PdfExtractor for MockExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageContent>, TrenchError> {
        Ok(self.pages.clone())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct UnreadableExtractor;

impl PdfExtractor for UnreadableExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageContent>, TrenchError> {
        Err(TrenchError::DocumentUnreadable("syntax error in xref".into()))
    }

    fn backend_name(&self) -> &str {
        "unreadable"
    }
}

/// Returns fixed tables and counts calls.
struct MockTables {
    tables: Vec<TableGrid>,
    calls: AtomicUsize,
}

impl MockTables {
    fn new(tables: Vec<TableGrid>) -> Self {
        MockTables {
            tables,
            calls: AtomicUsize::new(0),
        }
    }
}

impl VectorTableExtractor for MockTables {
    fn extract_tables(
        &self,
        _pdf_bytes: &[u8],
        _text: &[PageContent],
        _pages: &[usize],
    ) -> Result<Vec<TableGrid>, TrenchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.clone())
    }

    fn backend_name(&self) -> &str {
        "mock-vector"
    }
}

impl RasterTableExtractor for MockTables {
    fn extract_table(&self, _pdf_bytes: &[u8], _page: usize) -> Result<TableGrid, TrenchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.first().cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "mock-raster"
    }
}

/// OCR that always fails, as when tesseract is missing.
struct BrokenOcr;

impl RasterTableExtractor for BrokenOcr {
    fn extract_table(&self, _pdf_bytes: &[u8], _page: usize) -> Result<TableGrid, TrenchError> {
        Err(TrenchError::ToolNotFound {
            tool: "tesseract".into(),
        })
    }

    fn backend_name(&self) -> &str {
        "broken"
    }
}

fn page(number: usize, lines: &[&str]) -> PageContent {
    PageContent {
        page_number: number,
        lines: lines.iter().map(|s| s.to_string()).collect(),
        words: vec![],
    }
}

fn grid(rows: &[&[&str]]) -> TableGrid {
    TableGrid::new(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

fn mcgm_pages() -> Vec<PageContent> {
    vec![page(
        1,
        &[
            "MUNICIPAL CORPORATION OF GREATER MUMBAI",
            "No. MU-1608/25-26",
            "Dt. 05.03.2025",
            "Your Letter No. ETIPL/ROW/77 Dated: 01.02.2025",
            "(i) Ground Rent : 1,000",
            "(ii) Administrative Charge : 500",
            "CGST = 900",
            "SGST = 900",
            "Deposit as 50% of (C) = E 50,000",
        ],
    )]
}

fn mcgm_table() -> TableGrid {
    grid(&[
        &["Sr. No.", "Particulars", "Length in Mt.", "Rate in Rs.", "Amount"],
        &["1", "2", "3", "4", "5"],
        &["a", "CC Road", "60", "9,600", "576,000"],
        &["b", "BT Road", "40", "9,600", "384,000"],
        &["", "Total R.I. (A+B) = (C)", "", "", "960,000"],
    ])
}

fn pinned(parser: trench_core::authority::ProfileParser) -> trench_core::authority::ProfileParser {
    parser.with_today(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
}

// ---------------------------------------------------------------------------
// Test 1: MCGM note with a vector table, no raster page
// ---------------------------------------------------------------------------
#[test]
fn mcgm_vector_table_end_to_end() {
    let text = MockExtractor {
        pages: mcgm_pages(),
    };
    let vector = MockTables::new(vec![mcgm_table()]);
    let raster = MockTables::new(vec![]);
    let parser = pinned(mcgm::parser().unwrap());

    let parsed = parse_pdf(
        b"%PDF-1.4",
        Backends {
            text: &text,
            vector: &vector,
            raster: &raster,
        },
        &parser,
        &ManualOverrides::new(),
        &ManualOverrides::new(),
    )
    .unwrap();

    assert_eq!(parsed.reference(), "MU-1608/25-26");
    assert_eq!(parsed.non_refundable_filename(), "MU-1608_25-26_Non Refundable Output.xlsx");
    assert_eq!(parsed.sd_filename(), "MU-1608_25-26_SD Output.xlsx");
    assert!(!parsed.majority_blank());

    let nr = &parsed.non_refundable.row;
    assert_eq!(nr.values.len(), nr.headers.len());
    assert_eq!(nr.get("Section Length (Mtr.)"), Some("100"));
    assert_eq!(nr.get("Road Types - CC/BT/TILES/ Normal Soil/kacha"), Some("CC Road / BT Road"));
    assert_eq!(nr.get("GST Amount"), Some("1800"));
    assert_eq!(nr.get("Difference from, DN date  - DN Sent to Central team (ARTL)"), Some("5"));
    assert_eq!(parsed.sd.row.get("SD Amount"), Some("50000"));

    // MCGM never rasterizes
    assert_eq!(vector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(raster.calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test 2: MBMC with OCR failure degrades to text fallbacks
// ---------------------------------------------------------------------------
#[test]
fn mbmc_ocr_failure_falls_back_to_text() {
    let text = MockExtractor {
        pages: vec![
            page(1, &["No. MBMC/ABC-123", "Date: 02.04.2025", "Security Deposit: Rs. 12,000"]),
            page(2, &["Way Leave Charges: 3,000"]),
        ],
    };
    let vector = MockTables::new(vec![]);
    let parser = mbmc::parser().unwrap();

    let parsed = parse_pdf(
        b"%PDF-1.4",
        Backends {
            text: &text,
            vector: &vector,
            raster: &BrokenOcr,
        },
        &parser,
        &ManualOverrides::new(),
        &ManualOverrides::new(),
    )
    .unwrap();

    assert_eq!(parsed.reference(), "MBMC/ABC-123");
    let nr = &parsed.non_refundable.row;
    assert_eq!(nr.get("SD Amount"), Some("12000"));
    assert_eq!(
        nr.get("Not part of capping (License Fee/Rental Payment /Way Leave charges etc.)"),
        Some("3000")
    );
    assert_eq!(nr.get("Road Types - CC/BT/TILES/ Normal Soil/kacha"), Some(""));
}

// ---------------------------------------------------------------------------
// Test 3: overrides win, per schema
// ---------------------------------------------------------------------------
#[test]
fn overrides_apply_to_their_own_schema() {
    let text = MockExtractor {
        pages: mcgm_pages(),
    };
    let tables = MockTables::new(vec![mcgm_table()]);
    let parser = mcgm::parser().unwrap();

    let mut nr_overrides = ManualOverrides::new();
    nr_overrides.insert("Circle".into(), "PUN".into());
    nr_overrides.insert("SD Amount".into(), "1".into());
    nr_overrides.insert("Demand Note Reference number".into(), "MU-9999".into());
    let mut sd_overrides = ManualOverrides::new();
    sd_overrides.insert("Unique route id".into(), "R-77".into());

    let parsed = parse_pdf(
        b"%PDF-1.4",
        Backends {
            text: &text,
            vector: &tables,
            raster: &tables,
        },
        &parser,
        &nr_overrides,
        &sd_overrides,
    )
    .unwrap();

    assert_eq!(parsed.non_refundable.row.get("Circle"), Some("PUN"));
    assert_eq!(parsed.non_refundable.row.get("SD Amount"), Some("1"));
    // the SD row still sees the extracted deposit
    assert_eq!(parsed.sd.row.get("SD Amount"), Some("50000"));
    assert_eq!(parsed.sd.row.get("Unique route id"), Some("R-77"));
    assert_eq!(parsed.non_refundable.row.get("Unique route id"), None);
    // filenames follow the extracted reference, not the overridden cell
    assert_eq!(
        parsed.non_refundable.row.get("Demand Note Reference number"),
        Some("MU-9999")
    );
    assert_eq!(parsed.non_refundable_filename(), "MU-1608_25-26_Non Refundable Output.xlsx");
}

// ---------------------------------------------------------------------------
// Test 4: unreadable documents and unsupported authorities
// ---------------------------------------------------------------------------
#[test]
fn unreadable_document_is_fatal() {
    let tables = MockTables::new(vec![]);
    let parser = mcgm::parser().unwrap();
    let err = parse_pdf(
        b"garbage",
        Backends {
            text: &UnreadableExtractor,
            vector: &tables,
            raster: &tables,
        },
        &parser,
        &ManualOverrides::new(),
        &ManualOverrides::new(),
    )
    .unwrap_err();
    assert!(matches!(err, TrenchError::DocumentUnreadable(_)));
}

#[test]
fn unsupported_authority_fails_before_reading() {
    let registry = AuthorityRegistry::builtin().unwrap();
    let tables = MockTables::new(vec![]);
    let err = parse_pdf(
        b"%PDF-1.4",
        Backends {
            text: &UnreadableExtractor,
            vector: &tables,
            raster: &tables,
        },
        registry.get(Authority::MidcType1).unwrap(),
        &ManualOverrides::new(),
        &ManualOverrides::new(),
    )
    .unwrap_err();
    assert!(matches!(err, TrenchError::UnsupportedAuthority(Authority::MidcType1)));
    assert!(err.to_string().contains("not yet supported"));
}

// ---------------------------------------------------------------------------
// Test 5: spreadsheet output matches the assembled row
// ---------------------------------------------------------------------------
#[test]
fn spreadsheet_matches_row() {
    let text = MockExtractor {
        pages: mcgm_pages(),
    };
    let tables = MockTables::new(vec![mcgm_table()]);
    let parser = mcgm::parser().unwrap();
    let parsed = parse_pdf(
        b"%PDF-1.4",
        Backends {
            text: &text,
            vector: &tables,
            raster: &tables,
        },
        &parser,
        &ManualOverrides::new(),
        &ManualOverrides::new(),
    )
    .unwrap();

    let row = &parsed.non_refundable.row;
    let bytes = workbook_bytes(row).unwrap();
    let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let range = wb.worksheet_range(&row.schema).unwrap();
    assert_eq!(range.get_size().1, row.len());
    for (i, header) in row.headers.iter().enumerate() {
        assert_eq!(
            range.get_value((0, i as u32)),
            Some(&Data::String(header.clone()))
        );
    }
    let idx = row
        .headers
        .iter()
        .position(|h| h == "Demand Note Reference number")
        .unwrap();
    assert_eq!(
        range.get_value((1, idx as u32)),
        Some(&Data::String("MU-1608/25-26".into()))
    );
}

// ---------------------------------------------------------------------------
// Test 6: application letter
// ---------------------------------------------------------------------------
#[test]
fn application_letter_through_extractor() {
    let text = MockExtractor {
        pages: vec![page(1, &["Application No. ROW/2025/0042", "Ward: K/East"])],
    };
    let details = parse_application_pdf(b"%PDF-1.4", &text).unwrap();
    assert_eq!(details.application_number, "ROW/2025/0042");
    assert_eq!(details.authority, "MCGM");
    assert_eq!(details.application_length, "");
}
