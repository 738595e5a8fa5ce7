use crate::error::TrenchError;
use crate::extraction::{ensure_pdf, BBox, PageContent, PdfExtractor, WordBox};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// Text is taken in reading order rather than with `-layout`, so each table
/// cell of a demand note lands on its own line. Word positions come from a
/// second `-bbox` pass.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, TrenchError> {
        ensure_pdf(pdf_bytes)?;

        let mut tmpfile = tempfile::NamedTempFile::new()?;
        tmpfile.write_all(pdf_bytes)?;
        let tmp_path = tmpfile.path().to_path_buf();

        let text = run_pdftotext(&[], &tmp_path)?;
        let words = parse_bbox_xml(&run_pdftotext(&["-bbox"], &tmp_path)?);

        // pdftotext uses form feed \x0c as page separator
        let pages: Vec<PageContent> = text
            .split('\x0c')
            .enumerate()
            .map(|(i, page_text)| PageContent {
                page_number: i + 1,
                lines: page_text.lines().map(|l| l.to_string()).collect(),
                words: words.get(i).cloned().unwrap_or_default(),
            })
            .filter(|p| !p.lines.is_empty() || p.page_number == 1)
            .collect();

        debug!(pages = pages.len(), "pdftotext extracted text layer");
        for page in &pages {
            debug!(page = page.page_number, text = %page.lines.join("\n"), "page text");
        }
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

fn run_pdftotext(args: &[&str], pdf_path: &Path) -> Result<String, TrenchError> {
    let output = Command::new("pdftotext")
        .args(args)
        .arg(pdf_path)
        .arg("-") // output to stdout
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrenchError::PdftotextNotFound
            } else {
                TrenchError::Io(e)
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        // Exit code 1 is poppler's "error opening a PDF file".
        if code == 1 {
            return Err(TrenchError::DocumentUnreadable(stderr));
        }
        return Err(TrenchError::ToolFailed {
            tool: "pdftotext".into(),
            code,
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse `pdftotext -bbox` XHTML into per-page word lists (index 0 is page 1).
fn parse_bbox_xml(xml: &str) -> Vec<Vec<WordBox>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<Vec<WordBox>> = Vec::new();
    let mut current_bbox: Option<BBox> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => pages.push(Vec::new()),
                b"word" => current_bbox = parse_bbox(&e),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let (Some(bbox), Some(page)) = (current_bbox, pages.last_mut()) {
                    let text = t.unescape().map(|s| s.trim().to_string()).unwrap_or_default();
                    if !text.is_empty() {
                        page.push(WordBox { text, bbox });
                    }
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => current_bbox = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "stopping at malformed bbox xml");
                break;
            }
            _ => {}
        }
    }

    pages
}

fn parse_attr_f32(tag: &BytesStart, name: &[u8]) -> Option<f32> {
    tag.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok()?.parse().ok())
}

fn parse_bbox(tag: &BytesStart) -> Option<BBox> {
    Some(BBox {
        x_min: parse_attr_f32(tag, b"xMin")?,
        y_min: parse_attr_f32(tag, b"yMin")?,
        x_max: parse_attr_f32(tag, b"xMax")?,
        y_max: parse_attr_f32(tag, b"yMax")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox_xml_words_per_page() {
        let xml = r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
<meta name="Producer" content="poppler"/>
</head>
<body>
<doc>
  <page width="595.0" height="842.0">
    <word xMin="10.0" yMin="20.0" xMax="30.0" yMax="30.0">No.</word>
    <word xMin="32.0" yMin="20.0" xMax="90.0" yMax="30.0">A&amp;B/12</word>
  </page>
  <page width="595.0" height="842.0">
    <word xMin="50.5" yMin="100.0" xMax="70.0" yMax="110.0">Total</word>
  </page>
</doc>
</body>
</html>
"#;
        let pages = parse_bbox_xml(xml);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 2);
        assert_eq!(pages[0][1].text, "A&B/12");
        assert_eq!(pages[0][0].bbox.x_min, 10.0);
        assert_eq!(pages[1][0].text, "Total");
        assert_eq!(pages[1][0].bbox.center(), (60.25, 105.0));
    }

    #[test]
    fn test_rejects_non_pdf_before_spawning() {
        let err = PdftotextExtractor::new()
            .extract_pages(b"plain text, not a pdf")
            .unwrap_err();
        assert!(matches!(err, TrenchError::DocumentUnreadable(_)));
    }
}
