//! Lattice table detection from vector ruling lines.
//!
//! Stroked lines and rectangles in the page content stream are collected
//! as horizontal and vertical segments. Segments that touch each other form
//! one table; the distinct x and y positions of its rules give the column
//! and row boundaries. Words from the text layer are then dropped into the
//! cell containing their centre.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::TrenchError;
use crate::extraction::{ensure_pdf, PageContent, VectorTableExtractor, WordBox};
use crate::model::TableGrid;

/// A4 portrait height, used when a page has no resolvable MediaBox.
const DEFAULT_PAGE_TOP: f32 = 842.0;
const MAX_PARENT_DEPTH: usize = 32;

/// Ruling-line based table extractor over lopdf.
pub struct LatticeExtractor {
    /// Distance in points within which rule positions are treated as equal.
    pub tolerance: f32,
    /// Segments shorter than this are ignored (tick marks, rectangle ends of thin fills).
    pub min_segment_length: f32,
}

impl LatticeExtractor {
    pub fn new() -> Self {
        LatticeExtractor {
            tolerance: 2.0,
            min_segment_length: 4.0,
        }
    }
}

impl Default for LatticeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorTableExtractor for LatticeExtractor {
    fn extract_tables(
        &self,
        pdf_bytes: &[u8],
        text: &[PageContent],
        pages: &[usize],
    ) -> Result<Vec<TableGrid>, TrenchError> {
        ensure_pdf(pdf_bytes)?;
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| TrenchError::DocumentUnreadable(e.to_string()))?;
        let page_ids = doc.get_pages();

        let mut tables = Vec::new();
        for &page in pages {
            let Some(&page_id) = u32::try_from(page).ok().and_then(|p| page_ids.get(&p)) else {
                debug!(page, "page not present, skipping lattice detection");
                continue;
            };
            let raw = doc
                .get_page_content(page_id)
                .map_err(|e| TrenchError::DocumentUnreadable(e.to_string()))?;
            let content = Content::decode(&raw)
                .map_err(|e| TrenchError::DocumentUnreadable(e.to_string()))?;

            let segments = collect_segments(
                &content.operations,
                page_top(&doc, page_id),
                self.tolerance,
                self.min_segment_length,
            );
            let words: &[WordBox] = text
                .iter()
                .find(|p| p.page_number == page)
                .map(|p| p.words.as_slice())
                .unwrap_or(&[]);

            let found = build_tables(&segments, words, self.tolerance);
            info!(page, segments = segments.len(), tables = found.len(), "lattice detection");
            for (i, t) in found.iter().enumerate() {
                debug!(page, table = i, rows = t.row_count(), cols = t.column_count(), grid = ?t.rows(), "lattice table");
            }
            tables.extend(found);
        }
        Ok(tables)
    }

    fn backend_name(&self) -> &str {
        "lattice"
    }
}

/// Top edge of the page in user space, following inherited MediaBox entries.
fn page_top(doc: &Document, page_id: ObjectId) -> f32 {
    let mut dict = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_PARENT_DEPTH {
        let Some(d) = dict else { break };
        if let Some(top) = d
            .get(b"MediaBox")
            .and_then(|o| o.as_array())
            .ok()
            .and_then(|mb| mb.get(3))
            .and_then(|o| o.as_float().ok())
        {
            return top;
        }
        dict = d
            .get(b"Parent")
            .and_then(|p| p.as_reference())
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    DEFAULT_PAGE_TOP
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Horizontal rule at `y` spanning `x0..x1` (top-left origin).
    Horizontal { y: f32, x0: f32, x1: f32 },
    /// Vertical rule at `x` spanning `y0..y1` (top-left origin).
    Vertical { x: f32, y0: f32, y1: f32 },
}

/// Affine transform `[a b c d e f]` as used by the `cm` operator.
#[derive(Debug, Clone, Copy)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Transform applying `self` first, then `outer`.
    fn then(&self, outer: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [oa, ob, oc, od, oe, of] = outer.0;
        Matrix([
            a * oa + b * oc,
            a * ob + b * od,
            c * oa + d * oc,
            c * ob + d * od,
            e * oa + f * oc + oe,
            e * ob + f * od + of,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }
}

fn operand(op: &Operation, i: usize) -> Option<f32> {
    op.operands.get(i).and_then(|o: &Object| o.as_float().ok())
}

/// Walk the content stream and return every painted axis-aligned segment,
/// converted to a top-left origin using `page_top`.
pub fn collect_segments(
    operations: &[Operation],
    page_top: f32,
    tolerance: f32,
    min_length: f32,
) -> Vec<Segment> {
    let mut ctm = Matrix::IDENTITY;
    let mut stack: Vec<Matrix> = Vec::new();
    let mut pending: Vec<((f32, f32), (f32, f32))> = Vec::new();
    let mut subpath_start: Option<(f32, f32)> = None;
    let mut cursor: Option<(f32, f32)> = None;
    let mut segments = Vec::new();

    for op in operations {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => ctm = stack.pop().unwrap_or(Matrix::IDENTITY),
            "cm" => {
                let m: Option<Vec<f32>> = (0..6).map(|i| operand(op, i)).collect();
                if let Some(m) = m {
                    ctm = Matrix([m[0], m[1], m[2], m[3], m[4], m[5]]).then(&ctm);
                }
            }
            "m" => {
                if let (Some(x), Some(y)) = (operand(op, 0), operand(op, 1)) {
                    let p = ctm.apply(x, y);
                    subpath_start = Some(p);
                    cursor = Some(p);
                }
            }
            "l" => {
                if let (Some(x), Some(y), Some(from)) = (operand(op, 0), operand(op, 1), cursor) {
                    let p = ctm.apply(x, y);
                    pending.push((from, p));
                    cursor = Some(p);
                }
            }
            "h" => {
                if let (Some(from), Some(start)) = (cursor, subpath_start) {
                    pending.push((from, start));
                    cursor = Some(start);
                }
            }
            "re" => {
                let r: Option<Vec<f32>> = (0..4).map(|i| operand(op, i)).collect();
                if let Some(r) = r {
                    let (x, y, w, h) = (r[0], r[1], r[2], r[3]);
                    let corners = [
                        ctm.apply(x, y),
                        ctm.apply(x + w, y),
                        ctm.apply(x + w, y + h),
                        ctm.apply(x, y + h),
                    ];
                    for i in 0..4 {
                        pending.push((corners[i], corners[(i + 1) % 4]));
                    }
                    subpath_start = Some(corners[0]);
                    cursor = Some(corners[0]);
                }
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                for (p0, p1) in pending.drain(..) {
                    segments.extend(classify(p0, p1, page_top, tolerance, min_length));
                }
                subpath_start = None;
                cursor = None;
            }
            "n" => {
                pending.clear();
                subpath_start = None;
                cursor = None;
            }
            _ => {}
        }
    }

    segments
}

fn classify(
    (x0, y0): (f32, f32),
    (x1, y1): (f32, f32),
    page_top: f32,
    tolerance: f32,
    min_length: f32,
) -> Option<Segment> {
    let (ty0, ty1) = (page_top - y0, page_top - y1);
    if (ty0 - ty1).abs() <= tolerance && (x1 - x0).abs() >= min_length {
        return Some(Segment::Horizontal {
            y: (ty0 + ty1) / 2.0,
            x0: x0.min(x1),
            x1: x0.max(x1),
        });
    }
    if (x0 - x1).abs() <= tolerance && (ty1 - ty0).abs() >= min_length {
        return Some(Segment::Vertical {
            x: (x0 + x1) / 2.0,
            y0: ty0.min(ty1),
            y1: ty0.max(ty1),
        });
    }
    None
}

fn intersects(h: &Segment, v: &Segment, tol: f32) -> bool {
    match (h, v) {
        (Segment::Horizontal { y, x0, x1 }, Segment::Vertical { x, y0, y1 }) => {
            *x >= x0 - tol && *x <= x1 + tol && *y >= y0 - tol && *y <= y1 + tol
        }
        _ => false,
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Cluster sorted positions: a value further than `tol` from the previous one starts a new boundary.
fn cluster_positions(mut values: Vec<f32>, tol: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut clusters: Vec<Vec<f32>> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some(c) if c.last().is_some_and(|last| v - last <= tol) => c.push(v),
            _ => clusters.push(vec![v]),
        }
    }
    clusters
        .into_iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

fn slot(bounds: &[f32], v: f32) -> Option<usize> {
    bounds.windows(2).position(|w| v >= w[0] && v < w[1])
}

/// Group segments into tables and fill each table's cells with words.
/// Tables are returned top to bottom.
pub fn build_tables(segments: &[Segment], words: &[WordBox], tolerance: f32) -> Vec<TableGrid> {
    let n = segments.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in 0..n {
            if intersects(&segments[i], &segments[j], tolerance) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[a] = b;
                }
            }
        }
    }

    let mut groups: std::collections::BTreeMap<usize, Vec<Segment>> = Default::default();
    for i in 0..n {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(segments[i]);
    }

    let mut tables: Vec<(f32, TableGrid)> = groups
        .into_values()
        .filter_map(|group| {
            let xs: Vec<f32> = group
                .iter()
                .filter_map(|s| match s {
                    Segment::Vertical { x, .. } => Some(*x),
                    _ => None,
                })
                .collect();
            let ys: Vec<f32> = group
                .iter()
                .filter_map(|s| match s {
                    Segment::Horizontal { y, .. } => Some(*y),
                    _ => None,
                })
                .collect();
            let xs = cluster_positions(xs, tolerance);
            let ys = cluster_positions(ys, tolerance);
            if xs.len() < 2 || ys.len() < 2 {
                return None;
            }
            Some((ys[0], fill_grid(&xs, &ys, words)))
        })
        .collect();

    tables.sort_by(|a, b| a.0.total_cmp(&b.0));
    tables.into_iter().map(|(_, t)| t).collect()
}

fn fill_grid(xs: &[f32], ys: &[f32], words: &[WordBox]) -> TableGrid {
    let (rows, cols) = (ys.len() - 1, xs.len() - 1);
    let mut buckets: Vec<Vec<Vec<&WordBox>>> = vec![vec![Vec::new(); cols]; rows];

    for word in words {
        let (cx, cy) = word.bbox.center();
        if let (Some(r), Some(c)) = (slot(ys, cy), slot(xs, cx)) {
            buckets[r][c].push(word);
        }
    }

    TableGrid::new(
        buckets
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect(),
    )
}

/// Words of one cell in reading order; words on separate baselines become separate lines.
fn cell_text(mut words: Vec<&WordBox>) -> String {
    words.sort_by(|a, b| {
        a.bbox
            .center()
            .1
            .total_cmp(&b.bbox.center().1)
            .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
    });

    let mut lines: Vec<(f32, Vec<&WordBox>)> = Vec::new();
    for w in words {
        let cy = w.bbox.center().1;
        let half_height = (w.bbox.y_max - w.bbox.y_min) / 2.0;
        match lines.last_mut() {
            Some((line_y, line)) if (cy - *line_y).abs() <= half_height => line.push(w),
            _ => lines.push((cy, vec![w])),
        }
    }

    lines
        .into_iter()
        .map(|(_, mut line)| {
            line.sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
            line.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
