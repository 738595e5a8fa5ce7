//! Grayscale morphology used to recover ruled-table cells from a page image.
//!
//! Pixels are 8-bit. Binary images use 255 for foreground and 0 for background.

use image::{GrayImage, Luma};

/// Bounding box of one detected cell, in pixels of the working image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellBox {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Global threshold maximising between-class variance (Otsu).
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_variance = -1.0f64;
    let mut background_weight = 0u64;
    let mut background_sum = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }
        background_sum += level as f64 * count as f64;

        let mean_bg = background_sum / background_weight as f64;
        let mean_fg = (weighted_total - background_sum) / foreground_weight as f64;
        let variance =
            background_weight as f64 * foreground_weight as f64 * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }
    best_level
}

/// `src > level` becomes 255, everything else 0.
pub fn threshold(img: &GrayImage, level: u8) -> GrayImage {
    map_pixels(img, |v| if v > level { 255 } else { 0 })
}

/// `src > level` becomes 0, everything else 255.
pub fn threshold_inverse(img: &GrayImage, level: u8) -> GrayImage {
    map_pixels(img, |v| if v > level { 0 } else { 255 })
}

pub fn invert(img: &GrayImage) -> GrayImage {
    map_pixels(img, |v| 255 - v)
}

fn map_pixels(img: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = f(p.0[0]);
    }
    out
}

/// Weighted sum `a * alpha + b * beta`, rounded and saturated.
pub fn blend(a: &GrayImage, b: &GrayImage, alpha: f32, beta: f32) -> GrayImage {
    let (w, h) = a.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let av = a.get_pixel(x, y).0[0] as f32;
        let bv = b.get_pixel_checked(x, y).map(|p| p.0[0] as f32).unwrap_or(0.0);
        Luma([(av * alpha + bv * beta).round().clamp(0.0, 255.0) as u8])
    })
}

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

/// One pass of a min or max filter along a single axis with a centred window.
/// Out-of-image pixels are ignored.
fn filter_axis(img: &GrayImage, len: u32, horizontal: bool, op: Extremum) -> GrayImage {
    if len <= 1 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let before = (len / 2) as i64;
    let after = (len - 1 - len / 2) as i64;

    GrayImage::from_fn(w, h, |x, y| {
        let (pos, limit) = if horizontal { (x as i64, w as i64) } else { (y as i64, h as i64) };
        let lo = (pos - before).max(0);
        let hi = (pos + after).min(limit - 1);
        let values = (lo..=hi).map(|i| {
            let (sx, sy) = if horizontal { (i as u32, y) } else { (x, i as u32) };
            img.get_pixel(sx, sy).0[0]
        });
        let v = match op {
            Extremum::Min => values.min(),
            Extremum::Max => values.max(),
        };
        Luma([v.unwrap_or(0)])
    })
}

fn morph(img: &GrayImage, kernel_w: u32, kernel_h: u32, iterations: u32, op: Extremum) -> GrayImage {
    let mut out = img.clone();
    for _ in 0..iterations {
        out = filter_axis(&out, kernel_w, true, op);
        out = filter_axis(&out, kernel_h, false, op);
    }
    out
}

/// Erosion with a `kernel_w` x `kernel_h` rectangle.
pub fn erode(img: &GrayImage, kernel_w: u32, kernel_h: u32, iterations: u32) -> GrayImage {
    morph(img, kernel_w, kernel_h, iterations, Extremum::Min)
}

/// Dilation with a `kernel_w` x `kernel_h` rectangle.
pub fn dilate(img: &GrayImage, kernel_w: u32, kernel_h: u32, iterations: u32) -> GrayImage {
    morph(img, kernel_w, kernel_h, iterations, Extremum::Max)
}

/// Bounding boxes of 4-connected foreground regions.
///
/// Regions touching the image border are the page background around the
/// table, not cells, and are dropped.
pub fn connected_components(mask: &GrayImage) -> Vec<CellBox> {
    let (w, h) = mask.dimensions();
    let mut seen = vec![false; (w as usize) * (h as usize)];
    let idx = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;
    let mut boxes = Vec::new();
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for sy in 0..h {
        for sx in 0..w {
            if seen[idx(sx, sy)] || mask.get_pixel(sx, sy).0[0] == 0 {
                continue;
            }
            seen[idx(sx, sy)] = true;
            stack.push((sx, sy));
            let (mut x0, mut y0, mut x1, mut y1) = (sx, sy, sx, sy);

            while let Some((x, y)) = stack.pop() {
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);

                let mut visit = |nx: u32, ny: u32| {
                    if !seen[idx(nx, ny)] && mask.get_pixel(nx, ny).0[0] != 0 {
                        seen[idx(nx, ny)] = true;
                        stack.push((nx, ny));
                    }
                };
                if x > 0 {
                    visit(x - 1, y);
                }
                if x + 1 < w {
                    visit(x + 1, y);
                }
                if y > 0 {
                    visit(x, y - 1);
                }
                if y + 1 < h {
                    visit(x, y + 1);
                }
            }

            let touches_border = x0 == 0 || y0 == 0 || x1 + 1 == w || y1 + 1 == h;
            if !touches_border {
                boxes.push(CellBox {
                    x: x0,
                    y: y0,
                    width: x1 - x0 + 1,
                    height: y1 - y0 + 1,
                });
            }
        }
    }
    boxes
}

/// Sort boxes by (top, left) and group them into rows.
///
/// A box joins the current row when its top is within `tolerance` pixels of
/// the previous box's top; otherwise it opens a new row. Each row is ordered
/// left to right.
pub fn cluster_rows(mut boxes: Vec<CellBox>, tolerance: u32) -> Vec<Vec<CellBox>> {
    boxes.sort_by_key(|b| (b.y, b.x));

    let mut rows: Vec<Vec<CellBox>> = Vec::new();
    let mut last_y: Option<u32> = None;
    for b in boxes {
        match (last_y, rows.last_mut()) {
            (Some(ly), Some(row)) if b.y.abs_diff(ly) < tolerance => row.push(b),
            _ => rows.push(vec![b]),
        }
        last_y = Some(b.y);
    }

    for row in &mut rows {
        row.sort_by_key(|b| b.x);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(x: u32, y: u32) -> CellBox {
        CellBox {
            x,
            y,
            width: 40,
            height: 30,
        }
    }

    #[test]
    fn test_cluster_rows_by_vertical_proximity() {
        let boxes = vec![cell(100, 50), cell(0, 12), cell(50, 10), cell(0, 52)];
        let rows = cluster_rows(boxes, 10);
        assert_eq!(rows.len(), 2);
        let tops: Vec<Vec<u32>> = rows.iter().map(|r| r.iter().map(|b| b.y).collect()).collect();
        assert_eq!(tops, vec![vec![12, 10], vec![52, 50]]);
        assert_eq!(rows[0][0].x, 0);
        assert_eq!(rows[1][1].x, 100);
    }

    #[test]
    fn test_cluster_rows_tolerance_is_exclusive() {
        let rows = cluster_rows(vec![cell(0, 0), cell(0, 10)], 10);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_otsu_splits_bimodal_image() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([20]) } else { Luma([220]) });
        let level = otsu_level(&img);
        assert!((20..220).contains(&level));
        let bin = threshold_inverse(&img, level);
        assert_eq!(bin.get_pixel(0, 0).0[0], 255);
        assert_eq!(bin.get_pixel(9, 0).0[0], 0);
    }

    #[test]
    fn test_erode_then_dilate_keeps_only_long_lines() {
        // a 20px vertical line and a 3px speck on a 30x30 canvas
        let img = GrayImage::from_fn(30, 30, |x, y| {
            let line = x == 5 && (5..25).contains(&y);
            let speck = x == 20 && (10..13).contains(&y);
            Luma([if line || speck { 255 } else { 0 }])
        });
        let opened = dilate(&erode(&img, 1, 10, 1), 1, 10, 1);
        assert_eq!(opened.get_pixel(5, 15).0[0], 255);
        assert_eq!(opened.get_pixel(20, 11).0[0], 0);
    }

    #[test]
    fn test_components_skip_border_region() {
        // white page with a black 2x2 grid of rules forming four interior cells
        let img = GrayImage::from_fn(50, 50, |x, y| {
            let rule = [5, 25, 45].contains(&x) && (5..=45).contains(&y)
                || [5, 25, 45].contains(&y) && (5..=45).contains(&x);
            Luma([if rule { 0 } else { 255 }])
        });
        let mut cells = connected_components(&img);
        cells.sort_by_key(|c| (c.y, c.x));
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], CellBox { x: 6, y: 6, width: 19, height: 19 });
        assert_eq!(cells[3].area(), 361);
    }

    #[test]
    fn test_blend_and_invert() {
        let a = GrayImage::from_pixel(2, 1, Luma([255]));
        let b = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        let mixed = blend(&a, &b, 0.5, 0.5);
        assert_eq!(mixed.get_pixel(0, 0).0[0], 255);
        assert_eq!(mixed.get_pixel(1, 0).0[0], 128);
        assert_eq!(invert(&mixed).get_pixel(1, 0).0[0], 127);
    }
}
