//! Run-time layout facts read straight from the pixels: how many tray
//! columns a screen shows, and how many traits are pinned beside it.

use image::RgbImage;

use crate::geometry::Rect;
use crate::screen::metadata::ScreenMetadata;
use crate::utils::image::flood_fill_bounds;

/// Per-channel flood fill window; wide enough for compression artifacts,
/// tight enough not to leak through UI borders.
pub const FILL_TOLERANCE: u8 = 10;

#[derive(Debug, Clone, Copy)]
pub struct TrayDetection {
    pub columns: i32,
    /// Cleaned-up tray bounds, usable for overlay rendering.
    pub tray: Rect,
}

/// Measure the tray and snap its right edge to a known column count.
///
/// The only measurement that matters is the right-hand side: it tells us how
/// many columns to search and where pinned traits sit horizontally. The tray
/// expands as traits are collected but never shrinks when they're purged, so
/// the right edge is a reliable discrete signal.
pub fn detect_column_count(image: &RgbImage, meta: &ScreenMetadata) -> Option<TrayDetection> {
    // mask out the top and bottom of the image where the tray can't appear
    let band = meta.tray_band(image.width());

    let mut fill_union: Option<Rect> = None;
    for seed in meta.tray_fill_seeds() {
        let Some(bounds) = flood_fill_bounds(image, seed, FILL_TOLERANCE, band) else {
            continue;
        };
        fill_union = Some(match fill_union {
            Some(so_far) => so_far.union(&bounds),
            None => bounds,
        });
    }

    // clean it up: only the right edge is trusted, the rest is the band
    let tray = Rect::new(0, band.y, fill_union?.right(), band.height);

    let normalized_right = (tray.right() as f32 / meta.multiplier()) as i32;
    let columns = ScreenMetadata::snap_column_count(normalized_right)?;
    log::debug!("tray right edge {normalized_right} -> {columns} columns");

    Some(TrayDetection { columns, tray })
}

#[derive(Debug, Clone, Default)]
pub struct PinDetection {
    /// Raw flood-fill boxes, left-aligned; these only establish the row
    /// count and feed overlay rendering.
    pub fill_boxes: Vec<Rect>,
    /// Exact icon squares derived from the tray geometry, one per row.
    pub icons: Vec<Rect>,
}

impl PinDetection {
    pub fn rows(&self) -> i32 {
        self.icons.len() as i32
    }
}

/// Count pinned-trait rows and derive their icon rectangles. Zero rows is a
/// valid outcome, not a failure.
pub fn detect_pin_rows(
    image: &RgbImage,
    meta: &ScreenMetadata,
    column_count: i32,
) -> PinDetection {
    let mask = meta.pin_mask();
    let expected_height = meta.pin_fill_expected_height();

    // rows are contiguous from the top, so the first bad fill ends the scan:
    // a fill overlapping an accepted one means the seed landed in the same
    // box, and one far from the expected height means it leaked or missed
    let mut accepted: Vec<Rect> = Vec::new();
    let mut accepted_union: Option<Rect> = None;
    for seed in meta.pin_fill_seeds() {
        let Some(bounds) = flood_fill_bounds(image, seed, FILL_TOLERANCE, mask) else {
            break;
        };

        let overlaps = accepted_union.is_some_and(|so_far| so_far.intersects(&bounds));
        let height_deviation = (bounds.height - expected_height).abs() as f32;
        if overlaps || height_deviation > expected_height as f32 / 10.0 {
            break;
        }

        accepted_union = Some(match accepted_union {
            Some(so_far) => so_far.union(&bounds),
            None => bounds,
        });
        accepted.push(bounds);
    }

    let Some(left_most) = accepted.iter().map(Rect::left).min() else {
        return PinDetection::default();
    };

    // left-align; highlighted icons or certain chunky traits can block part
    // of a fill
    for rect in &mut accepted {
        let right = rect.right();
        rect.x = left_most;
        rect.width = right - left_most;
    }

    // the fill boxes are too noisy for final coordinates (compression eats
    // their edges), so re-derive icon rects from known tray geometry
    let icons = (0..accepted.len() as i32)
        .filter_map(|row| meta.pin_icon_rect(column_count, row))
        .collect();

    PinDetection {
        fill_boxes: accepted,
        icons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn white_screen() -> RgbImage {
        RgbImage::from_pixel(1920, 1080, Rgb([255, 255, 255]))
    }

    fn paint(image: &mut RgbImage, rect: Rect, color: [u8; 3]) {
        for y in rect.top().max(0)..rect.bottom().min(image.height() as i32) {
            for x in rect.left().max(0)..rect.right().min(image.width() as i32) {
                image.put_pixel(x as u32, y as u32, Rgb(color));
            }
        }
    }

    #[test]
    fn column_count_from_tray_right_edge() {
        let mut image = white_screen();
        // a five-column tray: right edge at 365, spanning both fill seeds
        paint(&mut image, Rect::new(0, 600, 365, 300), [40, 30, 60]);

        let meta = ScreenMetadata::new(1920).unwrap();
        let detection = detect_column_count(&image, &meta).unwrap();
        assert_eq!(detection.columns, 5);
        assert_eq!(detection.tray.right(), 365);
    }

    #[test]
    fn off_table_right_edge_is_rejected() {
        let mut image = white_screen();
        paint(&mut image, Rect::new(0, 600, 500, 300), [40, 30, 60]);

        let meta = ScreenMetadata::new(1920).unwrap();
        assert!(detect_column_count(&image, &meta).is_none());
    }

    #[test]
    fn pin_rows_counted_and_rederived() {
        let mut image = white_screen();
        // two pin boxes 168 apart, each 150 tall, reaching past the seeds
        for row in 0..2 {
            let y = 204 + row * 168;
            paint(&mut image, Rect::new(250, y, 950, 150), [70, 60, 90]);
        }

        let meta = ScreenMetadata::new(1920).unwrap();
        let detection = detect_pin_rows(&image, &meta, 4);

        assert_eq!(detection.rows(), 2);
        assert_eq!(detection.fill_boxes.len(), 2);

        let expected_first = meta.pin_icon_rect(4, 0).unwrap();
        assert_eq!(detection.icons[0], expected_first);
        assert_eq!(detection.icons[1].center().1 - detection.icons[0].center().1, 168);
    }

    #[test]
    fn no_pins_is_a_valid_outcome() {
        let image = white_screen();
        let meta = ScreenMetadata::new(1920).unwrap();

        // the first fill floods the whole masked background, far from the
        // expected box height
        let detection = detect_pin_rows(&image, &meta, 4);
        assert_eq!(detection.rows(), 0);
    }
}
