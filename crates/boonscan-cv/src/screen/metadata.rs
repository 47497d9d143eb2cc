//! Item position and offset variables adjusted for image size.
//!
//! Every constant is expressed at the 1920-wide reference resolution and
//! scaled by a single multiplier, so one number describes the whole layout.

use anyhow::ensure;
use boonscan_core::{Category, Codex, Subcategory, Trait};
use image::RgbImage;
use std::collections::HashSet;

use crate::Result;
use crate::geometry::Rect;

/// Width the layout constants were measured at.
pub const REFERENCE_WIDTH: f32 = 1920.0;

/// The highest number of tray columns that can be visible. Screens with more
/// than 6 bug out ingame and are unsupported.
pub const COLUMNS_MAX: i32 = 6;

/// Only the first column contains this many rows.
pub const ROWS_MAX: i32 = 7;

/// The most traits that can be pinned at once.
pub const PIN_ROWS_MAX: usize = 5;

// Tray icon locations & dimensions
const FIRST_ICON_X: f32 = 50.0; // X location of the first icon (equipped companion)
const FIRST_ICON_Y: f32 = 206.0; // Y location of above
const SECOND_COLUMN_X: f32 = 122.0; // X location of the second column
const SLOT_WIDTH: f32 = 77.0; // width of the diamond
const COLUMN_SEP: f32 = 64.25; // distance between columns (from 2nd column onwards)
const ROW_SEP: f32 = 93.6; // distance between rows
const ODD_COLUMN_Y_OFFSET: f32 = 47.0; // vertical offset of every second column

// Tray size detection
const TRAY_MASK_TOP: f32 = 248.0; // mask top when deducing tray column count
const TRAY_MASK_HEIGHT: f32 = 592.0; // and the height
const TRAY_FILL_SEEDS: [(f32, f32); 2] = [(186.0, 822.0), (121.0, 815.0)];

/// How many columns the tray contains if its right side is near these X
/// coordinates at reference scale.
const TRAY_RIGHT_TO_COLUMNS: [(i32, i32); 4] = [(232, 3), (298, 4), (365, 5), (432, 6)];
const TRAY_RIGHT_TOLERANCE: i32 = 15;

// Pinned trait detection. The mask width cuts off the full length of each
// pin box; any wider and the stats panel can overlap the border and let the
// flood fill out.
const PIN_MASK_TOP: f32 = 147.0;
const PIN_MASK_WIDTH: f32 = 1150.0;
const PIN_MASK_HEIGHT: f32 = 839.0;
const PINS_START_Y: f32 = 279.0;
const PINS_SEPARATION_Y: f32 = 168.0;
const PIN_FILL_EXPECTED_HEIGHT: f32 = 150.0; // single pin box; rows sit 168 apart
const PIN_CENTRE_FROM_LAST_COLUMN: f32 = 158.0;
const PIN_ITEM_FIRST_Y: f32 = 231.0;
const PINNED_SLOT_WIDTH: f32 = 117.0; // width of the diamond in a pinned trait

// Screen validity probe regions
const CAST_CHECK: (f32, f32, f32, f32) = (517.0, 994.0, 29.0, 41.0);
const HEALTH_CHECK: (f32, f32, f32, f32) = (62.0, 1009.0, 300.0, 17.0);
const BACK_BUTTON_CHECK: (f32, f32, f32, f32) = (1575.0, 963.0, 52.0, 52.0);

/// Restrict some slots to one category.
const CATEGORY_SLOTS: [((i32, i32), Category); 2] = [
    ((0, 0), Category::Companions),
    ((0, ROWS_MAX - 1), Category::Keepsakes),
];

/// Restrict the ability slots to one subcategory each.
const SUBCATEGORY_SLOTS: [((i32, i32), Subcategory); 5] = [
    ((0, 1), Subcategory::Attack),
    ((0, 2), Subcategory::Special),
    ((0, 3), Subcategory::Cast),
    ((0, 4), Subcategory::Dash),
    ((0, 5), Subcategory::Call),
];

/// Maps an image width onto the fixed UI template.
#[derive(Debug, Clone, Copy)]
pub struct ScreenMetadata {
    multiplier: f32,
}

impl ScreenMetadata {
    pub fn new(image_width: u32) -> Result<Self> {
        ensure!(image_width > 0, "image width must be > 0");
        Ok(Self {
            multiplier: image_width as f32 / REFERENCE_WIDTH,
        })
    }

    pub fn for_image(image: &RgbImage) -> Result<Self> {
        Self::new(image.width())
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn scale(&self, value: f32) -> f32 {
        value * self.multiplier
    }

    fn scale_i(&self, value: f32) -> i32 {
        (value * self.multiplier) as i32
    }

    /// Square bounding the trait at (column, row), or `None` for positions
    /// the asymmetric tray shape never fills: row 0 exists only in column 0
    /// (the companion), and odd columns hold one item fewer.
    pub fn trait_rect(&self, column: i32, row: i32) -> Option<Rect> {
        if row == 0 && column != 0 {
            return None;
        }

        // the distance between columns 0 and 1 is unique
        let start_x = if column == 0 {
            self.scale(FIRST_ICON_X)
        } else {
            self.scale(SECOND_COLUMN_X) - self.scale(COLUMN_SEP)
        };
        let mut start_y = self.scale(FIRST_ICON_Y);

        if column % 2 == 1 {
            if row == ROWS_MAX - 1 {
                return None;
            }
            start_y += self.scale(ODD_COLUMN_Y_OFFSET);
        }

        let middle_x = (start_x + column as f32 * self.scale(COLUMN_SEP)) as i32;
        let middle_y = (start_y + row as f32 * self.scale(ROW_SEP)) as i32;
        let width = self.scale(SLOT_WIDTH) as i32;

        Some(Rect::centered_square(middle_x, middle_y, width))
    }

    /// Icon square for a pinned trait row. The horizontal position hangs off
    /// the rightmost tray column, so the tray column count must be known.
    pub fn pin_icon_rect(&self, column_count: i32, row: i32) -> Option<Rect> {
        let rightmost = self.trait_rect(column_count - 1, 1)?;
        let centre_x = rightmost.x + rightmost.width / 2 + self.scale_i(PIN_CENTRE_FROM_LAST_COLUMN);
        let centre_y = self.scale_i(PIN_ITEM_FIRST_Y) + row * self.scale_i(PINS_SEPARATION_Y);

        Some(Rect::centered_square(
            centre_x,
            centre_y,
            self.scale_i(PINNED_SLOT_WIDTH),
        ))
    }

    /// Thin horizontal band the tray can appear in.
    pub(crate) fn tray_band(&self, image_width: u32) -> Rect {
        Rect::new(
            0,
            self.scale_i(TRAY_MASK_TOP),
            image_width as i32,
            self.scale_i(TRAY_MASK_HEIGHT),
        )
    }

    /// Interior points safe to flood fill from when measuring the tray.
    pub(crate) fn tray_fill_seeds(&self) -> [(i32, i32); 2] {
        TRAY_FILL_SEEDS.map(|(x, y)| (self.scale_i(x), self.scale_i(y)))
    }

    /// Snap a normalized tray right edge to the nearest known layout, within
    /// tolerance. Fills are noisy, so only the table entries count.
    pub fn snap_column_count(normalized_right: i32) -> Option<i32> {
        let (closest_right, columns) = TRAY_RIGHT_TO_COLUMNS
            .iter()
            .min_by_key(|(right, _)| (right - normalized_right).abs())
            .copied()?;

        ((closest_right - normalized_right).abs() <= TRAY_RIGHT_TOLERANCE).then_some(columns)
    }

    /// Region the pinned-trait boxes can appear in.
    pub(crate) fn pin_mask(&self) -> Rect {
        Rect::new(
            0,
            self.scale_i(PIN_MASK_TOP),
            self.scale_i(PIN_MASK_WIDTH),
            self.scale_i(PIN_MASK_HEIGHT),
        )
    }

    /// One candidate seed per pinnable row, near the right edge of the mask.
    pub(crate) fn pin_fill_seeds(&self) -> [(i32, i32); PIN_ROWS_MAX] {
        let x = self.scale_i(PIN_MASK_WIDTH) - 10;
        std::array::from_fn(|row| {
            (
                x,
                self.scale_i(PINS_START_Y) + row as i32 * self.scale_i(PINS_SEPARATION_Y),
            )
        })
    }

    pub(crate) fn pin_fill_expected_height(&self) -> i32 {
        self.scale_i(PIN_FILL_EXPECTED_HEIGHT)
    }

    fn probe_rect(&self, (x, y, width, height): (f32, f32, f32, f32)) -> Rect {
        Rect::new(
            self.scale_i(x),
            self.scale_i(y),
            self.scale_i(width),
            self.scale_i(height),
        )
    }

    /// Cast icon always present on a real victory screen.
    pub fn cast_check_rect(&self) -> Rect {
        self.probe_rect(CAST_CHECK)
    }

    /// Healthbar area.
    pub fn health_check_rect(&self) -> Rect {
        self.probe_rect(HEALTH_CHECK)
    }

    /// "Back" button under the victory stats panel.
    pub fn back_button_rect(&self) -> Rect {
        self.probe_rect(BACK_BUTTON_CHECK)
    }

    /// Traits that can legally appear at (column, row): the companion and
    /// keepsake slots and the five ability slots are locked to their
    /// category/subcategory, every other position takes whatever those
    /// don't claim, and any slot can be empty.
    pub fn slot_candidates<'c>(codex: &'c Codex, column: i32, row: i32) -> Vec<&'c Trait> {
        let position = (column, row);
        let category = CATEGORY_SLOTS
            .iter()
            .find(|(slot, _)| *slot == position)
            .map(|(_, category)| *category);
        let subcategory = SUBCATEGORY_SLOTS
            .iter()
            .find(|(slot, _)| *slot == position)
            .map(|(_, subcategory)| *subcategory);

        let allowed = |t: &Trait| {
            if let Some(category) = category {
                t.category == category
            } else if let Some(subcategory) = subcategory {
                t.subcategory == subcategory
            } else {
                !CATEGORY_SLOTS.iter().any(|(_, c)| t.category == *c)
                    && !SUBCATEGORY_SLOTS.iter().any(|(_, s)| t.subcategory == *s)
            }
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut candidates: Vec<&Trait> = Vec::new();
        for t in codex.traits() {
            if allowed(t) && seen.insert(&t.name) {
                candidates.push(t);
            }
        }

        // any slot can be empty (also read as "invalid" once outside the tray)
        let empty = codex.empty_slot();
        if seen.insert(&empty.name) {
            candidates.push(empty);
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_width() {
        assert!(ScreenMetadata::new(0).is_err());
        assert!(ScreenMetadata::new(1920).is_ok());
    }

    #[test]
    fn trait_rect_encodes_the_tray_shape() {
        let meta = ScreenMetadata::new(1920).unwrap();

        for column in 0..COLUMNS_MAX {
            for row in 0..ROWS_MAX {
                let rect = meta.trait_rect(column, row);
                let impossible = (row == 0 && column != 0)
                    || (column % 2 == 1 && row == ROWS_MAX - 1);
                assert_eq!(rect.is_none(), impossible, "column {column} row {row}");
            }
        }
    }

    #[test]
    fn trait_rect_scales_with_image_width() {
        let full = ScreenMetadata::new(1920).unwrap();
        let half = ScreenMetadata::new(960).unwrap();

        let at_full = full.trait_rect(0, 0).unwrap();
        let at_half = half.trait_rect(0, 0).unwrap();

        assert_eq!(at_full.width, 77);
        assert_eq!(at_full.center(), (50, 206));
        assert_eq!(at_half.center(), (25, 103));
    }

    #[test]
    fn odd_columns_are_offset() {
        let meta = ScreenMetadata::new(1920).unwrap();
        let even = meta.trait_rect(2, 1).unwrap();
        let odd = meta.trait_rect(1, 1).unwrap();
        assert_eq!(odd.center().1 - even.center().1, 47);
    }

    #[test]
    fn snaps_right_edges_to_known_layouts() {
        for (right, columns) in [(232, 3), (298, 4), (365, 5), (432, 6)] {
            assert_eq!(ScreenMetadata::snap_column_count(right), Some(columns));
            assert_eq!(ScreenMetadata::snap_column_count(right - 15), Some(columns));
        }
        assert_eq!(ScreenMetadata::snap_column_count(265), None);
        assert_eq!(ScreenMetadata::snap_column_count(500), None);
    }

    #[test]
    fn pin_icons_hang_off_the_last_tray_column() {
        let meta = ScreenMetadata::new(1920).unwrap();
        let rightmost = meta.trait_rect(3, 1).unwrap();

        let first = meta.pin_icon_rect(4, 0).unwrap();
        let second = meta.pin_icon_rect(4, 1).unwrap();

        assert_eq!(first.width, 117);
        assert_eq!(first.center().0, rightmost.center().0 + 158);
        assert_eq!(first.center().1, 231);
        assert_eq!(second.center().1 - first.center().1, 168);
    }
}
