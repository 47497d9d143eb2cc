//! The layout model: geometry scaled from a reference resolution, plus the
//! pixel-probing detectors that read run-time layout facts off the screen.

mod detect;
mod metadata;
mod normalize;
mod validity;

pub use detect::{FILL_TOLERANCE, PinDetection, TrayDetection, detect_column_count, detect_pin_rows};
pub use metadata::{COLUMNS_MAX, PIN_ROWS_MAX, REFERENCE_WIDTH, ROWS_MAX, ScreenMetadata};
pub use normalize::{ASPECT_EPSILON, AspectRatio, normalize_screen};
pub use validity::{ValidityModel, ValidityOracle, is_valid_screen};
