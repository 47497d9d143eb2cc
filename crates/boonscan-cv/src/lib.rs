//! Boonscan Computer Vision Library
//!
//! Layout inference and slot classification for victory screenshots: the
//! geometric model mapping an image width to exact slot rectangles, the
//! flood-fill detectors for the variable layout facts, and the two
//! interchangeable classification strategies.

pub mod classify;
pub mod geometry;
pub mod icons;
pub mod runner;
pub mod samples;
pub mod screen;
pub mod utils;

// Re-export commonly used types
pub use classify::{ClassifiedScreen, Classifier, ModelClassifier, Predictor, PsnrClassifier, Slot};
pub use geometry::Rect;
pub use icons::{IconLibrary, IconLoadMode};
pub use runner::{RunOptions, run_batch, run_single};
pub use samples::{SampleCategory, SampleLibrary, TraitSample};
pub use screen::{ScreenMetadata, ValidityModel, normalize_screen};

// Error handling
pub type Result<T> = anyhow::Result<T>;
