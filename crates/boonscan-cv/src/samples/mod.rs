//! Previously-classified trait images: the reference corpus the similarity
//! classifier scores slots against.

mod loader;

pub use loader::{SampleError, SampleLibrary};

use std::path::{Path, PathBuf};

use boonscan_core::TraitId;
use image::RgbImage;

/// Where a sample image came from; doubles as its directory name on disk
/// and as the suffix of trained-model labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleCategory {
    /// Created from codex icons with mutations (no pin overlays).
    Autogen,

    /// Created from codex icons with mutations (all pin overlays).
    AutogenPinned,

    /// Cropped from classified victory screens (trait tray).
    TrayIcons,

    /// Cropped from classified victory screens (pin rows).
    PinIcons,
}

impl SampleCategory {
    pub const ALL: [SampleCategory; 4] = [
        SampleCategory::Autogen,
        SampleCategory::AutogenPinned,
        SampleCategory::TrayIcons,
        SampleCategory::PinIcons,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SampleCategory::Autogen => "Autogen",
            SampleCategory::AutogenPinned => "AutogenPinned",
            SampleCategory::TrayIcons => "TrayIcons",
            SampleCategory::PinIcons => "PinIcons",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Sample sets a pin slot is compared against.
    pub fn for_pin_slots() -> [SampleCategory; 2] {
        [SampleCategory::Autogen, SampleCategory::PinIcons]
    }

    /// Sample sets a tray slot is compared against.
    pub fn for_tray_slots() -> [SampleCategory; 2] {
        [SampleCategory::AutogenPinned, SampleCategory::TrayIcons]
    }
}

/// One decoded reference image for a trait.
#[derive(Debug, Clone)]
pub struct TraitSample {
    pub trait_id: TraitId,
    pub category: SampleCategory,
    pub source: PathBuf,
    pub image: RgbImage,
}

impl TraitSample {
    /// Generated samples carry an underscore prefix so real screen crops can
    /// be told apart from them.
    pub fn is_generated(&self) -> bool {
        Path::new(&self.source)
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('_'))
    }
}
