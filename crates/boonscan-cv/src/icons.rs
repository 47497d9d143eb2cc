//! Decoded codex icon art, one image per icon-sharing group.
//!
//! Loaded once at startup and read-only afterwards; a missing or broken
//! icon file aborts the run because every downstream comparison would be
//! meaningless without it.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use boonscan_core::{Codex, TraitId};
use image::DynamicImage;

use crate::Result;
use crate::utils::image::{DIAMOND_RATIO, make_comparable};

/// How icon data is prepared when loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconLoadMode {
    /// Flatten to RGB and corner-mask diamond-framed art so icons compare
    /// directly against screen crops.
    Standard,

    /// Keep the image untouched, alpha channel included.
    Raw,
}

pub struct IconLibrary {
    icons: HashMap<TraitId, DynamicImage>,
}

impl IconLibrary {
    /// Decode every distinct icon, resolving relative icon paths against
    /// `base`. Sharing duplicates beyond the group's first are skipped.
    pub fn load(codex: &Codex, base: impl AsRef<Path>, mode: IconLoadMode) -> Result<Self> {
        let base = base.as_ref();
        let mut icons = HashMap::new();

        for canonical in codex.icon_groups() {
            let path = base.join(&canonical.icon_file);
            let decoded = image::open(&path)
                .with_context(|| format!("failed to read icon {}", path.display()))?;

            let stored = match mode {
                IconLoadMode::Raw => decoded,
                IconLoadMode::Standard => {
                    let rgb = decoded.to_rgb8();
                    let rgb = if canonical.category.is_diamond() {
                        make_comparable(&rgb, DIAMOND_RATIO)
                    } else {
                        rgb
                    };
                    DynamicImage::ImageRgb8(rgb)
                }
            };

            if let Some(id) = codex.trait_id(&canonical.name) {
                icons.insert(id, stored);
            }
        }

        log::info!("decoded {} distinct icons", icons.len());
        Ok(Self { icons })
    }

    /// Icon art for a trait, resolved through its icon-sharing group.
    pub fn icon(&self, codex: &Codex, name: &str) -> Option<&DynamicImage> {
        let canonical = codex.canonical_name(name)?;
        self.icons.get(&codex.trait_id(canonical)?)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
