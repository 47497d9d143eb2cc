//! Similarity classification: score each slot crop against every candidate
//! sample via peak signal-to-noise ratio and keep the best match.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use boonscan_core::{Category, Codex};
use image::RgbImage;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{ClassifiedScreen, Classifier, Slot, enumerate_slots};
use crate::Result;
use crate::geometry::Rect;
use crate::samples::{SampleCategory, SampleLibrary, TraitSample};
use crate::screen::ScreenMetadata;
use crate::utils::image::{DIAMOND_RATIO, crop, make_comparable, psnr, resize_to};

/// Classify traits on a victory screen by running PSNR comparisons against
/// previously-classified sample data.
pub struct PsnrClassifier<'c> {
    codex: &'c Codex,
    samples: &'c SampleLibrary,
}

/// One slot's ranked comparison results.
struct SlotOutcome<'c> {
    column: i32,
    row: i32,
    /// Candidate samples, best first. Empty when the slot rect fell outside
    /// the image or no candidate had sample data.
    ranked: Vec<(&'c TraitSample, f64)>,
    /// Comparable used against the winner, kept for debug dumps only.
    comparable: Option<RgbImage>,
}

impl<'c> PsnrClassifier<'c> {
    /// The sample library has already proven it covers the codex, so
    /// construction cannot fail.
    pub fn new(codex: &'c Codex, samples: &'c SampleLibrary) -> Self {
        Self { codex, samples }
    }

    fn classify_slot(
        &self,
        screen: &RgbImage,
        column: i32,
        row: i32,
        rect: Rect,
        keep_comparable: bool,
    ) -> SlotOutcome<'c> {
        let mut outcome = SlotOutcome {
            column,
            row,
            ranked: Vec::new(),
            comparable: None,
        };

        // must be a problematic image (wrong dimensions, photo of a screen
        // etc); the slot then counts as unmatched
        let Some(slot_img) = crop(screen, rect) else {
            return outcome;
        };

        // filter by slot location, then expand each candidate to its whole
        // icon-sharing group's samples
        let filtered = ScreenMetadata::slot_candidates(self.codex, column, row);
        let compare_categories = if column == -1 {
            SampleCategory::for_pin_slots()
        } else {
            SampleCategory::for_tray_slots()
        };

        let mut added: HashSet<&str> = HashSet::new();
        let mut possible: Vec<&TraitSample> = Vec::new();
        for candidate in filtered {
            let Some(shared) = self.codex.canonical_name(&candidate.name) else {
                continue;
            };
            if !added.insert(shared) {
                continue;
            }
            for category in compare_categories {
                possible.extend(self.samples.samples(shared, category));
            }
        }

        if possible.is_empty() {
            return outcome;
        }

        // cache to avoid repeatedly creating the same images; both caches
        // are local to this slot's pass, so workers share nothing mutable
        let mut comparables: HashMap<Category, RgbImage> = HashMap::new();
        let mut resized: HashMap<(Category, (u32, u32)), RgbImage> = HashMap::new();

        for sample in possible {
            let category = self.codex.get(sample.trait_id).category;
            let comparable = comparables.entry(category).or_insert_with(|| {
                if category.is_diamond() {
                    make_comparable(&slot_img, DIAMOND_RATIO)
                } else {
                    slot_img.clone()
                }
            });

            let target = sample.image.dimensions();
            let score = if comparable.dimensions() == target {
                psnr(comparable, &sample.image)
            } else {
                let scaled = resized
                    .entry((category, target))
                    .or_insert_with(|| resize_to(comparable, target.0, target.1));
                psnr(scaled, &sample.image)
            };

            outcome.ranked.push((sample, score));
        }

        outcome.ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        if keep_comparable {
            let category = self.codex.get(outcome.ranked[0].0.trait_id).category;
            outcome.comparable = Some(comparables.remove(&category).unwrap_or(slot_img));
        }

        outcome
    }

    /// Save "source" vs "best guess" thumbnail pairs and the top matches per
    /// slot. Purely diagnostic.
    fn write_debug(&self, dir: &Path, outcomes: &[SlotOutcome<'c>]) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create debug folder {}", dir.display()))?;

        let mut dump = fs::File::create(dir.join("result.txt"))?;

        let from_samples = outcomes
            .iter()
            .filter(|o| o.ranked.first().is_some_and(|(best, _)| !best.is_generated()))
            .count();
        writeln!(
            dump,
            "From samples: {from_samples}, from generated: {}",
            outcomes.len() - from_samples
        )?;

        for outcome in outcomes {
            let column_name = if outcome.column == -1 {
                "pin".to_owned()
            } else {
                outcome.column.to_string()
            };

            writeln!(dump, "{}_{}:", column_name, outcome.row)?;
            for (sample, score) in outcome.ranked.iter().take(10) {
                writeln!(
                    dump,
                    "{} ({}, {score:.2})",
                    self.codex.get(sample.trait_id).name,
                    sample.source.display()
                )?;
            }
            writeln!(dump)?;

            if let (Some(comparable), Some((winner, _))) =
                (&outcome.comparable, outcome.ranked.first())
            {
                let stem = format!("{}_{}", column_name, outcome.row);
                comparable.save(dir.join(format!("{stem}.png")))?;
                winner.image.save(dir.join(format!("{stem}_guess.png")))?;
            }
        }

        Ok(())
    }
}

impl<'c> Classifier<'c> for PsnrClassifier<'c> {
    fn name(&self) -> &'static str {
        "psnr"
    }

    fn classify(
        &self,
        screen: &RgbImage,
        column_count: i32,
        pin_rows: i32,
        debug_dir: Option<&Path>,
    ) -> Result<Option<ClassifiedScreen<'c>>> {
        let meta = ScreenMetadata::for_image(screen)?;
        let positions = enumerate_slots(&meta, column_count, pin_rows);
        let keep_comparables = debug_dir.is_some();

        // slots are independent; compare them all in parallel
        #[cfg(feature = "parallel")]
        let outcomes: Vec<SlotOutcome<'c>> = positions
            .par_iter()
            .map(|&(column, row, rect)| {
                self.classify_slot(screen, column, row, rect, keep_comparables)
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<SlotOutcome<'c>> = positions
            .iter()
            .map(|&(column, row, rect)| {
                self.classify_slot(screen, column, row, rect, keep_comparables)
            })
            .collect();

        if let Some(dir) = debug_dir {
            self.write_debug(dir, &outcomes)?;
        }

        // any missing results?
        let unmatched = outcomes.iter().filter(|o| o.ranked.is_empty()).count();
        if unmatched > 0 {
            log::warn!("classification failed: {unmatched} slots with no matches");
            return Ok(None);
        }

        let slots = outcomes
            .into_iter()
            .map(|outcome| {
                let (best, score) = outcome.ranked[0];
                Slot {
                    column: outcome.column,
                    row: outcome.row,
                    guess: self.codex.get(best.trait_id),
                    confidence: score,
                }
            })
            .collect();

        Ok(Some(ClassifiedScreen::new(self.codex, slots)))
    }
}
