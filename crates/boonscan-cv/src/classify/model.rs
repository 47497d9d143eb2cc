//! Model classification: ask an externally trained multi-class scorer about
//! each slot, then trim its verdicts down to what the slot can legally hold.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, ensure};
use boonscan_core::Codex;
use image::RgbImage;

use super::{ClassifiedScreen, Classifier, Slot, enumerate_slots};
use crate::Result;
use crate::samples::SampleCategory;
use crate::screen::ScreenMetadata;
use crate::utils::image::crop;

/// Opaque per-label scoring oracle. The training pipeline behind it is out
/// of scope; the core only consumes scores.
///
/// Labels follow the sample naming scheme `<trait name>_<sample category>`,
/// and `predict` returns one score per label, aligned with `labels()`.
pub trait Predictor {
    fn labels(&self) -> &[String];
    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>>;
}

struct LabelInfo {
    trait_name: String,
    category: SampleCategory,
}

/// Classify traits on a victory screen by running predictions against a
/// trained model.
pub struct ModelClassifier<'c> {
    codex: &'c Codex,
    oracle: Box<dyn Predictor + Send + Sync>,
    labels: Vec<LabelInfo>,
}

impl<'c> ModelClassifier<'c> {
    /// Parse the oracle's label set up front; a label that doesn't follow
    /// the naming scheme means the model wasn't trained on this corpus.
    pub fn new(codex: &'c Codex, oracle: Box<dyn Predictor + Send + Sync>) -> Result<Self> {
        let labels = oracle
            .labels()
            .iter()
            .map(|label| {
                let (name, suffix) = label
                    .rsplit_once('_')
                    .ok_or_else(|| anyhow!("malformed model label: {label}"))?;
                let category = SampleCategory::parse(suffix)
                    .ok_or_else(|| anyhow!("unknown model label type: {suffix}"))?;

                Ok(LabelInfo {
                    trait_name: name.to_owned(),
                    category,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            codex,
            oracle,
            labels,
        })
    }
}

impl<'c> Classifier<'c> for ModelClassifier<'c> {
    fn name(&self) -> &'static str {
        "model"
    }

    fn classify(
        &self,
        screen: &RgbImage,
        column_count: i32,
        pin_rows: i32,
        _debug_dir: Option<&Path>,
    ) -> Result<Option<ClassifiedScreen<'c>>> {
        let meta = ScreenMetadata::for_image(screen)?;
        let positions = enumerate_slots(&meta, column_count, pin_rows);

        let mut best_per_slot: Vec<(i32, i32, Option<(usize, f32)>)> = Vec::new();

        for (column, row, rect) in positions {
            let mut best: Option<(usize, f32)> = None;

            if let Some(slot_img) = crop(screen, rect) {
                let scores = self.oracle.predict(&slot_img)?;
                ensure!(
                    scores.len() == self.labels.len(),
                    "model returned {} scores for {} labels",
                    scores.len(),
                    self.labels.len()
                );

                // filter by slot location, expanded through icon-sharing
                // groups so canonical labels stay reachable
                let mut candidates: HashSet<&str> = HashSet::new();
                for candidate in ScreenMetadata::slot_candidates(self.codex, column, row) {
                    for sharer in self.codex.icon_sharing_traits(&candidate.name) {
                        candidates.insert(&sharer.name);
                    }
                }

                // then filter by sample partition: pins and tray cells were
                // trained from different sample sets
                let wanted = if column == -1 {
                    SampleCategory::for_pin_slots()
                } else {
                    SampleCategory::for_tray_slots()
                };

                for (index, info) in self.labels.iter().enumerate() {
                    if !wanted.contains(&info.category)
                        || !candidates.contains(info.trait_name.as_str())
                    {
                        continue;
                    }

                    let score = scores[index];
                    if best.is_none_or(|(_, top)| score > top) {
                        best = Some((index, score));
                    }
                }
            }

            best_per_slot.push((column, row, best));
        }

        let unmatched = best_per_slot
            .iter()
            .filter(|(_, _, best)| best.is_none())
            .count();
        if unmatched > 0 {
            log::warn!("classification failed: {unmatched} slots with no matches");
            return Ok(None);
        }

        let mut slots = Vec::with_capacity(best_per_slot.len());
        for (column, row, best) in best_per_slot {
            // unmatched slots were rejected above
            let Some((index, score)) = best else {
                continue;
            };
            let info = &self.labels[index];
            let guess = self
                .codex
                .trait_by_name(&info.trait_name)
                .ok_or_else(|| anyhow!("model label names unknown trait {}", info.trait_name))?;

            slots.push(Slot {
                column,
                row,
                guess,
                confidence: score as f64,
            });
        }

        Ok(Some(ClassifiedScreen::new(self.codex, slots)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct FixedOracle {
        labels: Vec<String>,
        scores: Vec<f32>,
    }

    impl Predictor for FixedOracle {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn predict(&self, _image: &RgbImage) -> Result<Vec<f32>> {
            Ok(self.scores.clone())
        }
    }

    fn codex() -> Codex {
        let doc = r#"[
            {
                "category": "Gods",
                "name": "Zeus",
                "equips": [ { "name": "Storm Surge", "desc": "x", "icon": "icons/a.png" } ]
            },
            {
                "category": "Arm_Aspects",
                "name": "Stygius",
                "equips": [ { "name": "Aspect of Zagreus", "desc": "x", "icon": "icons/b.png" } ]
            },
            {
                "category": "Empty_Ability",
                "name": "Empty",
                "equips": [ { "name": "Empty Boon", "desc": "x", "icon": "icons/empty.png" } ]
            }
        ]"#;
        Codex::load(doc.as_bytes()).unwrap()
    }

    #[test]
    fn rejects_unknown_label_suffix() {
        let codex = codex();
        let oracle = FixedOracle {
            labels: vec!["Storm Surge_NoSuchCategory".into()],
            scores: vec![1.0],
        };

        assert!(ModelClassifier::new(&codex, Box::new(oracle)).is_err());
    }

    #[test]
    fn picks_best_label_within_partition_and_candidates() {
        let codex = codex();
        let oracle = FixedOracle {
            labels: vec![
                "Storm Surge_TrayIcons".into(),
                "Storm Surge_PinIcons".into(),
                "Aspect of Zagreus_TrayIcons".into(),
                "Empty Boon_TrayIcons".into(),
            ],
            // the pin-partition label scores highest but must lose on tray
            // slots; the aspect wins there
            scores: vec![0.2, 0.9, 0.7, 0.1],
        };

        let classifier = ModelClassifier::new(&codex, Box::new(oracle)).unwrap();
        let screen = RgbImage::from_pixel(1920, 1080, Rgb([50, 50, 50]));

        let result = classifier
            .classify(&screen, 3, 0, None)
            .unwrap()
            .expect("all slots should match");

        let unconstrained = result
            .slots
            .iter()
            .find(|slot| (slot.column, slot.row) == (1, 1))
            .unwrap();
        assert_eq!(unconstrained.guess.name, "Aspect of Zagreus");
        assert!((unconstrained.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn constrained_slot_with_no_matching_label_fails_the_screen() {
        let codex = codex();
        // no Empty Boon label, so the companion slot (candidates: empty
        // only) can never match
        let oracle = FixedOracle {
            labels: vec![
                "Storm Surge_TrayIcons".into(),
                "Aspect of Zagreus_TrayIcons".into(),
            ],
            scores: vec![0.5, 0.5],
        };

        let classifier = ModelClassifier::new(&codex, Box::new(oracle)).unwrap();
        let screen = RgbImage::from_pixel(1920, 1080, Rgb([50, 50, 50]));

        assert!(classifier.classify(&screen, 3, 0, None).unwrap().is_none());
    }
}
