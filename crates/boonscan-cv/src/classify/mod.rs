//! Slot classification: two interchangeable strategies that turn a
//! normalized screen into per-slot trait identities, and the aggregate
//! result they both feed.

mod model;
mod psnr;

pub use model::{ModelClassifier, Predictor};
pub use psnr::PsnrClassifier;

use std::fmt;
use std::path::Path;

use anyhow::Context;
use boonscan_core::{Codex, Trait};
use image::RgbImage;

use crate::Result;
use crate::geometry::Rect;
use crate::screen::{COLUMNS_MAX, ROWS_MAX, ScreenMetadata};

/// A classification strategy.
pub trait Classifier<'c> {
    /// Short name, used for debug output folders.
    fn name(&self) -> &'static str;

    /// Classify every slot of a normalized screen.
    ///
    /// `column_count` and `pin_rows` may be negative when detection failed;
    /// all possible tray positions are then searched and no pins assumed.
    /// Returns `Ok(None)` when any slot ends with zero candidate matches,
    /// which points at a mis-detected layout or an inconsistent corpus
    /// rather than an ordinary low-confidence guess.
    fn classify(
        &self,
        screen: &RgbImage,
        column_count: i32,
        pin_rows: i32,
        debug_dir: Option<&Path>,
    ) -> Result<Option<ClassifiedScreen<'c>>>;
}

/// One classified position: a tray cell, or a pin row when `column` is -1.
#[derive(Debug, Clone)]
pub struct Slot<'c> {
    pub column: i32,
    pub row: i32,
    pub guess: &'c Trait,
    pub confidence: f64,
}

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column != -1 {
            write!(f, "Tray #{}_{}: {}", self.column, self.row, self.guess)
        } else {
            write!(f, "Pinned #{}: {}", self.row, self.guess)
        }
    }
}

/// Every position a classifier needs to look at, tray first then pins.
pub(crate) fn enumerate_slots(
    meta: &ScreenMetadata,
    column_count: i32,
    pin_rows: i32,
) -> Vec<(i32, i32, Rect)> {
    let mut slots = Vec::new();

    for column in 0..COLUMNS_MAX {
        // if we know the column count, respect it
        if column_count > 0 && column >= column_count {
            break;
        }

        for row in 0..ROWS_MAX {
            if let Some(rect) = meta.trait_rect(column, row) {
                slots.push((column, row, rect));
            }
        }
    }

    for row in 0..pin_rows.max(0) {
        if let Some(rect) = meta.pin_icon_rect(column_count, row) {
            slots.push((-1, row, rect));
        }
    }

    slots
}

/// The structured verdict for one screen. Built once, never mutated.
#[derive(Debug)]
pub struct ClassifiedScreen<'c> {
    pub slots: Vec<Slot<'c>>,
    pub pin_slots: Vec<Slot<'c>>,
    pub weapon_name: Option<String>,
    is_valid: bool,
}

impl<'c> ClassifiedScreen<'c> {
    /// Post-process raw slot guesses: split tray from pins, trim the unused
    /// tail of the tray, and derive the weapon verdict.
    pub fn new(codex: &Codex, all_slots: Vec<Slot<'c>>) -> Self {
        let (mut slots, pin_slots): (Vec<_>, Vec<_>) =
            all_slots.into_iter().partition(|slot| slot.column != -1);

        // traits fill the tray front to back, so a run of empties at the
        // tail means we ran out of traits, not that the player chose
        // empties. Pins are left alone.
        let trailing_empties = slots
            .iter()
            .rev()
            .take_while(|slot| !codex.is_slot_filled(slot.guess))
            .count();
        slots.truncate(slots.len() - trailing_empties);

        let weapon_name = codex
            .determine_weapon(slots.iter().map(|slot| slot.guess))
            .map(str::to_owned);
        let is_valid = weapon_name.is_some();

        Self {
            slots,
            pin_slots,
            weapon_name,
            is_valid,
        }
    }

    /// Whether exactly one weapon was implicated by the classified traits.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Highest retained tray column plus one, for downstream consumers.
    pub fn column_count(&self) -> i32 {
        self.slots
            .iter()
            .map(|slot| slot.column)
            .max()
            .map_or(0, |column| column + 1)
    }

    /// Export the verdict in JSON form for the presentation layer.
    pub fn export_json(&self, output_path: &Path) -> Result<()> {
        #[derive(serde::Serialize)]
        struct SlotDoc<'a> {
            name: &'a str,
            column: i32,
            row: i32,
            confidence: f64,
        }

        fn doc<'a>(slot: &'a Slot<'_>) -> SlotDoc<'a> {
            SlotDoc {
                name: &slot.guess.name,
                column: slot.column,
                row: slot.row,
                confidence: slot.confidence,
            }
        }

        #[derive(serde::Serialize)]
        struct ScreenDoc<'a> {
            weapon: Option<&'a str>,
            valid: bool,
            column_count: i32,
            slots: Vec<SlotDoc<'a>>,
            pin_slots: Vec<SlotDoc<'a>>,
        }

        let out = ScreenDoc {
            weapon: self.weapon_name.as_deref(),
            valid: self.is_valid,
            column_count: self.column_count(),
            slots: self.slots.iter().map(doc).collect(),
            pin_slots: self.pin_slots.iter().map(doc).collect(),
        };

        let json = serde_json::to_string_pretty(&out)
            .context("failed to serialize classification result")?;
        std::fs::write(output_path, json)
            .with_context(|| format!("failed to write JSON to {}", output_path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codex() -> Codex {
        let doc = r#"[
            {
                "category": "Gods",
                "name": "Zeus",
                "equips": [
                    { "name": "Lightning Strike", "desc": "x", "icon": "icons/a.png", "singleton": "Attack" },
                    { "name": "Storm Surge", "desc": "x", "icon": "icons/b.png" }
                ]
            },
            {
                "category": "Arm_Aspects",
                "name": "Stygius",
                "equips": [ { "name": "Aspect of Zagreus", "desc": "x", "icon": "icons/c.png" } ]
            },
            {
                "category": "Arm_Aspects",
                "name": "Varatha",
                "equips": [ { "name": "Aspect of Achilles", "desc": "x", "icon": "icons/d.png" } ]
            },
            {
                "category": "Empty_Ability",
                "name": "Empty",
                "equips": [ { "name": "Empty Boon", "desc": "x", "icon": "icons/empty.png" } ]
            }
        ]"#;
        Codex::load(doc.as_bytes()).unwrap()
    }

    fn slot<'c>(codex: &'c Codex, name: &str, column: i32, row: i32) -> Slot<'c> {
        Slot {
            column,
            row,
            guess: codex.trait_by_name(name).unwrap(),
            confidence: 1.0,
        }
    }

    #[test]
    fn trailing_empties_are_trimmed_from_the_tray() {
        let codex = codex();
        let screen = ClassifiedScreen::new(
            &codex,
            vec![
                slot(&codex, "Aspect of Zagreus", 0, 1),
                slot(&codex, "Storm Surge", 1, 1),
                slot(&codex, "Empty Boon", 1, 2),
                slot(&codex, "Empty Boon", 1, 3),
            ],
        );

        assert_eq!(screen.slots.len(), 2);
        assert_eq!(screen.slots.last().unwrap().guess.name, "Storm Surge");
        assert_eq!(screen.column_count(), 2);
    }

    #[test]
    fn interior_empties_and_pins_are_kept() {
        let codex = codex();
        let screen = ClassifiedScreen::new(
            &codex,
            vec![
                slot(&codex, "Empty Boon", 0, 1),
                slot(&codex, "Aspect of Zagreus", 0, 2),
                slot(&codex, "Empty Boon", -1, 0),
                slot(&codex, "Empty Boon", -1, 1),
            ],
        );

        // the leading empty stays, and pin slots are never trimmed
        assert_eq!(screen.slots.len(), 2);
        assert_eq!(screen.pin_slots.len(), 2);
    }

    #[test]
    fn validity_follows_weapon_determination() {
        let codex = codex();

        let one_weapon = ClassifiedScreen::new(
            &codex,
            vec![
                slot(&codex, "Lightning Strike", 0, 1),
                slot(&codex, "Aspect of Zagreus", 1, 1),
            ],
        );
        assert!(one_weapon.is_valid());
        assert_eq!(one_weapon.weapon_name.as_deref(), Some("Stygius"));

        let no_weapon =
            ClassifiedScreen::new(&codex, vec![slot(&codex, "Lightning Strike", 0, 1)]);
        assert!(!no_weapon.is_valid());

        let two_weapons = ClassifiedScreen::new(
            &codex,
            vec![
                slot(&codex, "Aspect of Zagreus", 0, 1),
                slot(&codex, "Aspect of Achilles", 1, 1),
            ],
        );
        assert!(!two_weapons.is_valid());
        assert_eq!(two_weapons.weapon_name, None);
    }

    #[test]
    fn enumeration_respects_column_count_and_pins() {
        let meta = ScreenMetadata::new(1920).unwrap();

        let slots = enumerate_slots(&meta, 4, 2);
        let tray = slots.iter().filter(|(column, _, _)| *column >= 0).count();
        let pins = slots.iter().filter(|(column, _, _)| *column == -1).count();

        // columns 0..4: 7 + 5 + 6 + 5 positions
        assert_eq!(tray, 23);
        assert_eq!(pins, 2);

        // unknown layout searches the full tray and assumes no pins
        let unknown = enumerate_slots(&meta, -1, -1);
        assert_eq!(unknown.len(), 7 + 5 + 6 + 5 + 6 + 5);
    }
}
