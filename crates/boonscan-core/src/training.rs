//! Labeled victory screens: the corpus classification results are verified
//! against. Field names on disk are PascalCase, matching the historical
//! classification database format.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainingData {
    pub screens: Vec<Screen>,

    #[serde(skip)]
    by_file: HashMap<String, usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Screen {
    pub file_name: String,

    #[serde(default)]
    pub traits: Vec<LabeledTrait>,

    #[serde(default)]
    pub pinned_traits: Vec<LabeledTrait>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_health: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_cast: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_back_button: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<i32>,

    #[serde(
        rename = "VerifiedDateUTC",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub verified_date_utc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabeledTrait {
    pub name: Option<String>,
    pub col: i32,
    pub row: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

impl fmt::Display for LabeledTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("?");
        if self.col == -1 {
            write!(f, "Pin {}: {}", self.row, name)
        } else {
            write!(f, "Tray {}_{}: {}", self.col, self.row, name)
        }
    }
}

impl Screen {
    /// All labels, tray first then pins, for verification sweeps.
    pub fn all_traits(&self) -> impl Iterator<Item = &LabeledTrait> {
        self.traits.iter().chain(self.pinned_traits.iter())
    }

    fn order_traits(&mut self) {
        self.traits.sort_by_key(|t| (t.row, t.col));
        self.pinned_traits.sort_by_key(|t| t.row);
    }
}

impl TrainingData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open training data: {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut data: TrainingData =
            serde_json::from_reader(reader).context("failed to parse training data")?;
        for screen in &mut data.screens {
            screen.order_traits();
        }
        data.reindex();
        Ok(data)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        for screen in &mut self.screens {
            screen.order_traits();
        }
        let mut file = File::create(path)
            .with_context(|| format!("failed to create training data: {}", path.display()))?;
        let body = serde_json::to_string_pretty(self)?;
        file.write_all(body.as_bytes())?;
        Ok(())
    }

    /// Look up a screen by file name, case-insensitively.
    pub fn screen_for(&self, file_name: &str) -> Option<&Screen> {
        self.by_file
            .get(&file_name.to_lowercase())
            .map(|idx| &self.screens[*idx])
    }

    fn reindex(&mut self) {
        self.by_file = self
            .screens
            .iter()
            .enumerate()
            .map(|(idx, screen)| (screen.file_name.to_lowercase(), idx))
            .collect();
    }
}
