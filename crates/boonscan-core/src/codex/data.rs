//! On-disk codex document model.
//!
//! The document is a JSON list of providers, each carrying its trait list.
//! Parsing is kept separate from the resolved [`Codex`](super::Codex) so the
//! load-time passes (duo merging, cross-reference checks) operate on plain
//! records.

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;

use super::{Category, Subcategory};

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderDoc {
    pub category: Category,
    pub name: String,
    #[serde(default)]
    pub equips: Vec<TraitDoc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TraitDoc {
    pub name: String,

    #[serde(rename = "desc")]
    pub description: String,

    /// Path to the icon file, also the key for icon-sharing groups.
    #[serde(rename = "icon")]
    pub icon_file: PathBuf,

    #[serde(rename = "singleton", default)]
    pub subcategory: Subcategory,

    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub requires_any: Vec<String>,
    #[serde(default)]
    pub incompatible_with: Vec<String>,
}

pub(crate) fn parse(reader: impl Read) -> Result<Vec<ProviderDoc>, serde_json::Error> {
    serde_json::from_reader(reader)
}
