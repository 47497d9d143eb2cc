//! Sample library loading.
//!
//! On disk the corpus is laid out as `<root>/<trait name>/<category>/*.png`.
//! Everything is decoded up front; classification must never touch the
//! filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use boonscan_core::Codex;
use image::RgbImage;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use thiserror::Error;

use super::{SampleCategory, TraitSample};

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read sample directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sample image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("sample folder {0} does not match any codex trait")]
    UnknownTrait(String),

    #[error("unknown sample category folder: {0}")]
    UnknownCategory(String),

    #[error("missing sample data for one or more traits: {0}")]
    MissingSamples(String),
}

/// All reference samples, indexed by canonical trait name then category.
#[derive(Debug)]
pub struct SampleLibrary {
    by_trait: HashMap<String, HashMap<SampleCategory, Vec<TraitSample>>>,
}

impl SampleLibrary {
    /// Load every sample under `root` and verify the corpus covers the whole
    /// codex. An incomplete corpus would silently misclassify, so it aborts
    /// startup instead.
    pub fn load(root: impl AsRef<Path>, codex: &Codex) -> Result<Self, SampleError> {
        let root = root.as_ref();
        let mut by_trait: HashMap<String, HashMap<SampleCategory, Vec<TraitSample>>> =
            HashMap::new();

        for trait_dir in list_dirs(root)? {
            let trait_name = dir_name(&trait_dir);
            let Some(trait_id) = codex.trait_id(&trait_name) else {
                return Err(SampleError::UnknownTrait(trait_name));
            };

            let mut by_category = HashMap::new();
            for category_dir in list_dirs(&trait_dir)? {
                let category_name = dir_name(&category_dir);
                let Some(category) = SampleCategory::parse(&category_name) else {
                    return Err(SampleError::UnknownCategory(category_name));
                };

                let files = list_files(&category_dir)?;

                #[cfg(feature = "parallel")]
                let decoded: Result<Vec<TraitSample>, SampleError> = files
                    .par_iter()
                    .map(|file| decode_sample(file, trait_id, category))
                    .collect();

                #[cfg(not(feature = "parallel"))]
                let decoded: Result<Vec<TraitSample>, SampleError> = files
                    .iter()
                    .map(|file| decode_sample(file, trait_id, category))
                    .collect();

                by_category.insert(category, decoded?);
            }

            by_trait.insert(trait_name, by_category);
        }

        let library = Self { by_trait };
        library.verify_complete(codex)?;

        log::info!("loaded {} sample images", library.len());
        Ok(library)
    }

    /// Build a library from already-decoded samples. Used by tests and by
    /// callers that synthesize their own corpus.
    pub fn from_samples(
        codex: &Codex,
        samples: impl IntoIterator<Item = TraitSample>,
    ) -> Result<Self, SampleError> {
        let mut by_trait: HashMap<String, HashMap<SampleCategory, Vec<TraitSample>>> =
            HashMap::new();

        for sample in samples {
            // sharers are filed under their canonical name, as on disk
            let name = &codex.get(sample.trait_id).name;
            let name = codex.canonical_name(name).unwrap_or(name).to_owned();
            by_trait
                .entry(name)
                .or_default()
                .entry(sample.category)
                .or_default()
                .push(sample);
        }

        let library = Self { by_trait };
        library.verify_complete(codex)?;
        Ok(library)
    }

    /// Does every trait have at least one real tray sample? Checked through
    /// the canonical name since sharers are filed together.
    fn verify_complete(&self, codex: &Codex) -> Result<(), SampleError> {
        let missing: Vec<&str> = codex
            .traits()
            .filter(|t| {
                let canonical = codex.canonical_name(&t.name).unwrap_or(&t.name);
                self.samples(canonical, SampleCategory::TrayIcons).is_empty()
            })
            .map(|t| t.name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SampleError::MissingSamples(missing.join(", ")))
        }
    }

    /// Samples filed under a canonical trait name and category; empty when
    /// none exist.
    pub fn samples(&self, canonical_name: &str, category: SampleCategory) -> &[TraitSample] {
        self.by_trait
            .get(canonical_name)
            .and_then(|by_category| by_category.get(&category))
            .map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_trait
            .values()
            .flat_map(|by_category| by_category.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decode_sample(
    path: &Path,
    trait_id: boonscan_core::TraitId,
    category: SampleCategory,
) -> Result<TraitSample, SampleError> {
    let image: RgbImage = image::open(path)
        .map_err(|source| SampleError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();

    Ok(TraitSample {
        trait_id,
        category,
        source: path.to_path_buf(),
        image,
    })
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn list_dirs(path: &Path) -> Result<Vec<PathBuf>, SampleError> {
    list_entries(path, true)
}

fn list_files(path: &Path) -> Result<Vec<PathBuf>, SampleError> {
    list_entries(path, false)
}

fn list_entries(path: &Path, dirs: bool) -> Result<Vec<PathBuf>, SampleError> {
    let io_err = |source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?.path();
        if entry.is_dir() == dirs {
            entries.push(entry);
        }
    }

    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn codex() -> Codex {
        let doc = r#"[
            {
                "category": "Gods",
                "name": "Zeus",
                "equips": [ { "name": "Lightning Strike", "desc": "x", "icon": "icons/a.png" } ]
            },
            {
                "category": "Empty_Ability",
                "name": "Empty",
                "equips": [ { "name": "Empty Boon", "desc": "x", "icon": "icons/empty.png" } ]
            }
        ]"#;
        Codex::load(doc.as_bytes()).unwrap()
    }

    fn sample(codex: &Codex, name: &str, category: SampleCategory) -> TraitSample {
        TraitSample {
            trait_id: codex.trait_id(name).unwrap(),
            category,
            source: PathBuf::from(format!("{name}/{}/img.png", category.as_str())),
            image: RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])),
        }
    }

    #[test]
    fn incomplete_corpus_fails_construction() {
        let codex = codex();
        let only_one = vec![sample(&codex, "Lightning Strike", SampleCategory::TrayIcons)];

        let err = SampleLibrary::from_samples(&codex, only_one).unwrap_err();
        assert!(matches!(err, SampleError::MissingSamples(names) if names.contains("Empty Boon")));
    }

    #[test]
    fn complete_corpus_loads_and_indexes() {
        let codex = codex();
        let library = SampleLibrary::from_samples(
            &codex,
            vec![
                sample(&codex, "Lightning Strike", SampleCategory::TrayIcons),
                sample(&codex, "Lightning Strike", SampleCategory::PinIcons),
                sample(&codex, "Empty Boon", SampleCategory::TrayIcons),
            ],
        )
        .unwrap();

        assert_eq!(library.len(), 3);
        assert_eq!(
            library
                .samples("Lightning Strike", SampleCategory::TrayIcons)
                .len(),
            1
        );
        assert!(library.samples("Lightning Strike", SampleCategory::Autogen).is_empty());
    }
}
