//! Per-image pipeline: decode, normalize, validate, detect the layout,
//! classify, and optionally verify against labeled training data.
//!
//! Every stage is one-way; a screen that fails a gate is reported invalid
//! and processing moves to the next image. Retries belong to callers.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use boonscan_core::{Codex, TrainingData};

use crate::Result;
use crate::classify::{ClassifiedScreen, Classifier};
use crate::screen::{
    ScreenMetadata, ValidityModel, detect_column_count, detect_pin_rows, is_valid_screen,
    normalize_screen,
};

/// How many validity models must agree before a screen is trusted.
const VALIDITY_MINIMUM_SCORE: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Save out debugging images and ranked-match dumps.
    pub debug_output: bool,

    /// Stop after the validation stages without classifying.
    pub validate_only: bool,

    /// Treat any disagreement with the training data as a hard error.
    pub strict_verify: bool,
}

/// Run a classifier against one image.
///
/// Returns the classified screen (which may or may not be valid), or `None`
/// when the image was rejected or classification failed.
pub fn run_single<'c>(
    classifier: &dyn Classifier<'c>,
    codex: &Codex,
    validity_models: &[ValidityModel],
    screen_path: &Path,
    trained: Option<&TrainingData>,
    options: &RunOptions,
) -> Result<Option<ClassifiedScreen<'c>>> {
    let short_file = screen_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    // is it the right size?
    let normalized = match image::open(screen_path) {
        Ok(original) => normalize_screen(&original),
        Err(err) => {
            log::warn!("failed to decode {short_file}: {err}");
            None
        }
    };
    let mut appears_valid = normalized.is_some();

    // does the robot think it's real?
    if let Some(screen) = &normalized {
        if !validity_models.is_empty()
            && !is_valid_screen(screen, validity_models, VALIDITY_MINIMUM_SCORE)?
        {
            log::info!("validity models reject {short_file}");
            appears_valid = false;
        }
    }

    let mut column_count = -1;
    let mut pin_rows = -1;

    if appears_valid {
        if let Some(screen) = &normalized {
            let meta = ScreenMetadata::for_image(screen)?;
            match detect_column_count(screen, &meta) {
                Some(detection) => {
                    column_count = detection.columns;
                    pin_rows = detect_pin_rows(screen, &meta, column_count).rows();
                }
                None => log::error!(
                    "unable to determine the number of trait columns in {short_file}; \
                     this isn't fatal but will frustrate classification"
                ),
            }
        }
    }

    log::info!("initial validation of {short_file}; appears valid: {appears_valid}");

    if let Some(trained) = trained {
        verify_validity(trained, screen_path, appears_valid, options)?;
    }

    if options.validate_only || !appears_valid {
        return Ok(None);
    }
    let Some(screen) = normalized else {
        return Ok(None);
    };

    let debug_dir = if options.debug_output {
        Some(debug_output_folder(screen_path, classifier.name()))
    } else {
        None
    };

    let result = classifier.classify(&screen, column_count, pin_rows, debug_dir.as_deref())?;

    match &result {
        // if it's null something went very wrong
        None => log::error!("failed to classify {short_file} with {}", classifier.name()),
        Some(classified) => {
            log::info!(
                "classified {short_file} with {}; valid: {}",
                classifier.name(),
                classified.is_valid()
            );

            if let Some(trained) = trained {
                verify_result(codex, trained, screen_path, classified, column_count, options)?;
            }
        }
    }

    Ok(result)
}

/// Run a classifier against every file in a directory, returning the number
/// of screens that came back missing or invalid.
pub fn run_batch<'c>(
    classifier: &dyn Classifier<'c>,
    codex: &Codex,
    validity_models: &[ValidityModel],
    screens_dir: &Path,
    trained: Option<&TrainingData>,
    options: &RunOptions,
) -> Result<usize> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(screens_dir)
        .with_context(|| format!("failed to read screens folder {}", screens_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut errors = 0;
    for (index, path) in files.iter().enumerate() {
        if index % 10 == 0 {
            log::info!("file {index}/{}", files.len());
        }

        let result = run_single(classifier, codex, validity_models, path, trained, options)?;
        if result.is_none_or(|classified| !classified.is_valid()) {
            errors += 1;
        }
    }

    Ok(errors)
}

/// Debug images live next to the screen, in a folder named after it.
fn debug_output_folder(screen_path: &Path, classifier_name: &str) -> PathBuf {
    let stem = screen_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    screen_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}_results_{classifier_name}"))
}

fn verify_validity(
    trained: &TrainingData,
    screen_path: &Path,
    appears_valid: bool,
    options: &RunOptions,
) -> Result<()> {
    let key = screen_path.to_string_lossy();
    let Some(known) = trained.screen_for(&key) else {
        return mismatch(
            options,
            format!("verification requested for a screen missing from the training data: {key}"),
        );
    };

    if known.is_valid.is_some_and(|valid| valid != appears_valid) {
        return mismatch(
            options,
            format!("screen validity doesn't match training validity: {key}"),
        );
    }

    Ok(())
}

/// Compare a classification against its labeled screen. Names are checked
/// through icon-sharing groups, since any sharer is as correct as another.
fn verify_result(
    codex: &Codex,
    trained: &TrainingData,
    screen_path: &Path,
    result: &ClassifiedScreen<'_>,
    column_count: i32,
    options: &RunOptions,
) -> Result<()> {
    let key = screen_path.to_string_lossy();
    let Some(known) = trained.screen_for(&key) else {
        return mismatch(
            options,
            format!("verification requested for a screen missing from the training data: {key}"),
        );
    };

    if known.is_valid != Some(true) {
        return Ok(());
    }

    let labeled: std::collections::HashMap<(i32, i32), &str> = known
        .all_traits()
        .filter_map(|t| t.name.as_deref().map(|name| ((t.col, t.row), name)))
        .collect();

    let mut correct = 0;
    let mut incorrect: Vec<String> = Vec::new();
    for slot in result.slots.iter().chain(&result.pin_slots) {
        let matches = labeled
            .get(&(slot.column, slot.row))
            .is_some_and(|known_name| {
                codex
                    .icon_sharing_traits(known_name)
                    .iter()
                    .any(|sharer| sharer.name == slot.guess.name)
            });

        if matches {
            correct += 1;
        } else {
            incorrect.push(slot.to_string());
        }
    }

    let total = correct + incorrect.len();
    if incorrect.is_empty() {
        log::info!("for {key}, {correct}/{total} were correct");
    } else {
        mismatch(
            options,
            format!(
                "for {key}, {correct}/{total} were correct (incorrect slots: {})",
                incorrect.join(", ")
            ),
        )?;
    }

    if known
        .column_count
        .is_some_and(|known_columns| known_columns != column_count)
    {
        mismatch(
            options,
            format!(
                "column count ({column_count}) doesn't match training data ({:?}) for {key}",
                known.column_count
            ),
        )?;
    }

    Ok(())
}

fn mismatch(options: &RunOptions, message: String) -> Result<()> {
    if options.strict_verify {
        bail!(message);
    }
    log::error!("{message}");
    Ok(())
}
