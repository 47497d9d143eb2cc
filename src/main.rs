use std::path::{Path, PathBuf};
use std::process::ExitCode;

use boonscan_core::{Codex, TrainingData};
use boonscan_cv::runner::{RunOptions, run_batch, run_single};
use boonscan_cv::{IconLibrary, IconLoadMode, PsnrClassifier, SampleLibrary};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut options = RunOptions::default();
    let mut training_path: Option<PathBuf> = None;
    let mut positional: Vec<PathBuf> = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" => options.debug_output = true,
            "--validate-only" => options.validate_only = true,
            "--strict" => options.strict_verify = true,
            "--training" => match args.next() {
                Some(path) => training_path = Some(PathBuf::from(path)),
                None => return usage("--training requires a path"),
            },
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [codex_path, samples_path, input_path] = positional.as_slice() else {
        return usage("expected <codex.json> <samples_dir> <screen_or_dir>");
    };

    match run(codex_path, samples_path, input_path, training_path, options) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(errors) => {
            log::error!("{errors} screens failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn usage(problem: &str) -> ExitCode {
    eprintln!("{problem}");
    eprintln!(
        "usage: boonscan [--debug] [--validate-only] [--strict] [--training <data.json>] \
         <codex.json> <samples_dir> <screen_or_dir>"
    );
    ExitCode::FAILURE
}

fn run(
    codex_path: &Path,
    samples_path: &Path,
    input_path: &Path,
    training_path: Option<PathBuf>,
    options: RunOptions,
) -> anyhow::Result<usize> {
    let codex = Codex::load_file(codex_path)?;

    // decode icons up front so a broken codex fails here, not mid-batch
    let icon_base = codex_path.parent().unwrap_or_else(|| Path::new("."));
    let icons = IconLibrary::load(&codex, icon_base, IconLoadMode::Standard)?;
    log::info!("codex ready with {} distinct icons", icons.len());

    let samples = SampleLibrary::load(samples_path, &codex)?;
    let classifier = PsnrClassifier::new(&codex, &samples);

    let trained = training_path.map(TrainingData::load).transpose()?;

    // no validity oracles ship with the CLI; the aspect and layout gates
    // still apply
    if input_path.is_dir() {
        run_batch(
            &classifier,
            &codex,
            &[],
            input_path,
            trained.as_ref(),
            &options,
        )
    } else {
        let result = run_single(
            &classifier,
            &codex,
            &[],
            input_path,
            trained.as_ref(),
            &options,
        )?;

        match result {
            Some(classified) => {
                for slot in classified.slots.iter().chain(&classified.pin_slots) {
                    println!("{slot}");
                }
                println!(
                    "weapon: {}, valid: {}",
                    classified.weapon_name.as_deref().unwrap_or("unknown"),
                    classified.is_valid()
                );

                if options.debug_output {
                    classified.export_json(&input_path.with_extension("result.json"))?;
                }

                Ok(usize::from(!classified.is_valid()))
            }
            None => Ok(1),
        }
    }
}
