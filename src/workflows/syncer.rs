use anyhow::{bail, Result};
use log::{error, info, warn};
use rustyline::DefaultEditor;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::models::{EpisodePair, SkipReason, SyncOutcome, SyncReport};
use crate::media::alass::{self, AlassError, AlassOptions, SyncCommand};

pub trait SyncRunner {
    /// Called once before any pair runs; an error aborts the sync.
    fn prepare(&mut self, options: &AlassOptions) -> Result<()>;

    fn run(&mut self, command: &SyncCommand) -> Result<(), AlassError>;
}

/// Runs alass as a child process.
pub struct AlassRunner;

impl SyncRunner for AlassRunner {
    fn prepare(&mut self, options: &AlassOptions) -> Result<()> {
        let program = alass::check_available(&options.program)?;
        info!("Using {}", program.display());
        Ok(())
    }

    fn run(&mut self, command: &SyncCommand) -> Result<(), AlassError> {
        command.run()
    }
}

pub struct SyncContext<'a> {
    pub video_dir: &'a Path,
    pub subtitle_dir: &'a Path,
    pub output_dir: &'a Path,
    pub output_name: &'a str,
    pub options: &'a AlassOptions,
    pub dry_run: bool,
}

/// Synchronizes every pair in order. A failed pair is logged and skipped; a
/// missing alass binary aborts the whole run.
pub fn sync_pairs(
    pairs: &[EpisodePair],
    ctx: &SyncContext,
    runner: &mut dyn SyncRunner,
) -> Result<SyncReport> {
    info!("Starting subtitle synchronization...");

    let mut report = SyncReport::default();
    let mut outputs: HashSet<PathBuf> = HashSet::new();

    for pair in pairs {
        let outcome = sync_pair(pair, ctx, runner, &mut outputs)?;
        report.record(&pair.video, &outcome);
    }

    info!("Subtitle synchronization completed: {report}");
    Ok(report)
}

fn sync_pair(
    pair: &EpisodePair,
    ctx: &SyncContext,
    runner: &mut dyn SyncRunner,
    outputs: &mut HashSet<PathBuf>,
) -> Result<SyncOutcome> {
    let video = ctx.video_dir.join(&pair.video);
    let subtitle = ctx.subtitle_dir.join(&pair.subtitle);
    let output = alass::output_path(ctx.output_name, ctx.output_dir, pair);

    if same_file(&output, &subtitle) {
        error!(
            "Output {output:?} would overwrite the input subtitle, skipping {}",
            pair.video
        );
        return Ok(SyncOutcome::Skipped(SkipReason::OverwritesInput));
    }
    if !outputs.insert(resolve(&output)) {
        warn!("{output:?} is written by more than one pair, the last one wins");
    }

    let command = SyncCommand::new(ctx.options, video, subtitle, output);
    info!("Executing: {}", command.command_line());

    if ctx.dry_run {
        return Ok(SyncOutcome::Skipped(SkipReason::DryRun));
    }

    match runner.run(&command) {
        Ok(()) => {
            info!("Successfully synced subtitles for {}", pair.video);
            Ok(SyncOutcome::Synced)
        }
        Err(e @ AlassError::NotFound(_)) => bail!(e),
        Err(e) => {
            error!("Failed to sync subtitles for {}: {e}", pair.video);
            let code = match e {
                AlassError::Failed { code, .. } => code,
                _ => None,
            };
            Ok(SyncOutcome::Failed(code))
        }
    }
}

/// Resolves `path` through the filesystem when possible. The output file
/// usually does not exist yet, so its parent folder is resolved instead.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || resolve(a) == resolve(b)
}

pub fn confirm_sync(pair_count: usize) -> Result<bool> {
    println!("Run alass for {pair_count} pair(s)? [y/N] ");

    let mut rl = DefaultEditor::new()?;
    loop {
        let input = rl.readline("").unwrap_or_default();
        let input = input.trim().to_lowercase();

        if input == "y" || input == "yes" {
            return Ok(true);
        } else if input == "n" || input == "no" || input.is_empty() {
            return Ok(false);
        } else {
            println!("Please enter 'y' or 'n'.");
        }
    }
}
