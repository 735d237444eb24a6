mod cli;
mod config;
mod domain;
mod infra;
mod media;
mod workflows;

use anyhow::{bail, Result};
use clap::Parser;
use log::{error, info};
use std::path::Path;

use cli::{Cli, Command};
use domain::models::{MediaFile, MediaKind};
use infra::settings::Settings;
use workflows::batch::{self, SyncRequest};
use workflows::syncer::{self, AlassRunner};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = config::get_settings_path(cli.config.as_deref());
    let mut settings = Settings::load(&config_path);
    settings.apply_overrides(&cli.settings);

    if cli.save {
        settings.save(&config_path)?;
        info!("Saved settings to {}", config_path.display());
    }

    match cli.command {
        Command::List {
            videos_only,
            subtitles_only,
        } => list(&settings, !subtitles_only, !videos_only, cli.filter_extensions),
        Command::Sync {
            dry_run,
            no_confirm,
        } => sync(
            &settings,
            SyncRequest {
                dry_run,
                no_confirm,
                filter_extensions: cli.filter_extensions,
            },
        ),
        Command::Config => show_config(&config_path, &settings),
    }
}

fn print_files(title: &str, files: &[MediaFile]) {
    println!("{title} ({} file(s)):", files.len());
    for file in files {
        if file.has_token() {
            println!("  [{}] {}", file.token, file.name);
        } else {
            println!("  [-] {} (no match)", file.name);
        }
    }
}

fn list(settings: &Settings, show_videos: bool, show_subtitles: bool, filter: bool) -> Result<()> {
    let listing = batch::list(settings, show_videos, show_subtitles, filter)?;

    if let Some(videos) = &listing.videos {
        print_files("Video files", videos);
    }
    if let Some(subtitles) = &listing.subtitles {
        if listing.videos.is_some() {
            println!();
        }
        print_files("Subtitle files", subtitles);
    }
    if listing.videos.is_none() || listing.subtitles.is_none() {
        return Ok(());
    }

    println!();
    println!("Matched pairs ({}):", listing.pairs.len());
    for pair in &listing.pairs {
        println!("  {}: {} <-> {}", pair.token, pair.video, pair.subtitle);
    }

    let lonely_videos = listing.unmatched(MediaKind::Video);
    if !lonely_videos.is_empty() {
        println!("Videos without subtitles:");
        for file in lonely_videos {
            println!("  {}", file.name);
        }
    }
    let lonely_subtitles = listing.unmatched(MediaKind::Subtitle);
    if !lonely_subtitles.is_empty() {
        println!("Subtitles without videos:");
        for file in lonely_subtitles {
            println!("  {}", file.name);
        }
    }

    Ok(())
}

fn sync(settings: &Settings, request: SyncRequest) -> Result<()> {
    let Some(report) = batch::sync(settings, request, &mut AlassRunner, syncer::confirm_sync)?
    else {
        println!("Skipped.");
        return Ok(());
    };

    if report.failed > 0 {
        eprintln!("Failed pairs:");
        for (video, code) in &report.failures {
            match code {
                Some(code) => eprintln!("  {video} (exit status {code})"),
                None => eprintln!("  {video}"),
            }
        }
        bail!("{} of {} pair(s) failed to sync", report.failed, report.total());
    }
    Ok(())
}

fn show_config(config_path: &Path, settings: &Settings) -> Result<()> {
    let status = if config_path.exists() { "" } else { " (not created yet)" };
    println!("Settings file: {}{status}", config_path.display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
