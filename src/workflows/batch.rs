use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::domain::models::{EpisodePair, MediaFile, MediaKind, SyncReport};
use crate::infra::settings::Settings;
use crate::media::alass::AlassOptions;
use crate::workflows::matchers::{pair_by_token, unmatched, EpisodePattern};
use crate::workflows::scan;
use crate::workflows::syncer::{self, SyncContext, SyncRunner};

fn compile_pattern(settings: &Settings, kind: MediaKind) -> Result<EpisodePattern> {
    let (regex, index) = match kind {
        MediaKind::Video => (&settings.video_regex, settings.video_match_index),
        MediaKind::Subtitle => (&settings.subtitle_regex, settings.subtitle_match_index),
    };
    EpisodePattern::new(regex, index)
        .with_context(|| format!("Invalid {} regex {regex:?}, please correct it", kind.label()))
}

fn required_folder(settings: &Settings, kind: MediaKind) -> Result<&Path> {
    let folder = match kind {
        MediaKind::Video => settings.video_folder.as_deref(),
        MediaKind::Subtitle => settings.srt_folder.as_deref(),
    };
    match folder.map(str::trim) {
        Some(folder) if !folder.is_empty() => Ok(Path::new(folder)),
        _ => {
            let flag = match kind {
                MediaKind::Video => "--video-folder",
                MediaKind::Subtitle => "--srt-folder",
            };
            bail!("No {} folder set. Pass {flag} or add it to the settings file", kind.label())
        }
    }
}

fn collect(settings: &Settings, kind: MediaKind, filter_extensions: bool) -> Result<Vec<MediaFile>> {
    let pattern = compile_pattern(settings, kind)?;
    let dir = required_folder(settings, kind)?;
    scan::scan_media(dir, &pattern, kind, filter_extensions)
}

/// What `list` shows: either side may be left out, pairs need both.
#[derive(Debug, Default)]
pub struct Listing {
    pub videos: Option<Vec<MediaFile>>,
    pub subtitles: Option<Vec<MediaFile>>,
    pub pairs: Vec<EpisodePair>,
}

impl Listing {
    pub fn unmatched(&self, kind: MediaKind) -> Vec<&MediaFile> {
        let files = match kind {
            MediaKind::Video => self.videos.as_deref(),
            MediaKind::Subtitle => self.subtitles.as_deref(),
        };
        match (files, &self.videos, &self.subtitles) {
            (Some(files), Some(_), Some(_)) => unmatched(files, &self.pairs, kind),
            _ => Vec::new(),
        }
    }
}

pub fn list(
    settings: &Settings,
    show_videos: bool,
    show_subtitles: bool,
    filter_extensions: bool,
) -> Result<Listing> {
    let mut listing = Listing::default();
    if show_videos {
        listing.videos = Some(collect(settings, MediaKind::Video, filter_extensions)?);
    }
    if show_subtitles {
        listing.subtitles = Some(collect(settings, MediaKind::Subtitle, filter_extensions)?);
    }
    if let (Some(videos), Some(subtitles)) = (&listing.videos, &listing.subtitles) {
        listing.pairs = pair_by_token(videos, subtitles);
    }
    Ok(listing)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SyncRequest {
    pub dry_run: bool,
    pub no_confirm: bool,
    pub filter_extensions: bool,
}

/// Scans both folders, pairs the files and runs every pair through `runner`.
///
/// Returns `None` when the user declines the confirmation.
pub fn sync(
    settings: &Settings,
    request: SyncRequest,
    runner: &mut dyn SyncRunner,
    confirm: impl FnOnce(usize) -> Result<bool>,
) -> Result<Option<SyncReport>> {
    // Both patterns are checked before touching the filesystem.
    compile_pattern(settings, MediaKind::Video)?;
    compile_pattern(settings, MediaKind::Subtitle)?;

    let video_dir = required_folder(settings, MediaKind::Video)?;
    let subtitle_dir = required_folder(settings, MediaKind::Subtitle)?;

    let videos = collect(settings, MediaKind::Video, request.filter_extensions)?;
    let subtitles = collect(settings, MediaKind::Subtitle, request.filter_extensions)?;

    let video_matches = videos.iter().filter(|f| f.has_token()).count();
    let subtitle_matches = subtitles.iter().filter(|f| f.has_token()).count();
    if video_matches == 0 {
        bail!("No video matches found. Check the video regex pattern.");
    }
    if subtitle_matches == 0 {
        bail!("No subtitle matches found. Check the subtitle regex pattern.");
    }
    info!("Found {video_matches} video matches.");
    info!("Found {subtitle_matches} subtitle matches.");

    let pairs = pair_by_token(&videos, &subtitles);
    for file in unmatched(&videos, &pairs, MediaKind::Video) {
        warn!("No subtitle found for {}", file.name);
    }
    for file in unmatched(&subtitles, &pairs, MediaKind::Subtitle) {
        warn!("No video found for {}", file.name);
    }
    if pairs.is_empty() {
        bail!("No video and subtitle episode tokens are equal, nothing to sync.");
    }

    let options = AlassOptions::from_settings(settings);
    if !request.dry_run {
        runner.prepare(&options)?;

        if !request.no_confirm && !confirm(pairs.len())? {
            return Ok(None);
        }
    }

    let output_dir = settings
        .output_folder
        .as_deref()
        .map(Path::new)
        .unwrap_or(video_dir);
    if !request.dry_run {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output folder {output_dir:?}"))?;
    }

    let ctx = SyncContext {
        video_dir,
        subtitle_dir,
        output_dir,
        output_name: &settings.output_name,
        options: &options,
        dry_run: request.dry_run,
    };
    syncer::sync_pairs(&pairs, &ctx, runner).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::alass::{AlassError, SyncCommand};
    use std::fs::File;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        prepared: bool,
        commands: Vec<String>,
    }

    impl SyncRunner for RecordingRunner {
        fn prepare(&mut self, _options: &AlassOptions) -> Result<()> {
            self.prepared = true;
            Ok(())
        }

        fn run(&mut self, command: &SyncCommand) -> Result<(), AlassError> {
            self.commands.push(command.command_line());
            Ok(())
        }
    }

    struct Library {
        _temp_dir: TempDir,
        videos: PathBuf,
        subtitles: PathBuf,
    }

    fn library(video_names: &[&str], subtitle_names: &[&str]) -> Library {
        let temp_dir = TempDir::new().unwrap();
        let videos = temp_dir.path().join("videos");
        let subtitles = temp_dir.path().join("subs");
        fs::create_dir(&videos).unwrap();
        fs::create_dir(&subtitles).unwrap();
        for name in video_names {
            File::create(videos.join(name)).unwrap();
        }
        for name in subtitle_names {
            File::create(subtitles.join(name)).unwrap();
        }
        Library {
            _temp_dir: temp_dir,
            videos,
            subtitles,
        }
    }

    fn settings_for(library: &Library) -> Settings {
        Settings {
            video_folder: Some(library.videos.to_string_lossy().into_owned()),
            srt_folder: Some(library.subtitles.to_string_lossy().into_owned()),
            video_regex: r"E(\d+)".to_string(),
            subtitle_regex: r"(\d+)".to_string(),
            ..Settings::default()
        }
    }

    fn no_confirm() -> SyncRequest {
        SyncRequest {
            no_confirm: true,
            ..Default::default()
        }
    }

    fn never_asked(_: usize) -> Result<bool> {
        panic!("confirmation should not be requested");
    }

    #[test]
    fn test_sync_runs_matched_pairs() {
        let library = library(&["Show E01.mkv", "Show E02.mkv"], &["01.srt", "02.srt"]);
        let settings = settings_for(&library);
        let mut runner = RecordingRunner::default();

        let report = sync(&settings, no_confirm(), &mut runner, never_asked)
            .unwrap()
            .unwrap();

        assert!(runner.prepared);
        assert_eq!(report.synced, 2);
        assert_eq!(runner.commands.len(), 2);
        assert!(runner.commands[0].contains("Show E01.srt"));
    }

    #[test]
    fn test_sync_refuses_without_folder() {
        let library = library(&["Show E01.mkv"], &["01.srt"]);
        let settings = Settings {
            srt_folder: None,
            ..settings_for(&library)
        };
        let mut runner = RecordingRunner::default();

        let err = sync(&settings, no_confirm(), &mut runner, never_asked).unwrap_err();
        assert!(err.to_string().contains("No subtitle folder set"));

        let settings = Settings {
            video_folder: Some("  ".to_string()),
            ..settings_for(&library)
        };
        let err = sync(&settings, no_confirm(), &mut runner, never_asked).unwrap_err();
        assert!(err.to_string().contains("No video folder set"));
        assert!(runner.commands.is_empty());
    }

    #[test]
    fn test_sync_refuses_invalid_regex() {
        let library = library(&["Show E01.mkv"], &["01.srt"]);
        let settings = Settings {
            subtitle_regex: r"(\d+".to_string(),
            ..settings_for(&library)
        };
        let mut runner = RecordingRunner::default();

        let err = sync(&settings, no_confirm(), &mut runner, never_asked).unwrap_err();
        assert!(err.to_string().contains("Invalid subtitle regex"));
    }

    #[test]
    fn test_sync_refuses_without_video_matches() {
        let library = library(&["Show 01.mkv"], &["01.srt"]);
        let settings = settings_for(&library);
        let mut runner = RecordingRunner::default();

        let err = sync(&settings, no_confirm(), &mut runner, never_asked).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No video matches found. Check the video regex pattern."
        );
        assert!(!runner.prepared);
    }

    #[test]
    fn test_sync_refuses_without_subtitle_matches() {
        let library = library(&["Show E01.mkv"], &["pilot.srt"]);
        let settings = settings_for(&library);
        let mut runner = RecordingRunner::default();

        let err = sync(&settings, no_confirm(), &mut runner, never_asked).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No subtitle matches found. Check the subtitle regex pattern."
        );
    }

    #[test]
    fn test_sync_refuses_without_pairs() {
        let library = library(&["Show E01.mkv"], &["02.srt"]);
        let settings = settings_for(&library);
        let mut runner = RecordingRunner::default();

        let err = sync(&settings, no_confirm(), &mut runner, never_asked).unwrap_err();
        assert!(err.to_string().contains("nothing to sync"));
        assert!(runner.commands.is_empty());
    }

    #[test]
    fn test_dry_run_leaves_output_folder_uncreated() {
        let library = library(&["Show E01.mkv"], &["01.srt"]);
        let output = library.videos.join("synced");
        let settings = Settings {
            output_folder: Some(output.to_string_lossy().into_owned()),
            ..settings_for(&library)
        };
        let mut runner = RecordingRunner::default();
        let request = SyncRequest {
            dry_run: true,
            ..Default::default()
        };

        let report = sync(&settings, request, &mut runner, never_asked)
            .unwrap()
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert!(!runner.prepared);
        assert!(runner.commands.is_empty());
        assert!(!output.exists());
    }

    #[test]
    fn test_output_folder_is_created() {
        let library = library(&["Show E01.mkv"], &["01.srt"]);
        let output = library.videos.join("synced");
        let settings = Settings {
            output_folder: Some(output.to_string_lossy().into_owned()),
            ..settings_for(&library)
        };
        let mut runner = RecordingRunner::default();

        sync(&settings, no_confirm(), &mut runner, never_asked).unwrap();

        assert!(output.is_dir());
    }

    #[test]
    fn test_declined_confirmation_runs_nothing() {
        let library = library(&["Show E01.mkv"], &["01.srt"]);
        let settings = settings_for(&library);
        let mut runner = RecordingRunner::default();
        let mut asked_for = 0;

        let result = sync(&settings, SyncRequest::default(), &mut runner, |count| {
            asked_for = count;
            Ok(false)
        })
        .unwrap();

        assert!(result.is_none());
        assert_eq!(asked_for, 1);
        assert!(runner.commands.is_empty());
    }

    #[test]
    fn test_list_pairs_and_unmatched() {
        let library = library(&["Show E01.mkv", "Show E03.mkv"], &["01.srt", "02.srt"]);
        let settings = settings_for(&library);

        let listing = list(&settings, true, true, false).unwrap();

        assert_eq!(listing.pairs.len(), 1);
        assert_eq!(listing.pairs[0].video, "Show E01.mkv");
        let lonely: Vec<&str> = listing
            .unmatched(MediaKind::Video)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(lonely, vec!["Show E03.mkv"]);
        let lonely: Vec<&str> = listing
            .unmatched(MediaKind::Subtitle)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(lonely, vec!["02.srt"]);
    }

    #[test]
    fn test_list_one_side_needs_only_its_folder() {
        let library = library(&["Show E01.mkv"], &[]);
        let settings = Settings {
            srt_folder: None,
            ..settings_for(&library)
        };

        let listing = list(&settings, true, false, false).unwrap();

        assert_eq!(listing.videos.as_ref().map(Vec::len), Some(1));
        assert!(listing.subtitles.is_none());
        assert!(listing.pairs.is_empty());
        assert!(listing.unmatched(MediaKind::Video).is_empty());

        assert!(list(&settings, true, true, false).is_err());
    }
}
