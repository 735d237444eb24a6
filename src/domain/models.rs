use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Subtitle,
}

const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "m4v", "mov", "webm", "ts", "wmv", "flv"];
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt", "sub", "idx"];

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Subtitle => "subtitle",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => VIDEO_EXTENSIONS,
            MediaKind::Subtitle => SUBTITLE_EXTENSIONS,
        }
    }
}

/// A file name (relative to its folder) and the episode token extracted from it.
///
/// The token is empty when the pattern did not match the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub token: String,
}

impl MediaFile {
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePair {
    pub token: String,
    pub video: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DryRun,
    OverwritesInput,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DryRun => write!(f, "dry run"),
            SkipReason::OverwritesInput => write!(f, "output would overwrite the input subtitle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// Exit code of alass, `None` when it never ran to completion.
    Failed(Option<i32>),
    Skipped(SkipReason),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Videos whose pair failed, with the alass exit code when there was one.
    pub failures: Vec<(String, Option<i32>)>,
}

impl SyncReport {
    pub fn record(&mut self, video: &str, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Synced => self.synced += 1,
            SyncOutcome::Failed(code) => {
                self.failed += 1;
                self.failures.push((video.to_string(), *code));
            }
            SyncOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.synced + self.failed + self.skipped
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} synced, {} failed, {} skipped",
            self.synced, self.failed, self.skipped
        )
    }
}
