use regex::Regex;
use std::fmt;

use crate::domain::models::{EpisodePair, MediaFile, MediaKind};

#[derive(Debug)]
pub enum PatternError {
    Empty,
    Invalid(regex::Error),
    GroupOutOfRange { index: usize, groups: usize },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Empty => write!(f, "the pattern is empty"),
            PatternError::Invalid(e) => write!(f, "{e}"),
            PatternError::GroupOutOfRange { index, groups } => write!(
                f,
                "match index {index} is out of range, the pattern has {groups} capture group(s)"
            ),
        }
    }
}

impl std::error::Error for PatternError {}

/// A validated episode regex together with the capture group that holds the token.
#[derive(Debug, Clone)]
pub struct EpisodePattern {
    regex: Regex,
    match_index: usize,
}

impl EpisodePattern {
    pub fn new(pattern: &str, match_index: usize) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let regex = Regex::new(pattern).map_err(PatternError::Invalid)?;

        let groups = regex.captures_len() - 1;
        if groups > 0 && match_index > groups {
            return Err(PatternError::GroupOutOfRange {
                index: match_index,
                groups,
            });
        }

        Ok(Self { regex, match_index })
    }

    /// Searches `name` and returns the episode token, or an empty string when
    /// the pattern does not match or the selected group did not participate.
    ///
    /// Index 0 selects the whole match. Patterns without capture groups always
    /// yield the whole match.
    pub fn extract(&self, name: &str) -> String {
        let Some(captures) = self.regex.captures(name) else {
            return String::new();
        };
        let group = if self.regex.captures_len() == 1 {
            0
        } else {
            self.match_index
        };
        captures
            .get(group)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

pub fn extract_tokens(names: Vec<String>, pattern: &EpisodePattern) -> Vec<MediaFile> {
    names
        .into_iter()
        .map(|name| {
            let token = pattern.extract(&name);
            MediaFile { name, token }
        })
        .collect()
}

/// Pairs every video with every subtitle carrying the same non-empty token.
///
/// Duplicate tokens on either side yield one pair per combination, in video
/// order then subtitle order.
pub fn pair_by_token(videos: &[MediaFile], subtitles: &[MediaFile]) -> Vec<EpisodePair> {
    let mut pairs = Vec::new();
    for video in videos.iter().filter(|v| v.has_token()) {
        for subtitle in subtitles {
            if subtitle.token == video.token {
                pairs.push(EpisodePair {
                    token: video.token.clone(),
                    video: video.name.clone(),
                    subtitle: subtitle.name.clone(),
                });
            }
        }
    }
    pairs
}

pub fn unmatched<'a>(
    files: &'a [MediaFile],
    pairs: &[EpisodePair],
    kind: MediaKind,
) -> Vec<&'a MediaFile> {
    files
        .iter()
        .filter(|file| {
            !pairs.iter().any(|pair| match kind {
                MediaKind::Video => pair.video == file.name,
                MediaKind::Subtitle => pair.subtitle == file.name,
            })
        })
        .collect()
}
