use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::Path;

use crate::domain::models::{MediaFile, MediaKind};
use crate::workflows::matchers::{extract_tokens, EpisodePattern};

/// Lists the names of regular files directly inside `dir`, sorted.
///
/// With `filter_extensions`, only names carrying one of `kind`'s known
/// extensions are kept.
pub fn list_files(dir: &Path, kind: MediaKind, filter_extensions: bool) -> Result<Vec<String>> {
    if dir.as_os_str().is_empty() {
        bail!("No {} folder given", kind.label());
    }
    if !dir.is_dir() {
        bail!("{} folder does not exist or is not a directory: {dir:?}", kind.label());
    }

    let mut names = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {dir:?}"))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                warn!("Skipping file with a non UTF-8 name: {name:?}");
                continue;
            }
        };

        if filter_extensions && !has_known_extension(&path, kind) {
            debug!("Skipping {name}, not a {} file", kind.label());
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

fn has_known_extension(path: &Path, kind: MediaKind) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            kind.extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Lists `dir` and extracts the episode token of every file.
pub fn scan_media(
    dir: &Path,
    pattern: &EpisodePattern,
    kind: MediaKind,
    filter_extensions: bool,
) -> Result<Vec<MediaFile>> {
    let names = list_files(dir, kind, filter_extensions)?;
    Ok(extract_tokens(names, pattern))
}
