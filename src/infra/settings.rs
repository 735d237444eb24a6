use anyhow::{Context, Result};
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::cli::SettingsArgs;

pub const DEFAULT_REGEX: &str = r"\d+";
pub const DEFAULT_MATCH_INDEX: usize = 1;
pub const MAX_MATCH_INDEX: usize = 10;
pub const MAX_SPLIT_PENALTY: u32 = 1000;
pub const DEFAULT_OUTPUT_NAME: &str = "{video}.{ext}";
pub const DEFAULT_ALASS: &str = "alass";

/// Flat settings record persisted as a JSON object.
///
/// Every key is optional in the file. Keys that are missing or hold a value of
/// the wrong type fall back to their default without failing the load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt_folder: Option<String>,
    pub video_regex: String,
    pub subtitle_regex: String,
    pub video_match_index: usize,
    pub subtitle_match_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,
    pub output_name: String,
    pub disable_fps_guessing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_penalty: Option<u32>,
    pub alass_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            video_folder: None,
            srt_folder: None,
            video_regex: DEFAULT_REGEX.to_string(),
            subtitle_regex: DEFAULT_REGEX.to_string(),
            video_match_index: DEFAULT_MATCH_INDEX,
            subtitle_match_index: DEFAULT_MATCH_INDEX,
            output_folder: None,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            disable_fps_guessing: false,
            split_penalty: None,
            alass_path: DEFAULT_ALASS.to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(
                "No settings file at {}, using defaults",
                path.display()
            );
            return Settings::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::from_json_str(&content),
            Err(e) => {
                error!("Error reading settings file {}: {e}", path.display());
                Settings::default()
            }
        }
    }

    pub fn from_json_str(content: &str) -> Self {
        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                error!("Error parsing settings file: {e}");
                return Settings::default();
            }
        };
        let Value::Object(map) = value else {
            error!("Settings file does not contain a JSON object");
            return Settings::default();
        };

        let fields = Fields(&map);
        let mut settings = Settings::default();

        // Single-regex settings files use one pattern and index for both sides.
        let shared_regex = fields.string("regex");
        let shared_index = fields.match_index("match_index");

        settings.video_folder = fields.string("video_folder");
        settings.srt_folder = fields.string("srt_folder");
        if let Some(regex) = fields.string("video_regex").or_else(|| shared_regex.clone()) {
            settings.video_regex = regex;
        }
        if let Some(regex) = fields.string("subtitle_regex").or(shared_regex) {
            settings.subtitle_regex = regex;
        }
        if let Some(index) = fields.match_index("video_match_index").or(shared_index) {
            settings.video_match_index = index;
        }
        if let Some(index) = fields.match_index("subtitle_match_index").or(shared_index) {
            settings.subtitle_match_index = index;
        }
        settings.output_folder = fields.string("output_folder");
        if let Some(name) = fields.string("output_name") {
            if name.trim().is_empty() {
                warn!("Empty 'output_name' in settings, using {DEFAULT_OUTPUT_NAME}");
            } else {
                settings.output_name = name;
            }
        }
        if let Some(flag) = fields.bool("disable_fps_guessing") {
            settings.disable_fps_guessing = flag;
        }
        settings.split_penalty = fields.split_penalty("split_penalty");
        if let Some(path) = fields.string("alass_path").filter(|p| !p.is_empty()) {
            settings.alass_path = path;
        }

        settings
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, args: &SettingsArgs) {
        if let Some(folder) = &args.video_folder {
            self.video_folder = Some(folder.clone());
        }
        if let Some(folder) = &args.srt_folder {
            self.srt_folder = Some(folder.clone());
        }
        if let Some(regex) = &args.regex {
            self.video_regex = regex.clone();
            self.subtitle_regex = regex.clone();
        }
        if let Some(regex) = &args.video_regex {
            self.video_regex = regex.clone();
        }
        if let Some(regex) = &args.subtitle_regex {
            self.subtitle_regex = regex.clone();
        }
        if let Some(index) = args.video_match_index {
            self.video_match_index = usize::from(index);
        }
        if let Some(index) = args.subtitle_match_index {
            self.subtitle_match_index = usize::from(index);
        }
        if let Some(folder) = &args.output_folder {
            self.output_folder = Some(folder.clone());
        }
        if let Some(name) = args.output_name.as_ref().filter(|n| !n.trim().is_empty()) {
            self.output_name = name.clone();
        }
        if let Some(flag) = args.disable_fps_guessing {
            self.disable_fps_guessing = flag;
        }
        if let Some(penalty) = args.split_penalty {
            self.split_penalty = Some(penalty);
        }
        if let Some(path) = args.alass_path.as_ref().filter(|p| !p.is_empty()) {
            self.alass_path = path.clone();
        }
    }
}

/// Typed, per-key access to the settings object. A key of the wrong type is
/// logged and treated as absent.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => {
                debug!("'{key}' not set in settings");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                warn!("Invalid '{key}' in settings, expected a string");
                None
            }
        }
    }

    fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            _ => {
                warn!("Invalid '{key}' in settings, expected true or false");
                None
            }
        }
    }

    fn match_index(&self, key: &str) -> Option<usize> {
        let value = self.get(key)?;
        match value.as_u64().and_then(|n| usize::try_from(n).ok()) {
            Some(index) if index <= MAX_MATCH_INDEX => Some(index),
            _ => {
                warn!("Invalid '{key}' in settings, expected an integer from 0 to {MAX_MATCH_INDEX}");
                None
            }
        }
    }

    fn split_penalty(&self, key: &str) -> Option<u32> {
        let value = self.get(key)?;
        match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(penalty) if penalty <= MAX_SPLIT_PENALTY => Some(penalty),
            _ => {
                warn!("Invalid '{key}' in settings, expected an integer from 0 to {MAX_SPLIT_PENALTY}");
                None
            }
        }
    }
}
