use anyhow::{Context, Result};
use log::debug;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::models::EpisodePair;
use crate::infra::settings::Settings;

#[derive(Debug)]
pub enum AlassError {
    NotFound(String),
    Spawn(io::Error),
    Failed { code: Option<i32>, stderr: String },
}

impl fmt::Display for AlassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlassError::NotFound(program) => write!(
                f,
                "{program} not found. Please install alass and ensure it's in your PATH."
            ),
            AlassError::Spawn(e) => write!(f, "failed to execute alass: {e}"),
            AlassError::Failed { code, stderr } => {
                match code {
                    Some(code) => write!(f, "alass exited with status {code}")?,
                    None => write!(f, "alass was terminated by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AlassError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlassOptions {
    pub program: String,
    pub disable_fps_guessing: bool,
    pub split_penalty: Option<u32>,
}

impl AlassOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            program: settings.alass_path.clone(),
            disable_fps_guessing: settings.disable_fps_guessing,
            split_penalty: settings.split_penalty,
        }
    }

    fn flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.disable_fps_guessing {
            flags.push("--disable-fps-guessing".to_string());
        }
        if let Some(penalty) = self.split_penalty {
            flags.push("--split-penalty".to_string());
            flags.push(penalty.to_string());
        }
        flags
    }
}

/// One alass invocation: `alass <video> <subtitle> <output> [flags]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    program: String,
    video: PathBuf,
    subtitle: PathBuf,
    output: PathBuf,
    flags: Vec<String>,
}

impl SyncCommand {
    pub fn new(options: &AlassOptions, video: PathBuf, subtitle: PathBuf, output: PathBuf) -> Self {
        Self {
            program: options.program.clone(),
            video,
            subtitle,
            output,
            flags: options.flags(),
        }
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.video.clone().into_os_string(),
            self.subtitle.clone().into_os_string(),
            self.output.clone().into_os_string(),
        ];
        args.extend(self.flags.iter().map(OsString::from));
        args
    }

    /// Printable form of the invocation with every path double-quoted.
    pub fn command_line(&self) -> String {
        let program = if needs_quoting(&self.program) {
            quote(&self.program)
        } else {
            self.program.clone()
        };
        let mut line = format!(
            "{} {} {} {}",
            program,
            quote(&self.video.to_string_lossy()),
            quote(&self.subtitle.to_string_lossy()),
            quote(&self.output.to_string_lossy()),
        );
        for flag in &self.flags {
            line.push(' ');
            line.push_str(flag);
        }
        line
    }

    /// Runs alass without a shell; success is a zero exit status.
    pub fn run(&self) -> Result<(), AlassError> {
        let output = Command::new(&self.program).args(self.args()).output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AlassError::NotFound(self.program.clone()));
            }
            Err(e) => return Err(AlassError::Spawn(e)),
        };

        debug!("alass stdout: {}", String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            return Err(AlassError::Failed {
                code: output.status.code(),
                stderr: last_line(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        Ok(())
    }
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '$' | '`'))
}

/// Wraps `arg` in double quotes, escaping the characters that stay special
/// inside them.
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Resolves the alass binary up front so a missing tool is reported once.
pub fn check_available(program: &str) -> Result<PathBuf> {
    which::which(program).with_context(|| AlassError::NotFound(program.to_string()).to_string())
}

/// Builds the output path for `pair` from a name template.
///
/// Supported placeholders: `{episode}`, `{video}` and `{subtitle}` (file stems)
/// and `{ext}` (the subtitle's extension, `srt` when it has none).
pub fn output_path(template: &str, output_dir: &Path, pair: &EpisodePair) -> PathBuf {
    let subtitle = Path::new(&pair.subtitle);
    let extension = subtitle
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("srt");

    let name = template
        .replace("{episode}", &pair.token)
        .replace("{video}", file_stem(&pair.video))
        .replace("{subtitle}", file_stem(&pair.subtitle))
        .replace("{ext}", extension);

    output_dir.join(sanitize_filename(&name))
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

fn sanitize_filename(name: &str) -> String {
    // Remove or replace invalid filename characters
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
