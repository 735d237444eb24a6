use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "episode-sync")]
#[command(
    about = "Pair video and subtitle files by episode number and synchronize them with alass"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file to load (and write with --save)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long, global = true)]
    pub save: bool,

    /// Only consider files with known video/subtitle extensions
    #[arg(long, global = true)]
    pub filter_extensions: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// List both folders with the extracted episode tokens and planned pairs
    List {
        /// Only list the video folder
        #[arg(long, conflicts_with = "subtitles_only")]
        videos_only: bool,

        /// Only list the subtitle folder
        #[arg(long)]
        subtitles_only: bool,
    },
    /// Run alass for every matched video/subtitle pair
    Sync {
        /// Print the alass invocations without running them
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompts
        #[arg(long)]
        no_confirm: bool,
    },
    /// Show the settings file location and the effective settings
    Config,
}

/// Overrides for values normally read from the settings file.
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Folder containing the video files
    #[arg(long, global = true)]
    pub video_folder: Option<String>,

    /// Folder containing the subtitle files
    #[arg(long, global = true)]
    pub srt_folder: Option<String>,

    /// Regex extracting the episode token from video file names
    #[arg(long, global = true)]
    pub video_regex: Option<String>,

    /// Regex extracting the episode token from subtitle file names
    #[arg(long, global = true)]
    pub subtitle_regex: Option<String>,

    /// Regex used for both video and subtitle names
    #[arg(long, global = true, conflicts_with_all = ["video_regex", "subtitle_regex"])]
    pub regex: Option<String>,

    /// Capture group holding the token in video names (0 = whole match)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub video_match_index: Option<u8>,

    /// Capture group holding the token in subtitle names (0 = whole match)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub subtitle_match_index: Option<u8>,

    /// Where synchronized subtitles are written (defaults to the video folder)
    #[arg(long, global = true)]
    pub output_folder: Option<String>,

    /// Output file name template; supports {episode}, {video}, {subtitle} and {ext}
    #[arg(long, global = true)]
    pub output_name: Option<String>,

    /// Pass --disable-fps-guessing to alass; `--disable-fps-guessing=false` turns it back off
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub disable_fps_guessing: Option<bool>,

    /// Pass --split-penalty to alass
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(0..=1000))]
    pub split_penalty: Option<u32>,

    /// Path or name of the alass binary
    #[arg(long = "alass", global = true)]
    pub alass_path: Option<String>,
}
