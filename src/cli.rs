use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bilinote::Preference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Parser)]
#[command(
    name = "bilinote",
    about = "Turn Bilibili videos into Markdown study notes",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Show progress and metadata on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Credential for the rewrite and transcription services (falls back to $DASHSCOPE_API_KEY)
    #[arg(short, long, global = true)]
    pub key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a study note from a video's subtitles
    Note(NoteArgs),

    /// Resolve a playable media URL for a video
    Media {
        /// Bilibili video URL
        url: String,
    },

    /// Transcribe a publicly reachable media file
    Transcribe {
        /// Media file URL
        media_url: String,

        /// Source language
        #[arg(short, long, default_value = "auto")]
        lang: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct NoteArgs {
    /// Bilibili video URL or BV id (reads from stdin if omitted)
    pub url: Option<String>,

    /// Page (part) of a multi-part video, starting at 0
    #[arg(short, long, default_value_t = 0)]
    pub page: usize,

    /// Subtitle preference: ai (machine-generated first) or native
    #[arg(long, value_enum)]
    pub prefer: Option<Preference>,

    /// Skip the AI rewrite even when a credential is available
    #[arg(long)]
    pub no_rewrite: bool,

    /// Transcribe videos without subtitles instead of printing guidance
    #[arg(long)]
    pub auto_transcribe: bool,

    /// Language hint for --auto-transcribe
    #[arg(long, default_value = "auto")]
    pub lang: String,

    /// Output format: markdown (default) or json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
