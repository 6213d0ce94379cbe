// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// oxitag - tag FLAC/MP4 files in memory and read FLAC/MP4/MP3 tags
#[derive(Parser, Debug)]
#[command(name = "oxitag")]
#[command(about = "Embed and read audio metadata without touching the audio stream", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (log structural decisions)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Tagging options as a JSON file
    #[arg(long, value_name = "JSON", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON, one document per line
    Json,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read metadata from audio file(s)
    Read {
        /// Audio file paths or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Include the embedded cover (base64)
        #[arg(long)]
        with_cover: bool,
    },

    /// Detect file format
    Detect {
        /// Audio file paths or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },

    /// Write metadata into a FLAC or MP4 file
    Tag {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Metadata JSON string
        #[arg(short, long, required_unless_present = "from_file", conflicts_with = "from_file")]
        metadata: Option<String>,

        /// Read metadata from JSON file
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Cover image to embed
        #[arg(short, long, value_name = "IMAGE")]
        cover: Option<PathBuf>,

        /// MIME type or quality label used when the container is not recognized
        #[arg(long)]
        hint: Option<String>,

        /// Write the tagged file here instead of replacing FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export cover art
    ExportCover {
        /// Audio file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory for the cover image
        #[arg(short, long)]
        output: PathBuf,
    },
}
