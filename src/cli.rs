use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Stream the input hop by hop through the per-frame analyzer
    Realtime,
    /// Analyze the whole track once and deliver its metadata
    File,
}

#[derive(Parser, Debug)]
#[command(name = "analyzer", about = "Audio feature analysis for the visual engine")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Analysis mode
    #[arg(long, value_enum, default_value_t = Mode::Realtime)]
    pub mode: Mode,

    /// Track identifier attached to file-mode results
    #[arg(long)]
    pub track_id: Option<String>,

    /// Backend API base URL
    #[arg(long, default_value = "http://localhost:3001")]
    pub api_url: String,

    /// Config file (defaults to analyzer.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timeline resolution in seconds
    #[arg(long, default_value_t = 1.0)]
    pub resolution: f32,

    /// Print JSON to stdout instead of posting it
    #[arg(long)]
    pub dry_run: bool,

    /// In realtime mode, wait one hop between frames like a live stream
    #[arg(long)]
    pub pace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["analyzer"]).unwrap();
        assert_eq!(cli.mode, Mode::Realtime);
        assert_eq!(cli.api_url, "http://localhost:3001");
        assert_eq!(cli.resolution, 1.0);
        assert!(cli.input.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn file_mode_arguments() {
        let cli = Cli::try_parse_from([
            "analyzer", "song.flac", "--mode", "file", "--track-id", "42", "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.mode, Mode::File);
        assert_eq!(cli.track_id.as_deref(), Some("42"));
        assert_eq!(cli.input, Some(PathBuf::from("song.flac")));
        assert!(cli.dry_run);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["analyzer", "--mode", "live"]).is_err());
    }
}
