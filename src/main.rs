mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use cli::{Cli, Mode};
use darthander_analyzer::audio;
use darthander_analyzer::audio::decode::AudioData;
use darthander_analyzer::audio::features::AnalysisReport;
use darthander_analyzer::audio::frame::FrameAnalyzer;
use darthander_analyzer::audio::track::TrackAnalyzer;
use darthander_analyzer::config::{self, AnalysisConfig, Config};
use darthander_analyzer::sink::{FeatureSink, HttpSink, StdoutSink};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect analyzer.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("analyzer.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("darthander").join("analyzer.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("darthander").join("analyzer.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }
    // Merge: config values apply only when CLI is at its default
    if cli.api_url == config::default_api_url() {
        cli.api_url = cfg.sink.api_url.clone();
    }
    if cli.resolution == 1.0 {
        cli.resolution = cfg.analysis.timeline_resolution;
    }
    cfg.sink.api_url = cli.api_url.clone();
    cfg.analysis.timeline_resolution = cli.resolution;

    let sink: Box<dyn FeatureSink> = if cli.dry_run {
        Box::new(StdoutSink)
    } else {
        Box::new(HttpSink::new(&cfg.sink)?)
    };

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    match cli.mode {
        Mode::File => {
            let track_id = cli
                .track_id
                .clone()
                .context("File mode requires --track-id")?;
            run_file(input, track_id, &cfg.analysis, sink.as_ref())
        }
        Mode::Realtime => run_realtime(input, &cfg.analysis, cli.pace, sink.as_ref()),
    }
}

fn run_file(
    input: &Path,
    track_id: String,
    analysis: &AnalysisConfig,
    sink: &dyn FeatureSink,
) -> Result<()> {
    log::info!("Loading track: {}", input.display());
    let audio = audio::decode::decode_audio(input)?;

    let result = TrackAnalyzer::new()
        .with_resolution(analysis.timeline_resolution)
        .analyze(&audio.samples, audio.sample_rate)?;

    let report = AnalysisReport {
        analysis: result,
        track_id,
    };

    match sink.send_analysis(&report) {
        Ok(()) => log::info!("Analysis complete for track {}", report.track_id),
        Err(e) => log::error!("Failed to save analysis: {}", e),
    }
    Ok(())
}

fn run_realtime(
    input: &Path,
    analysis: &AnalysisConfig,
    pace: bool,
    sink: &dyn FeatureSink,
) -> Result<()> {
    let audio = audio::decode::decode_audio(input)?;
    let stream_config = stream_config(analysis, &audio);

    let frame_size = stream_config.frame_size.max(1);
    let hop = stream_config.hop_length.max(1);
    let total = if audio.samples.len() >= frame_size {
        1 + (audio.samples.len() - frame_size) / hop
    } else {
        0
    };
    let hop_duration = Duration::from_secs_f32(hop as f32 / audio.sample_rate.max(1) as f32);

    log::info!(
        "Streaming {} frames (frame={}, hop={}) from {}",
        total,
        frame_size,
        hop,
        input.display()
    );

    let mut analyzer = FrameAnalyzer::new(&stream_config);
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut dropped = 0usize;
    for i in 0..total {
        let start = i * hop;
        let frame = analyzer.analyze_frame(&audio.samples[start..start + frame_size]);
        if let Err(e) = sink.send_frame(&frame) {
            dropped += 1;
            log::warn!("Dropped frame {}: {}", i, e);
        }
        pb.set_position(i as u64 + 1);
        if pace {
            std::thread::sleep(hop_duration);
        }
    }
    pb.finish_with_message("Stream complete");

    if dropped > 0 {
        log::warn!("{} of {} frames were not delivered", dropped, total);
    }
    Ok(())
}

/// Analysis settings for a decoded stream; the decoder's rate wins over the
/// configured one.
fn stream_config(analysis: &AnalysisConfig, audio: &AudioData) -> AnalysisConfig {
    if audio.sample_rate != analysis.sample_rate {
        log::warn!(
            "Input is {}Hz, configured rate is {}Hz; analysing at the input rate",
            audio.sample_rate,
            analysis.sample_rate
        );
    }
    AnalysisConfig {
        sample_rate: audio.sample_rate,
        ..analysis.clone()
    }
}
