use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Analysis parameters, fixed once an analyzer is constructed.
#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_bpm_history")]
    pub bpm_history: usize,
    #[serde(default = "default_timeline_resolution")]
    pub timeline_resolution: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_realtime_timeout_ms")]
    pub realtime_timeout_ms: u64,
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            hop_length: default_hop_length(),
            frame_size: default_frame_size(),
            smoothing: default_smoothing(),
            bpm_history: default_bpm_history(),
            timeline_resolution: default_timeline_resolution(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            realtime_timeout_ms: default_realtime_timeout_ms(),
            analysis_timeout_secs: default_analysis_timeout_secs(),
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_hop_length() -> usize { 512 }
fn default_frame_size() -> usize { 2048 }
fn default_smoothing() -> f32 { 0.3 }
fn default_bpm_history() -> usize { 10 }
fn default_timeline_resolution() -> f32 { 1.0 }
pub fn default_api_url() -> String { "http://localhost:3001".into() }
fn default_realtime_timeout_ms() -> u64 { 500 }
fn default_analysis_timeout_secs() -> u64 { 30 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::debug!("Config parse error: {}", e);
            None
        }
    }
}
