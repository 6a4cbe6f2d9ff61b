use std::io::Write;
use std::time::Duration;

use crate::audio::features::{AnalysisReport, FeatureFrame};
use crate::config::SinkConfig;
use crate::error::{AnalysisError, Result};

/// Destination for analysis results. The core only produces values; a sink
/// decides how they leave the process.
pub trait FeatureSink {
    /// Deliver one real-time frame. Callers treat failures as dropped frames.
    fn send_frame(&self, frame: &FeatureFrame) -> Result<()>;

    /// Deliver a finished track analysis. Failures are reported, not retried.
    fn send_analysis(&self, report: &AnalysisReport) -> Result<()>;
}

/// Posts JSON to the visuals backend.
pub struct HttpSink {
    client: reqwest::blocking::Client,
    base_url: String,
    realtime_timeout: Duration,
    analysis_timeout: Duration,
}

impl HttpSink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| AnalysisError::Sink(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            realtime_timeout: Duration::from_millis(config.realtime_timeout_ms),
            analysis_timeout: Duration::from_secs(config.analysis_timeout_secs),
        })
    }

    pub fn realtime_url(&self) -> String {
        format!("{}/api/audio/realtime", self.base_url)
    }

    pub fn analysis_url(&self) -> String {
        format!("{}/api/audio/analysis", self.base_url)
    }
}

impl HttpSink {
    /// POST `body` as JSON; transport errors and non-2xx statuses both fail.
    fn post<T: serde::Serialize>(&self, url: String, body: &T, timeout: Duration) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .map_err(|e| AnalysisError::Sink(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Sink(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}

impl FeatureSink for HttpSink {
    fn send_frame(&self, frame: &FeatureFrame) -> Result<()> {
        self.post(self.realtime_url(), frame, self.realtime_timeout)
    }

    fn send_analysis(&self, report: &AnalysisReport) -> Result<()> {
        self.post(self.analysis_url(), report, self.analysis_timeout)
    }
}

/// Writes one JSON document per line to stdout.
pub struct StdoutSink;

impl StdoutSink {
    fn emit<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value).map_err(|e| AnalysisError::Sink(e.to_string()))?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line).map_err(|e| AnalysisError::Sink(e.to_string()))
    }
}

impl FeatureSink for StdoutSink {
    fn send_frame(&self, frame: &FeatureFrame) -> Result<()> {
        self.emit(frame)
    }

    fn send_analysis(&self, report: &AnalysisReport) -> Result<()> {
        self.emit(report)
    }
}
