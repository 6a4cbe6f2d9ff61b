//! Audio feature extraction for the visual engine.
//!
//! [`audio::frame::FrameAnalyzer`] turns a live stream into per-frame band
//! energies, amplitude, spectral descriptors and a running tempo.
//! [`audio::track::TrackAnalyzer`] computes tempo, key, mood, sections and
//! an energy timeline for a whole track. Results leave through a
//! [`sink::FeatureSink`].

pub mod audio;
pub mod config;
pub mod error;
pub mod sink;

pub use error::{AnalysisError, Result};
