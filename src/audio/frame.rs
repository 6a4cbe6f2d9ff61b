use rustfft::FftPlanner;

use super::decode;
use super::features::{Band, BandEnergies, FeatureFrame};
use super::onset::{BeatTracker, BpmHistory, FALLBACK_BPM};
use super::spectrum::{self, clamp_unit, MagnitudeSpectrum};
use crate::config::AnalysisConfig;

/// Mean band magnitude that maps to an energy of 1.0.
const BAND_NORMALIZATION: f32 = 1000.0;
/// Mean absolute spectral difference that maps to a flux of 1.0.
const FLUX_NORMALIZATION: f32 = 100.0;
const AMPLITUDE_GAIN: f32 = 10.0;

/// Last emitted value per band; empty until a band has produced a value.
#[derive(Clone, Debug, Default)]
pub struct SmoothingState {
    previous: [Option<f32>; 7],
}

impl SmoothingState {
    pub fn get(&self, band: Band) -> Option<f32> {
        self.previous[band as usize]
    }

    /// `factor * raw + (1 - factor) * previous`, or `raw` for the first value.
    fn apply(&mut self, band: Band, raw: f32, factor: f32) -> f32 {
        let slot = &mut self.previous[band as usize];
        let out = match *slot {
            Some(prev) => factor * raw + (1.0 - factor) * prev,
            None => raw,
        };
        *slot = Some(out);
        out
    }
}

/// Real-time analyzer for one audio stream.
///
/// Holds the stream's smoothing and tempo state; `&mut self` on every call
/// keeps calls for one stream serialized. Use one instance per stream.
pub struct FrameAnalyzer {
    sample_rate: u32,
    smoothing_factor: f32,
    smoothing: SmoothingState,
    beats: BeatTracker,
    planner: FftPlanner<f32>,
    spectrum: Option<MagnitudeSpectrum>,
}

impl FrameAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            smoothing_factor: config.smoothing,
            smoothing: SmoothingState::default(),
            beats: BeatTracker::new(config.sample_rate, config.hop_length, config.bpm_history),
            planner: FftPlanner::new(),
            spectrum: None,
        }
    }

    pub fn smoothing(&self) -> &SmoothingState {
        &self.smoothing
    }

    pub fn bpm_history(&self) -> &BpmHistory {
        self.beats.history()
    }

    /// Analyze an interleaved multi-channel frame after averaging channels.
    pub fn analyze_interleaved(&mut self, samples: &[f32], channels: usize) -> FeatureFrame {
        let mono = decode::downmix(samples, channels);
        self.analyze_frame(&mono)
    }

    /// Analyze one mono frame. Never fails; degenerate input yields zeros
    /// and the fallback tempo.
    pub fn analyze_frame(&mut self, frame: &[f32]) -> FeatureFrame {
        if frame.is_empty() || self.sample_rate == 0 {
            return FeatureFrame {
                bands: BandEnergies::default(),
                overall_amplitude: 0.0,
                peak_amplitude: 0.0,
                spectral_centroid: 0.0,
                spectral_flux: 0.0,
                beat_intensity: 0.0,
                detected_bpm: FALLBACK_BPM,
            };
        }

        let mags = self.magnitudes(frame);
        let freqs = spectrum::bin_frequencies(frame.len(), self.sample_rate);

        let mut bands = BandEnergies::default();
        for band in Band::ALL {
            let (low, high) = band.range();
            let (sum, n) = mags
                .iter()
                .zip(&freqs)
                .filter(|&(_, &f)| f >= low && f < high)
                .fold((0.0f32, 0usize), |(sum, n), (&m, _)| (sum + m, n + 1));
            if n == 0 {
                continue;
            }
            let raw = clamp_unit(sum / n as f32 / BAND_NORMALIZATION);
            let smoothed = self.smoothing.apply(band, raw, self.smoothing_factor);
            bands.set(band, clamp_unit(smoothed));
        }

        let mean_abs = frame.iter().map(|s| s.abs()).sum::<f32>() / frame.len() as f32;
        let peak = frame.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        let nyquist = self.sample_rate as f32 / 2.0;
        let centroid = spectrum::spectral_centroid(&mags, &freqs) / nyquist;

        let flux = if mags.len() > 1 {
            mags.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>() / (mags.len() - 1) as f32
        } else {
            0.0
        };

        let beat = self.beats.process_frame(frame);

        FeatureFrame {
            bands,
            overall_amplitude: clamp_unit(mean_abs * AMPLITUDE_GAIN),
            peak_amplitude: clamp_unit(peak),
            spectral_centroid: clamp_unit(centroid),
            spectral_flux: clamp_unit(flux / FLUX_NORMALIZATION),
            beat_intensity: beat.beat_intensity,
            detected_bpm: beat.detected_bpm,
        }
    }

    fn magnitudes(&mut self, frame: &[f32]) -> Vec<f32> {
        let stale = self
            .spectrum
            .as_ref()
            .map_or(true, |s| s.size() != frame.len());
        if stale {
            self.spectrum = Some(MagnitudeSpectrum::new(&mut self.planner, frame.len()));
        }
        match self.spectrum.as_mut() {
            Some(spectrum) => spectrum.compute(frame),
            None => Vec::new(),
        }
    }
}
