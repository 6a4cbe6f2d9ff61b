use std::collections::VecDeque;

use rustfft::FftPlanner;

use super::spectrum::{self, Framing, MagnitudeSpectrum, FFT_SIZE, HOP_SIZE};
use crate::error::{AnalysisError, Result};

/// Tempo reported whenever no estimate can be made.
pub const FALLBACK_BPM: f32 = 120.0;

const MIN_BPM: f32 = 40.0;
const MAX_BPM: f32 = 240.0;
/// Centre of the log-normal tempo prior (std: one octave).
const PRIOR_BPM: f32 = 120.0;
/// Dynamic range kept below the louder of two compared frames.
const TOP_DB: f32 = 80.0;
/// Seconds of per-hop onset strength kept by a real-time tracker.
const TRAIL_SECONDS: f32 = 6.0;

/// Spectral-flux onset detector over a sequence of frames one hop apart.
///
/// Each frame is compared with the one pushed before it: the half-wave
/// rectified rise of the log-power spectrum, averaged over bins. Both frames
/// are floored at 80 dB below the louder of the two, so the detector needs
/// no pass over the whole signal and never sees padding.
pub struct OnsetDetector {
    spectrum: MagnitudeSpectrum,
    previous: Option<Vec<f32>>,
}

impl OnsetDetector {
    pub fn new(planner: &mut FftPlanner<f32>, n_fft: usize) -> Self {
        Self {
            spectrum: MagnitudeSpectrum::new(planner, n_fft),
            previous: None,
        }
    }

    /// Onset strength of `frame` against the previous frame; 0.0 for the
    /// first frame. Frames are zero-padded or cut to the FFT length.
    pub fn push(&mut self, frame: &[f32]) -> f32 {
        let db: Vec<f32> = self
            .spectrum
            .compute(frame)
            .iter()
            .map(|m| 10.0 * (m * m).max(1e-10).log10())
            .collect();
        let strength = match &self.previous {
            Some(previous) => spectral_rise(previous, &db),
            None => 0.0,
        };
        self.previous = Some(db);
        strength
    }
}

fn spectral_rise(previous: &[f32], current: &[f32]) -> f32 {
    if current.is_empty() {
        return 0.0;
    }
    let peak = previous
        .iter()
        .chain(current)
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    let rise: f32 = current
        .iter()
        .zip(previous)
        .map(|(&cur, &prev)| (cur.max(floor) - prev.max(floor)).max(0.0))
        .sum();
    rise / current.len() as f32
}

/// Onset-strength envelope over leading STFT frames (`n_fft`, or the whole
/// signal if shorter, every `hop` samples). One value per frame; the first
/// value is 0.
pub fn onset_envelope(samples: &[f32], n_fft: usize, hop: usize) -> Vec<f32> {
    let n_fft = n_fft.min(samples.len());
    let frames = Framing::Leading.frame_count(samples.len(), n_fft, hop);
    if frames == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let mut detector = OnsetDetector::new(&mut planner, n_fft);
    let mut frame = vec![0.0f32; n_fft];
    (0..frames)
        .map(|t| {
            Framing::Leading.fill(&mut frame, samples, t, hop);
            detector.push(&frame)
        })
        .collect()
}

/// Estimate tempo from an onset envelope sampled every `hop` samples.
///
/// Autocorrelates the mean-removed envelope over the lags of the
/// 40-240 BPM range, weights each lag by a log-normal prior around 120 BPM
/// and returns the tempo of the best lag.
pub fn estimate_tempo(envelope: &[f32], sample_rate: u32, hop: usize) -> Result<f32> {
    if sample_rate == 0 || hop == 0 {
        return Err(AnalysisError::Degenerate("zero sample rate or hop".into()));
    }
    let frame_rate = sample_rate as f32 / hop as f32;
    let min_lag = ((60.0 * frame_rate / MAX_BPM).floor() as usize).max(1);
    let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;

    if envelope.len() <= max_lag {
        return Err(AnalysisError::Degenerate(format!(
            "onset envelope too short: {} frames, need > {}",
            envelope.len(),
            max_lag
        )));
    }

    let mean = spectrum::mean(envelope);
    let centred: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
    let energy: f32 = centred.iter().map(|v| v * v).sum();
    if !(energy > 1e-12) {
        return Err(AnalysisError::Degenerate("onset envelope has no energy".into()));
    }

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let acf: f32 = centred[..centred.len() - lag]
            .iter()
            .zip(&centred[lag..])
            .map(|(a, b)| a * b)
            .sum::<f32>()
            / energy;
        let bpm = 60.0 * frame_rate / lag as f32;
        let octaves = (bpm / PRIOR_BPM).log2();
        let score = acf * (-0.5 * octaves * octaves).exp();
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    match best {
        Some((lag, score)) if score > 0.0 => {
            let bpm = 60.0 * frame_rate / lag as f32;
            log::debug!("Tempo estimate: lag={} score={:.3} -> {:.1} BPM", lag, score, bpm);
            Ok(bpm)
        }
        _ => Err(AnalysisError::Degenerate("no periodicity in onset envelope".into())),
    }
}

/// Whole-track tempo: one estimate over the full envelope, no smoothing.
pub fn track_tempo(samples: &[f32], sample_rate: u32) -> f32 {
    let envelope = onset_envelope(samples, FFT_SIZE, HOP_SIZE);
    match estimate_tempo(&envelope, sample_rate, HOP_SIZE) {
        Ok(bpm) => bpm,
        Err(e) => {
            log::warn!("Tempo estimation failed ({}), using {} BPM", e, FALLBACK_BPM);
            FALLBACK_BPM
        }
    }
}

/// Bounded FIFO of raw tempo estimates; reports their median.
#[derive(Clone, Debug)]
pub struct BpmHistory {
    values: VecDeque<f32>,
    capacity: usize,
}

impl BpmHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, bpm: f32) {
        self.values.push_back(bpm);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    /// Middle value; mean of the two middle values for even lengths.
    pub fn median(&self) -> Option<f32> {
        median(&self.values.iter().copied().collect::<Vec<_>>())
    }
}

pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    } else {
        Some(sorted[mid])
    }
}

/// Beat output for one real-time frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatEstimate {
    pub beat_intensity: f32,
    pub detected_bpm: f32,
}

/// Per-stream tempo tracker.
///
/// Frames arrive one hop apart; each frame's onset strength against the
/// frame before it is appended to a trail, so the trail is the stream's
/// onset envelope. Tempo is estimated over the trail, and successful
/// estimates go through [`BpmHistory`].
pub struct BeatTracker {
    sample_rate: u32,
    hop_length: usize,
    onsets: OnsetDetector,
    trail: VecDeque<f32>,
    trail_capacity: usize,
    history: BpmHistory,
}

impl BeatTracker {
    pub fn new(sample_rate: u32, hop_length: usize, history_capacity: usize) -> Self {
        let hop_length = hop_length.max(1);
        let frame_rate = sample_rate as f32 / hop_length as f32;
        let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;
        let trail_capacity = ((TRAIL_SECONDS * frame_rate) as usize).max(2 * max_lag + 1);
        Self {
            sample_rate,
            hop_length,
            onsets: OnsetDetector::new(&mut FftPlanner::new(), FFT_SIZE),
            trail: VecDeque::with_capacity(trail_capacity + 1),
            trail_capacity,
            history: BpmHistory::new(history_capacity),
        }
    }

    pub fn history(&self) -> &BpmHistory {
        &self.history
    }

    pub fn process_frame(&mut self, frame: &[f32]) -> BeatEstimate {
        let strength = self.onsets.push(frame);
        let strength = if strength.is_finite() { strength } else { 0.0 };

        self.trail.push_back(strength);
        while self.trail.len() > self.trail_capacity {
            self.trail.pop_front();
        }

        let trail: Vec<f32> = self.trail.iter().copied().collect();
        let detected_bpm = match estimate_tempo(&trail, self.sample_rate, self.hop_length) {
            Ok(bpm) => {
                self.history.push(bpm);
                self.history.median().unwrap_or(FALLBACK_BPM)
            }
            Err(e) => {
                log::trace!("No tempo this frame: {}", e);
                FALLBACK_BPM
            }
        };

        BeatEstimate {
            beat_intensity: spectrum::clamp_unit(strength),
            detected_bpm,
        }
    }
}
