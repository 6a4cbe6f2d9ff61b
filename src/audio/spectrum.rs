use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Default STFT frame length used by the whole-track passes.
pub const FFT_SIZE: usize = 2048;
/// Default STFT hop used by the whole-track passes.
pub const HOP_SIZE: usize = 512;

/// How STFT frames are laid out over the signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// Frame `i` is centred on sample `i * hop`, zero outside the signal.
    /// One frame per hop whose centre lies inside the signal.
    Centered,
    /// Frame `i` starts at sample `i * hop`. A signal shorter than one frame
    /// yields a single zero-padded frame.
    Leading,
}

impl Framing {
    /// Number of `size`-sample frames laid over `len` samples.
    pub fn frame_count(self, len: usize, size: usize, hop: usize) -> usize {
        if len == 0 || size == 0 || hop == 0 {
            return 0;
        }
        match self {
            Framing::Centered => len.div_ceil(hop),
            Framing::Leading if len < size => 1,
            Framing::Leading => 1 + (len - size) / hop,
        }
    }

    /// Copy frame `index` into `frame`, zero where it falls outside the signal.
    pub fn fill(self, frame: &mut [f32], samples: &[f32], index: usize, hop: usize) {
        let start = match self {
            Framing::Centered => (index * hop) as isize - (frame.len() / 2) as isize,
            Framing::Leading => (index * hop) as isize,
        };
        fill_padded(frame, samples, start);
    }
}

/// Windowed magnitude spectrum of a fixed frame length.
///
/// Holds the FFT plan, the Hann window and a scratch buffer so repeated
/// frames of the same length don't allocate new plans. Clones share the
/// plan, so one per worker thread is cheap.
#[derive(Clone)]
pub struct MagnitudeSpectrum {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl MagnitudeSpectrum {
    pub fn new(planner: &mut FftPlanner<f32>, size: usize) -> Self {
        Self {
            fft: planner.plan_fft_forward(size),
            window: hann_window(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Magnitudes of bins `0..=size/2`. Input shorter than the frame is zero-padded.
    pub fn compute(&mut self, frame: &[f32]) -> Vec<f32> {
        let size = self.size();
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < frame.len() { frame[i] } else { 0.0 };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);
        self.buffer[..size / 2 + 1].iter().map(|c| c.norm()).collect()
    }
}

/// Symmetric Hann window.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

/// Centre frequency in Hz of each bin returned by [`MagnitudeSpectrum::compute`].
pub fn bin_frequencies(size: usize, sample_rate: u32) -> Vec<f32> {
    (0..=size / 2)
        .map(|k| k as f32 * sample_rate as f32 / size as f32)
        .collect()
}

/// Magnitude-weighted mean frequency in Hz; 0.0 for a silent spectrum.
pub fn spectral_centroid(magnitudes: &[f32], frequencies: &[f32]) -> f32 {
    let total: f32 = magnitudes.iter().sum();
    if !(total > 1e-10) {
        return 0.0;
    }
    magnitudes
        .iter()
        .zip(frequencies)
        .map(|(&m, &f)| m * f)
        .sum::<f32>()
        / total
}

/// Visit the magnitude spectrum of every STFT frame in order. Only one
/// frame is alive at a time, so whole-track reductions stay small.
pub fn for_each_stft_frame(
    samples: &[f32],
    size: usize,
    hop: usize,
    framing: Framing,
    mut visit: impl FnMut(&[f32]),
) {
    let frames = framing.frame_count(samples.len(), size, hop);
    if frames == 0 {
        return;
    }

    let mut planner = FftPlanner::<f32>::new();
    let mut spectrum = MagnitudeSpectrum::new(&mut planner, size);
    let mut frame = vec![0.0f32; size];
    for t in 0..frames {
        framing.fill(&mut frame, samples, t, hop);
        visit(&spectrum.compute(&frame));
    }
}

/// Copies `samples[start..start + frame.len()]` into `frame`, zero outside the signal.
fn fill_padded(frame: &mut [f32], samples: &[f32], start: isize) {
    for (i, slot) in frame.iter_mut().enumerate() {
        let idx = start + i as isize;
        *slot = if idx >= 0 && (idx as usize) < samples.len() {
            samples[idx as usize]
        } else {
            0.0
        };
    }
}

/// Framewise RMS over centred, zero-padded frames of `frame` samples every `hop`.
pub fn frame_rms(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    if samples.is_empty() || frame == 0 || hop == 0 {
        return Vec::new();
    }
    let pad = (frame / 2) as isize;
    let frames = 1 + samples.len() / hop;
    (0..frames)
        .map(|t| {
            let start = (t * hop) as isize - pad;
            let lo = start.max(0) as usize;
            let hi = ((start + frame as isize).max(0) as usize).min(samples.len());
            let sum_sq: f32 = samples[lo..hi.max(lo)].iter().map(|s| s * s).sum();
            (sum_sq / frame as f32).sqrt()
        })
        .collect()
}

/// Mean of the framewise RMS curve, the loudness figure used for tracks,
/// sections and timeline windows.
pub fn mean_rms(samples: &[f32]) -> f32 {
    mean(&frame_rms(samples, FFT_SIZE, HOP_SIZE))
}

/// Mean spectral centroid over centred STFT frames, divided by Nyquist.
pub fn mean_brightness(samples: &[f32], sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    let freqs = bin_frequencies(FFT_SIZE, sample_rate);
    let (mut total, mut count) = (0.0f64, 0usize);
    for_each_stft_frame(samples, FFT_SIZE, HOP_SIZE, Framing::Centered, |mags| {
        total += spectral_centroid(mags, &freqs) as f64;
        count += 1;
    });
    if count == 0 {
        return 0.0;
    }
    (total / count as f64) as f32 / (sample_rate as f32 / 2.0)
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Clamp into [0, 1]; non-finite values collapse to 0.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
