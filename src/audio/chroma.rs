use rayon::prelude::*;
use rustfft::FftPlanner;

use super::spectrum::{self, Framing, MagnitudeSpectrum, FFT_SIZE, HOP_SIZE};

pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

// C1 up to C8; bins outside carry no reliable pitch.
const MIN_PITCH_HZ: f32 = 32.70;
const MAX_PITCH_HZ: f32 = 4186.0;
const SEMITONE_RATIO: f32 = 1.059_463_1;
/// Longest chroma FFT. Above this the lowest notes are dropped instead.
const MAX_CHROMA_FFT: usize = 32768;

pub type Chroma = [f32; 12];

/// FFT length whose bins are no wider than a semitone at C1 (32768 at
/// 44.1 kHz, 16384 at 22.05 kHz).
pub fn chroma_fft_size(sample_rate: u32) -> usize {
    let semitone_at_floor = MIN_PITCH_HZ * (SEMITONE_RATIO - 1.0);
    let needed = (sample_rate as f32 / semitone_at_floor).ceil() as usize;
    needed.next_power_of_two().clamp(FFT_SIZE, MAX_CHROMA_FFT)
}

/// Per-frame chroma, one frame every 512 samples centred on `t * 512`.
///
/// Each bin's power is folded into the pitch class nearest its frequency.
/// The FFT is long enough that a bin never spans more than one semitone,
/// so bass notes land in their own class. Every frame is then scaled so
/// its largest class is 1.0 (silent frames stay all-zero).
pub fn chromagram(samples: &[f32], sample_rate: u32) -> Vec<Chroma> {
    if sample_rate == 0 {
        return Vec::new();
    }
    let size = chroma_fft_size(sample_rate);
    let frames = Framing::Centered.frame_count(samples.len(), size, HOP_SIZE);
    if frames == 0 {
        return Vec::new();
    }
    log::debug!("Chroma: {} frames of {} samples", frames, size);

    let classes = bin_pitch_classes(size, sample_rate);
    let template = MagnitudeSpectrum::new(&mut FftPlanner::new(), size);

    (0..frames)
        .into_par_iter()
        .map_init(
            || (template.clone(), vec![0.0f32; size]),
            |(spectrum, frame), t| {
                Framing::Centered.fill(frame, samples, t, HOP_SIZE);
                fold_pitch_classes(&spectrum.compute(frame), &classes)
            },
        )
        .collect()
}

fn fold_pitch_classes(mags: &[f32], classes: &[Option<usize>]) -> Chroma {
    let mut chroma = [0.0f32; 12];
    for (mag, class) in mags.iter().zip(classes) {
        if let Some(pc) = class {
            chroma[*pc] += mag * mag;
        }
    }
    let peak = chroma.iter().copied().fold(0.0f32, f32::max);
    if peak > 1e-10 {
        for v in chroma.iter_mut() {
            *v /= peak;
        }
    }
    chroma
}

fn bin_pitch_classes(size: usize, sample_rate: u32) -> Vec<Option<usize>> {
    let bin_width = sample_rate as f32 / size as f32;
    // below this a single bin is wider than a semitone
    let lowest = MIN_PITCH_HZ.max(bin_width / (SEMITONE_RATIO - 1.0));
    spectrum::bin_frequencies(size, sample_rate)
        .into_iter()
        .map(|f| {
            if !(lowest..=MAX_PITCH_HZ).contains(&f) {
                return None;
            }
            let midi = 69.0 + 12.0 * (f / 440.0).log2();
            Some((midi.round() as i64).rem_euclid(12) as usize)
        })
        .collect()
}

/// Pitch class with the largest total energy over time. Ties, and an
/// all-silent chromagram, resolve to the lowest index (C).
pub fn dominant_pitch_class(chroma: &[Chroma]) -> usize {
    let mut totals = [0.0f32; 12];
    for frame in chroma {
        for (total, v) in totals.iter_mut().zip(frame) {
            *total += v;
        }
    }
    let mut best = 0;
    for (i, &total) in totals.iter().enumerate() {
        if total > totals[best] {
            best = i;
        }
    }
    best
}

pub fn key_of(chroma: &[Chroma]) -> &'static str {
    PITCH_CLASSES[dominant_pitch_class(chroma)]
}

/// Key name of the dominant pitch class.
pub fn detect_key(samples: &[f32], sample_rate: u32) -> &'static str {
    key_of(&chromagram(samples, sample_rate))
}
