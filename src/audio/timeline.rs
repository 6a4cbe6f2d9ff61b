use rayon::prelude::*;

use super::features::TimelinePoint;
use super::spectrum;

pub const DEFAULT_RESOLUTION: f32 = 1.0;

/// Energy/brightness sampled over consecutive `resolution`-second windows.
///
/// Emits `floor(duration / resolution)` points; a trailing partial window is
/// dropped.
pub fn build_timeline(samples: &[f32], sample_rate: u32, resolution: f32) -> Vec<TimelinePoint> {
    if sample_rate == 0 || !(resolution > 0.0) || !resolution.is_finite() {
        log::warn!("Skipping timeline: sample_rate={}, resolution={}", sample_rate, resolution);
        return Vec::new();
    }

    let duration = samples.len() as f32 / sample_rate as f32;
    let count = (duration / resolution).floor() as usize;
    let window = (sample_rate as f32 * resolution) as usize;
    if window == 0 {
        return Vec::new();
    }

    (0..count)
        .into_par_iter()
        .map(|i| {
            let start = (i * window).min(samples.len());
            let end = (start + window).min(samples.len());
            let chunk = &samples[start..end];
            TimelinePoint {
                time: i as f32 * resolution,
                energy: (spectrum::mean_rms(chunk) * 10.0).min(1.0),
                brightness: spectrum::mean_brightness(chunk, sample_rate),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::spectrum::tests::sine;

    #[test]
    fn one_point_per_full_window() {
        let sr = 8000;
        let samples = vec![0.0; sr as usize * 5 + 1234];
        let timeline = build_timeline(&samples, sr, 1.0);
        assert_eq!(timeline.len(), 5);
        for (i, p) in timeline.iter().enumerate() {
            assert_eq!(p.time, i as f32 * 1.0);
            assert_eq!(p.energy, 0.0);
            assert_eq!(p.brightness, 0.0);
        }
    }

    #[test]
    fn fractional_resolution() {
        let sr = 8000;
        let samples = vec![0.0; sr as usize * 3];
        let timeline = build_timeline(&samples, sr, 0.5);
        assert_eq!(timeline.len(), 6);
        for (i, p) in timeline.iter().enumerate() {
            assert_eq!(p.time, i as f32 * 0.5);
        }
        assert!(build_timeline(&samples, sr, 0.0).is_empty());
        assert!(build_timeline(&samples, sr, 10.0).is_empty());
    }

    #[test]
    fn loud_bright_window_scores_higher() {
        let sr = 22050;
        let mut samples = sine(200.0, 0.05, sr, sr as usize);
        samples.extend(sine(6000.0, 0.5, sr, sr as usize));
        let timeline = build_timeline(&samples, sr, 1.0);
        assert_eq!(timeline.len(), 2);
        assert!(timeline[1].energy > timeline[0].energy);
        assert!(timeline[1].brightness > timeline[0].brightness);
        for p in &timeline {
            assert!((0.0..=1.0).contains(&p.energy));
            assert!((0.0..=1.0).contains(&p.brightness));
        }
    }
}
