use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::chroma;
use super::features::TrackAnalysis;
use super::onset;
use super::presets;
use super::segment;
use super::spectrum;
use super::timeline;
use crate::error::{AnalysisError, Result};

/// Offline whole-track analyzer.
///
/// Holds no mutable state, so one instance can analyze several buffers,
/// including from different threads.
pub struct TrackAnalyzer {
    resolution: f32,
    cancel: Option<Arc<AtomicBool>>,
}

impl TrackAnalyzer {
    pub fn new() -> Self {
        Self {
            resolution: timeline::DEFAULT_RESOLUTION,
            cancel: None,
        }
    }

    /// Timeline window length in seconds.
    pub fn with_resolution(mut self, resolution: f32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Flag checked between the major steps; setting it aborts the analysis
    /// with [`AnalysisError::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn checkpoint(&self, step: &str) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => {
                log::info!("Analysis cancelled before {}", step);
                Err(AnalysisError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// Analyze a mono buffer. Numerical failures inside a step fall back to
    /// that step's default; only cancellation returns an error.
    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<TrackAnalysis> {
        let duration = if sample_rate > 0 {
            samples.len() as f32 / sample_rate as f32
        } else {
            log::warn!("Sample rate is zero; analysing as an empty track");
            0.0
        };
        let samples: &[f32] = if sample_rate > 0 { samples } else { &[] };
        log::info!("Duration: {:.1}s, Sample rate: {}", duration, sample_rate);

        self.checkpoint("tempo")?;
        let bpm = onset::track_tempo(samples, sample_rate);
        log::info!("Detected BPM: {:.1}", bpm);

        self.checkpoint("key")?;
        let chroma = chroma::chromagram(samples, sample_rate);
        let key = chroma::key_of(&chroma);
        let overall_energy = spectrum::mean_rms(samples);
        let brightness = spectrum::mean_brightness(samples, sample_rate);
        let mood = presets::classify_mood(brightness, overall_energy);
        log::info!(
            "Key: {}, energy: {:.3}, brightness: {:.3}, mood: {}",
            key,
            overall_energy,
            brightness,
            mood.as_str()
        );

        self.checkpoint("segmentation")?;
        let (sections, analysis_timeline) = rayon::join(
            || match segment::detect_sections(samples, sample_rate, &chroma) {
                Ok(sections) => sections,
                Err(e) => {
                    log::warn!("Section detection error: {}", e);
                    Vec::new()
                }
            },
            || timeline::build_timeline(samples, sample_rate, self.resolution),
        );
        self.checkpoint("timeline")?;
        log::info!(
            "Sections: {}, timeline points: {}",
            sections.len(),
            analysis_timeline.len()
        );

        Ok(TrackAnalysis {
            duration,
            bpm,
            key: key.to_string(),
            overall_energy,
            mood,
            sections,
            analysis_timeline,
            suggested_preset: presets::preset_for_mood(mood),
        })
    }
}

impl Default for TrackAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::Mood;
    use crate::audio::spectrum::tests::sine;

    #[test]
    fn silent_track_scenario() {
        let sr = 22050;
        let samples = vec![0.0; sr as usize * 10];
        let analysis = TrackAnalyzer::new().analyze(&samples, sr).unwrap();

        assert!((analysis.duration - 10.0).abs() < 1e-6);
        assert!(analysis.overall_energy.abs() < 1e-9);
        assert!(matches!(analysis.mood, Mood::Dark | Mood::Melancholic));
        assert_eq!(analysis.suggested_preset, presets::preset_for_mood(analysis.mood));
        assert_eq!(analysis.bpm, onset::FALLBACK_BPM);
        assert_eq!(analysis.key, "C");
        assert!(analysis.sections.len() <= segment::SECTION_COUNT);
        assert_eq!(analysis.analysis_timeline.len(), 10);
    }

    #[test]
    fn tonal_track_properties() {
        let sr = 22050;
        let mut samples = Vec::new();
        for (freq, amp) in [(440.0, 0.2), (440.0, 0.9), (660.0, 0.5), (440.0, 0.1)] {
            samples.extend(sine(freq, amp, sr, sr as usize * 3));
        }
        let duration = samples.len() as f32 / sr as f32;
        let analysis = TrackAnalyzer::new()
            .with_resolution(0.5)
            .analyze(&samples, sr)
            .unwrap();

        assert_eq!(analysis.key, "A");
        assert_eq!(analysis.analysis_timeline.len(), (duration / 0.5).floor() as usize);
        for (i, p) in analysis.analysis_timeline.iter().enumerate() {
            assert_eq!(p.time, i as f32 * 0.5);
        }

        let sections = &analysis.sections;
        assert!(!sections.is_empty());
        assert_eq!(sections[0].start, 0.0);
        assert_eq!(sections.last().unwrap().end, duration);
        for pair in sections.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(analysis.bpm > 0.0);
    }

    #[test]
    fn short_track_has_no_sections() {
        let sr = 44100;
        let analysis = TrackAnalyzer::new().analyze(&[0.1; 3000], sr).unwrap();
        assert!(analysis.sections.is_empty());
        assert!(analysis.analysis_timeline.is_empty());
    }

    #[test]
    fn cancellation_stops_analysis() {
        let flag = Arc::new(AtomicBool::new(true));
        let analyzer = TrackAnalyzer::new().with_cancel_flag(flag.clone());
        let result = analyzer.analyze(&vec![0.0; 44100], 44100);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));

        flag.store(false, Ordering::Relaxed);
        assert!(analyzer.analyze(&vec![0.0; 44100], 44100).is_ok());
    }

    #[test]
    fn zero_sample_rate_does_not_abort() {
        let analysis = TrackAnalyzer::new().analyze(&[0.5; 100], 0).unwrap();
        assert_eq!(analysis.duration, 0.0);
        assert_eq!(analysis.bpm, onset::FALLBACK_BPM);
        assert!(analysis.sections.is_empty());
    }
}
