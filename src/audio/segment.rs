use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::chroma::Chroma;
use super::features::Section;
use super::presets;
use super::spectrum::{self, HOP_SIZE};
use crate::error::{AnalysisError, Result};

/// Number of contiguous segments; with the track end this gives 8 boundaries.
pub const SECTION_COUNT: usize = 7;

/// Split a track into labelled sections.
///
/// `chroma` is the track's chromagram (one frame per hop, see
/// [`chromagram`](super::chroma::chromagram)). It is clustered into
/// [`SECTION_COUNT`] temporally contiguous segments; segment starts plus the
/// track end form the boundaries, so the sections cover `[0, duration)`
/// without gaps.
pub fn detect_sections(samples: &[f32], sample_rate: u32, chroma: &[Chroma]) -> Result<Vec<Section>> {
    if sample_rate == 0 {
        return Err(AnalysisError::Segmentation("sample rate is zero".into()));
    }
    let starts = agglomerate(chroma, SECTION_COUNT)?;

    let mut bounds: Vec<usize> = starts
        .iter()
        .map(|&frame| (frame * HOP_SIZE).min(samples.len()))
        .collect();
    bounds.push(samples.len());
    log::debug!("Section boundaries (samples): {:?}", bounds);

    let count = bounds.len() - 1;
    let sections = bounds
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let (start, end) = (pair[0], pair[1]);
            let energy = spectrum::mean_rms(&samples[start..end]);
            let section_type = presets::classify_section(index, count, energy);
            Section {
                start: start as f32 / sample_rate as f32,
                end: end as f32 / sample_rate as f32,
                section_type,
                energy,
                suggested_preset: presets::preset_for_section(section_type),
            }
        })
        .collect();

    Ok(sections)
}

/// Ward-linkage agglomerative clustering restricted to neighbouring frames.
///
/// Starts from one cluster per frame and repeatedly merges the adjacent pair
/// whose merge least increases within-cluster variance, until `k` clusters
/// remain. Returns the first frame of each cluster, ascending (always
/// starting at 0).
pub fn agglomerate(features: &[Chroma], k: usize) -> Result<Vec<usize>> {
    if k == 0 || features.len() < k {
        return Err(AnalysisError::Segmentation(format!(
            "{} frames cannot form {} segments",
            features.len(),
            k
        )));
    }

    let mut clusters: Vec<Cluster> = features
        .iter()
        .enumerate()
        .map(|(i, f)| Cluster {
            start: i,
            size: 1,
            sum: *f,
            prev: i.checked_sub(1),
            next: if i + 1 < features.len() { Some(i + 1) } else { None },
            alive: true,
            version: 0,
        })
        .collect();

    let mut heap = BinaryHeap::new();
    for left in 0..features.len().saturating_sub(1) {
        heap.push(Merge::between(&clusters, left, left + 1));
    }

    let mut remaining = features.len();
    while remaining > k {
        let Some(merge) = heap.pop() else {
            break;
        };
        if !merge.is_current(&clusters) {
            continue;
        }

        let (left, right) = (merge.left, merge.right);
        let absorbed = clusters[right].clone();
        clusters[right].alive = false;

        let target = &mut clusters[left];
        target.size += absorbed.size;
        for (acc, v) in target.sum.iter_mut().zip(absorbed.sum.iter()) {
            *acc += v;
        }
        target.next = absorbed.next;
        target.version += 1;

        if let Some(next) = absorbed.next {
            clusters[next].prev = Some(left);
            heap.push(Merge::between(&clusters, left, next));
        }
        if let Some(prev) = clusters[left].prev {
            heap.push(Merge::between(&clusters, prev, left));
        }
        remaining -= 1;
    }

    let mut starts = Vec::with_capacity(k);
    let mut cursor = Some(0);
    while let Some(i) = cursor {
        starts.push(clusters[i].start);
        cursor = clusters[i].next;
    }
    Ok(starts)
}

#[derive(Clone, Debug)]
struct Cluster {
    start: usize,
    size: usize,
    sum: Chroma,
    prev: Option<usize>,
    next: Option<usize>,
    alive: bool,
    version: u32,
}

impl Cluster {
    fn centroid(&self) -> Chroma {
        let mut c = self.sum;
        for v in c.iter_mut() {
            *v /= self.size as f32;
        }
        c
    }
}

/// Candidate merge of two neighbouring clusters, ordered so the cheapest
/// (then leftmost) pops first from a max-heap.
struct Merge {
    cost: f32,
    left: usize,
    right: usize,
    left_version: u32,
    right_version: u32,
}

impl Merge {
    fn between(clusters: &[Cluster], left: usize, right: usize) -> Self {
        let (a, b) = (&clusters[left], &clusters[right]);
        let (ca, cb) = (a.centroid(), b.centroid());
        let dist: f32 = ca.iter().zip(cb.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        let (na, nb) = (a.size as f32, b.size as f32);
        Self {
            cost: na * nb / (na + nb) * dist,
            left,
            right,
            left_version: a.version,
            right_version: b.version,
        }
    }

    fn is_current(&self, clusters: &[Cluster]) -> bool {
        let (a, b) = (&clusters[self.left], &clusters[self.right]);
        a.alive
            && b.alive
            && a.next == Some(self.right)
            && a.version == self.left_version
            && b.version == self.right_version
    }
}

impl Ord for Merge {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.left.cmp(&self.left))
    }
}

impl PartialOrd for Merge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Merge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Merge {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::chroma::chromagram;
    use crate::audio::features::SectionType;
    use crate::audio::spectrum::tests::sine;

    fn sections_of(samples: &[f32], sr: u32) -> Result<Vec<Section>> {
        detect_sections(samples, sr, &chromagram(samples, sr))
    }

    fn one_hot(pc: usize) -> Chroma {
        let mut c = [0.0; 12];
        c[pc] = 1.0;
        c
    }

    #[test]
    fn recovers_contiguous_blocks() {
        let mut features = Vec::new();
        for (block, len) in [(0usize, 10usize), (4, 6), (7, 12), (2, 5)] {
            features.extend(std::iter::repeat(one_hot(block)).take(len));
        }
        let starts = agglomerate(&features, 4).unwrap();
        assert_eq!(starts, vec![0, 10, 16, 28]);
    }

    #[test]
    fn uniform_input_still_yields_k_segments() {
        let features = vec![[0.0; 12]; 50];
        let starts = agglomerate(&features, 7).unwrap();
        assert_eq!(starts.len(), 7);
        assert_eq!(starts[0], 0);
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn too_few_frames_is_an_error() {
        assert!(agglomerate(&vec![[0.0; 12]; 3], 7).is_err());
        assert!(agglomerate(&[], 1).is_err());
        assert!(sections_of(&[0.0; 1000], 44100).is_err());
        assert!(sections_of(&[0.0; 1000], 0).is_err());
    }

    #[test]
    fn sections_tile_the_track() {
        let sr = 22050;
        let mut samples = Vec::new();
        for freq in [220.0, 330.0, 440.0, 262.0, 392.0, 494.0, 349.0, 220.0] {
            samples.extend(sine(freq, 0.4, sr, sr as usize * 2));
        }
        let duration = samples.len() as f32 / sr as f32;
        let sections = sections_of(&samples, sr).unwrap();

        assert_eq!(sections.len(), SECTION_COUNT);
        assert_eq!(sections[0].start, 0.0);
        assert_eq!(sections.last().unwrap().end, duration);
        for pair in sections.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for s in &sections {
            assert!(s.start < s.end);
            assert!(s.energy >= 0.0);
            assert_eq!(s.suggested_preset, presets::preset_for_section(s.section_type));
        }
        assert_eq!(sections[0].section_type, SectionType::Intro);
        assert_eq!(sections.last().unwrap().section_type, SectionType::Outro);
    }

    #[test]
    fn silent_track_is_intro_breakdowns_outro() {
        let sr = 22050;
        let sections = sections_of(&vec![0.0; sr as usize * 10], sr).unwrap();
        assert_eq!(sections.len(), SECTION_COUNT);
        for s in &sections[1..SECTION_COUNT - 1] {
            assert_eq!(s.section_type, SectionType::Breakdown);
            assert_eq!(s.energy, 0.0);
        }
    }
}
