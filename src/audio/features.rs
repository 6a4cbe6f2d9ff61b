use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The seven fixed analysis bands, in ascending frequency order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    SubBass,
    Bass,
    LowMid,
    Mid,
    HighMid,
    Presence,
    Brilliance,
}

impl Band {
    pub const ALL: [Band; 7] = [
        Band::SubBass,
        Band::Bass,
        Band::LowMid,
        Band::Mid,
        Band::HighMid,
        Band::Presence,
        Band::Brilliance,
    ];

    /// Wire name of the band.
    pub fn name(self) -> &'static str {
        match self {
            Band::SubBass => "subBass",
            Band::Bass => "bass",
            Band::LowMid => "lowMid",
            Band::Mid => "mid",
            Band::HighMid => "highMid",
            Band::Presence => "presence",
            Band::Brilliance => "brilliance",
        }
    }

    /// Half-open frequency range `[low, high)` in Hz.
    pub fn range(self) -> (f32, f32) {
        match self {
            Band::SubBass => (20.0, 60.0),
            Band::Bass => (60.0, 250.0),
            Band::LowMid => (250.0, 500.0),
            Band::Mid => (500.0, 2000.0),
            Band::HighMid => (2000.0, 4000.0),
            Band::Presence => (4000.0, 6000.0),
            Band::Brilliance => (6000.0, 20000.0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-band energies, serialized as a flat `name -> value` map.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies([f32; 7]);

impl BandEnergies {
    pub fn get(&self, band: Band) -> f32 {
        self.0[band.index()]
    }

    pub fn set(&mut self, band: Band, value: f32) {
        self.0[band.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, f32)> + '_ {
        Band::ALL.iter().map(move |&b| (b, self.get(b)))
    }
}

impl std::ops::Index<Band> for BandEnergies {
    type Output = f32;

    fn index(&self, band: Band) -> &f32 {
        &self.0[band.index()]
    }
}

impl Serialize for BandEnergies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Band::ALL.len()))?;
        for (band, value) in self.iter() {
            map.serialize_entry(band.name(), &value)?;
        }
        map.end()
    }
}

/// Features for one real-time frame. Everything except `detected_bpm` is in [0, 1].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFrame {
    #[serde(flatten)]
    pub bands: BandEnergies,
    pub overall_amplitude: f32,
    pub peak_amplitude: f32,
    pub spectral_centroid: f32,
    pub spectral_flux: f32,
    pub beat_intensity: f32,
    pub detected_bpm: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Euphoric,
    Dark,
    Driving,
    Melancholic,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Euphoric => "euphoric",
            Mood::Dark => "dark",
            Mood::Driving => "driving",
            Mood::Melancholic => "melancholic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Intro,
    Verse,
    Buildup,
    Chorus,
    Breakdown,
    Drop,
    Outro,
}

impl SectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Intro => "intro",
            SectionType::Verse => "verse",
            SectionType::Buildup => "buildup",
            SectionType::Chorus => "chorus",
            SectionType::Breakdown => "breakdown",
            SectionType::Drop => "drop",
            SectionType::Outro => "outro",
        }
    }
}

/// Visual preset names understood by the downstream renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Preset {
    Cosmos,
    Emergence,
    Descent,
    Portal,
    Void,
    FractalBloom,
    Return,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Cosmos => "COSMOS",
            Preset::Emergence => "EMERGENCE",
            Preset::Descent => "DESCENT",
            Preset::Portal => "PORTAL",
            Preset::Void => "VOID",
            Preset::FractalBloom => "FRACTAL_BLOOM",
            Preset::Return => "RETURN",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub start: f32,
    pub end: f32,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub energy: f32,
    pub suggested_preset: Preset,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub time: f32,
    pub energy: f32,
    pub brightness: f32,
}

/// Whole-track metadata, computed once by the offline analyzer.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAnalysis {
    pub duration: f32,
    pub bpm: f32,
    pub key: String,
    pub overall_energy: f32,
    pub mood: Mood,
    pub sections: Vec<Section>,
    pub analysis_timeline: Vec<TimelinePoint>,
    pub suggested_preset: Preset,
}

/// Offline result tagged with the caller's track identifier, as delivered.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub analysis: TrackAnalysis,
    pub track_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_serializes_flat_camel_case() {
        let mut bands = BandEnergies::default();
        bands.set(Band::Bass, 0.5);
        let frame = FeatureFrame {
            bands,
            overall_amplitude: 0.1,
            peak_amplitude: 0.2,
            spectral_centroid: 0.3,
            spectral_flux: 0.0,
            beat_intensity: 0.0,
            detected_bpm: 120.0,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["bass"], 0.5);
        assert_eq!(json["subBass"], 0.0);
        assert_eq!(json["detectedBpm"], 120.0);
        assert!(json.get("bands").is_none());
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(Preset::FractalBloom).unwrap(), "FRACTAL_BLOOM");
        assert_eq!(serde_json::to_value(SectionType::Breakdown).unwrap(), "breakdown");
        assert_eq!(serde_json::to_value(Mood::Melancholic).unwrap(), "melancholic");
        for preset in [Preset::Cosmos, Preset::FractalBloom, Preset::Return] {
            assert_eq!(serde_json::to_value(preset).unwrap(), preset.as_str());
        }
    }

    #[test]
    fn report_carries_track_id() {
        let report = AnalysisReport {
            analysis: TrackAnalysis {
                duration: 1.0,
                bpm: 120.0,
                key: "C".into(),
                overall_energy: 0.0,
                mood: Mood::Dark,
                sections: Vec::new(),
                analysis_timeline: Vec::new(),
                suggested_preset: Preset::Void,
            },
            track_id: "abc".into(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["trackId"], "abc");
        assert_eq!(json["suggestedPreset"], "VOID");
        assert!(json["analysisTimeline"].is_array());
    }
}
