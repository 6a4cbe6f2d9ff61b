//! Mood and section classification cascades, and the fixed preset tables.
//!
//! Both cascades are ordered lists of `(predicate, outcome)` rules evaluated
//! top to bottom; the first rule that matches wins. The last rule of each
//! list always matches.

use super::features::{Mood, Preset, SectionType};

/// One entry of a classification cascade.
pub struct Rule<C, T> {
    pub matches: fn(&C) -> bool,
    pub outcome: T,
}

/// First matching outcome, if any rule matches.
pub fn first_match<C, T: Copy>(rules: &[Rule<C, T>], context: &C) -> Option<T> {
    rules.iter().find(|rule| (rule.matches)(context)).map(|rule| rule.outcome)
}

/// Whole-track descriptors the mood cascade looks at.
#[derive(Clone, Copy, Debug)]
pub struct MoodInputs {
    pub brightness: f32,
    pub energy: f32,
}

pub const MOOD_RULES: &[Rule<MoodInputs, Mood>] = &[
    Rule { matches: bright_and_loud, outcome: Mood::Euphoric },
    Rule { matches: dull_and_quiet, outcome: Mood::Dark },
    Rule { matches: very_loud, outcome: Mood::Driving },
    Rule { matches: always, outcome: Mood::Melancholic },
];

fn bright_and_loud(m: &MoodInputs) -> bool {
    m.brightness > 0.4 && m.energy > 0.5
}

fn dull_and_quiet(m: &MoodInputs) -> bool {
    m.brightness < 0.3 && m.energy < 0.3
}

fn very_loud(m: &MoodInputs) -> bool {
    m.energy > 0.6
}

fn always<C>(_: &C) -> bool {
    true
}

pub fn classify_mood(brightness: f32, energy: f32) -> Mood {
    first_match(MOOD_RULES, &MoodInputs { brightness, energy }).unwrap_or(Mood::Melancholic)
}

/// Position and loudness of one section within its track.
#[derive(Clone, Copy, Debug)]
pub struct SectionContext {
    pub index: usize,
    pub count: usize,
    pub energy: f32,
}

// Nothing here produces `SectionType::Buildup`; its preset entry is kept
// so downstream consumers can still map it.
pub const SECTION_RULES: &[Rule<SectionContext, SectionType>] = &[
    Rule { matches: is_first, outcome: SectionType::Intro },
    Rule { matches: is_last, outcome: SectionType::Outro },
    Rule { matches: loud_late, outcome: SectionType::Drop },
    Rule { matches: loud, outcome: SectionType::Chorus },
    Rule { matches: quiet, outcome: SectionType::Breakdown },
    Rule { matches: always, outcome: SectionType::Verse },
];

fn is_first(s: &SectionContext) -> bool {
    s.index == 0
}

fn is_last(s: &SectionContext) -> bool {
    s.index + 1 == s.count
}

fn loud_late(s: &SectionContext) -> bool {
    s.energy > 0.6 && s.index > 2
}

fn loud(s: &SectionContext) -> bool {
    s.energy > 0.6
}

fn quiet(s: &SectionContext) -> bool {
    s.energy < 0.3
}

pub fn classify_section(index: usize, count: usize, energy: f32) -> SectionType {
    first_match(SECTION_RULES, &SectionContext { index, count, energy })
        .unwrap_or(SectionType::Verse)
}

pub fn preset_for_mood(mood: Mood) -> Preset {
    match mood {
        Mood::Dark => Preset::Void,
        Mood::Euphoric => Preset::Emergence,
        Mood::Driving => Preset::FractalBloom,
        Mood::Melancholic => Preset::Cosmos,
    }
}

pub fn preset_for_section(section_type: SectionType) -> Preset {
    match section_type {
        SectionType::Intro => Preset::Cosmos,
        SectionType::Verse => Preset::Emergence,
        SectionType::Buildup => Preset::Descent,
        SectionType::Chorus => Preset::Portal,
        SectionType::Breakdown => Preset::Void,
        SectionType::Drop => Preset::FractalBloom,
        SectionType::Outro => Preset::Return,
    }
}

/// Lookup by wire name of a mood or section type; unknown names map to COSMOS.
pub fn preset_for_name(name: &str) -> Preset {
    const MOODS: [Mood; 4] = [Mood::Euphoric, Mood::Dark, Mood::Driving, Mood::Melancholic];
    const SECTIONS: [SectionType; 7] = [
        SectionType::Intro,
        SectionType::Verse,
        SectionType::Buildup,
        SectionType::Chorus,
        SectionType::Breakdown,
        SectionType::Drop,
        SectionType::Outro,
    ];

    if let Some(mood) = MOODS.iter().find(|m| m.as_str() == name) {
        return preset_for_mood(*mood);
    }
    SECTIONS
        .iter()
        .find(|s| s.as_str() == name)
        .map(|s| preset_for_section(*s))
        .unwrap_or(Preset::Cosmos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_cascade_examples() {
        assert_eq!(classify_mood(0.5, 0.6), Mood::Euphoric);
        assert_eq!(classify_mood(0.1, 0.1), Mood::Dark);
        assert_eq!(classify_mood(0.2, 0.7), Mood::Driving);
        assert_eq!(classify_mood(0.35, 0.4), Mood::Melancholic);
    }

    #[test]
    fn mood_priority_order() {
        // bright and very loud: euphoric beats driving
        assert_eq!(classify_mood(0.9, 0.9), Mood::Euphoric);
        // silence is dark
        assert_eq!(classify_mood(0.0, 0.0), Mood::Dark);
        // quiet but bright falls through to melancholic
        assert_eq!(classify_mood(0.5, 0.1), Mood::Melancholic);
        // boundaries are strict
        assert_eq!(classify_mood(0.4, 0.9), Mood::Driving);
        assert_eq!(classify_mood(0.3, 0.2), Mood::Melancholic);
    }

    #[test]
    fn section_cascade() {
        assert_eq!(classify_section(0, 7, 0.9), SectionType::Intro);
        assert_eq!(classify_section(6, 7, 0.9), SectionType::Outro);
        assert_eq!(classify_section(1, 7, 0.7), SectionType::Chorus);
        assert_eq!(classify_section(2, 7, 0.7), SectionType::Chorus);
        assert_eq!(classify_section(3, 7, 0.7), SectionType::Drop);
        assert_eq!(classify_section(3, 7, 0.1), SectionType::Breakdown);
        assert_eq!(classify_section(3, 7, 0.45), SectionType::Verse);
        assert_eq!(classify_section(0, 1, 0.45), SectionType::Intro);
    }

    #[test]
    fn buildup_is_never_classified() {
        for count in 1..10 {
            for index in 0..count {
                for energy in [0.0, 0.3, 0.45, 0.6, 0.61, 1.0, 5.0] {
                    assert_ne!(classify_section(index, count, energy), SectionType::Buildup);
                }
            }
        }
    }

    #[test]
    fn preset_tables() {
        assert_eq!(preset_for_mood(Mood::Dark), Preset::Void);
        assert_eq!(preset_for_mood(Mood::Euphoric), Preset::Emergence);
        assert_eq!(preset_for_mood(Mood::Driving), Preset::FractalBloom);
        assert_eq!(preset_for_mood(Mood::Melancholic), Preset::Cosmos);

        assert_eq!(preset_for_section(SectionType::Intro), Preset::Cosmos);
        assert_eq!(preset_for_section(SectionType::Verse), Preset::Emergence);
        assert_eq!(preset_for_section(SectionType::Buildup), Preset::Descent);
        assert_eq!(preset_for_section(SectionType::Chorus), Preset::Portal);
        assert_eq!(preset_for_section(SectionType::Breakdown), Preset::Void);
        assert_eq!(preset_for_section(SectionType::Drop), Preset::FractalBloom);
        assert_eq!(preset_for_section(SectionType::Outro), Preset::Return);
    }

    #[test]
    fn name_lookup_falls_back_to_cosmos() {
        assert_eq!(preset_for_name("dark"), Preset::Void);
        assert_eq!(preset_for_name("buildup"), Preset::Descent);
        assert_eq!(preset_for_name("outro"), Preset::Return);
        assert_eq!(preset_for_name("bridge"), Preset::Cosmos);
        assert_eq!(preset_for_name(""), Preset::Cosmos);
    }
}
