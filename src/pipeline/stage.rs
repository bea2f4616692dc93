use std::fmt;

use serde::Serialize;

use crate::artifact::ArtifactRole;

/// One step of the dubbing pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractAudio,
    SeparateBackground,
    Transcribe,
    GrammarCorrectEnglish,
    Translate,
    OptimizeForSpeech,
    SelectSpeech,
    Synthesize,
    ReconcileDuration,
    MixBackground,
    Remux,
}

impl Stage {
    pub const ALL: [Stage; 11] = [
        Stage::ExtractAudio,
        Stage::SeparateBackground,
        Stage::Transcribe,
        Stage::GrammarCorrectEnglish,
        Stage::Translate,
        Stage::OptimizeForSpeech,
        Stage::SelectSpeech,
        Stage::Synthesize,
        Stage::ReconcileDuration,
        Stage::MixBackground,
        Stage::Remux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractAudio => "extract",
            Self::SeparateBackground => "separate-background",
            Self::Transcribe => "transcribe",
            Self::GrammarCorrectEnglish => "grammar-correct-en",
            Self::Translate => "translate",
            Self::OptimizeForSpeech => "grammar-correct-ar",
            Self::SelectSpeech => "select-speech",
            Self::Synthesize => "synthesize",
            Self::ReconcileDuration => "reconcile-duration",
            Self::MixBackground => "mix-background",
            Self::Remux => "remux",
        }
    }

    /// Position in the fixed execution order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Artifacts that must be bound before the stage may run.
    ///
    /// Remux additionally needs one speech track, mixed or aligned; that
    /// choice is made when the stage runs.
    pub fn inputs(&self) -> &'static [ArtifactRole] {
        use ArtifactRole::*;
        match self {
            Self::ExtractAudio => &[SourceVideo],
            Self::SeparateBackground => &[SourceAudio],
            Self::Transcribe => &[SourceAudio],
            Self::GrammarCorrectEnglish => &[Transcript],
            Self::Translate => &[Transcript],
            Self::OptimizeForSpeech => &[Translation],
            Self::SelectSpeech => &[Translation],
            Self::Synthesize => &[Translation],
            Self::ReconcileDuration => &[SynthesizedSpeech, SourceAudio],
            Self::MixBackground => &[AlignedSpeech, BackgroundTrack],
            Self::Remux => &[SourceVideo],
        }
    }

    /// Artifact role the stage binds on success; `None` for selection, which
    /// only produces in-memory text.
    pub fn output(&self) -> Option<ArtifactRole> {
        use ArtifactRole::*;
        match self {
            Self::ExtractAudio => Some(SourceAudio),
            Self::SeparateBackground => Some(BackgroundTrack),
            Self::Transcribe | Self::GrammarCorrectEnglish => Some(Transcript),
            Self::Translate | Self::OptimizeForSpeech => Some(Translation),
            Self::SelectSpeech => None,
            Self::Synthesize => Some(SynthesizedSpeech),
            Self::ReconcileDuration => Some(AlignedSpeech),
            Self::MixBackground => Some(MixedSpeech),
            Self::Remux => Some(FinalVideo),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_index() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert!(Stage::Transcribe < Stage::Translate);
    }

    #[test]
    fn test_every_input_is_produced_earlier_or_supplied() {
        for stage in Stage::ALL {
            for role in stage.inputs() {
                if *role == ArtifactRole::SourceVideo {
                    continue;
                }
                let producer = Stage::ALL
                    .iter()
                    .find(|s| s.output() == Some(*role))
                    .unwrap();
                assert!(producer < &stage, "{} reads {} before it exists", stage, role);
            }
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Stage::Transcribe.to_string(), "transcribe");
        assert_eq!(Stage::OptimizeForSpeech.to_string(), "grammar-correct-ar");
    }
}
