use serde::Serialize;

use super::Stage;

/// What a text stage does with an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// Empty output is a valid value and replaces the input.
    Accept,
    /// Empty output is discarded and the stage's input text is kept.
    FallBackToPrevious,
}

impl EmptyPolicy {
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::GrammarCorrectEnglish | Stage::Translate | Stage::OptimizeForSpeech => {
                Self::FallBackToPrevious
            }
            _ => Self::Accept,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    Raw,
    Corrected,
    Translated,
    SpeechOptimized,
}

impl TextKind {
    pub fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Transcribe => Some(Self::Raw),
            Stage::GrammarCorrectEnglish => Some(Self::Corrected),
            Stage::Translate => Some(Self::Translated),
            Stage::OptimizeForSpeech => Some(Self::SpeechOptimized),
            _ => None,
        }
    }
}

/// The run's text as it moves from transcript to speech-ready Arabic.
///
/// Only the current value and the one before it are kept.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TextSlot {
    kind: Option<TextKind>,
    current: Option<String>,
    previous: Option<String>,
}

impl TextSlot {
    /// Replace the current text with `output` under `policy`, remembering `input`
    /// as the previous value. Returns the text now held and whether it fell back.
    pub fn advance(
        &mut self,
        kind: TextKind,
        input: &str,
        output: String,
        policy: EmptyPolicy,
    ) -> (String, bool) {
        let fell_back = policy == EmptyPolicy::FallBackToPrevious && output.trim().is_empty();
        let next = if fell_back { input.to_string() } else { output };

        self.kind = Some(kind);
        self.previous = Some(input.to_string());
        self.current = Some(next.clone());
        (next, fell_back)
    }

    pub fn kind(&self) -> Option<TextKind> {
        self.kind
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}
