use serde::Serialize;
use tracing::{info, warn};

use crate::config::ServiceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelChoice {
    ShortForm,
    LongForm,
    Override,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedModel {
    pub name: String,
    pub choice: ModelChoice,
}

/// Pick the speech-to-text model for audio of `duration_ms`.
///
/// Audio up to `short_form_max_secs` long goes to the short-form model, longer
/// audio to the long-form one. An unknown duration uses the short-form model.
/// `override_model` wins over both.
pub fn select_transcription_model(
    duration_ms: Option<u64>,
    short_form_max_secs: f64,
    config: &ServiceConfig,
    override_model: Option<&str>,
) -> SelectedModel {
    if let Some(model) = override_model {
        info!("Using caller-supplied transcription model {}", model);
        return SelectedModel {
            name: model.to_string(),
            choice: ModelChoice::Override,
        };
    }

    let choice = match duration_ms {
        Some(ms) if ms as f64 / 1000.0 > short_form_max_secs => ModelChoice::LongForm,
        Some(_) => ModelChoice::ShortForm,
        None => {
            warn!("Audio duration unknown, defaulting to the short-form transcription model");
            ModelChoice::ShortForm
        }
    };

    let name = match choice {
        ModelChoice::LongForm => config.long_form_stt_model.clone(),
        _ => config.short_form_stt_model.clone(),
    };

    info!("Selected transcription model {} ({:?}, duration {:?} ms)", name, choice, duration_ms);
    SelectedModel { name, choice }
}
