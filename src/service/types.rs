use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationRequest<'a> {
    pub model: &'a str,
    pub text: &'a str,
    pub langpair: String,
    pub preprocessing: &'a str,
}

impl<'a> TranslationRequest<'a> {
    pub fn new(model: &'a str, text: &'a str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            model,
            text,
            langpair: format!("{}-{}", source_lang, target_lang),
            preprocessing: "default",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationResponse {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
}

/// MIME type for an audio upload, chosen from the file extension.
pub fn audio_mime_type(extension: Option<&str>) -> &'static str {
    match extension.map(|e| e.to_lowercase()).as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/m4a",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        _ => "audio/wav",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serializes_lowercase_roles() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let request = ChatRequest {
            model: "Fanar",
            messages: &messages,
            max_tokens: 1000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert_eq!(json["max_tokens"], 1000);
    }

    #[test]
    fn test_translation_request_langpair() {
        let request = TranslationRequest::new("Fanar-Shaheen-MT-1", "hi", "en", "ar");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["langpair"], "en-ar");
        assert_eq!(json["preprocessing"], "default");
    }

    #[test]
    fn test_chat_response_without_choices_parses_empty() {
        let response: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(response.choices.is_empty());
    }

    #[test]
    fn test_audio_mime_type() {
        assert_eq!(audio_mime_type(Some("MP3")), "audio/mpeg");
        assert_eq!(audio_mime_type(Some("wav")), "audio/wav");
        assert_eq!(audio_mime_type(Some("aiff")), "audio/wav");
        assert_eq!(audio_mime_type(None), "audio/wav");
    }
}
