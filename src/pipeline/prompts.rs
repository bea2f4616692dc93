use crate::service::ChatMessage;

pub const ASSISTANT_SYSTEM: &str = "You are a helpful assistant.";

const ARABIC_SPEECH_SYSTEM: &str =
    "أنت مساعد لغوي مختص بتحسين النصوص لتحويلها إلى كلام (TTS) بطريقة طبيعية وسلسة.";

const ARABIC_SPEECH_INSTRUCTION: &str = "قم بإعادة صياغة هذا النص ليكون أكثر سلاسة وطبيعية عند النطق لتحسين أداء تحويل النص إلى كلام (TTS)، ويجب أن يكون النص الناتج أكثر إيجازًا واختصارًا من النص الأصلي، مع الحفاظ على المعنى الأساسي. استخدم جملاً قصيرة، وتجنّب التعقيد أو الكلمات الزائدة. لا تضف مقدمات أو تعليقات أو اقتباسات — فقط أرجع النص المحسّن النهائي.";

/// Grammar and punctuation pass over a raw English transcript.
pub fn english_grammar(transcript: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ASSISTANT_SYSTEM),
        ChatMessage::user(format!(
            "Add grammar to the following transcription:\n\n{}",
            transcript
        )),
    ]
}

/// Rewrite of translated Arabic text so it reads naturally when spoken.
pub fn arabic_speech_rewrite(translation: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ARABIC_SPEECH_SYSTEM),
        ChatMessage::user(format!("{}\n\nالنص:\n{}", ARABIC_SPEECH_INSTRUCTION, translation)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ChatRole;

    #[test]
    fn test_english_prompt_embeds_transcript() {
        let messages = english_grammar("hello there");
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[1].content.ends_with("\n\nhello there"));
    }

    #[test]
    fn test_arabic_prompt_embeds_text_last() {
        let messages = arabic_speech_rewrite("مرحبا");
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.ends_with("النص:\nمرحبا"));
    }
}
