//! Selection of the text that is actually sent to speech synthesis.
//!
//! The TTS-optimised text comes back from a language model, which tends to
//! wrap the spoken lines in quotation marks and surround them with commentary.
//! Only the quoted spans are spoken.

/// Opening delimiter paired with the delimiter that closes it.
const DELIMITERS: [(char, char); 3] = [('"', '"'), ('\u{201C}', '\u{201D}'), ('\u{00AB}', '\u{00BB}')];

pub struct SpeechSelector;

impl SpeechSelector {
    /// Concatenate every quoted span in `text`, left to right, separated by a single space.
    ///
    /// Straight double quotes, curly double quotes and Arabic angle quotes are
    /// all recognised and may be mixed in one text. A span must be non-empty and
    /// terminated; an opening quote with no closer contributes nothing.
    pub fn select(text: &str) -> String {
        let mut spans: Vec<&str> = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let Some(ch) = rest.chars().next() else {
                break;
            };

            if let Some(close) = closer_for(ch) {
                let body_start = pos + ch.len_utf8();
                if let Some(offset) = text[body_start..].find(close) {
                    if offset > 0 {
                        spans.push(&text[body_start..body_start + offset]);
                        pos = body_start + offset + close.len_utf8();
                        continue;
                    }
                }
            }

            pos += ch.len_utf8();
        }

        spans.join(" ")
    }
}

fn closer_for(open: char) -> Option<char> {
    DELIMITERS
        .iter()
        .find(|(o, _)| *o == open)
        .map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_delimiters_in_order() {
        assert_eq!(SpeechSelector::select("He said \"hello\" and «world»"), "hello world");
    }

    #[test]
    fn test_curly_quotes() {
        assert_eq!(
            SpeechSelector::select("\u{201C}مرحبا\u{201D} ثم \u{201C}بكم\u{201D}"),
            "مرحبا بكم"
        );
    }

    #[test]
    fn test_no_delimiters_yields_empty() {
        assert_eq!(SpeechSelector::select("نص بدون علامات اقتباس"), "");
        assert_eq!(SpeechSelector::select(""), "");
    }

    #[test]
    fn test_unterminated_quote_is_ignored() {
        assert_eq!(SpeechSelector::select("«one» then «two"), "one");
        assert_eq!(SpeechSelector::select("trailing \""), "");
    }

    #[test]
    fn test_curly_quote_not_closed_by_straight_quote() {
        assert_eq!(SpeechSelector::select("\u{201C}open \"x\""), "x");
    }

    #[test]
    fn test_empty_span_is_skipped() {
        assert_eq!(SpeechSelector::select("«» and «text»"), "text");
    }

    #[test]
    fn test_angle_quote_may_contain_straight_quotes() {
        assert_eq!(SpeechSelector::select("«a \"b\" c»"), "a \"b\" c");
    }
}
