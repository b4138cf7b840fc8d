use async_trait::async_trait;
use sawtfeel_models::Emotion;

use super::TextSentiment;

/// Keyword-to-emotion entries. Small on purpose: the point is a deterministic
/// signal over Arabic text, not coverage.
const LEXICON: [(&str, Emotion); 22] = [
    ("غاضب", Emotion::Anger),
    ("غضب", Emotion::Anger),
    ("عصبي", Emotion::Anger),
    ("كره", Emotion::Anger),
    ("حزين", Emotion::Sadness),
    ("الحزن", Emotion::Sadness),
    ("بكاء", Emotion::Sadness),
    ("الم", Emotion::Sadness),
    ("فقدان", Emotion::Sadness),
    ("سعيد", Emotion::Joy),
    ("جميل", Emotion::Joy),
    ("ورائع", Emotion::Joy),
    ("رائع", Emotion::Joy),
    ("والفرح", Emotion::Joy),
    ("فرح", Emotion::Joy),
    ("ضحك", Emotion::Joy),
    ("خائف", Emotion::Fear),
    ("خوف", Emotion::Fear),
    ("قلق", Emotion::Fear),
    ("مفاجأة", Emotion::Surprise),
    ("مندهش", Emotion::Surprise),
    ("عجيب", Emotion::Surprise),
];

/// Lexicon-driven text sentiment backend.
///
/// Counts emotion keywords in the window text; the majority label wins and
/// confidence grows with the share of matched words. Windows with no matches
/// (or no text at all) fall back to (neutral, 0.5), the same default the
/// tonal path uses for silence.
pub struct LexiconSentiment;

impl LexiconSentiment {
    fn classify(text: &str) -> (Emotion, f64) {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return (Emotion::Neutral, 0.5);
        }

        let mut counts: Vec<(Emotion, u32)> = Vec::new();
        let mut matched = 0u32;
        for word in &words {
            if let Some((_, emotion)) = LEXICON.iter().find(|(k, _)| k == word) {
                matched += 1;
                match counts.iter_mut().find(|(e, _)| e == emotion) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((*emotion, 1)),
                }
            }
        }

        if matched == 0 {
            return (Emotion::Neutral, 0.5);
        }

        let mut best = counts[0];
        for entry in &counts[1..] {
            if entry.1 > best.1 {
                best = *entry;
            }
        }

        // Match density scales confidence; floor keeps a single hit in a
        // long window from reading as near-certainty of nothing.
        let density = matched as f64 / words.len() as f64;
        let confidence = (0.5 + density * 0.5).clamp(0.1, 1.0);
        (best.0, confidence)
    }
}

#[async_trait]
impl TextSentiment for LexiconSentiment {
    async fn classify_text(&self, text: &str) -> anyhow::Result<(Emotion, f64)> {
        Ok(Self::classify(text))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}
