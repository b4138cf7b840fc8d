use async_trait::async_trait;

/// External translation capability (Arabic → English).
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn translate(&self, text: &str) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

const GLOSSARY: [(&str, &str); 14] = [
    ("هذا", "this"),
    ("صوت", "voice"),
    ("جميل", "beautiful"),
    ("ورائع", "and wonderful"),
    ("لكن", "but"),
    ("الحزن", "the sadness"),
    ("يظهر", "appears"),
    ("احيانا", "sometimes"),
    ("والفرح", "and the joy"),
    ("يعود", "returns"),
    ("بسرعة", "quickly"),
    ("كبيرة", "great"),
    ("حزين", "sad"),
    ("سعيد", "happy"),
];

/// Word-by-word glossary translator. Unknown words pass through unchanged so
/// the output stays aligned with the source text. This is the injected demo
/// double for the external translation service.
pub struct GlossaryTranslator;

#[async_trait]
impl Translator for GlossaryTranslator {
    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        let translated = text
            .split_whitespace()
            .map(|word| {
                GLOSSARY
                    .iter()
                    .find(|(ar, _)| *ar == word)
                    .map(|(_, en)| *en)
                    .unwrap_or(word)
            })
            .collect::<Vec<_>>()
            .join(" ");
        Ok(translated)
    }

    fn name(&self) -> &str {
        "glossary"
    }
}
