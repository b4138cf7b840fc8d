pub mod asr;
pub mod audio;
pub mod emotion;
pub mod fusion;
pub mod translate;

pub use asr::{SpeechToText, SpeechToTextOutput, TranscribeRequest};
pub use emotion::{TextSentiment, ToneClassifier};
pub use translate::Translator;
