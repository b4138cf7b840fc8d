use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ModelError, ProcessingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Audio,
    Video,
}

const VIDEO_FORMATS: [(&str, &str); 6] = [
    ("mp4", "MP4"),
    ("avi", "AVI"),
    ("mov", "MOV"),
    ("mkv", "MKV"),
    ("webm", "WebM"),
    ("flv", "FLV"),
];

const AUDIO_FORMATS: [(&str, &str); 5] = [
    ("mp3", "MP3"),
    ("wav", "WAV"),
    ("flac", "FLAC"),
    ("aac", "AAC"),
    ("ogg", "OGG"),
];

/// Display names for the upload allow-list, in the order error responses
/// report them.
pub fn supported_formats() -> Vec<&'static str> {
    ["MP3", "WAV", "MP4", "AVI", "MOV", "MKV", "WebM", "FLV"].to_vec()
}

/// Classifies a filename by extension into (kind, canonical format name).
pub fn detect_format(filename: &str) -> Result<(FileKind, String), ModelError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if let Some((_, name)) = VIDEO_FORMATS.iter().find(|(e, _)| *e == ext) {
        return Ok((FileKind::Video, name.to_string()));
    }
    if let Some((_, name)) = AUDIO_FORMATS.iter().find(|(e, _)| *e == ext) {
        return Ok((FileKind::Audio, name.to_string()));
    }
    Err(ModelError::UnsupportedFormat(format!(".{ext}")))
}

/// Metadata record for one uploaded file. Mutated only by the pipeline that
/// owns the file id; everything else reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFileMeta {
    pub original_filename: String,
    pub stored_path: String,
    pub file_hash: String,
    pub file_size: u64,
    pub file_type: FileKind,
    pub format: String,
    pub upload_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default = "default_status")]
    pub status: ProcessingStatus,
}

fn default_status() -> ProcessingStatus {
    ProcessingStatus::Uploaded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_video_and_audio() {
        assert_eq!(
            detect_format("clip.MP4").unwrap(),
            (FileKind::Video, "MP4".to_string())
        );
        assert_eq!(
            detect_format("voice.wav").unwrap(),
            (FileKind::Audio, "WAV".to_string())
        );
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(matches!(
            detect_format("notes.txt"),
            Err(ModelError::UnsupportedFormat(_))
        ));
        assert!(detect_format("no_extension").is_err());
    }
}
