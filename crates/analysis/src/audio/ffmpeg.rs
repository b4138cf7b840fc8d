use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

/// Extracts the audio track of any container ffmpeg understands into a
/// 16kHz mono 16-bit PCM WAV, band-passed for speech. Writes through a
/// sibling `.part` file so a crashed extraction never leaves a half-written
/// artifact at the destination.
pub async fn extract_audio_16k_mono(
    ffmpeg_path: &str,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    let partial = output.with_extension("wav.part");

    info!(input = %input.display(), output = %output.display(), "Extracting audio track");

    let cmd_output = Command::new(ffmpeg_path)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ac")
        .arg("1")
        .arg("-ar")
        .arg("16000")
        .arg("-af")
        .arg("highpass=f=200,lowpass=f=3400")
        .arg("-f")
        .arg("wav")
        .arg(&partial)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to execute ffmpeg: {}", e))?;

    if !cmd_output.status.success() {
        let stderr = String::from_utf8_lossy(&cmd_output.stderr);
        let _ = tokio::fs::remove_file(&partial).await;
        anyhow::bail!("Audio extraction failed: {}", stderr.trim());
    }

    tokio::fs::rename(&partial, output)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to move extracted audio into place: {}", e))?;

    debug!(output = %output.display(), "Audio extraction completed");
    Ok(())
}

/// Container duration in seconds via ffprobe.
pub async fn probe_duration_secs(
    ffprobe_path: &str,
    input: impl AsRef<Path>,
) -> anyhow::Result<f64> {
    let output = Command::new(ffprobe_path)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input.as_ref())
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to execute ffprobe: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffprobe failed: {}", stderr.trim());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("Unparseable ffprobe duration '{}': {}", text.trim(), e))
}
