use std::path::Path;

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async as AsyncResampler, FixedAsync, Resampler as RubatoResampler,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Reads a WAV file and returns f32 mono samples resampled to 16kHz.
///
/// Supports 16-bit integer and 32-bit float formats. Stereo is down-mixed to
/// mono; any source rate is resampled to 16kHz.
pub fn read_wav_16k_mono(path: impl AsRef<Path>) -> anyhow::Result<Vec<f32>> {
    let reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to open WAV '{}': {}", path.as_ref().display(), e))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.unwrap_or(0) as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.unwrap_or(0.0))
            .collect(),
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    if sample_rate != 16000 {
        resample_to_16k(&mono, sample_rate)
    } else {
        Ok(mono)
    }
}

/// Writes 16kHz mono f32 samples as a 16-bit PCM WAV file.
pub fn write_wav_16k_mono(path: impl AsRef<Path>, samples: &[f32]) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path.as_ref(), spec)
        .map_err(|e| anyhow::anyhow!("Failed to create WAV '{}': {}", path.as_ref().display(), e))?;
    for sample in samples {
        let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(clamped)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Duration in seconds of a WAV file, from the header alone.
pub fn wav_duration_secs(path: impl AsRef<Path>) -> anyhow::Result<f64> {
    let reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to open WAV '{}': {}", path.as_ref().display(), e))?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Resamples mono audio from `src_rate` Hz to 16kHz using sinc interpolation.
fn resample_to_16k(audio: &[f32], src_rate: u32) -> anyhow::Result<Vec<f32>> {
    let ratio = 16000.0 / src_rate as f64;
    let chunk_size = 1024;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: Some(0.95),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = AsyncResampler::<f32>::new_sinc(
        ratio,
        2.0,
        &params,
        chunk_size,
        1, // mono
        FixedAsync::Input,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create resampler: {}", e))?;

    let mut output = Vec::with_capacity((audio.len() as f64 * ratio) as usize + 1024);

    for chunk in audio.chunks(chunk_size) {
        let input = if chunk.len() < chunk_size {
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        } else {
            chunk.to_vec()
        };

        let frames = input.len();
        let input_adapter = InterleavedSlice::new(&input, 1, frames)
            .map_err(|e| anyhow::anyhow!("Input adapter error: {}", e))?;

        let result = resampler
            .process(&input_adapter, None)
            .map_err(|e| anyhow::anyhow!("Resample error: {}", e))?;

        output.extend(result.take_data());
    }

    // Trim zero-padding artifacts from the final chunk
    let expected_len = (audio.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}
