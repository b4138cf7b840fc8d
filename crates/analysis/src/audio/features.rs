use rustfft::{FftPlanner, num_complex::Complex};

/// Root-mean-square energy of a PCM chunk.
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Fraction of adjacent sample pairs that cross zero.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Magnitude-weighted mean frequency in Hz.
pub fn spectral_centroid(samples: &[f32], sample_rate: u32) -> f32 {
    if samples.len() < 64 {
        return 0.0;
    }
    // Power-of-two window for the FFT; anything beyond is ignored.
    let n = samples.len().next_power_of_two() / 2;
    let n = n.clamp(64, 4096);

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .take(n)
        .map(|s| Complex::new(*s, 0.0))
        .collect();
    buffer.resize(n, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let bin_hz = sample_rate as f32 / n as f32;
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for (i, c) in buffer.iter().take(n / 2).enumerate() {
        let magnitude = c.norm();
        weighted += i as f32 * bin_hz * magnitude;
        total += magnitude;
    }

    if total > 0.0 { weighted / total } else { 0.0 }
}

/// Fundamental-frequency estimate via autocorrelation, in Hz.
/// Returns 0.0 when no periodicity stands out (unvoiced/silence).
pub fn pitch_estimate(samples: &[f32], sample_rate: u32) -> f32 {
    // Search 60..400 Hz, the usual speech F0 band.
    let min_lag = (sample_rate / 400) as usize;
    let max_lag = (sample_rate / 60) as usize;
    if samples.len() < max_lag * 2 || min_lag == 0 {
        return 0.0;
    }

    let energy: f32 = samples.iter().map(|s| s * s).sum();
    if energy <= f32::EPSILON {
        return 0.0;
    }

    let mut best_lag = 0usize;
    let mut best_corr = 0.0f32;
    for lag in min_lag..=max_lag {
        let mut corr = 0.0f32;
        for i in 0..samples.len() - lag {
            corr += samples[i] * samples[i + lag];
        }
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    // Weak periodicity reads as unvoiced.
    if best_lag == 0 || best_corr / energy < 0.3 {
        return 0.0;
    }
    sample_rate as f32 / best_lag as f32
}
