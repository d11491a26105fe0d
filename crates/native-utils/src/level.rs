//! Voice-energy metering for the session visualizer.
//!
//! The meter turns a window of time-domain samples into a single scalar in
//! [0, 1]: RMS loudness boosted by a fixed gain, clamped, then exponentially
//! smoothed so the visual reaction neither flickers nor lags.

/// Gain applied to the raw RMS before clamping. Tuned for the orb animation;
/// changing it changes how hard the orbs react to normal speech.
pub const ENERGY_GAIN: f32 = 5.0;

/// Per-tick smoothing factor of the exponential moving average.
pub const ENERGY_SMOOTHING: f32 = 0.1;

/// Computes the instantaneous energy target for a sample window in [-1, 1].
pub fn energy_target(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    let rms = (sum / samples.len() as f32).sqrt();
    (rms * ENERGY_GAIN).clamp(0.0, 1.0)
}

/// Exponentially-smoothed voice energy, always in [0, 1].
#[derive(Debug, Default)]
pub struct EnergyMeter {
    smoothed: f32,
}

impl EnergyMeter {
    pub fn new() -> Self {
        Self { smoothed: 0.0 }
    }

    /// Feeds one sample window and returns the updated smoothed value.
    pub fn update(&mut self, samples: &[f32]) -> f32 {
        let target = energy_target(samples);
        self.smoothed += ENERGY_SMOOTHING * (target - self.smoothed);
        self.smoothed
    }

    pub fn value(&self) -> f32 {
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_window_hits_exactly_one() {
        // RMS of an all-max window is 1.0; the 5x gain must clamp, not overshoot.
        let samples = vec![1.0f32; 2048];
        assert_eq!(energy_target(&samples), 1.0);
    }

    #[test]
    fn silence_yields_zero() {
        assert_eq!(energy_target(&vec![0.0f32; 2048]), 0.0);
        assert_eq!(energy_target(&[]), 0.0);
    }

    #[test]
    fn smoothing_follows_the_recurrence() {
        let mut meter = EnergyMeter::new();
        let window = vec![1.0f32; 64];
        let mut expected = 0.0f32;
        for _ in 0..16 {
            expected += ENERGY_SMOOTHING * (1.0 - expected);
            let got = meter.update(&window);
            assert!((got - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn smoothed_value_converges_toward_constant_target() {
        let mut meter = EnergyMeter::new();
        let window = vec![0.1f32; 256];
        let target = energy_target(&window);
        for _ in 0..400 {
            meter.update(&window);
        }
        assert!((meter.value() - target).abs() < 1e-3);
    }

    #[test]
    fn smoothed_value_stays_in_unit_interval() {
        let mut meter = EnergyMeter::new();
        let loud = vec![1.0f32; 64];
        let quiet = vec![0.0f32; 64];
        for i in 0..200 {
            let v = meter.update(if i % 2 == 0 { &loud } else { &quiet });
            assert!((0.0..=1.0).contains(&v), "out of range: {v}");
        }
    }
}
