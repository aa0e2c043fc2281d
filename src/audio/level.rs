//! RMS level estimation with exponential smoothing.
//!
//! The estimate is deliberately crude: RMS in dBFS shifted by a fixed offset,
//! with no frequency weighting and no calibration against a reference meter.
//! Readings are indicative only and must not be treated as SPL.

const FULL_SCALE: f64 = 32768.0;

/// Tunable constants of the estimator.
///
/// The defaults are empirical and uncalibrated; changing them changes what the
/// display calls "dB".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelParams {
    /// Added to dBFS to move the value into a positive display range
    pub offset_db: f64,
    /// Lower clamp bound for a single block estimate
    pub min_db: f64,
    /// Upper clamp bound for a single block estimate
    pub max_db: f64,
    /// EMA weight of the newest block (α)
    pub smoothing: f64,
    /// Added to the RMS inside the logarithm so silence stays finite
    pub epsilon: f64,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            offset_db: 100.0,
            min_db: 0.0,
            max_db: 120.0,
            smoothing: 0.2,
            epsilon: 1e-9,
        }
    }
}

impl LevelParams {
    pub fn new(
        offset_db: f64,
        min_db: f64,
        max_db: f64,
        smoothing: f64,
        epsilon: f64,
    ) -> Result<Self, &'static str> {
        if !(min_db <= max_db) {
            return Err("level min_db must not exceed max_db");
        }
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err("level smoothing must be in (0, 1]");
        }
        if !(epsilon > 0.0) || !offset_db.is_finite() {
            return Err("level epsilon must be positive and offset finite");
        }
        Ok(Self {
            offset_db,
            min_db,
            max_db,
            smoothing,
            epsilon,
        })
    }

    /// Clamped per-block estimate, before smoothing.
    ///
    /// `block` must not be empty.
    pub fn estimate_db(&self, block: &[i16]) -> f64 {
        debug_assert!(!block.is_empty(), "empty blocks are skipped by the caller");
        let sum_sq: f64 = block
            .iter()
            .map(|&s| {
                let x = f64::from(s) / FULL_SCALE;
                x * x
            })
            .sum();
        let rms = (sum_sq / block.len() as f64).sqrt();
        let dbfs = 20.0 * (rms + self.epsilon).log10();
        (dbfs + self.offset_db).clamp(self.min_db, self.max_db)
    }

    /// One smoothing step: estimate `block` and blend it into `prior_db`.
    pub fn process(&self, block: &[i16], prior_db: f64) -> f64 {
        let estimated = self.estimate_db(block);
        self.smoothing * estimated + (1.0 - self.smoothing) * prior_db
    }
}

/// Smoothed level carried across blocks of one capture session. Each
/// session starts a fresh state at 0.
#[derive(Debug, Clone)]
pub struct LevelState {
    params: LevelParams,
    smoothed_db: f64,
}

impl LevelState {
    pub fn new(params: LevelParams) -> Self {
        Self {
            params,
            smoothed_db: 0.0,
        }
    }

    /// Fold one block into the average. Empty blocks leave the state as is.
    pub fn update(&mut self, block: &[i16]) -> f64 {
        if !block.is_empty() {
            self.smoothed_db = self.params.process(block, self.smoothed_db);
        }
        self.smoothed_db
    }

    pub fn smoothed_db(&self) -> f64 {
        self.smoothed_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: i16, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    #[test]
    fn silence_clamps_to_floor() {
        let params = LevelParams::default();
        // 20*log10(1e-9) + 100 = -80 before clamping
        let unclamped = 20.0 * 1e-9f64.log10() + 100.0;
        assert!((unclamped + 80.0).abs() < 1e-9);
        assert_eq!(params.estimate_db(&[0; 480]), 0.0);
        assert_eq!(params.process(&[0; 480], 0.0), 0.0);
    }

    #[test]
    fn full_scale_is_about_one_hundred() {
        let params = LevelParams::default();
        let db = params.estimate_db(&tone(i16::MAX, 1024));
        assert!((db - 100.0).abs() < 0.01, "{db}");

        let db = params.estimate_db(&[i16::MIN; 64]);
        assert!((db - 100.0).abs() < 1e-6, "{db}");
    }

    #[test]
    fn quieter_signal_reads_lower() {
        let params = LevelParams::default();
        let loud = params.estimate_db(&tone(16384, 256));
        let quiet = params.estimate_db(&tone(164, 256));
        // -6 dBFS and -46 dBFS
        assert!((loud - 93.98).abs() < 0.05, "{loud}");
        assert!((quiet - 53.98).abs() < 0.1, "{quiet}");
    }

    #[test]
    fn estimate_is_bounded_by_clamp_range() {
        let params = LevelParams {
            offset_db: 150.0,
            ..LevelParams::default()
        };
        assert_eq!(params.estimate_db(&tone(i16::MAX, 32)), 120.0);
    }

    #[test]
    fn one_step_keeps_eighty_percent_of_the_gap() {
        let params = LevelParams::default();
        let block = tone(8000, 512);
        let estimated = params.estimate_db(&block);
        for prior in [0.0, 12.5, 60.0, 119.0] {
            let smoothed = params.process(&block, prior);
            let expected = 0.8 * (prior - estimated).abs();
            assert!(((smoothed - estimated).abs() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_input_converges() {
        let mut state = LevelState::new(LevelParams::default());
        let block = tone(3000, 256);
        let target = LevelParams::default().estimate_db(&block);
        let mut last_gap = f64::INFINITY;
        for _ in 0..100 {
            let gap = (state.update(&block) - target).abs();
            assert!(gap <= last_gap);
            last_gap = gap;
        }
        assert!(last_gap < 1e-6);
    }

    #[test]
    fn state_skips_empty_blocks() {
        let mut state = LevelState::new(LevelParams::default());
        state.update(&tone(i16::MAX, 128));
        let after_one = state.smoothed_db();
        assert!((after_one - 20.0).abs() < 0.01, "{after_one}");
        assert_eq!(state.update(&[]), after_one);
        assert_eq!(LevelState::new(LevelParams::default()).smoothed_db(), 0.0);
    }

    #[test]
    fn params_reject_inverted_range() {
        assert!(LevelParams::new(100.0, 50.0, 10.0, 0.2, 1e-9).is_err());
        assert!(LevelParams::new(100.0, 0.0, 120.0, 0.0, 1e-9).is_err());
        assert!(LevelParams::new(100.0, 0.0, 120.0, 0.2, 0.0).is_err());
        assert!(LevelParams::new(100.0, 0.0, 120.0, 0.2, 1e-9).is_ok());
    }
}
