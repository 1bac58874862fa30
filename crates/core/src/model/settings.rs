use std::time::Duration;

use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("total rounds must be > 0")]
    InvalidTotalRounds,

    #[error("time limit must be > 0 ms")]
    InvalidTimeLimit,

    #[error("tick must be > 0 ms and no longer than the time limit")]
    InvalidTick,

    #[error("min points ({min}) must be <= max points ({max})")]
    InvalidPointRange { min: u32, max: u32 },
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

pub const DEFAULT_TOTAL_ROUNDS: u32 = 10;
pub const DEFAULT_TIME_LIMIT_MS: u64 = 20_000;
pub const DEFAULT_TICK_MS: u64 = 100;
pub const DEFAULT_MAX_POINTS: u32 = 100;
pub const DEFAULT_MIN_POINTS: u32 = 10;

/// Session configuration: round count, per-round countdown and point range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    total_rounds: u32,
    time_limit_ms: u64,
    tick_ms: u64,
    max_points: u32,
    min_points: u32,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            tick_ms: DEFAULT_TICK_MS,
            max_points: DEFAULT_MAX_POINTS,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl QuizSettings {
    /// Creates custom settings with the default 100 ms tick.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a count or duration is zero or the point range is inverted.
    pub fn new(
        total_rounds: u32,
        time_limit_ms: u64,
        max_points: u32,
        min_points: u32,
    ) -> Result<Self, SettingsError> {
        Self::default()
            .with_total_rounds(total_rounds)?
            .with_time_limit_ms(time_limit_ms)?
            .with_points(min_points, max_points)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTotalRounds` for zero.
    pub fn with_total_rounds(mut self, total_rounds: u32) -> Result<Self, SettingsError> {
        if total_rounds == 0 {
            return Err(SettingsError::InvalidTotalRounds);
        }
        self.total_rounds = total_rounds;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTimeLimit` for zero, or `InvalidTick` if the
    /// current tick no longer fits in the limit.
    pub fn with_time_limit_ms(mut self, time_limit_ms: u64) -> Result<Self, SettingsError> {
        if time_limit_ms == 0 {
            return Err(SettingsError::InvalidTimeLimit);
        }
        if self.tick_ms > time_limit_ms {
            return Err(SettingsError::InvalidTick);
        }
        self.time_limit_ms = time_limit_ms;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTick` for zero or a tick longer than the limit.
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Result<Self, SettingsError> {
        if tick_ms == 0 || tick_ms > self.time_limit_ms {
            return Err(SettingsError::InvalidTick);
        }
        self.tick_ms = tick_ms;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidPointRange` if `min > max`.
    pub fn with_points(mut self, min_points: u32, max_points: u32) -> Result<Self, SettingsError> {
        if min_points > max_points {
            return Err(SettingsError::InvalidPointRange {
                min: min_points,
                max: max_points,
            });
        }
        self.min_points = min_points;
        self.max_points = max_points;
        Ok(self)
    }

    #[must_use]
    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    #[must_use]
    pub fn time_limit_ms(&self) -> u64 {
        self.time_limit_ms
    }

    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    #[must_use]
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    #[must_use]
    pub fn max_points(&self) -> u32 {
        self.max_points
    }

    #[must_use]
    pub fn min_points(&self) -> u32 {
        self.min_points
    }
}
