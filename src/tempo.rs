use std::{fmt, time::Duration};

pub const MIN_BPM: u32 = 1;
pub const MAX_BPM: u32 = 999;
pub const DEFAULT_BPM: u32 = 120;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// A tempo in beats per minute, always within `MIN_BPM..=MAX_BPM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bpm(u32);

impl Bpm {
    pub fn new(value: u32) -> Result<Self, TempoError> {
        if (MIN_BPM..=MAX_BPM).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TempoError::OutOfRange(value as f64))
        }
    }

    /// Parse free-form text from the BPM field.
    ///
    /// Decimal input is rounded to the nearest whole beat before the range
    /// check, so `"119.6"` becomes 120.
    pub fn parse(text: &str) -> Result<Self, TempoError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TempoError::Empty);
        }

        let value: f64 = trimmed
            .parse()
            .map_err(|_| TempoError::NotANumber(trimmed.to_string()))?;
        if !value.is_finite() {
            return Err(TempoError::NotANumber(trimmed.to_string()));
        }

        Self::from_f64(value)
    }

    /// Tempo whose beat lasts `interval`, i.e. `round(60000 / ms)`.
    pub fn from_interval(interval: Duration) -> Result<Self, TempoError> {
        let millis = interval.as_secs_f64() * 1000.0;
        if millis <= 0.0 {
            return Err(TempoError::ZeroInterval);
        }
        Self::from_f64(MILLIS_PER_MINUTE / millis)
    }

    fn from_f64(value: f64) -> Result<Self, TempoError> {
        let rounded = value.round();
        if rounded < MIN_BPM as f64 || rounded > MAX_BPM as f64 {
            return Err(TempoError::OutOfRange(value));
        }
        Ok(Self(rounded as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Time between two beats, rounded to whole milliseconds.
    pub fn interval(self) -> Duration {
        let millis = (MILLIS_PER_MINUTE / self.0 as f64).round();
        Duration::from_millis(millis as u64)
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TempoError {
    Empty,
    NotANumber(String),
    OutOfRange(f64),
    ZeroInterval,
}

impl fmt::Display for TempoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempoError::Empty => write!(f, "tempo is empty"),
            TempoError::NotANumber(text) => write!(f, "\"{text}\" is not a number"),
            TempoError::OutOfRange(value) => write!(
                f,
                "{value} BPM is outside {MIN_BPM}..={MAX_BPM}"
            ),
            TempoError::ZeroInterval => write!(f, "taps landed on the same instant"),
        }
    }
}

impl std::error::Error for TempoError {}
