use std::{collections::VecDeque, time::Instant};

use crate::tempo::Bpm;

pub const MIN_TAP_WINDOW: usize = 2;
pub const MAX_TAP_WINDOW: usize = 4;
pub const DEFAULT_TAP_WINDOW: usize = MAX_TAP_WINDOW;

/// Tap-based tempo estimator over a sliding window of recent taps.
///
/// Typical usage:
///
/// ```ignore
/// let mut tapper = TapTempo::new(4);
/// if let Some(bpm) = tapper.add_tap(Instant::now()) {
///     println!("Detected tempo: {bpm}");
/// }
/// ```
///
/// The window is never cleared: every tap pushes the oldest one out once the
/// window is full, so the estimate always reflects the most recent taps.
#[derive(Debug, Clone)]
pub struct TapTempo {
    window: usize,
    taps: VecDeque<Instant>,
}

impl TapTempo {
    /// Create a new tap-tempo helper.
    ///
    /// * `window` – number of most recent taps averaged into the estimate,
    ///   between `MIN_TAP_WINDOW` and `MAX_TAP_WINDOW`.
    pub fn new(window: usize) -> Self {
        assert!(
            (MIN_TAP_WINDOW..=MAX_TAP_WINDOW).contains(&window),
            "tap window must hold {MIN_TAP_WINDOW} to {MAX_TAP_WINDOW} taps"
        );

        Self {
            window,
            taps: VecDeque::with_capacity(window + 1),
        }
    }

    /// Register a tap at the supplied instant.
    ///
    /// Returns `Some(bpm)` once the window holds two or more taps and the mean
    /// interval maps onto a valid tempo, otherwise returns `None` and the
    /// caller keeps its current tempo.
    pub fn add_tap(&mut self, now: Instant) -> Option<Bpm> {
        self.taps.push_back(now);
        while self.taps.len() > self.window {
            self.taps.pop_front();
        }

        if self.taps.len() < 2 {
            return None;
        }

        let intervals = self.taps.len() - 1;
        let total = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(earlier, later)| later.saturating_duration_since(*earlier))
            .sum::<std::time::Duration>();

        match Bpm::from_interval(total / intervals as u32) {
            Ok(bpm) => Some(bpm),
            Err(err) => {
                log::debug!("tap ignored for tempo: {err}");
                None
            }
        }
    }

    pub fn taps(&self) -> usize {
        self.taps.len()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_WINDOW)
    }
}
