use std::time::{Duration, Instant};

use serde::Deserialize;

pub const DEFAULT_RISE_MS: u64 = 80;
pub const DEFAULT_FALL_MS: u64 = 200;

/// Shape of one flash: a linear ramp up, then a longer ramp down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FlashEnvelope {
    pub rise_ms: u64,
    pub fall_ms: u64,
}

impl Default for FlashEnvelope {
    fn default() -> Self {
        Self {
            rise_ms: DEFAULT_RISE_MS,
            fall_ms: DEFAULT_FALL_MS,
        }
    }
}

impl FlashEnvelope {
    fn rise(&self) -> Duration {
        Duration::from_millis(self.rise_ms)
    }

    fn fall(&self) -> Duration {
        Duration::from_millis(self.fall_ms)
    }

    pub fn total(&self) -> Duration {
        self.rise() + self.fall()
    }
}

/// Overlay opacity driven by pulses. A new pulse restarts the envelope.
#[derive(Debug, Clone, Default)]
pub struct Flash {
    envelope: FlashEnvelope,
    started: Option<Instant>,
}

impl Flash {
    pub fn new(envelope: FlashEnvelope) -> Self {
        Self {
            envelope,
            started: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.started
            .is_some_and(|start| now.saturating_duration_since(start) < self.envelope.total())
    }

    /// Opacity in `[0, 1]` at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        let Some(start) = self.started else {
            return 0.0;
        };

        let elapsed = now.saturating_duration_since(start);
        let rise = self.envelope.rise();
        let fall = self.envelope.fall();

        if elapsed < rise {
            return elapsed.as_secs_f32() / rise.as_secs_f32();
        }

        let falling = elapsed - rise;
        if falling < fall {
            1.0 - falling.as_secs_f32() / fall.as_secs_f32()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn ramps_up_then_down() {
        let base = Instant::now();
        let mut flash = Flash::default();
        assert_eq!(flash.opacity(base), 0.0);

        flash.trigger(base);
        assert!((flash.opacity(at(base, 40)) - 0.5).abs() < 1e-3);
        assert!((flash.opacity(at(base, 80)) - 1.0).abs() < 1e-3);
        assert!((flash.opacity(at(base, 180)) - 0.5).abs() < 1e-3);
        assert_eq!(flash.opacity(at(base, 280)), 0.0);
        assert!(!flash.is_active(at(base, 300)));
    }

    #[test]
    fn retrigger_restarts_the_envelope() {
        let base = Instant::now();
        let mut flash = Flash::default();
        flash.trigger(base);
        flash.trigger(at(base, 200));
        assert!(flash.is_active(at(base, 300)));
        assert!((flash.opacity(at(base, 240)) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn zero_rise_jumps_to_full() {
        let base = Instant::now();
        let mut flash = Flash::new(FlashEnvelope {
            rise_ms: 0,
            fall_ms: 100,
        });
        flash.trigger(base);
        assert!((flash.opacity(base) - 1.0).abs() < 1e-3);
    }
}
