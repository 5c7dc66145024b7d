use std::time::Instant;

use crate::{
    click::ClickPlayer,
    flash::{Flash, FlashEnvelope},
    scheduler::{Reschedule, Scheduler},
    tap_tempo::TapTempo,
    tempo::{Bpm, TempoError},
    timer::{TimerId, Timers},
};

/// Text field that currently receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Bpm,
    Color,
}

impl Field {
    pub fn next(self) -> Self {
        match self {
            Field::Bpm => Field::Color,
            Field::Color => Field::Bpm,
        }
    }
}

pub struct Settings {
    pub bpm: Bpm,
    pub color: String,
    pub tap_window: usize,
    pub flash: FlashEnvelope,
}

/// Everything on the metronome screen: tempo, colour, transport and the
/// side effects of each beat.
pub struct Metronome<T: Timers, C: ClickPlayer> {
    bpm: Bpm,
    bpm_input: String,
    tempo_error: Option<TempoError>,
    color: String,
    playing: bool,
    focus: Field,
    tapper: TapTempo,
    scheduler: Scheduler<T>,
    flash: Flash,
    click: Option<C>,
    pulses: u64,
}

impl<T: Timers, C: ClickPlayer> Metronome<T, C> {
    pub fn new(settings: Settings, timers: T, click: C) -> Self {
        Self {
            bpm: settings.bpm,
            bpm_input: settings.bpm.to_string(),
            tempo_error: None,
            color: settings.color,
            playing: false,
            focus: Field::Bpm,
            tapper: TapTempo::new(settings.tap_window),
            scheduler: Scheduler::new(timers),
            flash: Flash::new(settings.flash),
            click: Some(click),
            pulses: 0,
        }
    }

    /// Replace the BPM field text. Valid input retimes the metronome; anything
    /// else is shown as an error and the last valid tempo keeps running.
    pub fn set_bpm_input(&mut self, text: impl Into<String>, now: Instant) {
        self.bpm_input = text.into();
        match Bpm::parse(&self.bpm_input) {
            Ok(bpm) => {
                self.tempo_error = None;
                self.set_bpm(bpm, now);
            }
            Err(err) => {
                log::debug!("invalid tempo input: {err}");
                self.tempo_error = Some(err);
            }
        }
    }

    pub fn set_color(&mut self, text: impl Into<String>) {
        self.color = text.into();
    }

    pub fn edit_focused(&mut self, edit: impl FnOnce(&mut String), now: Instant) {
        match self.focus {
            Field::Bpm => {
                let mut text = self.bpm_input.clone();
                edit(&mut text);
                self.set_bpm_input(text, now);
            }
            Field::Color => {
                let mut text = self.color.clone();
                edit(&mut text);
                self.set_color(text);
            }
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn toggle_playing(&mut self, now: Instant) {
        self.playing = !self.playing;
        if self.playing {
            log::info!("start @ {} BPM", self.bpm);
        } else {
            log::info!("stop");
        }
        self.reconcile(now);
    }

    /// Register a tap. Every tap is itself a beat.
    pub fn tap(&mut self, now: Instant) {
        if let Some(bpm) = self.tapper.add_tap(now) {
            log::info!("tapped tempo {bpm} BPM ({} taps)", self.tapper.taps());
            self.bpm_input = bpm.to_string();
            self.tempo_error = None;
            self.bpm = bpm;
        }
        self.pulse(now);
        self.reconcile(now);
    }

    /// Handle a tick delivered by the timer with the given id.
    pub fn on_tick(&mut self, timer: TimerId, now: Instant) {
        if self.scheduler.accept_tick(timer) {
            self.pulse(now);
        } else {
            log::trace!("dropped stale tick from {timer:?}");
        }
    }

    /// Cancel the schedule and release the click. Safe to call twice.
    pub fn unmount(&mut self) {
        if self.scheduler.is_running() {
            log::info!("cancelling pulse timer on unmount");
        }
        self.scheduler.teardown();
        if let Some(mut click) = self.click.take() {
            click.unload();
        }
    }

    fn set_bpm(&mut self, bpm: Bpm, now: Instant) {
        if bpm != self.bpm {
            log::info!("tempo {} -> {} BPM", self.bpm, bpm);
            self.bpm = bpm;
        }
        self.reconcile(now);
    }

    fn reconcile(&mut self, now: Instant) {
        match self.scheduler.reconcile(self.playing, self.bpm) {
            Ok(Reschedule::Started(bpm)) => {
                log::debug!("pulse timer every {:?} ({bpm} BPM)", bpm.interval());
                self.pulse(now);
            }
            Ok(Reschedule::Stopped) | Ok(Reschedule::Unchanged) => {}
            Err(err) => {
                log::error!("failed to start pulse timer: {err}");
                self.playing = false;
            }
        }
    }

    fn pulse(&mut self, now: Instant) {
        if let Some(click) = self.click.as_mut() {
            if let Err(err) = click.play() {
                log::warn!("{err}");
            }
        }
        self.flash.trigger(now);
        self.pulses += 1;
    }

    pub fn bpm(&self) -> Bpm {
        self.bpm
    }

    pub fn bpm_input(&self) -> &str {
        &self.bpm_input
    }

    pub fn tempo_error(&self) -> Option<&TempoError> {
        self.tempo_error.as_ref()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn tapper(&self) -> &TapTempo {
        &self.tapper
    }

    pub fn opacity(&self, now: Instant) -> f32 {
        self.flash.opacity(now)
    }

    pub fn is_flashing(&self, now: Instant) -> bool {
        self.flash.is_active(now)
    }

    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn scheduler(&self) -> &Scheduler<T> {
        &self.scheduler
    }
}

impl<T: Timers, C: ClickPlayer> Drop for Metronome<T, C> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::click::fake::FakeClick;
    use crate::scheduler::fake::FakeTimers;
    use std::time::Duration;

    fn settings() -> Settings {
        Settings {
            bpm: Bpm::default(),
            color: "#FF0000".into(),
            tap_window: 4,
            flash: FlashEnvelope::default(),
        }
    }

    fn metronome() -> (Metronome<FakeTimers, FakeClick>, FakeTimers, FakeClick) {
        let timers = FakeTimers::default();
        let click = FakeClick::default();
        let metronome = Metronome::new(settings(), timers.clone(), click.clone());
        (metronome, timers, click)
    }

    fn ms(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn start_pulses_immediately_and_schedules() {
        let (mut m, timers, click) = metronome();
        let base = Instant::now();

        m.toggle_playing(base);
        assert!(m.is_playing());
        assert_eq!(m.pulses(), 1);
        assert_eq!(click.log.borrow().plays, 1);
        assert!(m.is_flashing(base));

        let log = timers.log.borrow();
        assert_eq!(log.started.len(), 1);
        assert_eq!(log.started[0].1, Duration::from_millis(500));

        let id = log.started[0].0;
        drop(log);
        m.on_tick(id, ms(base, 500));
        m.on_tick(id, ms(base, 1000));
        assert_eq!(m.pulses(), 3);
    }

    #[test]
    fn no_pulse_after_stop() {
        let (mut m, timers, _) = metronome();
        let base = Instant::now();

        m.toggle_playing(base);
        let id = m.scheduler().active_timer().unwrap();
        m.toggle_playing(ms(base, 100));
        assert!(!m.is_playing());
        assert_eq!(timers.log.borrow().cancelled, vec![id]);

        // A tick queued before the stop arrives late.
        m.on_tick(id, ms(base, 500));
        assert_eq!(m.pulses(), 1);
        assert_eq!(timers.log.borrow().live(), 0);
    }

    #[test]
    fn tempo_edit_while_playing_restarts_fresh() {
        let (mut m, timers, _) = metronome();
        let base = Instant::now();

        m.toggle_playing(base);
        m.set_bpm_input("60", ms(base, 250));

        assert_eq!(m.bpm().get(), 60);
        assert_eq!(m.pulses(), 2);
        let log = timers.log.borrow();
        assert_eq!(log.started.len(), 2);
        assert_eq!(log.cancelled, vec![log.started[0].0]);
        assert_eq!(log.started[1].1, Duration::from_millis(1000));
        assert_eq!(log.live(), 1);
    }

    #[test]
    fn tempo_edit_while_stopped_only_updates_value() {
        let (mut m, timers, click) = metronome();
        m.set_bpm_input("90", Instant::now());
        assert_eq!(m.bpm().get(), 90);
        assert_eq!(m.pulses(), 0);
        assert!(timers.log.borrow().started.is_empty());
        assert_eq!(click.log.borrow().plays, 0);
    }

    #[test]
    fn invalid_input_keeps_last_valid_tempo_running() {
        let (mut m, timers, _) = metronome();
        let base = Instant::now();
        m.toggle_playing(base);

        m.set_bpm_input("abc", ms(base, 10));
        assert!(matches!(m.tempo_error(), Some(TempoError::NotANumber(_))));
        assert_eq!(m.bpm().get(), 120);
        assert_eq!(m.bpm_input(), "abc");
        assert!(m.scheduler().is_running());
        assert_eq!(timers.log.borrow().started.len(), 1);

        m.set_bpm_input("0", ms(base, 20));
        assert!(matches!(m.tempo_error(), Some(TempoError::OutOfRange(_))));

        m.set_bpm_input("100", ms(base, 30));
        assert!(m.tempo_error().is_none());
        assert_eq!(m.scheduler().bpm().map(Bpm::get), Some(100));
    }

    #[test]
    fn taps_pulse_and_set_tempo() {
        let (mut m, timers, _) = metronome();
        let base = Instant::now();

        m.tap(base);
        assert_eq!(m.pulses(), 1);
        assert_eq!(m.bpm().get(), 120);

        m.tap(ms(base, 400));
        m.tap(ms(base, 900));
        m.tap(ms(base, 1300));
        assert_eq!(m.bpm().get(), 138);
        assert_eq!(m.bpm_input(), "138");
        assert_eq!(m.pulses(), 4);
        // Stopped: taps never start a timer.
        assert!(timers.log.borrow().started.is_empty());
    }

    #[test]
    fn tapping_while_playing_retimes_the_schedule() {
        let (mut m, timers, _) = metronome();
        let base = Instant::now();
        m.toggle_playing(base);

        m.tap(ms(base, 100));
        m.tap(ms(base, 350));
        assert_eq!(m.bpm().get(), 240);
        let log = timers.log.borrow();
        assert_eq!(log.live(), 1);
        assert_eq!(log.started.last().unwrap().1, Duration::from_millis(250));
    }

    #[test]
    fn playback_failure_does_not_stop_flash_or_schedule() {
        let timers = FakeTimers::default();
        let click = FakeClick {
            failing: true,
            ..FakeClick::default()
        };
        let mut m = Metronome::new(settings(), timers.clone(), click.clone());
        let base = Instant::now();

        m.toggle_playing(base);
        assert!(m.is_playing());
        assert!(m.is_flashing(base));
        assert_eq!(m.pulses(), 1);
        assert_eq!(click.log.borrow().plays, 1);
        assert_eq!(timers.log.borrow().live(), 1);
    }

    #[test]
    fn unmount_releases_audio_whether_running_or_not() {
        let (mut m, timers, click) = metronome();
        m.toggle_playing(Instant::now());
        m.unmount();
        m.unmount();
        assert_eq!(click.log.borrow().unloads, 1);
        assert_eq!(timers.log.borrow().live(), 0);

        let (m, _, click) = metronome();
        drop(m);
        assert_eq!(click.log.borrow().unloads, 1);
    }

    #[test]
    fn edits_go_to_the_focused_field() {
        let (mut m, _, _) = metronome();
        let now = Instant::now();

        m.edit_focused(|text| text.push('5'), now);
        assert_eq!(m.bpm_input(), "1205");
        assert!(m.tempo_error().is_some());

        m.cycle_focus();
        assert_eq!(m.focus(), Field::Color);
        m.edit_focused(|text| { text.pop(); }, now);
        assert_eq!(m.color(), "#FF000");
    }
}
