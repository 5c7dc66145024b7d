use std::io;

use crate::{
    tempo::Bpm,
    timer::{TimerId, Timers},
};

/// Outcome of bringing the pulse schedule in line with the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reschedule {
    /// The active schedule already matches.
    Unchanged,
    /// A fresh timer is running; the caller owes an immediate pulse.
    Started(Bpm),
    /// The previous timer was cancelled and nothing replaced it.
    Stopped,
}

struct Active<H> {
    bpm: Bpm,
    id: TimerId,
    _handle: H,
}

/// Owns the single recurring pulse timer.
///
/// All changes go through [`Scheduler::reconcile`], which always drops the
/// old timer before starting a new one, so at most one timer is ever alive.
pub struct Scheduler<T: Timers> {
    timers: T,
    active: Option<Active<T::Handle>>,
    next_id: u64,
}

impl<T: Timers> Scheduler<T> {
    pub fn new(timers: T) -> Self {
        Self {
            timers,
            active: None,
            next_id: 0,
        }
    }

    /// Make the schedule match `(playing, bpm)`.
    pub fn reconcile(&mut self, playing: bool, bpm: Bpm) -> io::Result<Reschedule> {
        let desired = playing.then_some(bpm);
        let current = self.active.as_ref().map(|active| active.bpm);

        if desired == current {
            return Ok(Reschedule::Unchanged);
        }

        // Cancel before start.
        self.active = None;

        let Some(bpm) = desired else {
            return Ok(Reschedule::Stopped);
        };

        let id = TimerId(self.next_id);
        self.next_id += 1;
        let handle = self.timers.start(id, bpm.interval())?;
        self.active = Some(Active {
            bpm,
            id,
            _handle: handle,
        });
        Ok(Reschedule::Started(bpm))
    }

    /// Whether a tick from `id` should produce a pulse. Ticks from cancelled
    /// timers that were already in flight are rejected here.
    pub fn accept_tick(&self, id: TimerId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }

    pub fn teardown(&mut self) {
        self.active = None;
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Tempo of the live timer, if any.
    pub fn bpm(&self) -> Option<Bpm> {
        self.active.as_ref().map(|active| active.bpm)
    }

    #[cfg(test)]
    pub fn active_timer(&self) -> Option<TimerId> {
        self.active.as_ref().map(|active| active.id)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeTimers;
    use super::*;
    use std::time::Duration;

    fn bpm(value: u32) -> Bpm {
        Bpm::new(value).unwrap()
    }

    #[test]
    fn starts_only_when_playing() {
        let timers = FakeTimers::default();
        let log = timers.log.clone();
        let mut scheduler = Scheduler::new(timers);

        assert_eq!(scheduler.reconcile(false, bpm(120)).unwrap(), Reschedule::Unchanged);
        assert!(!scheduler.is_running());
        assert_eq!(log.borrow().live(), 0);

        assert_eq!(
            scheduler.reconcile(true, bpm(120)).unwrap(),
            Reschedule::Started(bpm(120))
        );
        assert!(scheduler.is_running());
        assert_eq!(log.borrow().started[0].1, Duration::from_millis(500));
        assert_eq!(log.borrow().live(), 1);
    }

    #[test]
    fn same_state_keeps_the_timer() {
        let timers = FakeTimers::default();
        let log = timers.log.clone();
        let mut scheduler = Scheduler::new(timers);

        scheduler.reconcile(true, bpm(100)).unwrap();
        assert_eq!(scheduler.reconcile(true, bpm(100)).unwrap(), Reschedule::Unchanged);
        assert_eq!(log.borrow().started.len(), 1);
        assert!(log.borrow().cancelled.is_empty());
    }

    #[test]
    fn tempo_change_cancels_before_restarting() {
        let timers = FakeTimers::default();
        let log = timers.log.clone();
        let mut scheduler = Scheduler::new(timers);

        scheduler.reconcile(true, bpm(120)).unwrap();
        let old = scheduler.active_timer().unwrap();

        assert_eq!(
            scheduler.reconcile(true, bpm(60)).unwrap(),
            Reschedule::Started(bpm(60))
        );
        let log = log.borrow();
        assert_eq!(log.cancelled, vec![old]);
        assert_eq!(log.started[1].1, Duration::from_millis(1000));
        assert_eq!(log.live(), 1);
        assert!(!scheduler.accept_tick(old));
        assert!(scheduler.accept_tick(log.started[1].0));
    }

    #[test]
    fn stop_cancels_exactly_once() {
        let timers = FakeTimers::default();
        let log = timers.log.clone();
        let mut scheduler = Scheduler::new(timers);

        scheduler.reconcile(true, bpm(120)).unwrap();
        let id = scheduler.active_timer().unwrap();
        assert_eq!(scheduler.reconcile(false, bpm(120)).unwrap(), Reschedule::Stopped);
        assert_eq!(scheduler.reconcile(false, bpm(90)).unwrap(), Reschedule::Unchanged);
        scheduler.teardown();

        assert_eq!(log.borrow().cancelled, vec![id]);
        assert!(!scheduler.accept_tick(id));
    }
}
