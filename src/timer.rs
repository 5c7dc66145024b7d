use std::{
    io,
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use crate::ControlMessage;

const THREAD_NAME: &str = "bpm-flash-timer";

/// Identifies one recurring timer for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Source of recurring timers.
///
/// A timer runs for as long as its handle is alive; dropping the handle
/// cancels it.
pub trait Timers {
    type Handle;

    fn start(&mut self, id: TimerId, period: Duration) -> io::Result<Self::Handle>;
}

/// Timers backed by one thread each, delivering ticks to the main loop.
#[derive(Debug, Clone)]
pub struct ThreadTimers {
    tx: Sender<ControlMessage>,
}

impl ThreadTimers {
    pub fn new(tx: Sender<ControlMessage>) -> Self {
        Self { tx }
    }
}

impl Timers for ThreadTimers {
    type Handle = TimerThread;

    fn start(&mut self, id: TimerId, period: Duration) -> io::Result<TimerThread> {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let tx = self.tx.clone();
        let period = period.max(Duration::from_millis(1));

        let thread = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let mut next_tick = Instant::now() + period;
                loop {
                    let timeout = next_tick.saturating_duration_since(Instant::now());
                    match cancel_rx.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {
                            if tx.send(ControlMessage::Tick { timer: id }).is_err() {
                                break;
                            }
                            next_tick = next_tick
                                .checked_add(period)
                                .unwrap_or_else(Instant::now);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(TimerThread {
            cancel: Some(cancel_tx),
            thread: Some(thread),
        })
    }
}

/// Handle to a running timer thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct TimerThread {
    cancel: Option<Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        // Closing the channel wakes the thread out of recv_timeout.
        self.cancel.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
