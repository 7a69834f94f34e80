use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::constants::TIMER_HZ;

/// # Timers
/// The 8-bit delay and sound timers.
///
/// Shared between the executor, which reads and writes them through FX07,
/// FX15 and FX18, and a `TimerClock`, which counts them down. Both counters
/// are atomics so neither side ever sees a torn update.
#[derive(Debug, Default)]
pub struct Timers {
    delay: AtomicU8,
    sound: AtomicU8,
}

impl Timers {
    pub fn new() -> Self {
        Timers {
            delay: AtomicU8::new(0),
            sound: AtomicU8::new(0),
        }
    }

    pub fn delay(&self) -> u8 {
        self.delay.load(Ordering::SeqCst)
    }

    pub fn sound(&self) -> u8 {
        self.sound.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, value: u8) {
        self.delay.store(value, Ordering::SeqCst);
    }

    pub fn set_sound(&self, value: u8) {
        self.sound.store(value, Ordering::SeqCst);
    }

    /// The host should be beeping
    pub fn is_sounding(&self) -> bool {
        self.sound() > 0
    }

    /// One 60Hz tick: both timers count down, stopping at zero
    pub fn tick(&self) {
        Self::count_down(&self.delay);
        Self::count_down(&self.sound);
    }

    pub fn reset(&self) {
        self.set_delay(0);
        self.set_sound(0);
    }

    // saturates at zero; a concurrent store is never overwritten
    fn count_down(timer: &AtomicU8) {
        let _ = timer.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| t.checked_sub(1));
    }
}

/// # TimerClock
/// Ticks a set of `Timers` from its own thread at a fixed wall-clock rate,
/// however fast or slow instructions are being executed.
///
/// Stops when `stop` is called or the clock is dropped.
pub struct TimerClock {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TimerClock {
    /// Starts ticking at `TIMER_HZ`
    pub fn start(timers: Arc<Timers>) -> io::Result<Self> {
        Self::with_rate(timers, TIMER_HZ)
    }

    /// Starts ticking at `hz` ticks per second
    pub fn with_rate(timers: Arc<Timers>, hz: u32) -> io::Result<Self> {
        let period = Duration::from_secs(1) / hz.max(1);
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("timer-clock".into())
            .spawn(move || {
                // deadlines advance by whole periods so lateness doesn't accumulate
                let mut deadline = Instant::now() + period;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stopped.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            timers.tick();
                            deadline += period;
                        }
                        // a stop message or a dropped sender
                        _ => break,
                    }
                }
                debug!("timer clock stopped");
            })?;

        debug!("timer clock started at {}Hz", hz);
        Ok(TimerClock {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stops the clock and waits for its thread to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimerClock {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_decrements_both() {
        let timers = Timers::new();
        timers.set_delay(2);
        timers.set_sound(1);
        timers.tick();
        assert_eq!(timers.delay(), 1);
        assert_eq!(timers.sound(), 0);
    }

    #[test]
    fn test_tick_stops_at_zero() {
        let timers = Timers::new();
        timers.set_delay(1);
        timers.tick();
        timers.tick();
        timers.tick();
        assert_eq!(timers.delay(), 0);
        assert_eq!(timers.sound(), 0);
    }

    #[test]
    fn test_is_sounding() {
        let timers = Timers::new();
        assert!(!timers.is_sounding());
        timers.set_sound(3);
        assert!(timers.is_sounding());
    }

    #[test]
    fn test_reset() {
        let timers = Timers::new();
        timers.set_delay(9);
        timers.set_sound(9);
        timers.reset();
        assert_eq!((timers.delay(), timers.sound()), (0, 0));
    }

    #[test]
    fn test_clock_counts_down_on_wall_time() {
        let timers = Arc::new(Timers::new());
        timers.set_delay(200);
        let clock = TimerClock::with_rate(Arc::clone(&timers), 1000).unwrap();
        thread::sleep(Duration::from_millis(100));
        clock.stop();
        let delay = timers.delay();
        assert!(delay < 200, "delay never ticked: {}", delay);
    }

    #[test]
    fn test_clock_stops_ticking_after_stop() {
        let timers = Arc::new(Timers::new());
        let clock = TimerClock::with_rate(Arc::clone(&timers), 1000).unwrap();
        clock.stop();
        timers.set_delay(50);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(timers.delay(), 50);
    }

    #[test]
    fn test_clock_stops_on_drop() {
        let timers = Arc::new(Timers::new());
        {
            let _clock = TimerClock::with_rate(Arc::clone(&timers), 1000).unwrap();
        }
        timers.set_sound(50);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(timers.sound(), 50);
        // only this test still holds the timers
        assert_eq!(Arc::strong_count(&timers), 1);
    }
}
