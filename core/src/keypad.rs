use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::warn;

use crate::constants::KEY_COUNT;

/// # Keypad
/// Chip-8 input is generated with a hexadecimal keypad.
///
/// ```text
/// |1|2|3|C|
/// |4|5|6|D|
/// |7|8|9|E|
/// |A|0|B|F|
/// ```
///
/// The input source sets and clears keys from its own thread; the executor
/// reads them for EX9E/EXA1 and parks on them for FX0A.
#[derive(Debug, Default)]
pub struct Keypad {
    latch: Mutex<Latch>,
    key_pressed: Condvar,
}

#[derive(Debug, Default)]
struct Latch {
    pressed: [bool; KEY_COUNT],
    // bumped on every press, so a waiter can tell a new press from a held key
    presses: u64,
    last_pressed: u8,
    cancelled: bool,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pressed status of a key
    ///
    /// # Arguments
    /// * `key` the key code, 0x0..=0xF; anything else is ignored
    /// * `pressed` true on key down, false on key up
    pub fn set_key_pressed(&self, key: u8, pressed: bool) {
        if key as usize >= KEY_COUNT {
            warn!("ignoring key code {:#04X}", key);
            return;
        }
        let mut latch = self.lock();
        latch.pressed[key as usize] = pressed;
        if pressed {
            latch.presses = latch.presses.wrapping_add(1);
            latch.last_pressed = key;
            self.key_pressed.notify_all();
        }
    }

    /// Whether a key is held; only the low nibble of `key` is used
    pub fn is_pressed(&self, key: u8) -> bool {
        self.lock().pressed[key as usize & 0xF]
    }

    /// Parks the calling thread until the next key press
    ///
    /// Returns the key that was pressed, or `None` once the keypad has been
    /// cancelled. Keys already held when the wait starts don't count.
    pub fn wait_for_press(&self) -> Option<u8> {
        let latch = self.lock();
        let seen = latch.presses;
        let latch = self
            .key_pressed
            .wait_while(latch, |l| !l.cancelled && l.presses == seen)
            .unwrap_or_else(PoisonError::into_inner);
        if latch.cancelled {
            None
        } else {
            Some(latch.last_pressed)
        }
    }

    /// Wakes any pending `wait_for_press` with `None`.
    /// Stays cancelled, so later waits return immediately, until `reset`.
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.key_pressed.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Releases every key and clears cancellation.
    /// The press counter keeps counting, so a wait already in progress still
    /// resolves on the next press.
    pub fn reset(&self) {
        let mut latch = self.lock();
        latch.pressed = [false; KEY_COUNT];
        latch.last_pressed = 0;
        latch.cancelled = false;
        self.key_pressed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Latch> {
        self.latch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_press_and_release() {
        let keypad = Keypad::new();
        keypad.set_key_pressed(0xE, true);
        assert!(keypad.is_pressed(0xE));
        keypad.set_key_pressed(0xE, false);
        assert!(!keypad.is_pressed(0xE));
    }

    #[test]
    fn test_is_pressed_masks_high_nibble() {
        let keypad = Keypad::new();
        keypad.set_key_pressed(0x3, true);
        assert!(keypad.is_pressed(0x13));
    }

    #[test]
    fn test_ignores_invalid_key() {
        let keypad = Keypad::new();
        keypad.set_key_pressed(0x10, true);
        assert!(!(0..16).any(|k| keypad.is_pressed(k)));
    }

    #[test]
    fn test_wait_resolves_on_next_press() {
        let keypad = Arc::new(Keypad::new());
        let input = Arc::clone(&keypad);
        let presser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            input.set_key_pressed(0x7, true);
        });
        assert_eq!(keypad.wait_for_press(), Some(0x7));
        presser.join().unwrap();
    }

    #[test]
    fn test_wait_ignores_release() {
        let keypad = Arc::new(Keypad::new());
        keypad.set_key_pressed(0x2, true);
        let input = Arc::clone(&keypad);
        let presser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            input.set_key_pressed(0x2, false);
            thread::sleep(Duration::from_millis(10));
            input.set_key_pressed(0xB, true);
        });
        assert_eq!(keypad.wait_for_press(), Some(0xB));
        presser.join().unwrap();
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let keypad = Arc::new(Keypad::new());
        let shutdown = Arc::clone(&keypad);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            shutdown.cancel();
        });
        assert_eq!(keypad.wait_for_press(), None);
        canceller.join().unwrap();
        // sticky until reset
        assert_eq!(keypad.wait_for_press(), None);
        keypad.reset();
        assert!(!keypad.is_cancelled());
    }

    #[test]
    fn test_wait_survives_reset() {
        let keypad = Arc::new(Keypad::new());
        keypad.set_key_pressed(0x1, true);
        let (tx, rx) = std::sync::mpsc::channel();
        let waiter = {
            let keypad = Arc::clone(&keypad);
            thread::spawn(move || tx.send(keypad.wait_for_press()).unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        keypad.reset();
        assert!(!keypad.is_pressed(0x1));
        keypad.set_key_pressed(0x7, true);
        assert_eq!(rx.recv_timeout(Duration::from_millis(500)), Ok(Some(0x7)));
        waiter.join().unwrap();
    }
}
