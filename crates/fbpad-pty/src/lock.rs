/// Size of the passphrase buffer; one byte is reserved, as for a C string.
pub const PASS_CAPACITY: usize = 1024;

/// Screen lock with a passphrase accumulator.
///
/// Without a configured passphrase the lock can never engage.
#[derive(Debug)]
pub struct ScreenLock {
    passphrase: Option<String>,
    locked: bool,
    typed: Vec<u8>,
}

impl ScreenLock {
    pub fn new(passphrase: Option<String>) -> Self {
        Self {
            passphrase: passphrase.filter(|p| !p.is_empty()),
            locked: false,
            typed: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.passphrase.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Engage the lock, discarding anything typed so far.
    pub fn lock(&mut self) {
        if self.is_enabled() {
            self.locked = true;
            self.typed.clear();
        }
    }

    /// Feed one keystroke while locked. Returns true when this keystroke
    /// unlocked the screen.
    ///
    /// Printable bytes accumulate until the buffer is full; carriage return
    /// compares and clears. Everything else is ignored.
    pub fn feed(&mut self, byte: u8) -> bool {
        if !self.locked {
            return false;
        }
        match byte {
            b'\r' => {
                let matched = self
                    .passphrase
                    .as_deref()
                    .is_some_and(|p| p.as_bytes() == self.typed.as_slice());
                self.typed.clear();
                if matched {
                    self.locked = false;
                    log::info!("screen unlocked");
                }
                matched
            }
            0x20..=0x7e if self.typed.len() + 1 < PASS_CAPACITY => {
                self.typed.push(byte);
                false
            }
            _ => false,
        }
    }

    /// Number of keystrokes held.
    pub fn typed_len(&self) -> usize {
        self.typed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked(pass: &str) -> ScreenLock {
        let mut lock = ScreenLock::new(Some(pass.to_string()));
        lock.lock();
        lock
    }

    fn type_str(lock: &mut ScreenLock, s: &str) -> bool {
        s.bytes().fold(false, |_, b| lock.feed(b))
    }

    #[test]
    fn test_unlock_on_exact_match() {
        let mut lock = locked("secret");
        assert!(lock.is_locked());
        assert!(type_str(&mut lock, "secret\r"));
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_wrong_passphrase_clears_buffer() {
        let mut lock = locked("secret");
        assert!(!type_str(&mut lock, "secrets\r"));
        assert!(lock.is_locked());
        assert_eq!(lock.typed_len(), 0);

        // A retry after the failure starts from scratch.
        assert!(type_str(&mut lock, "secret\r"));
    }

    #[test]
    fn test_prefix_does_not_unlock() {
        let mut lock = locked("secret");
        assert!(!type_str(&mut lock, "secr\r"));
        assert!(lock.is_locked());
    }

    #[test]
    fn test_non_printable_ignored() {
        let mut lock = locked("ab");
        assert!(type_str(&mut lock, "a\x1b\x7f\tb\r"));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let mut lock = locked("x");
        for _ in 0..2000 {
            lock.feed(b'y');
        }
        assert_eq!(lock.typed_len(), PASS_CAPACITY - 1);
        assert!(!lock.feed(b'\r'));
        assert_eq!(lock.typed_len(), 0);
    }

    #[test]
    fn test_disabled_without_passphrase() {
        let mut lock = ScreenLock::new(None);
        lock.lock();
        assert!(!lock.is_enabled());
        assert!(!lock.is_locked());

        let mut empty = ScreenLock::new(Some(String::new()));
        empty.lock();
        assert!(!empty.is_locked());
    }
}
