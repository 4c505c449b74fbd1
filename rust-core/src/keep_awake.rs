//! Scoped ownership of the platform wake lock.
//!
//! The platform implements `WakeLock`; `KeepAwake` owns one and guarantees
//! it is released when navigation stops or the owner is dropped.

use log::{debug, warn};

use crate::error::Result;

pub trait WakeLock {
    fn acquire(&mut self) -> Result<()>;
    fn release(&mut self);
}

impl<L: WakeLock + ?Sized> WakeLock for Box<L> {
    fn acquire(&mut self) -> Result<()> {
        (**self).acquire()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

pub struct KeepAwake<L: WakeLock> {
    lock: L,
    held: bool,
}

impl<L: WakeLock> KeepAwake<L> {
    pub fn new(lock: L) -> Self {
        Self { lock, held: false }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Acquire the lock. A failure is logged and leaves the lock unheld.
    pub fn hold(&mut self) -> bool {
        if self.held {
            return true;
        }
        match self.lock.acquire() {
            Ok(()) => {
                debug!("Wake lock acquired");
                self.held = true;
            }
            Err(e) => warn!("Could not keep the device awake: {e}"),
        }
        self.held
    }

    pub fn release(&mut self) {
        if self.held {
            self.lock.release();
            self.held = false;
            debug!("Wake lock released");
        }
    }
}

impl<L: WakeLock> Drop for KeepAwake<L> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::NavError;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts acquisitions and releases through shared cells.
    #[derive(Clone, Default)]
    pub(crate) struct CountingLock {
        pub acquired: Rc<Cell<u32>>,
        pub released: Rc<Cell<u32>>,
        pub fail: bool,
    }

    impl WakeLock for CountingLock {
        fn acquire(&mut self) -> Result<()> {
            if self.fail {
                return Err(NavError::WakeLock("denied".into()));
            }
            self.acquired.set(self.acquired.get() + 1);
            Ok(())
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn hold_is_idempotent() {
        let lock = CountingLock::default();
        let mut guard = KeepAwake::new(lock.clone());
        assert!(guard.hold());
        assert!(guard.hold());
        assert_eq!(lock.acquired.get(), 1);
    }

    #[test]
    fn drop_releases() {
        let lock = CountingLock::default();
        {
            let mut guard = KeepAwake::new(lock.clone());
            guard.hold();
        }
        assert_eq!(lock.released.get(), 1);
    }

    #[test]
    fn unheld_lock_is_not_released() {
        let lock = CountingLock::default();
        drop(KeepAwake::new(lock.clone()));
        assert_eq!(lock.released.get(), 0);
    }

    #[test]
    fn failed_acquire_is_tolerated() {
        let lock = CountingLock {
            fail: true,
            ..Default::default()
        };
        let mut guard = KeepAwake::new(lock.clone());
        assert!(!guard.hold());
        guard.release();
        assert_eq!(lock.released.get(), 0);
    }
}
