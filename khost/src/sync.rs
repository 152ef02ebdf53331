//! Non-blocking mutual exclusion.
//!
//! [`TryLock`] is the only lock the I/O path is allowed to take: acquisition
//! either succeeds immediately or fails with no waiting, so a handler can
//! surface `EBUSY` to its caller instead of queueing inside the driver.

use core::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A mutex whose only acquisition primitive is a try-acquire.
pub struct TryLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: `TryLock` provides mutual exclusion over `data`, so it may be
// shared between threads whenever the protected value may be sent.
unsafe impl<T: Send> Send for TryLock<T> {}
// SAFETY: See above; a `&TryLock<T>` only hands out the value through the
// guard, which holds the flag.
unsafe impl<T: Send> Sync for TryLock<T> {}

impl<T> TryLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Returns `None` immediately if another guard is live.
    pub fn try_lock(&self) -> Option<TryLockGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(TryLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Consumes the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Mutable access without locking; requires exclusive ownership.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

/// RAII guard returned by [`TryLock::try_lock`]; releases on drop, so every
/// exit path of an acquiring operation releases the lock.
pub struct TryLockGuard<'a, T> {
    lock: &'a TryLock<T>,
}

impl<T> Deref for TryLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: The guard's existence proves exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for TryLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: The guard's existence proves exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for TryLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
