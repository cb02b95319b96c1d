//! Exclusive ownership of an actuator group.
//!
//! A group holds a [`ClaimLock`]; whoever wants to command it takes a
//! [`Claim`] first. Only one claim per lock is alive at a time, and commands
//! presented with another lock's claim are refused.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use snafu::ensure;

use crate::error::{BusySnafu, MotionError, NotOwnerSnafu};

#[derive(Debug, Default, Clone)]
pub struct ClaimLock {
    held: Arc<AtomicBool>,
}

impl ClaimLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock, failing with [`MotionError::Busy`] while another
    /// claim is alive.
    pub fn try_claim(&self) -> Result<Claim, MotionError> {
        let acquired = self
            .held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok();
        ensure!(acquired, BusySnafu);
        Ok(Claim {
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_claimed(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    pub fn check(&self, claim: &Claim) -> Result<(), MotionError> {
        ensure!(Arc::ptr_eq(&self.held, &claim.held), NotOwnerSnafu);
        Ok(())
    }
}

/// Proof of ownership; released on drop.
#[derive(Debug)]
pub struct Claim {
    held: Arc<AtomicBool>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_busy_until_the_first_drops() {
        let lock = ClaimLock::new();
        let claim = lock.try_claim().unwrap();
        assert!(lock.is_claimed());
        assert_eq!(lock.try_claim().unwrap_err(), MotionError::Busy);

        drop(claim);
        assert!(!lock.is_claimed());
        assert!(lock.try_claim().is_ok());
    }

    #[test]
    fn clones_share_one_lock() {
        let lock = ClaimLock::new();
        let shared = lock.clone();
        let claim = shared.try_claim().unwrap();
        assert!(lock.try_claim().is_err());
        lock.check(&claim).unwrap();
    }

    #[test]
    fn foreign_claim_is_not_owner() {
        let ours = ClaimLock::new();
        let theirs = ClaimLock::new();
        let claim = theirs.try_claim().unwrap();
        assert_eq!(ours.check(&claim).unwrap_err(), MotionError::NotOwner);
    }
}
