//! # Admission Control
//!
//! Bounds how many pipelines run at once and stops taking new proposals
//! when the log keeps failing.
//!
//! ## Rules
//!
//! | Condition                                  | `admit` returns         |
//! |--------------------------------------------|-------------------------|
//! | halted                                     | `Halted`                |
//! | `max_in_flight` pipelines already running  | `Backpressure` (no wait)|
//! | otherwise                                  | a permit                |
//!
//! A permit is released when dropped. Any successful pipeline resets the
//! consecutive failure count; reaching the limit halts admissions until an
//! operator resumes them.

use crate::config::AdmissionConfig;
use crate::error::GateError;
use crate::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use tracing::{error, info};

/// Shared admission state.
#[derive(Debug)]
pub struct AdmissionControl {
    max_in_flight: usize,
    failure_limit: u32,
    in_flight: AtomicUsize,
    consecutive_failures: AtomicU32,
    halted: AtomicBool,
}

impl AdmissionControl {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight.max(1),
            failure_limit: config.integrity_failure_limit.max(1),
            in_flight: AtomicUsize::new(0),
            consecutive_failures: AtomicU32::new(0),
            halted: AtomicBool::new(false),
        }
    }

    /// Reserves a pipeline slot.
    pub fn admit(&self) -> Result<AdmissionPermit<'_>> {
        if self.is_halted() {
            return Err(GateError::Halted {
                failures: self.consecutive_failures(),
            });
        }
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            })
            .map_err(|in_flight| GateError::Backpressure {
                in_flight,
                limit: self.max_in_flight,
            })?;
        Ok(AdmissionPermit { control: self })
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Counts an integrity failure; returns true if this one halted admissions.
    pub fn record_integrity_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.failure_limit && !self.halted.swap(true, Ordering::AcqRel) {
            error!(
                "Halting admissions after {} consecutive integrity failures",
                failures
            );
            return true;
        }
        false
    }

    /// Re-opens admissions after an operator has dealt with the log.
    pub fn resume(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        if self.halted.swap(false, Ordering::AcqRel) {
            info!("Admissions resumed");
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }
}

/// A reserved pipeline slot.
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    control: &'a AdmissionControl,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.control.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
