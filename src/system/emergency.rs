//! Emergency Flag
//!
//! The one piece of state shared between the State Machine and the Safety
//! Monitor besides the motor outputs.
//!
//! # Semantics
//! - Starts cleared
//! - Set exactly once, by the Safety Monitor, when the touch switch closes
//! - Never cleared at runtime; a restart is the only reset
//!
//! Release/acquire ordering makes the flag, and the halt issued just before
//! it is observed, visible across cores.
//!
//! Every wait loop in the controller goes through [`EmergencyFlag::hold`] or
//! [`EmergencyFlag::check`], which is the only cancellation mechanism the
//! State Machine has.

use core::sync::atomic::{AtomicBool, Ordering};
use embassy_time::{Duration, Instant, Timer};

/// Granularity at which waits re-check the flag
pub const ABORT_POLL: Duration = Duration::from_millis(10);

/// Marker returned when a routine gave up because of an emergency stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Aborted;

/// Latched emergency-stop flag
pub struct EmergencyFlag {
    stopped: AtomicBool,
}

impl EmergencyFlag {
    pub const fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_set(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Latches the flag; `true` only for the call that actually set it
    pub(crate) fn trip(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    /// `Err(Aborted)` once the flag is set
    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_set() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    /// Waits for `duration`, returning early with `Err(Aborted)` if the flag
    /// gets set in the meantime
    pub async fn hold(&self, duration: Duration) -> Result<(), Aborted> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let remaining = deadline - now;
            Timer::after(if remaining < ABORT_POLL { remaining } else { ABORT_POLL }).await;
        }
    }
}

impl Default for EmergencyFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_flag_starts_clear() {
        let flag = EmergencyFlag::new();
        assert!(!flag.is_set());
        assert_eq!(flag.check(), Ok(()));
    }

    #[test]
    fn test_trip_is_latched_and_reports_first_caller() {
        let flag = EmergencyFlag::new();
        assert!(flag.trip());
        assert!(flag.is_set());
        assert!(!flag.trip());
        assert!(flag.is_set());
        assert_eq!(flag.check(), Err(Aborted));
    }

    #[test]
    fn test_hold_completes_when_clear() {
        let flag = EmergencyFlag::new();
        let start = Instant::now();
        assert_eq!(block_on(flag.hold(Duration::from_millis(30))), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_hold_aborts_immediately_when_set() {
        let flag = EmergencyFlag::new();
        flag.trip();
        let start = Instant::now();
        assert_eq!(block_on(flag.hold(Duration::from_secs(5))), Err(Aborted));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_hold_aborts_when_set_from_another_thread() {
        let flag = EmergencyFlag::new();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(30));
                flag.trip();
            });
            let start = Instant::now();
            assert_eq!(block_on(flag.hold(Duration::from_secs(5))), Err(Aborted));
            assert!(start.elapsed() < Duration::from_secs(1));
        });
    }
}
