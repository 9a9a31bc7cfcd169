/// Failed-login lockout tracking
///
/// Caretaker PIN logins are short secrets, so repeated failures against the
/// same login target lock it for a fixed window. State is in-process; a
/// restart clears all lockouts.
///
/// # Policy
///
/// - 3 consecutive failures lock the key
/// - the lock lasts 5 minutes
/// - a successful login clears the key
/// - failures older than the lock window are forgotten
///
/// Entries expire like TTL'd counters: every recorded failure sweeps keys
/// whose last failure and lock are both past the window, so the map only
/// holds keys that failed recently.
///
/// # Example
///
/// ```
/// use babycontrol_shared::auth::lockout::LoginLockout;
///
/// let lockout = LoginLockout::default();
/// assert!(lockout.check("smith-family|01").is_ok());
///
/// for _ in 0..3 {
///     lockout.record_failure("smith-family|01");
/// }
/// assert!(lockout.check("smith-family|01").is_err());
/// ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Consecutive failures before a key is locked
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lock duration once the limit is hit
pub const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    failures: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

impl AttemptState {
    fn expired(&self, now: Instant, window: Duration) -> bool {
        let locked = self.locked_until.is_some_and(|until| until > now);
        !locked && now.duration_since(self.last_failure) >= window
    }
}

/// Key is locked; carries the time remaining
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Too many failed login attempts, retry in {} seconds", .retry_after.as_secs())]
pub struct LockedOut {
    pub retry_after: Duration,
}

/// Tracks failed logins per client key
#[derive(Debug)]
pub struct LoginLockout {
    max_attempts: u32,
    lock_duration: Duration,
    attempts: Mutex<HashMap<String, AttemptState>>,
}

impl Default for LoginLockout {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCK_DURATION)
    }
}

impl LoginLockout {
    pub fn new(max_attempts: u32, lock_duration: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lock_duration,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Fails with `LockedOut` while `key` is locked
    pub fn check(&self, key: &str) -> Result<(), LockedOut> {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(state) = attempts.get(key) {
            if let Some(until) = state.locked_until {
                if until > now {
                    return Err(LockedOut {
                        retry_after: until - now,
                    });
                }
                attempts.remove(key);
            }
        }

        Ok(())
    }

    /// Records a failed attempt, returning the lock if this one tripped it
    pub fn record_failure(&self, key: &str) -> Option<LockedOut> {
        let now = Instant::now();
        let window = self.lock_duration;
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());

        attempts.retain(|_, state| !state.expired(now, window));

        let state = attempts.entry(key.to_string()).or_insert(AttemptState {
            failures: 0,
            last_failure: now,
            locked_until: None,
        });

        state.failures += 1;
        state.last_failure = now;
        if state.failures >= self.max_attempts {
            state.locked_until = Some(now + self.lock_duration);
            tracing::warn!(key = %key, failures = state.failures, "Login locked out");
            return Some(LockedOut {
                retry_after: self.lock_duration,
            });
        }

        None
    }

    pub fn record_success(&self, key: &str) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.remove(key);
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locks_after_max_attempts() {
        let lockout = LoginLockout::default();

        assert!(lockout.record_failure("a").is_none());
        assert!(lockout.record_failure("a").is_none());
        assert!(lockout.check("a").is_ok());

        let locked = lockout.record_failure("a").expect("third failure locks");
        assert_eq!(locked.retry_after, DEFAULT_LOCK_DURATION);

        let err = lockout.check("a").unwrap_err();
        assert!(err.retry_after <= DEFAULT_LOCK_DURATION);
        assert!(err.retry_after > Duration::from_secs(290));
    }

    #[test]
    fn test_keys_are_independent() {
        let lockout = LoginLockout::new(1, Duration::from_secs(60));
        lockout.record_failure("a");

        assert!(lockout.check("a").is_err());
        assert!(lockout.check("b").is_ok());
    }

    #[test]
    fn test_success_resets_failures() {
        let lockout = LoginLockout::default();
        lockout.record_failure("a");
        lockout.record_failure("a");
        lockout.record_success("a");

        assert!(lockout.record_failure("a").is_none());
        assert!(lockout.check("a").is_ok());
    }

    #[test]
    fn test_lock_expires() {
        let lockout = LoginLockout::new(1, Duration::from_millis(20));
        lockout.record_failure("a");
        assert!(lockout.check("a").is_err());

        std::thread::sleep(Duration::from_millis(40));
        assert!(lockout.check("a").is_ok());
        assert!(lockout.record_failure("a").is_some());
    }

    #[test]
    fn test_stale_failures_are_swept() {
        let lockout = LoginLockout::new(3, Duration::from_millis(250));
        for i in 0..200 {
            let key = format!("family-{}|01", i);
            lockout.record_failure(&key);
            lockout.record_failure(&key);
        }
        assert_eq!(lockout.tracked_keys(), 200);

        std::thread::sleep(Duration::from_millis(300));
        lockout.record_failure("other|02");
        assert_eq!(lockout.tracked_keys(), 1);
    }

    #[test]
    fn test_active_lock_survives_sweep() {
        let lockout = LoginLockout::new(1, Duration::from_secs(60));
        lockout.record_failure("a");
        lockout.record_failure("b");

        assert!(lockout.check("a").is_err());
        assert_eq!(lockout.tracked_keys(), 2);
    }
}
