use std::time::{Duration, Instant};

use super::HostError;

/// Point in time after which no further remote call may start.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline `budget` from now. A zero budget means no deadline.
    pub fn after(budget: Duration) -> Self {
        if budget.is_zero() {
            return Self::unbounded();
        }
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    pub fn unbounded() -> Self {
        Self { expires_at: None }
    }

    /// Time left for `operation`, or `HostError::Timeout` if none is left.
    /// `None` means unbounded.
    pub fn remaining(&self, operation: &str) -> Result<Option<Duration>, HostError> {
        let Some(expires_at) = self.expires_at else {
            return Ok(None);
        };
        match expires_at.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => Ok(Some(left)),
            _ => Err(HostError::Timeout(operation.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let d = Deadline::unbounded();
        assert!(d.remaining("listing").unwrap().is_none());
    }

    #[test]
    fn zero_budget_is_unbounded() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.remaining("listing").unwrap().is_none());
    }

    #[test]
    fn generous_budget_has_time_left() {
        let d = Deadline::after(Duration::from_secs(60));
        let left = d.remaining("listing").unwrap().unwrap();
        assert!(left <= Duration::from_secs(60));
        assert!(left > Duration::from_secs(50));
    }

    #[test]
    fn expired_budget_times_out() {
        let d = Deadline::after(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(2));
        let err = d.remaining("listing collaborators").unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("listing collaborators"));
    }
}
