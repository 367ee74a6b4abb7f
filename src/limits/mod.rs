//! Limit policy for bounded containers
//!
//! One ceiling governs the approximate aggregate size of every container in
//! a sandbox run. Containers hold an explicit reference to their policy;
//! independent runs use independent policies.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CofferError, Result};

/// Default ceiling on the approximate size of any one container.
pub const DEFAULT_MAX_SIZE: usize = 200_000;

/// Size ceiling consulted at construction and at every growing mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitPolicy {
    /// Maximum aggregate approximate size permitted for one container
    pub max_size: usize,
}

impl LimitPolicy {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Check a prospective size against the ceiling.
    ///
    /// The message becomes the sandbox-visible rejection text when the
    /// check fails.
    pub fn check(&self, projected: usize, message: &str) -> Result<()> {
        if projected > self.max_size {
            debug!(projected, max_size = self.max_size, "{}", message);
            return Err(CofferError::SizeLimitExceeded(message.to_string()));
        }
        Ok(())
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceiling() {
        assert_eq!(LimitPolicy::default().max_size, 200_000);
    }

    #[test]
    fn test_check_within_ceiling() {
        let policy = LimitPolicy::new(10);
        assert!(policy.check(10, "too big").is_ok());
        assert!(policy.check(0, "too big").is_ok());
    }

    #[test]
    fn test_check_over_ceiling() {
        let policy = LimitPolicy::new(10);
        let err = policy.check(11, "too big").unwrap_err();
        assert!(matches!(err, CofferError::SizeLimitExceeded(_)));
        assert_eq!(err.to_string(), "Size limit exceeded: too big");
    }

    #[test]
    fn test_policy_deserializes() {
        let policy: LimitPolicy = serde_json::from_str(r#"{"max_size":5}"#).unwrap();
        assert_eq!(policy, LimitPolicy::new(5));
    }
}
